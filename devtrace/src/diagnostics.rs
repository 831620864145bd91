//! Diagnostic channel
//!
//! Non-fatal conditions met while decoding (trace FIFO overrun, an end event
//! with no pending start, an approximated compute-unit end) are reported
//! here. Nothing sent through this channel ever aborts decoding.

use log::{info, warn};

/// Log target used by [`LogDiagnostics`]
pub const DIAGNOSTIC_TARGET: &str = "devtrace::diagnostics";

/// Severity of a diagnostic message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Warning,
}

/// Sink for decoder diagnostics
pub trait DiagnosticSink {
    fn emit(&self, severity: Severity, message: &str);
}

/// Forwards diagnostics to the `log` facade
#[derive(Debug, Default, Clone, Copy)]
pub struct LogDiagnostics;

impl DiagnosticSink for LogDiagnostics {
    fn emit(&self, severity: Severity, message: &str) {
        match severity {
            Severity::Info => info!(target: DIAGNOSTIC_TARGET, "{message}"),
            Severity::Warning => warn!(target: DIAGNOSTIC_TARGET, "{message}"),
        }
    }
}
