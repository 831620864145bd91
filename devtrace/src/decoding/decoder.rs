//! # Trace Decoder
//!
//! Turns batches of [`RawSample`]s into [`LogicalEvent`]s.
//!
//! ## Per-Batch Flow
//!
//! ```text
//! batch ──▶ cap check ──▶ flow dispatch ──┬─▶ emulation path (host time per sample)
//!                                         └─▶ hardware path (two-sample clock training)
//!                                                  │
//!                                                  ▼
//!                                           reconciliation
//!                                                  │
//!                                                  ▼
//!                       clear started bits + half-collected anchors
//! ```
//!
//! ## Dependencies
//!
//! The registry, diagnostic sink and host clock are borrowed for the lifetime
//! of the decoder, so tests can substitute fakes for all three.
//!
//! ## Threading
//!
//! A decoder is driven from one thread. Shard one decoder per device stream
//! when several streams are ingested concurrently.

use log::{debug, info};

use devtrace_common::{
    RawSample, DEFAULT_MAX_TRACE_EVENTS, EMU_WRAP_CYCLES, HW_WRAP_CYCLES, TRACE_FIFO_DEPTH,
};

use super::channel::{ChannelTable, Direction};
use super::event_display::DecodeStats;
use super::{EventSink, LogicalEvent};
use crate::calibration::{ClockCalibrator, HostBaseline, HostClock};
use crate::diagnostics::DiagnosticSink;
use crate::domain::{ChannelId, FlowMode, MonitorGroup, MonitorKind};
use crate::registry::CapabilityRegistry;

/// Tunables of a decoder session
#[derive(Debug, Clone, PartialEq)]
pub struct DecoderConfig {
    /// Samples processed per session before decoding stops
    pub max_trace_events: u64,
    /// Trace clock used for the slope when clock training is degenerate
    pub trace_clock_mhz: f64,
    /// Added to each training anchor's host time (transport delay)
    pub host_delay_compensation_ns: f64,
    /// Wraparound added on overflow, emulation flow
    pub emu_wrap_cycles: u64,
    /// Wraparound added on overflow, hardware flow
    pub hw_wrap_cycles: u64,
    /// Hardware batches this long mean the device FIFO overran
    pub trace_fifo_depth: usize,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            max_trace_events: DEFAULT_MAX_TRACE_EVENTS,
            trace_clock_mhz: 300.0,
            host_delay_compensation_ns: 1000.0,
            emu_wrap_cycles: EMU_WRAP_CYCLES,
            hw_wrap_cycles: HW_WRAP_CYCLES,
            trace_fifo_depth: TRACE_FIFO_DEPTH,
        }
    }
}

/// Stateful decoder for one device's trace stream
pub struct Decoder<'a> {
    device: String,
    pub(super) config: DecoderConfig,

    // Dependencies (readonly)
    pub(super) registry: &'a dyn CapabilityRegistry,
    pub(super) diagnostics: &'a dyn DiagnosticSink,
    pub(super) clock: &'a dyn HostClock,

    // Session state
    pub(super) calibrator: ClockCalibrator,
    pub(super) baseline: HostBaseline,
    pub(super) channels: ChannelTable,
    /// Running corrected timestamp per monitor group (emulation flow)
    pub(super) emu_offsets: [u64; MonitorGroup::COUNT],
    /// Estimated duration of one device cycle in host ms (emulation flow)
    pub(super) emu_cycle_ms: f64,
    processed: u64,

    pub stats: DecodeStats,
}

impl<'a> Decoder<'a> {
    /// Create a decoder for `device`
    #[must_use]
    pub fn new(
        device: impl Into<String>,
        config: DecoderConfig,
        registry: &'a dyn CapabilityRegistry,
        diagnostics: &'a dyn DiagnosticSink,
        clock: &'a dyn HostClock,
    ) -> Self {
        let calibrator =
            ClockCalibrator::new(config.trace_clock_mhz, config.host_delay_compensation_ns);
        Self {
            device: device.into(),
            config,
            registry,
            diagnostics,
            clock,
            calibrator,
            baseline: HostBaseline::default(),
            channels: ChannelTable::default(),
            emu_offsets: [0; MonitorGroup::COUNT],
            emu_cycle_ms: 0.0,
            processed: 0,
            stats: DecodeStats::default(),
        }
    }

    /// Decode one batch of samples captured by `group`.
    ///
    /// Returns the events completed by this batch. A batch arriving after the
    /// session cap was met, or an empty batch, is a no-op. A batch that would
    /// cross the cap is truncated to the remaining capacity.
    pub fn decode(&mut self, samples: &[RawSample], group: MonitorGroup) -> Vec<LogicalEvent> {
        if self.is_exhausted() || samples.is_empty() {
            return Vec::new();
        }

        let take = usize::try_from(self.remaining_capacity())
            .map_or(samples.len(), |remaining| remaining.min(samples.len()));
        if take < samples.len() {
            info!(
                "Sample cap of {} reached, dropping {} samples",
                self.config.max_trace_events,
                samples.len() - take
            );
        }
        let batch = &samples[..take];

        debug!(
            "Decoding {} {group} samples for {} (total = {})",
            batch.len(),
            self.device,
            self.processed
        );
        self.processed += batch.len() as u64;

        let mut sink = EventSink::default();
        match self.registry.flow_mode() {
            FlowMode::HardwareEmulation => self.decode_emulation(batch, group, &mut sink),
            FlowMode::Hardware => {
                self.decode_hardware(batch, group, &mut sink);
                self.reconcile(group, &mut sink);
            }
        }

        self.channels.clear_started();
        self.calibrator.clear_training();

        let events = sink.into_events();
        self.stats.record_batch(batch.len(), &events);
        debug!("Done decoding, {} events", events.len());
        events
    }

    /// Start a new session: drain every queue, forget calibration and
    /// offsets, and reset the sample counter
    pub fn reset_session(&mut self) {
        self.calibrator.reset();
        self.baseline.reset();
        self.channels.reset();
        self.emu_offsets = [0; MonitorGroup::COUNT];
        self.emu_cycle_ms = 0.0;
        self.processed = 0;
    }

    #[must_use]
    pub fn device(&self) -> &str {
        &self.device
    }

    /// Samples processed so far in this session
    #[must_use]
    pub fn processed_samples(&self) -> u64 {
        self.processed
    }

    #[must_use]
    pub fn remaining_capacity(&self) -> u64 {
        self.config.max_trace_events.saturating_sub(self.processed)
    }

    /// Whether the session cap has been met
    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        self.processed >= self.config.max_trace_events
    }

    #[must_use]
    pub fn calibrator(&self) -> &ClockCalibrator {
        &self.calibrator
    }

    /// Estimated host duration of one device cycle (emulation flow).
    /// Zero until the first compute-unit span completes, so earlier
    /// zero-width bursts keep `end_ms == start_ms`.
    #[must_use]
    pub fn emulation_cycle_ms(&self) -> f64 {
        self.emu_cycle_ms
    }

    /// Unmatched burst starts currently queued on a memory channel
    #[must_use]
    pub fn pending_starts(&self, channel: ChannelId, direction: Direction) -> usize {
        match channel.kind {
            MonitorKind::Memory => {
                self.channels.memory.get(channel.slot.0).map_or(0, |c| c.queue(direction).len())
            }
            MonitorKind::Accelerator => 0,
        }
    }
}
