//! # devtrace - Main Entry Point
//!
//! Decodes a binary sample dump against a capability registry and prints the
//! reconstructed events, either as text lines or as JSON lines (`--json`).

use anyhow::{Context, Result};
use clap::Parser;
use log::info;
use std::io::{BufWriter, Write};

use devtrace::calibration::SystemHostClock;
use devtrace::cli::Args;
use devtrace::decoding::{display_statistics, format_event, Decoder};
use devtrace::diagnostics::LogDiagnostics;
use devtrace::registry::StaticRegistry;
use devtrace::sample_dump::read_samples;

// Exit codes
const EXIT_SUCCESS: i32 = 0;
const EXIT_ERROR: i32 = 1;
const EXIT_USAGE: i32 = 2;

fn main() {
    env_logger::init();
    std::process::exit(match run() {
        Ok(()) => EXIT_SUCCESS,
        Err(e) => {
            let code = exit_code_for(&e);
            eprintln!("error: {e:#}");
            code
        }
    });
}

fn exit_code_for(err: &anyhow::Error) -> i32 {
    let msg = err.to_string().to_lowercase();
    if msg.contains("not described in capability registry") {
        EXIT_USAGE
    } else {
        EXIT_ERROR
    }
}

fn run() -> Result<()> {
    let args = Args::parse();

    let registry = StaticRegistry::from_file(&args.registry)
        .with_context(|| format!("Failed to load registry {}", args.registry.display()))?;
    registry.device(&args.device)?;

    let samples = read_samples(&args.samples)
        .with_context(|| format!("Failed to read samples {}", args.samples.display()))?;

    if !args.quiet {
        eprintln!("devtrace v{}", env!("CARGO_PKG_VERSION"));
        eprintln!("device: {}", args.device);
        eprintln!("samples: {}", samples.len());
    }

    let diagnostics = LogDiagnostics;
    let clock = SystemHostClock::new();
    let mut decoder =
        Decoder::new(&args.device, args.decoder_config(), &registry, &diagnostics, &clock);

    let batch_size = if args.batch_size == 0 { samples.len().max(1) } else { args.batch_size };
    let stdout = std::io::stdout();
    let mut out = BufWriter::new(stdout.lock());

    for batch in samples.chunks(batch_size) {
        if decoder.is_exhausted() {
            info!("Session cap reached after {} samples", decoder.processed_samples());
            break;
        }

        for event in decoder.decode(batch, args.group) {
            if args.json {
                serde_json::to_writer(&mut out, &event).context("Failed to write event JSON")?;
                writeln!(out)?;
            } else if !args.quiet {
                writeln!(out, "{}", format_event(&event))?;
            }
        }
    }
    out.flush()?;

    if !args.quiet {
        display_statistics(&decoder.stats);
    }

    Ok(())
}
