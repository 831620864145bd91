//! CLI argument definitions

use clap::Parser;
use std::path::PathBuf;

use crate::domain::MonitorGroup;
use crate::decoding::DecoderConfig;

#[derive(Parser)]
#[command(
    name = "devtrace",
    about = "Decode accelerator performance-monitor traces into a host timeline",
    after_help = "\
EXAMPLES:
    devtrace trace.bin --registry u200.json --device u200
    devtrace trace.bin --registry u200.json --device u200 --json > events.jsonl
    devtrace trace.bin --registry u200.json --device u200 --batch-size 8192"
)]
pub struct Args {
    /// Binary sample dump (concatenated 24-byte records)
    #[arg(value_name = "SAMPLES")]
    pub samples: PathBuf,

    /// Capability registry describing the device's monitor slots (JSON)
    #[arg(short, long, value_name = "FILE")]
    pub registry: PathBuf,

    /// Device name as listed in the registry
    #[arg(short, long)]
    pub device: String,

    /// Monitor group the samples were captured by
    #[arg(short, long, default_value = "memory")]
    pub group: MonitorGroup,

    /// Samples per decode batch (0 = whole dump in one batch)
    #[arg(long, default_value = "0")]
    pub batch_size: usize,

    /// Cap on samples processed in this session
    #[arg(long)]
    pub max_events: Option<u64>,

    /// Emit one JSON object per event instead of text lines
    #[arg(long)]
    pub json: bool,

    /// Suppress non-essential output
    #[arg(short, long)]
    pub quiet: bool,
}

impl Args {
    /// Decoder configuration derived from the arguments
    #[must_use]
    pub fn decoder_config(&self) -> DecoderConfig {
        let mut config = DecoderConfig::default();
        if let Some(max_events) = self.max_events {
            config.max_trace_events = max_events;
        }
        config
    }
}
