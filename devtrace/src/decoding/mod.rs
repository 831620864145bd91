//! Trace decoding core
//!
//! - `decoder`: session state, sample cap, flow dispatch
//! - `emulation`: per-sample host timestamps, flag-driven memory bursts
//! - `hardware`: clock training, id bands, toggle masks, reconciliation
//! - `channel`: fixed tables of per-channel correlation state
//! - `event`: output records
//! - `event_display`: headless formatting and statistics

mod channel;
mod decoder;
mod emulation;
pub mod event;
pub mod event_display;
mod hardware;

// Re-export common types
pub use channel::{AccelToggle, Direction};
pub use decoder::{Decoder, DecoderConfig};
pub use event::{Completeness, EventKind, LogicalEvent};
pub(crate) use event::EventSink;
pub use event_display::{display_statistics, format_event, DecodeStats};
