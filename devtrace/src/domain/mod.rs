//! Domain model for devtrace
//!
//! This module contains core domain types and errors that provide:
//! - Compile-time safety via newtype pattern
//! - Self-documenting function signatures
//! - Structured error handling

pub mod errors;
pub mod types;

// Re-export common types for convenience
pub use types::{ChannelId, DeviceCycles, FlowMode, MonitorGroup, MonitorKind, SlotIndex};

pub use errors::{RegistryError, SampleDumpError};
