//! Structured error types for devtrace
//!
//! Using thiserror for automatic Display implementation and error chaining.
//! Decoding itself never fails; these cover the I/O edges around it.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SampleDumpError {
    #[error("Sample dump ends with a partial record ({trailing} of {record_size} bytes at offset {offset})")]
    TruncatedRecord { offset: usize, trailing: usize, record_size: usize },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("Failed to parse capability registry: {0}")]
    ParseFailed(String),

    #[error("Device {0} not described in capability registry")]
    UnknownDevice(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}
