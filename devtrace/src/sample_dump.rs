//! Binary sample dumps
//!
//! A dump is a plain concatenation of [`RawSample`] records in their
//! little-endian form, exactly as offloaded from the device FIFO.

use std::io::Write;
use std::path::Path;

use devtrace_common::{RawSample, SAMPLE_SIZE};

use crate::domain::SampleDumpError;

/// Decode every record in `bytes`
///
/// # Errors
/// Returns an error if `bytes` ends with a partial record
pub fn parse_samples(bytes: &[u8]) -> Result<Vec<RawSample>, SampleDumpError> {
    let chunks = bytes.chunks_exact(SAMPLE_SIZE);
    let trailing = chunks.remainder().len();
    if trailing != 0 {
        return Err(SampleDumpError::TruncatedRecord {
            offset: bytes.len() - trailing,
            trailing,
            record_size: SAMPLE_SIZE,
        });
    }

    Ok(chunks
        .map(|chunk| {
            let mut record = [0u8; SAMPLE_SIZE];
            record.copy_from_slice(chunk);
            RawSample::from_le_bytes(&record)
        })
        .collect())
}

/// Read and decode a dump file
///
/// # Errors
/// Returns an error if the file cannot be read or ends with a partial record
pub fn read_samples(path: impl AsRef<Path>) -> Result<Vec<RawSample>, SampleDumpError> {
    let bytes = std::fs::read(path)?;
    parse_samples(&bytes)
}

/// Encode `samples` to any writer (file, buffer, ...)
///
/// # Errors
/// Returns an error if writing fails
pub fn write_samples<W: Write>(mut writer: W, samples: &[RawSample]) -> Result<(), SampleDumpError> {
    for sample in samples {
        writer.write_all(&sample.to_le_bytes())?;
    }
    writer.flush()?;
    Ok(())
}
