// error.rs - Error types for the audit sink.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while writing or reading audit logs.
#[derive(Debug, Error)]
pub enum AuditError {
    /// Failed to open or create a day file (or the audit directory).
    #[error("failed to open audit log at {path}: {source}")]
    OpenFailed {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Failed to write an event.
    #[error("failed to append event: {0}")]
    WriteFailed(#[from] std::io::Error),

    /// An event line is not valid JSON for [`crate::AuditEvent`].
    #[error("serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// The hash chain in a day file is broken.
    #[error("integrity check failed in {path} at line {line}: expected hash {expected}, got {actual}")]
    IntegrityViolation {
        path: PathBuf,
        line: usize,
        expected: String,
        actual: String,
    },

    /// Failed to read a file for hashing.
    #[error("failed to hash file at {path}: {source}")]
    HashFileFailed {
        path: PathBuf,
        source: std::io::Error,
    },
}
