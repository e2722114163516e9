// error.rs - Error types for the version control adapters.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur during version control operations.
#[derive(Debug, Error)]
pub enum VcsError {
    /// Rollback was requested without a confirmation token.
    #[error("rollback to {target} requires confirmation; preview it first and confirm")]
    ConfirmationRequired { target: String },

    /// The confirmation token was issued for a different commit.
    #[error("confirmation token is for commit {confirmed}, but {target} resolves to {resolved}")]
    ConfirmationMismatch {
        target: String,
        confirmed: String,
        resolved: String,
    },

    /// The backend binary is missing, crashed, or rejected the command.
    #[error("version control backend unavailable: `git {command}` failed: {detail}")]
    BackendUnavailable { command: String, detail: String },

    /// A revision reference could not be parsed or does not name a commit.
    #[error("invalid revision reference '{reference}': {reason}")]
    InvalidReference { reference: String, reason: String },

    /// Repository metadata could not be written.
    #[error("failed to update repository metadata at {path}: {source}")]
    MetadataWrite {
        path: PathBuf,
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, VcsError>;
