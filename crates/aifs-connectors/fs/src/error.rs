// error.rs - Error types for the filesystem connector.

use std::path::PathBuf;
use thiserror::Error;

use aifs_audit::OperationRecord;
use aifs_vcs::VcsError;
use aifs_workspace::WorkspaceError;

/// Errors that can occur during filesystem operations.
#[derive(Debug, Error)]
pub enum FsError {
    /// The path guard rejected an argument (`InvalidPath`, `PathViolation`,
    /// `ForbiddenPath`).
    #[error(transparent)]
    Workspace(#[from] WorkspaceError),

    #[error("'{path}' does not exist")]
    NotFound { path: String },

    #[error("'{path}' is a directory, not a file")]
    NotAFile { path: String },

    #[error("'{path}' is not a directory")]
    NotADirectory { path: String },

    /// The destination cannot be overwritten as requested.
    #[error("cannot write to '{path}': {reason}")]
    Conflict { path: String, reason: String },

    /// Non-recursive delete of a directory that still has entries.
    #[error("directory '{path}' is not empty; delete it recursively")]
    DirectoryNotEmpty { path: String },

    /// The workspace root itself cannot be deleted, moved or overwritten.
    #[error("the workspace root cannot be {action}")]
    RootProtected { action: String },

    /// A search pattern is not a valid glob.
    #[error("invalid search pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },

    /// No holding-area entry with this id.
    #[error("no deleted item with id '{id}' in the holding area")]
    HoldingEntryNotFound { id: String },

    /// A file I/O operation failed.
    #[error("I/O error at {path}: {source}")]
    IoError {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The platform trash refused the item.
    #[error("could not move '{path}' to the trash: {detail}")]
    Trash { path: String, detail: String },

    /// The holding-area manifest could not be read or written.
    #[error("holding area manifest at {path} is unreadable: {source}")]
    Manifest {
        path: PathBuf,
        source: serde_json::Error,
    },

    /// A version control query (history, rollback) failed.
    #[error(transparent)]
    Vcs(#[from] VcsError),

    /// The file operation succeeded, but committing it failed. The record
    /// describes what was done to the working tree.
    #[error("{} succeeded but was not committed: {source}", .record.summary())]
    Uncommitted {
        record: Box<OperationRecord>,
        source: VcsError,
    },
}

impl FsError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::IoError {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn conflict(path: &str, reason: impl Into<String>) -> Self {
        Self::Conflict {
            path: path.to_string(),
            reason: reason.into(),
        }
    }
}
