// error.rs - Error types for workspace validation and path resolution.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while validating the workspace root or resolving a
/// caller-supplied path against it.
///
/// Path errors are caller errors: they are never retried and always carry
/// the path exactly as the caller supplied it.
#[derive(Debug, Error)]
pub enum WorkspaceError {
    /// The configured workspace root is unusable (missing, not a directory,
    /// not writable, or not absolute).
    #[error("invalid workspace root {path}: {reason}")]
    InvalidRoot { path: PathBuf, reason: String },

    /// Malformed input: empty, contains a NUL byte, or names a reserved device.
    #[error("invalid path '{path}': {reason}")]
    InvalidPath { path: String, reason: String },

    /// The path resolves (after `..` and symlinks) outside the workspace root.
    #[error("path '{path}' resolves outside the workspace")]
    PathViolation { path: String },

    /// The path targets a deny-listed location such as `.git`.
    #[error("access to '{path}' is forbidden")]
    ForbiddenPath { path: String },

    /// A file I/O operation failed while resolving or probing.
    #[error("I/O error at {path}: {source}")]
    IoError {
        path: PathBuf,
        source: std::io::Error,
    },
}
