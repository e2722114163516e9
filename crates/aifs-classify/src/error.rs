// error.rs - Error types for the classification engine.

use std::path::PathBuf;
use thiserror::Error;

use aifs_connector_fs::FsError;
use aifs_workspace::WorkspaceError;

/// Errors that abort a classification run.
///
/// Per-file problems (unreadable content, a failed move) never surface here;
/// they are collected into the run report instead.
#[derive(Debug, Error)]
pub enum ClassifyError {
    /// Discovery or another filesystem service call failed.
    #[error(transparent)]
    Fs(#[from] FsError),

    #[error("failed to read rules at {path}: {source}")]
    RulesRead {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The rule document exists but is not valid. It is never overwritten in
    /// this state; the user has to fix it by hand.
    #[error("failed to parse rules at {path}: {source}")]
    RulesParse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("failed to write rules to {path}: {source}")]
    RulesWrite {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to serialize rules: {0}")]
    RulesSerialize(#[from] toml::ser::Error),

    #[error("failed to write signal cache to {path}: {source}")]
    CacheWrite {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to encode signal cache: {0}")]
    CacheSerialize(#[from] serde_json::Error),

    #[error("invalid rule block '{block}': {reason}")]
    InvalidRule { block: String, reason: String },

    /// A rules update would have dropped an existing block or criterion.
    #[error("rules update for block '{block}' is not additive")]
    NotAdditive { block: String },
}

/// A file's content could not be turned into a classification signal.
///
/// Not fatal: the file is routed to the unclassified destination.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error(transparent)]
    Workspace(#[from] WorkspaceError),

    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("{path} is not a readable {format} document: {detail}")]
    Corrupt {
        path: String,
        format: &'static str,
        detail: String,
    },

    #[error("{path} is {size} bytes, over the {limit} byte extraction limit")]
    TooLarge { path: String, size: u64, limit: u64 },
}

impl ExtractError {
    pub(crate) fn corrupt(path: &str, format: &'static str, detail: impl ToString) -> Self {
        Self::Corrupt {
            path: path.to_string(),
            format,
            detail: detail.to_string(),
        }
    }
}
