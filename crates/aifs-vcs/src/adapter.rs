//! Core VersionControl trait and commit types

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::rollback::{ConfirmationToken, RevisionRef, RollbackOutcome, RollbackPreview};

/// Subject prefix of commits made by aifs on behalf of an operation.
pub const MACHINE_PREFIX: &str = "[aifs]";

/// Subject prefix of checkpoint commits capturing edits made outside aifs.
pub const MANUAL_PREFIX: &str = "[manual]";

/// How a path changed in a commit (first letter of git's status code).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeStatus {
    Added,
    Modified,
    Deleted,
    Renamed,
    Copied,
    TypeChanged,
    Unknown,
}

impl ChangeStatus {
    pub fn from_code(code: &str) -> Self {
        match code.chars().next() {
            Some('A') => Self::Added,
            Some('M') => Self::Modified,
            Some('D') => Self::Deleted,
            Some('R') => Self::Renamed,
            Some('C') => Self::Copied,
            Some('T') => Self::TypeChanged,
            _ => Self::Unknown,
        }
    }
}

impl fmt::Display for ChangeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Added => "added",
            Self::Modified => "modified",
            Self::Deleted => "deleted",
            Self::Renamed => "renamed",
            Self::Copied => "copied",
            Self::TypeChanged => "type changed",
            Self::Unknown => "changed",
        };
        f.write_str(s)
    }
}

/// One path touched by a commit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangedPath {
    pub status: ChangeStatus,
    /// Path relative to the workspace root (new path for renames).
    pub path: String,
    /// Previous path for renames and copies.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub old_path: Option<String>,
}

/// A versioned snapshot of the workspace.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommitEntry {
    /// Full commit hash.
    pub id: String,
    pub short_id: String,
    pub timestamp: DateTime<Utc>,
    pub author: String,
    /// First line of the message, including the origin prefix.
    pub subject: String,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub changed: Vec<ChangedPath>,
}

impl CommitEntry {
    /// True when aifs made this commit on behalf of an operation.
    pub fn is_machine_authored(&self) -> bool {
        self.subject.starts_with(MACHINE_PREFIX)
    }

    /// True for checkpoints of edits made outside aifs.
    pub fn is_manual_checkpoint(&self) -> bool {
        self.subject.starts_with(MANUAL_PREFIX)
    }

    /// One-line summary of changed paths:
    /// `2 files changed: a.txt (added), b.txt (deleted)`.
    pub fn change_summary(&self) -> String {
        if self.changed.is_empty() {
            return "no file changes".to_string();
        }
        let files = self
            .changed
            .iter()
            .map(|c| match &c.old_path {
                Some(old) => format!("{} -> {} ({})", old, c.path, c.status),
                None => format!("{} ({})", c.path, c.status),
            })
            .collect::<Vec<_>>()
            .join(", ");
        let noun = if self.changed.len() == 1 { "file" } else { "files" };
        format!("{} {} changed: {}", self.changed.len(), noun, files)
    }
}

impl fmt::Display for CommitEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} ({})",
            self.short_id,
            self.timestamp.format("%Y-%m-%d %H:%M:%S"),
            self.subject,
            self.author
        )
    }
}

/// Versioning backend for one workspace.
///
/// Implementations encode their own availability: a disabled backend
/// answers every call with a successful no-op so callers never branch on it.
pub trait VersionControl: Send + Sync {
    /// Commit the whole working tree as one machine-authored change.
    ///
    /// Returns `None` when versioning is disabled.
    fn commit(&self, summary: &str) -> Result<Option<CommitEntry>>;

    /// Commit pending changes made outside aifs, if there are any.
    fn checkpoint_manual(&self) -> Result<Option<CommitEntry>>;

    /// The most recent `n` commits, newest first.
    fn list_recent(&self, n: usize) -> Result<Vec<CommitEntry>>;

    /// Describe what rolling back to `target` would restore.
    fn preview_rollback(&self, target: &RevisionRef) -> Result<RollbackPreview>;

    /// Reset the working tree to `target`. Requires the token obtained by
    /// confirming a preview of the same commit.
    fn rollback(
        &self,
        target: &RevisionRef,
        token: Option<&ConfirmationToken>,
        clean_untracked: bool,
    ) -> Result<RollbackOutcome>;

    /// Whether commits are actually recorded.
    fn is_enabled(&self) -> bool;

    /// Adapter display name (for CLI output)
    fn name(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(subject: &str, changed: Vec<ChangedPath>) -> CommitEntry {
        CommitEntry {
            id: "0123456789abcdef0123456789abcdef01234567".into(),
            short_id: "0123456".into(),
            timestamp: Utc::now(),
            author: "aifs-agent".into(),
            subject: subject.into(),
            body: String::new(),
            changed,
        }
    }

    #[test]
    fn status_codes() {
        assert_eq!(ChangeStatus::from_code("A"), ChangeStatus::Added);
        assert_eq!(ChangeStatus::from_code("R100"), ChangeStatus::Renamed);
        assert_eq!(ChangeStatus::from_code(""), ChangeStatus::Unknown);
    }

    #[test]
    fn origin_prefixes() {
        assert!(entry("[aifs] write a.txt", vec![]).is_machine_authored());
        assert!(entry("[manual] checkpoint", vec![]).is_manual_checkpoint());
        assert!(!entry("initial import", vec![]).is_machine_authored());
    }

    #[test]
    fn change_summary_lists_paths() {
        let commit = entry(
            "[aifs] move a.txt -> docs/a.txt",
            vec![ChangedPath {
                status: ChangeStatus::Renamed,
                path: "docs/a.txt".into(),
                old_path: Some("a.txt".into()),
            }],
        );
        assert_eq!(
            commit.change_summary(),
            "1 file changed: a.txt -> docs/a.txt (renamed)"
        );
        assert_eq!(entry("x", vec![]).change_summary(), "no file changes");
    }
}
