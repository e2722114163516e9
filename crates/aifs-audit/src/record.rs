// record.rs - OperationRecord: one immutable entry per executed operation.
//
// The filesystem service builds a record immediately after an operation runs
// (successfully or not). The same record feeds two consumers: the audit log
// and, for mutations with versioning enabled, the commit message.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Which primitive was executed.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    List,
    Search,
    Read,
    Stat,
    Write,
    Mkdir,
    Copy,
    Move,
    Delete,
    Restore,
    Rollback,
    Classify,
}

impl OperationKind {
    /// Mutating kinds change the working tree and are committed.
    pub fn is_mutating(self) -> bool {
        matches!(
            self,
            Self::Write
                | Self::Mkdir
                | Self::Copy
                | Self::Move
                | Self::Delete
                | Self::Restore
                | Self::Rollback
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::List => "list",
            Self::Search => "search",
            Self::Read => "read",
            Self::Stat => "stat",
            Self::Write => "write",
            Self::Mkdir => "mkdir",
            Self::Copy => "copy",
            Self::Move => "move",
            Self::Delete => "delete",
            Self::Restore => "restore",
            Self::Rollback => "rollback",
            Self::Classify => "classify",
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether the operation succeeded.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Outcome {
    Success,
    Failure { error: String },
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success)
    }
}

/// A record of one executed operation.
///
/// Fields are public for reading; records are built once through
/// [`OperationRecord::success`] / [`OperationRecord::failure`] plus the
/// builder setters and never modified after being handed off.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OperationRecord {
    /// When the operation finished (UTC).
    pub timestamp: DateTime<Utc>,

    /// Who issued the request (session or agent id).
    pub actor: String,

    pub kind: OperationKind,

    /// Workspace-relative target paths; `[source, destination]` for copy/move.
    pub targets: Vec<String>,

    pub outcome: Outcome,

    /// Bytes read or written, where relevant.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bytes: Option<u64>,

    /// Entries listed, matches found, or files classified, where relevant.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<u64>,
}

impl OperationRecord {
    pub fn success(actor: impl Into<String>, kind: OperationKind, targets: Vec<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            actor: actor.into(),
            kind,
            targets,
            outcome: Outcome::Success,
            bytes: None,
            count: None,
        }
    }

    pub fn failure(
        actor: impl Into<String>,
        kind: OperationKind,
        targets: Vec<String>,
        error: impl fmt::Display,
    ) -> Self {
        Self {
            outcome: Outcome::Failure {
                error: error.to_string(),
            },
            ..Self::success(actor, kind, targets)
        }
    }

    pub fn with_bytes(mut self, bytes: u64) -> Self {
        self.bytes = Some(bytes);
        self
    }

    pub fn with_count(mut self, count: u64) -> Self {
        self.count = Some(count);
        self
    }

    /// One-line human summary, used as the body of commit messages.
    ///
    /// `write notes/todo.txt (8 bytes)`, `move a.txt -> docs/a.txt`.
    pub fn summary(&self) -> String {
        let targets = match self.kind {
            OperationKind::Copy | OperationKind::Move | OperationKind::Restore
                if self.targets.len() == 2 =>
            {
                format!("{} -> {}", self.targets[0], self.targets[1])
            }
            _ => self.targets.join(", "),
        };
        let mut line = format!("{} {}", self.kind, targets);
        if let Some(bytes) = self.bytes {
            line.push_str(&format!(" ({} bytes)", bytes));
        } else if let Some(count) = self.count {
            line.push_str(&format!(" ({} entries)", count));
        }
        line
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mutating_kinds() {
        assert!(OperationKind::Write.is_mutating());
        assert!(OperationKind::Delete.is_mutating());
        assert!(OperationKind::Rollback.is_mutating());
        assert!(!OperationKind::Read.is_mutating());
        assert!(!OperationKind::Search.is_mutating());
    }

    #[test]
    fn summary_for_write_mentions_size() {
        let record = OperationRecord::success("s1", OperationKind::Write, vec!["notes/todo.txt".into()])
            .with_bytes(8);
        assert_eq!(record.summary(), "write notes/todo.txt (8 bytes)");
    }

    #[test]
    fn summary_for_move_uses_arrow() {
        let record = OperationRecord::success(
            "s1",
            OperationKind::Move,
            vec!["a.txt".into(), "docs/a.txt".into()],
        );
        assert_eq!(record.summary(), "move a.txt -> docs/a.txt");
    }

    #[test]
    fn failure_keeps_error_text() {
        let record = OperationRecord::failure("s1", OperationKind::Read, vec!["x".into()], "not found");
        assert_eq!(
            record.outcome,
            Outcome::Failure {
                error: "not found".into()
            }
        );
        assert!(!record.outcome.is_success());
    }

    #[test]
    fn outcome_serializes_with_status_tag() {
        let json = serde_json::to_string(&Outcome::Success).unwrap();
        assert_eq!(json, r#"{"status":"success"}"#);
    }
}
