//! Rollback references, previews, and the confirmation gate.
//!
//! A rollback is a two-step exchange: the caller asks for a
//! [`RollbackPreview`], shows it to the user, and only on approval calls
//! [`RollbackPreview::confirm`] to obtain the [`ConfirmationToken`] that
//! `rollback` demands. The token is bound to the commit the preview
//! resolved, so a stale approval cannot roll back to a different commit.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::adapter::CommitEntry;
use crate::error::VcsError;

/// Which commit to roll back to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RevisionRef {
    /// `n` commits before HEAD (`HEAD~n`).
    Back(usize),
    /// A full or abbreviated commit hash.
    Commit(String),
}

impl RevisionRef {
    pub fn commits_back(n: usize) -> Self {
        Self::Back(n)
    }

    /// Argument form understood by the backend.
    pub fn to_rev_arg(&self) -> String {
        match self {
            Self::Back(0) => "HEAD".to_string(),
            Self::Back(n) => format!("HEAD~{}", n),
            Self::Commit(id) => id.clone(),
        }
    }
}

impl fmt::Display for RevisionRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_rev_arg())
    }
}

impl FromStr for RevisionRef {
    type Err = VcsError;

    /// Accepts `HEAD`, `HEAD~N`, `HEAD^`, `~N`, or a 4-40 digit hex hash.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let invalid = |reason: &str| VcsError::InvalidReference {
            reference: s.to_string(),
            reason: reason.to_string(),
        };

        if s.eq_ignore_ascii_case("HEAD") {
            return Ok(Self::Back(0));
        }
        if s.eq_ignore_ascii_case("HEAD^") {
            return Ok(Self::Back(1));
        }
        let relative = s
            .strip_prefix("HEAD~")
            .or_else(|| s.strip_prefix("head~"))
            .or_else(|| s.strip_prefix('~'));
        if let Some(count) = relative {
            if count.is_empty() {
                return Ok(Self::Back(1));
            }
            return count
                .parse::<usize>()
                .map(Self::Back)
                .map_err(|_| invalid("expected a commit count after '~'"));
        }
        if (4..=40).contains(&s.len()) && s.chars().all(|c| c.is_ascii_hexdigit()) {
            return Ok(Self::Commit(s.to_ascii_lowercase()));
        }
        Err(invalid("expected HEAD, HEAD~N, ~N, or a commit hash"))
    }
}

/// Proof that the user approved rolling back to one specific commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfirmationToken {
    commit_id: String,
}

impl ConfirmationToken {
    /// The commit this token authorises a rollback to.
    pub fn commit_id(&self) -> &str {
        &self.commit_id
    }
}

/// What a rollback would do, for presentation before confirmation.
#[derive(Debug, Clone, Serialize)]
pub struct RollbackPreview {
    /// The reference as requested.
    pub reference: String,
    /// The resolved target commit; `None` when versioning is disabled.
    pub target: Option<CommitEntry>,
    /// Commits that would no longer be on the branch, newest first.
    pub discarded: Vec<CommitEntry>,
}

impl RollbackPreview {
    /// Approve this preview.
    pub fn confirm(&self) -> ConfirmationToken {
        ConfirmationToken {
            commit_id: self
                .target
                .as_ref()
                .map(|c| c.id.clone())
                .unwrap_or_default(),
        }
    }

    /// Human-readable description shown before asking for approval.
    pub fn describe(&self) -> String {
        let Some(target) = &self.target else {
            return "Version control is disabled; rollback has no effect.".to_string();
        };
        let mut text = format!("Roll back to {}\n  {}", target, target.change_summary());
        if self.discarded.is_empty() {
            text.push_str("\nNo later commits will be undone.");
        } else {
            text.push_str(&format!("\nUndoes {} later commit(s):", self.discarded.len()));
            for commit in &self.discarded {
                text.push_str(&format!("\n  {}", commit));
            }
        }
        text
    }
}

/// Result of a completed rollback.
#[derive(Debug, Clone, Serialize)]
pub struct RollbackOutcome {
    /// Commit the working tree now matches; `None` when versioning is disabled.
    pub head: Option<String>,
    /// Checkpoint of outside edits taken just before resetting.
    pub checkpoint: Option<CommitEntry>,
}

/// Check a token against the commit `target` resolved to.
pub(crate) fn check_token(
    target: &RevisionRef,
    resolved: &str,
    token: Option<&ConfirmationToken>,
) -> Result<(), VcsError> {
    let token = token.ok_or_else(|| VcsError::ConfirmationRequired {
        target: target.to_string(),
    })?;
    if token.commit_id != resolved {
        return Err(VcsError::ConfirmationMismatch {
            target: target.to_string(),
            confirmed: token.commit_id.clone(),
            resolved: resolved.to_string(),
        });
    }
    Ok(())
}
