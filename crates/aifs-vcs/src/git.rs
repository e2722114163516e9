//! Git adapter: one repository rooted exactly at the workspace.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::Mutex;

use chrono::{DateTime, Utc};

use crate::adapter::{
    ChangeStatus, ChangedPath, CommitEntry, VersionControl, MACHINE_PREFIX, MANUAL_PREFIX,
};
use crate::config::VcsConfig;
use crate::error::{Result, VcsError};
use crate::rollback::{
    check_token, ConfirmationToken, RevisionRef, RollbackOutcome, RollbackPreview,
};

const FIELD_SEP: char = '\x1f';
const RECORD_SEP: char = '\x1e';
const LOG_FORMAT: &str = "--format=%H%x1f%h%x1f%aI%x1f%an%x1f%s%x1f%b%x1e";

/// Entries appended to `.git/info/exclude` so service state is never
/// versioned or touched by rollback.
const EXCLUDES: &[&str] = &["/.aifs/"];

/// Git adapter that auto-commits each operation.
///
/// The repository is initialised lazily on first use, always inside the
/// workspace root itself, never reusing a repository from a parent directory.
pub struct GitAdapter {
    /// Working directory for git operations
    work_dir: PathBuf,
    config: VcsConfig,
    ready: Mutex<bool>,
}

impl GitAdapter {
    /// Create a new GitAdapter for the given workspace root
    pub fn new(work_dir: impl Into<PathBuf>, config: VcsConfig) -> Self {
        Self {
            work_dir: work_dir.into(),
            config,
            ready: Mutex::new(false),
        }
    }

    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }

    /// Run a git command in the workspace root and return its trimmed stdout.
    fn git_cmd(&self, args: &[&str]) -> Result<String> {
        self.git_raw(args).map(|out| out.trim().to_string())
    }

    fn git_raw(&self, args: &[&str]) -> Result<String> {
        let command = args.join(" ");
        let output = Command::new("git")
            .args(["-c", "core.quotepath=false", "-c", "commit.gpgsign=false"])
            .args(args)
            .current_dir(&self.work_dir)
            // Environment overrides would point git at another repository.
            .env_remove("GIT_DIR")
            .env_remove("GIT_WORK_TREE")
            .env_remove("GIT_INDEX_FILE")
            .output()
            .map_err(|e| VcsError::BackendUnavailable {
                command: command.clone(),
                detail: e.to_string(),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(VcsError::BackendUnavailable {
                command,
                detail: stderr.trim().to_string(),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    /// Make sure the workspace root is a repository with a local identity.
    pub fn ensure(&self) -> Result<()> {
        let mut ready = match self.ready.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if *ready {
            return Ok(());
        }

        if !self.work_dir.join(".git").exists() {
            let branch = self.config.default_branch.as_str();
            if self.git_cmd(&["init", "-b", branch]).is_err() {
                // Older git without `init -b`.
                self.git_cmd(&["init"])?;
                let head = format!("refs/heads/{}", branch);
                self.git_cmd(&["symbolic-ref", "HEAD", &head])?;
            }
            tracing::info!(root = %self.work_dir.display(), "initialised workspace repository");
        }

        self.git_cmd(&["config", "--local", "user.name", &self.config.user_name])?;
        self.git_cmd(&["config", "--local", "user.email", &self.config.user_email])?;
        if cfg!(windows) {
            self.git_cmd(&["config", "--local", "core.autocrlf", "true"])?;
        }
        self.write_excludes()?;

        *ready = true;
        Ok(())
    }

    fn write_excludes(&self) -> Result<()> {
        let path = self.work_dir.join(".git").join("info").join("exclude");
        let existing = fs::read_to_string(&path).unwrap_or_default();
        let missing: Vec<&str> = EXCLUDES
            .iter()
            .copied()
            .filter(|entry| !existing.lines().any(|l| l.trim() == *entry))
            .collect();
        if missing.is_empty() {
            return Ok(());
        }

        let mut content = existing;
        if !content.is_empty() && !content.ends_with('\n') {
            content.push('\n');
        }
        for entry in missing {
            content.push_str(entry);
            content.push('\n');
        }
        let write = || -> std::io::Result<()> {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(&path, content)
        };
        write().map_err(|source| VcsError::MetadataWrite {
            path: path.clone(),
            source,
        })
    }

    fn has_head(&self) -> bool {
        self.git_cmd(&["rev-parse", "--verify", "--quiet", "HEAD"]).is_ok()
    }

    fn has_changes(&self) -> Result<bool> {
        let status = self.git_cmd(&["status", "--porcelain"])?;
        Ok(!status.is_empty())
    }

    /// Stage everything and commit with the given subject.
    fn commit_all(&self, subject: &str, allow_empty: bool) -> Result<CommitEntry> {
        self.git_cmd(&["add", "-A"])?;
        let mut args = vec!["commit", "--quiet", "-m", subject];
        if allow_empty {
            args.push("--allow-empty");
        }
        self.git_cmd(&args)?;
        self.load_commit("HEAD")
    }

    /// Resolve a revision to a full commit hash.
    fn resolve(&self, target: &RevisionRef) -> Result<String> {
        let rev = format!("{}^{{commit}}", target.to_rev_arg());
        self.git_cmd(&["rev-parse", "--verify", "--quiet", &rev])
            .map_err(|_| VcsError::InvalidReference {
                reference: target.to_string(),
                reason: "no such commit in the workspace history".to_string(),
            })
    }

    fn load_commit(&self, rev: &str) -> Result<CommitEntry> {
        let raw = self.git_raw(&["log", "-n", "1", LOG_FORMAT, rev])?;
        let mut commits = self.parse_log(&raw)?;
        commits.pop().ok_or_else(|| VcsError::InvalidReference {
            reference: rev.to_string(),
            reason: "commit not found".to_string(),
        })
    }

    fn parse_log(&self, raw: &str) -> Result<Vec<CommitEntry>> {
        let mut commits = Vec::new();
        for record in raw.split(RECORD_SEP) {
            let record = record.trim_start_matches('\n').trim_end();
            if record.is_empty() {
                continue;
            }
            let fields: Vec<&str> = record.splitn(6, FIELD_SEP).collect();
            if fields.len() < 5 {
                tracing::warn!(record, "skipping malformed git log record");
                continue;
            }
            let timestamp = DateTime::parse_from_rfc3339(fields[2].trim())
                .map(|t| t.with_timezone(&Utc))
                .unwrap_or_else(|_| Utc::now());
            let id = fields[0].trim().to_string();
            let changed = self.changed_paths(&id)?;
            commits.push(CommitEntry {
                short_id: fields[1].trim().to_string(),
                timestamp,
                author: fields[3].trim().to_string(),
                subject: fields[4].trim().to_string(),
                body: fields.get(5).map(|b| b.trim().to_string()).unwrap_or_default(),
                changed,
                id,
            });
        }
        Ok(commits)
    }

    fn changed_paths(&self, id: &str) -> Result<Vec<ChangedPath>> {
        let raw = self.git_raw(&["show", "--name-status", "-M", "--format=", id])?;
        Ok(raw.lines().filter_map(parse_name_status).collect())
    }

    fn checkpoint(&self) -> Result<Option<CommitEntry>> {
        if !self.config.snapshot_manual_changes || !self.has_changes()? {
            return Ok(None);
        }
        let subject = format!("{} checkpoint of changes made outside aifs", MANUAL_PREFIX);
        let entry = self.commit_all(&subject, false)?;
        tracing::info!(commit = %entry.short_id, "checkpointed manual changes");
        Ok(Some(entry))
    }
}

/// Parse one `git show --name-status` line: `M\tpath` or `R090\told\tnew`.
fn parse_name_status(line: &str) -> Option<ChangedPath> {
    let mut parts = line.split('\t');
    let code = parts.next()?.trim();
    if code.is_empty() {
        return None;
    }
    let first = parts.next()?.to_string();
    let status = ChangeStatus::from_code(code);
    match parts.next() {
        Some(second) => Some(ChangedPath {
            status,
            path: second.to_string(),
            old_path: Some(first),
        }),
        None => Some(ChangedPath {
            status,
            path: first,
            old_path: None,
        }),
    }
}

impl VersionControl for GitAdapter {
    fn commit(&self, summary: &str) -> Result<Option<CommitEntry>> {
        self.ensure()?;
        let subject = format!("{} {}", MACHINE_PREFIX, summary);
        // Always one commit per operation, even when it left the tree unchanged.
        let entry = self.commit_all(&subject, true)?;
        tracing::info!(commit = %entry.short_id, summary, "committed operation");
        Ok(Some(entry))
    }

    fn checkpoint_manual(&self) -> Result<Option<CommitEntry>> {
        self.ensure()?;
        self.checkpoint()
    }

    fn list_recent(&self, n: usize) -> Result<Vec<CommitEntry>> {
        self.ensure()?;
        if n == 0 || !self.has_head() {
            return Ok(Vec::new());
        }
        let count = n.to_string();
        let raw = self.git_raw(&["log", "-n", &count, LOG_FORMAT, "HEAD"])?;
        self.parse_log(&raw)
    }

    fn preview_rollback(&self, target: &RevisionRef) -> Result<RollbackPreview> {
        self.ensure()?;
        let resolved = self.resolve(target)?;
        let entry = self.load_commit(&resolved)?;
        let range = format!("{}..HEAD", resolved);
        let raw = self.git_raw(&["log", LOG_FORMAT, &range])?;
        Ok(RollbackPreview {
            reference: target.to_string(),
            target: Some(entry),
            discarded: self.parse_log(&raw)?,
        })
    }

    fn rollback(
        &self,
        target: &RevisionRef,
        token: Option<&ConfirmationToken>,
        clean_untracked: bool,
    ) -> Result<RollbackOutcome> {
        self.ensure()?;
        let resolved = self.resolve(target)?;
        check_token(target, &resolved, token)?;

        // Outside edits would be discarded by the reset; keep them reachable.
        let checkpoint = self.checkpoint()?;
        self.git_cmd(&["reset", "--hard", "--quiet", &resolved])?;
        if clean_untracked {
            self.git_cmd(&["clean", "-fd", "--quiet"])?;
        }
        tracing::info!(reference = %target, commit = %resolved, "rolled back workspace");

        Ok(RollbackOutcome {
            head: Some(resolved),
            checkpoint,
        })
    }

    fn is_enabled(&self) -> bool {
        true
    }

    fn name(&self) -> &str {
        "git"
    }
}
