// connector.rs - FsConnector: sandboxed filesystem operations with
// per-operation commits and an audit trail.
//
// Every operation follows the same protocol:
//
//   1. Resolve every path argument through the PathGuard (no I/O before this)
//   2. Check preconditions and perform the operation
//   3. Build an OperationRecord describing what happened
//   4. For mutations, commit the working tree with the record's summary
//   5. Append the record (and commit id) to the audit log
//
// Mutations hold the workspace lock for steps 1-5 so that interleaved
// callers cannot mix two operations into one commit.

use std::fs::{self, File};
use std::io::{Read, Seek, SeekFrom};
use std::sync::{Mutex, MutexGuard};

use walkdir::WalkDir;

use aifs_audit::{AuditEvent, AuditLog, OperationKind, OperationRecord};
use aifs_vcs::{
    CommitEntry, ConfirmationToken, Repository, RevisionRef, RollbackOutcome, RollbackPreview,
    VersionControl,
};
use aifs_workspace::{is_denied_name, PathGuard, ResolvedPath, WorkspaceLayout, WorkspaceRoot};

use crate::config::FsConfig;
use crate::entry::{Entry, OperationReport, ReadOutput, ReadWindow, StatInfo, TransferOptions};
use crate::error::FsError;
use crate::holding::{HoldingArea, HoldingEntry};
use crate::ops;
use crate::search::{join_relative, posix, Search};
use crate::trash::{self, DeleteMode};

/// What a mutation did, before it is recorded and committed.
struct Applied {
    targets: Vec<String>,
    bytes: Option<u64>,
    holding_id: Option<String>,
}

impl Applied {
    fn new(targets: Vec<String>) -> Self {
        Self {
            targets,
            bytes: None,
            holding_id: None,
        }
    }

    fn with_bytes(mut self, bytes: u64) -> Self {
        self.bytes = Some(bytes);
        self
    }
}

/// Filesystem operation service for one workspace.
pub struct FsConnector {
    guard: PathGuard,

    /// Git backend or the disabled no-op adapter.
    repository: Repository,

    /// Where deletes go when `delete_mode = "holding"` (or the platform
    /// trash is unavailable).
    holding: HoldingArea,

    config: FsConfig,

    /// Optional audit log for recording operations.
    audit_log: Mutex<Option<AuditLog>>,

    /// Serializes validate → execute → commit per workspace.
    lock: Mutex<()>,

    /// Who is performing operations (for audit events).
    actor: String,
}

impl FsConnector {
    pub fn new(root: WorkspaceRoot, repository: Repository) -> Self {
        let layout = WorkspaceLayout::for_root(&root);
        Self {
            guard: PathGuard::new(root),
            repository,
            holding: HoldingArea::new(layout.holding_dir),
            config: FsConfig::default(),
            audit_log: Mutex::new(None),
            lock: Mutex::new(()),
            actor: "aifs".to_string(),
        }
    }

    pub fn with_config(mut self, config: FsConfig) -> Self {
        self.config = config;
        self
    }

    /// Attach an audit log to record operations.
    pub fn with_audit_log(mut self, log: AuditLog) -> Self {
        self.audit_log = Mutex::new(Some(log));
        self
    }

    pub fn with_actor(mut self, actor: impl Into<String>) -> Self {
        self.actor = actor.into();
        self
    }

    pub fn root(&self) -> &WorkspaceRoot {
        self.guard.root()
    }

    pub fn guard(&self) -> &PathGuard {
        &self.guard
    }

    pub fn repository(&self) -> &Repository {
        &self.repository
    }

    pub fn config(&self) -> &FsConfig {
        &self.config
    }

    /// Actor name written into audit records.
    pub fn actor(&self) -> &str {
        &self.actor
    }

    // ── Queries ─────────────────────────────────────────────────

    /// Immediate children of a directory, or its whole subtree when
    /// `recursive`. Ordered by depth, then path. Deny-listed entries are
    /// never listed.
    pub fn list(&self, path: &str, recursive: bool) -> Result<Vec<Entry>, FsError> {
        let _lock = self.lock();
        let result = self.list_entries(path, recursive);
        self.observe(OperationKind::List, &[path], &result, |entries| {
            OperationRecord::success(&self.actor, OperationKind::List, vec![path.to_string()])
                .with_count(entries.len() as u64)
        });
        result
    }

    fn list_entries(&self, path: &str, recursive: bool) -> Result<Vec<Entry>, FsError> {
        let base = self.guard.resolve(path)?;
        require_dir(&base, path)?;

        let walker = WalkDir::new(base.absolute())
            .min_depth(1)
            .max_depth(if recursive { usize::MAX } else { 1 })
            .follow_links(false)
            .into_iter()
            .filter_entry(|e| !is_denied_name(e.file_name()));

        let mut entries = Vec::new();
        for item in walker {
            let item = match item {
                Ok(item) => item,
                Err(e) => {
                    tracing::debug!(error = %e, "skipping unreadable entry");
                    continue;
                }
            };
            let Ok(meta) = item.metadata() else { continue };
            let Ok(below) = item.path().strip_prefix(base.absolute()) else {
                continue;
            };
            let relative = join_relative(base.relative(), &posix(below));
            entries.push(Entry::new(relative, &meta, item.depth()));
        }
        entries.sort_by(|a, b| a.depth.cmp(&b.depth).then_with(|| a.path.cmp(&b.path)));
        Ok(entries)
    }

    /// Lazily search below `base` for names matching `pattern` (substring or
    /// glob). Each call re-scans the tree.
    pub fn search(&self, base: &str, pattern: &str, recursive: bool) -> Result<Search<'_>, FsError> {
        let result = self.guard.resolve(base).map_err(FsError::from).and_then(|resolved| {
            require_dir(&resolved, base)?;
            Search::new(
                self,
                resolved.absolute(),
                resolved.relative(),
                pattern,
                recursive,
                self.config.search_limit,
            )
        });
        if let Err(e) = &result {
            let record = OperationRecord::failure(
                &self.actor,
                OperationKind::Search,
                vec![base.to_string(), pattern.to_string()],
                e,
            );
            self.audit(record, None);
        }
        result
    }

    /// Read a file, optionally only a byte window of it.
    pub fn read(&self, path: &str, window: Option<ReadWindow>) -> Result<ReadOutput, FsError> {
        let _lock = self.lock();
        let result = self.read_file(path, window.unwrap_or_default());
        self.observe(OperationKind::Read, &[path], &result, |out| {
            OperationRecord::success(&self.actor, OperationKind::Read, vec![out.path.clone()])
                .with_bytes(out.content.len() as u64)
        });
        result
    }

    fn read_file(&self, path: &str, window: ReadWindow) -> Result<ReadOutput, FsError> {
        let target = self.guard.resolve(path)?;
        if !target.exists() {
            return Err(FsError::NotFound {
                path: path.to_string(),
            });
        }
        if target.is_dir() {
            return Err(FsError::NotAFile {
                path: path.to_string(),
            });
        }

        let abs = target.absolute();
        let mut file = File::open(abs).map_err(|e| FsError::io(abs, e))?;
        let size = file.metadata().map_err(|e| FsError::io(abs, e))?.len();
        let offset = window.offset.min(size);
        let length = window
            .length
            .unwrap_or(u64::MAX)
            .min(self.config.read_max_bytes);

        file.seek(SeekFrom::Start(offset))
            .map_err(|e| FsError::io(abs, e))?;
        let mut content = Vec::new();
        file.take(length)
            .read_to_end(&mut content)
            .map_err(|e| FsError::io(abs, e))?;

        let truncated = offset > 0 || offset + (content.len() as u64) < size;
        Ok(ReadOutput {
            path: target.relative().to_string(),
            content,
            size,
            offset,
            truncated,
        })
    }

    /// Metadata for one path.
    pub fn stat(&self, path: &str) -> Result<StatInfo, FsError> {
        let _lock = self.lock();
        let result = self.guard.resolve(path).map_err(FsError::from).and_then(|target| {
            let meta = fs::metadata(target.absolute()).map_err(|_| FsError::NotFound {
                path: path.to_string(),
            })?;
            Ok(StatInfo::new(target.relative().to_string(), &meta))
        });
        self.observe(OperationKind::Stat, &[path], &result, |info| {
            OperationRecord::success(&self.actor, OperationKind::Stat, vec![info.path.clone()])
        });
        result
    }

    // ── Mutations ───────────────────────────────────────────────

    /// Replace the whole content of a file, creating it and its parent
    /// directories as needed.
    pub fn write(&self, path: &str, content: &[u8]) -> Result<OperationReport, FsError> {
        self.mutate(OperationKind::Write, &[path], || {
            let target = self.guard.resolve(path)?;
            if target.is_root() || target.is_dir() {
                return Err(FsError::NotAFile {
                    path: path.to_string(),
                });
            }
            ops::ensure_parent(target.absolute())?;
            fs::write(target.absolute(), content).map_err(|e| FsError::io(target.absolute(), e))?;
            Ok(Applied::new(vec![target.relative().to_string()]).with_bytes(content.len() as u64))
        })
    }

    /// Create a directory and any missing parents.
    pub fn mkdir(&self, path: &str) -> Result<OperationReport, FsError> {
        self.mutate(OperationKind::Mkdir, &[path], || {
            let target = self.guard.resolve(path)?;
            if target.exists() && !target.is_dir() {
                return Err(FsError::NotADirectory {
                    path: path.to_string(),
                });
            }
            fs::create_dir_all(target.absolute()).map_err(|e| FsError::io(target.absolute(), e))?;
            Ok(Applied::new(vec![target.relative().to_string()]))
        })
    }

    /// Copy a file or directory tree.
    pub fn copy(&self, src: &str, dst: &str, options: TransferOptions) -> Result<OperationReport, FsError> {
        self.transfer(OperationKind::Copy, src, dst, options)
    }

    /// Move (rename) a file or directory tree.
    pub fn move_path(
        &self,
        src: &str,
        dst: &str,
        options: TransferOptions,
    ) -> Result<OperationReport, FsError> {
        self.transfer(OperationKind::Move, src, dst, options)
    }

    fn transfer(
        &self,
        kind: OperationKind,
        src: &str,
        dst: &str,
        options: TransferOptions,
    ) -> Result<OperationReport, FsError> {
        self.mutate(kind, &[src, dst], || {
            let from = self.guard.resolve(src)?;
            let to = self.guard.resolve(dst)?;

            if !from.exists() {
                return Err(FsError::NotFound {
                    path: src.to_string(),
                });
            }
            if from.is_root() && kind == OperationKind::Move {
                return Err(FsError::RootProtected {
                    action: "moved".to_string(),
                });
            }
            if to.is_root() {
                return Err(FsError::RootProtected {
                    action: "overwritten".to_string(),
                });
            }
            if from.absolute() == to.absolute() {
                return Err(FsError::conflict(dst, "source and destination are the same"));
            }
            if from.is_dir() && to.absolute().starts_with(from.absolute()) {
                return Err(FsError::conflict(dst, "destination is inside the source directory"));
            }

            if to.exists() {
                if from.is_dir() != to.is_dir() {
                    let (have, want) = if to.is_dir() {
                        ("directory", "file")
                    } else {
                        ("file", "directory")
                    };
                    return Err(FsError::conflict(
                        dst,
                        format!("destination is a {} but the source is a {}", have, want),
                    ));
                }
                if !options.overwrite {
                    return Err(FsError::conflict(dst, "destination exists and overwrite is off"));
                }
                ops::remove_any(to.absolute())?;
            }

            let bytes = match kind {
                OperationKind::Move => {
                    let size = ops::tree_size(from.absolute());
                    ops::relocate(from.absolute(), to.absolute())?;
                    size
                }
                _ => ops::copy_tree(from.absolute(), to.absolute())?,
            };
            Ok(Applied::new(vec![from.relative().to_string(), to.relative().to_string()])
                .with_bytes(bytes))
        })
    }

    /// Delete a file or directory reversibly: to the platform trash, or to
    /// the workspace holding area.
    ///
    /// A non-empty directory is only deleted when `recursive` is set.
    pub fn delete(&self, path: &str, recursive: bool) -> Result<OperationReport, FsError> {
        self.mutate(OperationKind::Delete, &[path], || {
            let target = self.guard.resolve(path)?;
            if target.is_root() {
                return Err(FsError::RootProtected {
                    action: "deleted".to_string(),
                });
            }
            if !target.exists() {
                return Err(FsError::NotFound {
                    path: path.to_string(),
                });
            }
            if target.is_dir() && !recursive && !ops::is_empty_dir(target.absolute())? {
                return Err(FsError::DirectoryNotEmpty {
                    path: path.to_string(),
                });
            }

            let size = ops::tree_size(target.absolute());
            let holding_id = match self.config.delete_mode {
                DeleteMode::Holding => Some(self.holding.hold(&target)?.id),
                DeleteMode::System => match trash::send_to_system_trash(&target) {
                    Ok(()) => None,
                    Err(e) => {
                        tracing::warn!(error = %e, "platform trash unavailable; using holding area");
                        Some(self.holding.hold(&target)?.id)
                    }
                },
            };

            let mut applied =
                Applied::new(vec![target.relative().to_string()]).with_bytes(size);
            applied.holding_id = holding_id;
            Ok(applied)
        })
    }

    /// Items currently in the holding area.
    pub fn held(&self) -> Result<Vec<HoldingEntry>, FsError> {
        self.holding.list()
    }

    /// Put a held item back at its original path, or at `destination`.
    pub fn restore(&self, id: &str, destination: Option<&str>) -> Result<OperationReport, FsError> {
        self.mutate(OperationKind::Restore, &[id], || {
            let entry = self.holding.get(id)?;
            let requested = destination.unwrap_or(&entry.original_path);
            let dest = self.guard.resolve(requested)?;
            if dest.exists() {
                return Err(FsError::conflict(
                    requested,
                    "something already exists there; restore to another destination",
                ));
            }
            self.holding.release(id, dest.absolute())?;
            Ok(
                Applied::new(vec![format!("holding:{}", id), dest.relative().to_string()])
                    .with_bytes(entry.size),
            )
        })
    }

    // ── History ─────────────────────────────────────────────────

    /// Most recent commits, newest first. Empty when versioning is disabled.
    pub fn history(&self, n: usize) -> Result<Vec<CommitEntry>, FsError> {
        Ok(self.repository.list_recent(n)?)
    }

    pub fn preview_rollback(&self, target: &RevisionRef) -> Result<RollbackPreview, FsError> {
        let _lock = self.lock();
        Ok(self.repository.preview_rollback(target)?)
    }

    /// Reset the working tree to `target`. Blocks every other operation
    /// until the reset completes.
    pub fn rollback(
        &self,
        target: &RevisionRef,
        token: Option<&ConfirmationToken>,
        clean_untracked: bool,
    ) -> Result<RollbackOutcome, FsError> {
        let _lock = self.lock();
        let targets = vec![target.to_string()];
        match self.repository.rollback(target, token, clean_untracked) {
            Ok(outcome) => {
                let record = OperationRecord::success(&self.actor, OperationKind::Rollback, targets);
                self.audit(record, outcome.head.as_deref());
                Ok(outcome)
            }
            Err(e) => {
                let record =
                    OperationRecord::failure(&self.actor, OperationKind::Rollback, targets, &e);
                self.audit(record, None);
                Err(e.into())
            }
        }
    }

    // ── Protocol ────────────────────────────────────────────────

    fn lock(&self) -> MutexGuard<'_, ()> {
        match self.lock.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Run one mutation under the workspace lock, then record and commit it.
    fn mutate<F>(&self, kind: OperationKind, inputs: &[&str], op: F) -> Result<OperationReport, FsError>
    where
        F: FnOnce() -> Result<Applied, FsError>,
    {
        let _lock = self.lock();

        // Outside edits get their own commit so this one holds only `op`.
        if let Err(e) = self.repository.checkpoint_manual() {
            tracing::warn!(error = %e, "could not checkpoint manual changes");
        }

        let applied = match op() {
            Ok(applied) => applied,
            Err(e) => {
                tracing::info!(op = %kind, error = %e, "operation failed");
                let targets = inputs.iter().map(|s| s.to_string()).collect();
                self.audit(OperationRecord::failure(&self.actor, kind, targets, &e), None);
                return Err(e);
            }
        };

        let mut record = OperationRecord::success(&self.actor, kind, applied.targets);
        if let Some(bytes) = applied.bytes {
            record = record.with_bytes(bytes);
        }
        tracing::info!(summary = %record.summary(), "operation applied");

        match self.repository.commit(&record.summary()) {
            Ok(commit) => {
                self.audit(record.clone(), commit.as_ref().map(|c| c.id.as_str()));
                Ok(OperationReport {
                    record,
                    commit,
                    holding_id: applied.holding_id,
                })
            }
            Err(source) => {
                tracing::warn!(error = %source, "operation applied but not committed");
                let event = AuditEvent::new(record.clone())
                    .with_metadata(serde_json::json!({ "commit_error": source.to_string() }));
                self.append(event);
                Err(FsError::Uncommitted {
                    record: Box::new(record),
                    source,
                })
            }
        }
    }

    /// Audit a query's result.
    fn observe<T>(
        &self,
        kind: OperationKind,
        inputs: &[&str],
        result: &Result<T, FsError>,
        on_success: impl FnOnce(&T) -> OperationRecord,
    ) {
        let record = match result {
            Ok(value) => on_success(value),
            Err(e) => {
                let targets = inputs.iter().map(|s| s.to_string()).collect();
                OperationRecord::failure(&self.actor, kind, targets, e)
            }
        };
        tracing::debug!(summary = %record.summary(), success = record.outcome.is_success(), "query");
        self.audit(record, None);
    }

    /// Append a record to the audit log, if one is attached. Used by
    /// higher-level workflows that report their own operation kind.
    pub fn audit(&self, record: OperationRecord, commit_id: Option<&str>) {
        let mut event = AuditEvent::new(record);
        if let Some(id) = commit_id {
            event = event.with_commit(id);
        }
        self.append(event);
    }

    fn append(&self, mut event: AuditEvent) {
        let mut log = match self.audit_log.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Some(log) = log.as_mut() {
            if let Err(e) = log.append(&mut event) {
                tracing::error!(error = %e, "failed to append audit event");
            }
        }
    }
}

fn require_dir(target: &ResolvedPath, input: &str) -> Result<(), FsError> {
    if !target.exists() {
        return Err(FsError::NotFound {
            path: input.to_string(),
        });
    }
    if !target.is_dir() {
        return Err(FsError::NotADirectory {
            path: input.to_string(),
        });
    }
    Ok(())
}
