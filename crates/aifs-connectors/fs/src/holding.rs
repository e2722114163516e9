// holding.rs - Workspace-local holding area for deleted items.
//
// Deleted files and directories are moved under `<data>/holding/<id>/` and
// listed in `manifest.json`, so they can be restored by id even where no
// platform trash is available. The data directory is deny-listed and never
// versioned, so held items are invisible to every other operation.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use aifs_workspace::ResolvedPath;

use crate::entry::EntryKind;
use crate::error::FsError;
use crate::ops;

const MANIFEST: &str = "manifest.json";

/// One item waiting in the holding area.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HoldingEntry {
    pub id: String,
    /// Where the item lived, relative to the workspace root.
    pub original_path: String,
    pub kind: EntryKind,
    pub size: u64,
    pub deleted_at: DateTime<Utc>,
}

/// The holding area of one workspace.
#[derive(Debug, Clone)]
pub struct HoldingArea {
    dir: PathBuf,
}

impl HoldingArea {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Entries currently held, oldest first.
    pub fn list(&self) -> Result<Vec<HoldingEntry>, FsError> {
        let path = self.dir.join(MANIFEST);
        if !path.exists() {
            return Ok(Vec::new());
        }
        let content = fs::read_to_string(&path).map_err(|e| FsError::io(&path, e))?;
        serde_json::from_str(&content).map_err(|source| FsError::Manifest { path, source })
    }

    pub fn get(&self, id: &str) -> Result<HoldingEntry, FsError> {
        self.list()?
            .into_iter()
            .find(|e| e.id == id)
            .ok_or_else(|| FsError::HoldingEntryNotFound { id: id.to_string() })
    }

    /// Record `target` and move it into the holding area. The manifest is
    /// written first; if the move then fails the record is withdrawn.
    pub fn hold(&self, target: &ResolvedPath) -> Result<HoldingEntry, FsError> {
        let meta = fs::symlink_metadata(target.absolute())
            .map_err(|e| FsError::io(target.absolute(), e))?;
        let kind = EntryKind::from_metadata(&meta);
        let size = ops::tree_size(target.absolute());

        let id = format!(
            "{}-{}",
            Utc::now().format("%Y%m%dT%H%M%S"),
            &Uuid::new_v4().simple().to_string()[..8]
        );
        let entry = HoldingEntry {
            id,
            original_path: target.relative().to_string(),
            kind,
            size,
            deleted_at: Utc::now(),
        };
        let mut entries = self.list()?;
        entries.push(entry.clone());
        self.save(&entries)?;

        let slot = self.dir.join(&entry.id);
        let moved = fs::create_dir_all(&slot)
            .map_err(|e| FsError::io(&slot, e))
            .and_then(|()| {
                ops::relocate(target.absolute(), &self.payload_path(&entry.id, target.relative()))
            });
        if let Err(e) = moved {
            entries.pop();
            if let Err(save_err) = self.save(&entries) {
                tracing::warn!(id = %entry.id, error = %save_err, "could not withdraw holding record");
            }
            if let Err(rm_err) = fs::remove_dir_all(&slot) {
                tracing::debug!(path = %slot.display(), error = %rm_err, "no holding slot to clean");
            }
            return Err(e);
        }

        tracing::info!(id = %entry.id, path = %entry.original_path, "moved to holding area");
        Ok(entry)
    }

    /// Move a held item to `destination` (an absolute path already validated
    /// by the caller) and forget it.
    pub fn release(&self, id: &str, destination: &Path) -> Result<HoldingEntry, FsError> {
        let mut entries = self.list()?;
        let index = entries
            .iter()
            .position(|e| e.id == id)
            .ok_or_else(|| FsError::HoldingEntryNotFound { id: id.to_string() })?;
        let entry = entries.remove(index);

        ops::relocate(&self.payload_path(id, &entry.original_path), destination)?;
        let slot = self.dir.join(id);
        if let Err(e) = fs::remove_dir_all(&slot) {
            tracing::warn!(path = %slot.display(), error = %e, "could not clean holding slot");
        }
        self.save(&entries)?;
        Ok(entry)
    }

    fn payload_path(&self, id: &str, original: &str) -> PathBuf {
        let name = original.rsplit('/').next().unwrap_or(original);
        self.dir.join(id).join(name)
    }

    fn save(&self, entries: &[HoldingEntry]) -> Result<(), FsError> {
        fs::create_dir_all(&self.dir).map_err(|e| FsError::io(&self.dir, e))?;
        let path = self.dir.join(MANIFEST);
        let json = serde_json::to_string_pretty(entries).map_err(|source| FsError::Manifest {
            path: path.clone(),
            source,
        })?;
        fs::write(&path, json).map_err(|e| FsError::io(&path, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aifs_workspace::{PathGuard, WorkspaceRoot};
    use tempfile::tempdir;

    fn setup() -> (tempfile::TempDir, PathGuard, HoldingArea) {
        let dir = tempdir().unwrap();
        let root = WorkspaceRoot::new(dir.path()).unwrap();
        let holding = HoldingArea::new(root.join(".aifs/holding"));
        (dir, PathGuard::new(root), holding)
    }

    #[test]
    fn hold_and_release_file() {
        let (dir, guard, holding) = setup();
        fs::create_dir_all(dir.path().join("notes")).unwrap();
        fs::write(dir.path().join("notes/todo.txt"), "buy milk").unwrap();

        let target = guard.resolve("notes/todo.txt").unwrap();
        let entry = holding.hold(&target).unwrap();
        assert!(!dir.path().join("notes/todo.txt").exists());
        assert_eq!(entry.original_path, "notes/todo.txt");
        assert_eq!(entry.kind, EntryKind::File);
        assert_eq!(entry.size, 8);
        assert_eq!(holding.list().unwrap().len(), 1);

        holding
            .release(&entry.id, &dir.path().join("notes/todo.txt"))
            .unwrap();
        assert_eq!(
            fs::read_to_string(dir.path().join("notes/todo.txt")).unwrap(),
            "buy milk"
        );
        assert!(holding.list().unwrap().is_empty());
    }

    #[test]
    fn hold_directory_tree() {
        let (dir, guard, holding) = setup();
        fs::create_dir_all(dir.path().join("old/nested")).unwrap();
        fs::write(dir.path().join("old/nested/a.txt"), "a").unwrap();

        let entry = holding.hold(&guard.resolve("old").unwrap()).unwrap();
        assert_eq!(entry.kind, EntryKind::Directory);
        assert!(!dir.path().join("old").exists());

        holding.release(&entry.id, &dir.path().join("old")).unwrap();
        assert!(dir.path().join("old/nested/a.txt").is_file());
    }

    #[test]
    fn unwritable_manifest_leaves_target_in_place() {
        let (dir, guard, holding) = setup();
        fs::write(dir.path().join("keep.txt"), "keep").unwrap();
        fs::create_dir_all(holding.dir().join(MANIFEST)).unwrap();

        let target = guard.resolve("keep.txt").unwrap();
        assert!(holding.hold(&target).is_err());
        assert_eq!(fs::read_to_string(dir.path().join("keep.txt")).unwrap(), "keep");
        let slots = fs::read_dir(holding.dir()).unwrap().count();
        assert_eq!(slots, 1);
    }

    #[test]
    fn missing_target_records_nothing() {
        let (dir, guard, holding) = setup();
        fs::write(dir.path().join("gone.txt"), "x").unwrap();
        let target = guard.resolve("gone.txt").unwrap();
        fs::remove_file(dir.path().join("gone.txt")).unwrap();

        assert!(holding.hold(&target).is_err());
        assert!(holding.list().unwrap().is_empty());
    }

    #[test]
    fn unknown_id() {
        let (dir, _guard, holding) = setup();
        let err = holding.release("nope", &dir.path().join("x")).unwrap_err();
        assert!(matches!(err, FsError::HoldingEntryNotFound { .. }));
    }
}
