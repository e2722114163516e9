// layout.rs - Where aifs keeps its own state inside a workspace.
//
// All service state lives under a single data directory at the workspace
// root. The directory is deny-listed by the path guard, excluded from
// version control, and owned exclusively by aifs.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::WorkspaceError;
use crate::root::WorkspaceRoot;

/// Name of the data directory at the workspace root.
pub const DATA_DIR_NAME: &str = ".aifs";

/// Paths of every piece of persisted service state for one workspace.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkspaceLayout {
    /// `<root>/.aifs`
    pub data_dir: PathBuf,

    /// Classification rule document.
    pub rules_file: PathBuf,

    /// Content-hash keyed cache of extracted classification signals.
    pub signal_cache: PathBuf,

    /// Directory of day-rotated audit logs.
    pub audit_dir: PathBuf,

    /// Reversible delete holding area.
    pub holding_dir: PathBuf,

    /// Queue file consumed by the external indexer.
    pub index_queue: PathBuf,

    /// Diagnostic log files.
    pub logs_dir: PathBuf,
}

impl WorkspaceLayout {
    /// Standard `.aifs/` layout for a workspace.
    pub fn for_root(root: &WorkspaceRoot) -> Self {
        Self::for_data_dir(root.join(DATA_DIR_NAME))
    }

    /// Layout rooted at an explicit data directory.
    pub fn for_data_dir(data_dir: impl AsRef<Path>) -> Self {
        let data_dir = data_dir.as_ref().to_path_buf();
        Self {
            rules_file: data_dir.join("classify_rules.toml"),
            signal_cache: data_dir.join("signal_cache.json"),
            audit_dir: data_dir.join("audit"),
            holding_dir: data_dir.join("holding"),
            index_queue: data_dir.join("index_queue.jsonl"),
            logs_dir: data_dir.join("logs"),
            data_dir,
        }
    }

    /// Create the data directory and its subdirectories.
    pub fn ensure_dirs(&self) -> Result<(), WorkspaceError> {
        for dir in [&self.data_dir, &self.audit_dir, &self.holding_dir, &self.logs_dir] {
            fs::create_dir_all(dir).map_err(|source| WorkspaceError::IoError {
                path: dir.clone(),
                source,
            })?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn layout_lives_under_data_dir() {
        let dir = tempdir().unwrap();
        let root = WorkspaceRoot::new(dir.path()).unwrap();
        let layout = WorkspaceLayout::for_root(&root);

        assert!(layout.data_dir.ends_with(DATA_DIR_NAME));
        for p in [
            &layout.rules_file,
            &layout.signal_cache,
            &layout.audit_dir,
            &layout.holding_dir,
            &layout.index_queue,
        ] {
            assert!(p.starts_with(&layout.data_dir));
        }
    }

    #[test]
    fn ensure_dirs_creates_tree() {
        let dir = tempdir().unwrap();
        let root = WorkspaceRoot::new(dir.path()).unwrap();
        let layout = WorkspaceLayout::for_root(&root);

        layout.ensure_dirs().unwrap();
        assert!(layout.audit_dir.is_dir());
        assert!(layout.holding_dir.is_dir());
    }
}
