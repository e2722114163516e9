// root.rs - The validated workspace root.
//
// A WorkspaceRoot is constructed once from configuration and handed to every
// component that touches the filesystem. Construction is the only place the
// root is validated: it must be absolute, exist, be a directory, and accept
// writes. The stored path is canonical so later containment checks compare
// like with like.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::WorkspaceError;

/// An absolute, canonical, writable directory that bounds all operations.
///
/// Each component that touches the filesystem holds its own clone; there is
/// no global instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkspaceRoot {
    path: PathBuf,
}

impl WorkspaceRoot {
    /// Validate `path` and build a root from it.
    ///
    /// Surrounding whitespace and quotes are stripped from string input
    /// (users paste paths from file managers), then the directory is checked
    /// for writability by creating and removing a temp file inside it.
    pub fn new(path: impl AsRef<Path>) -> Result<Self, WorkspaceError> {
        let raw = path.as_ref();
        let cleaned = clean_configured_path(raw);

        if !cleaned.is_absolute() {
            return Err(invalid_root(&cleaned, "workspace root must be an absolute path"));
        }
        if !cleaned.exists() {
            return Err(invalid_root(&cleaned, "workspace root does not exist"));
        }
        if !cleaned.is_dir() {
            return Err(invalid_root(&cleaned, "workspace root is not a directory"));
        }

        let canonical = fs::canonicalize(&cleaned).map_err(|source| WorkspaceError::IoError {
            path: cleaned.clone(),
            source,
        })?;

        // Probe writability; permission bits alone lie on some platforms.
        tempfile::NamedTempFile::new_in(&canonical)
            .map_err(|e| invalid_root(&canonical, &format!("workspace root is not writable: {e}")))?;

        tracing::debug!(root = %canonical.display(), "workspace root validated");
        Ok(Self { path: canonical })
    }

    /// The canonical absolute path of the root.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Join a relative path onto the root without any validation.
    ///
    /// Only for paths the crate itself controls (the data area); caller
    /// input must go through [`crate::PathGuard::resolve`].
    pub fn join(&self, relative: impl AsRef<Path>) -> PathBuf {
        self.path.join(relative)
    }
}

impl AsRef<Path> for WorkspaceRoot {
    fn as_ref(&self) -> &Path {
        &self.path
    }
}

fn clean_configured_path(raw: &Path) -> PathBuf {
    match raw.to_str() {
        Some(s) => {
            let trimmed = s.trim().trim_matches('"').trim_matches('\'');
            PathBuf::from(trimmed)
        }
        None => raw.to_path_buf(),
    }
}

fn invalid_root(path: &Path, reason: &str) -> WorkspaceError {
    WorkspaceError::InvalidRoot {
        path: path.to_path_buf(),
        reason: reason.to_string(),
    }
}
