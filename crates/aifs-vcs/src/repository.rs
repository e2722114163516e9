//! Repository: the configured versioning backend for one workspace.

use std::path::Path;

use crate::adapter::{CommitEntry, VersionControl};
use crate::config::VcsConfig;
use crate::error::Result;
use crate::git::GitAdapter;
use crate::none::NoneAdapter;
use crate::rollback::{ConfirmationToken, RevisionRef, RollbackOutcome, RollbackPreview};

/// Either a real git backend or the disabled no-op adapter, chosen once
/// from configuration and binary availability.
pub enum Repository {
    Git(GitAdapter),
    Disabled(NoneAdapter),
}

impl Repository {
    /// Select the backend for a workspace root.
    ///
    /// Falls back to [`Repository::Disabled`] when versioning is turned off
    /// or `git` is not on `PATH`.
    pub fn from_config(root: &Path, config: &VcsConfig) -> Self {
        if !config.enabled {
            tracing::debug!("version control disabled by configuration");
            return Self::Disabled(NoneAdapter::new());
        }
        match which::which("git") {
            Ok(_) => Self::Git(GitAdapter::new(root, config.clone())),
            Err(e) => {
                tracing::warn!(error = %e, "git not found; operations will not be versioned");
                Self::Disabled(NoneAdapter::new())
            }
        }
    }

    pub fn disabled() -> Self {
        Self::Disabled(NoneAdapter::new())
    }

    fn backend(&self) -> &dyn VersionControl {
        match self {
            Self::Git(git) => git,
            Self::Disabled(none) => none,
        }
    }
}

impl VersionControl for Repository {
    fn commit(&self, summary: &str) -> Result<Option<CommitEntry>> {
        self.backend().commit(summary)
    }

    fn checkpoint_manual(&self) -> Result<Option<CommitEntry>> {
        self.backend().checkpoint_manual()
    }

    fn list_recent(&self, n: usize) -> Result<Vec<CommitEntry>> {
        self.backend().list_recent(n)
    }

    fn preview_rollback(&self, target: &RevisionRef) -> Result<RollbackPreview> {
        self.backend().preview_rollback(target)
    }

    fn rollback(
        &self,
        target: &RevisionRef,
        token: Option<&ConfirmationToken>,
        clean_untracked: bool,
    ) -> Result<RollbackOutcome> {
        self.backend().rollback(target, token, clean_untracked)
    }

    fn is_enabled(&self) -> bool {
        self.backend().is_enabled()
    }

    fn name(&self) -> &str {
        self.backend().name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disabled_config_selects_noop() {
        let dir = tempfile::tempdir().unwrap();
        let repo = Repository::from_config(dir.path(), &VcsConfig::disabled());
        assert!(matches!(repo, Repository::Disabled(_)));
        assert_eq!(repo.name(), "none");
        assert!(!dir.path().join(".git").exists());
    }

    #[test]
    fn enabled_config_selects_git_when_available() {
        let dir = tempfile::tempdir().unwrap();
        let repo = Repository::from_config(dir.path(), &VcsConfig::default());
        if which::which("git").is_ok() {
            assert_eq!(repo.name(), "git");
            assert!(repo.is_enabled());
        } else {
            assert_eq!(repo.name(), "none");
        }
    }
}
