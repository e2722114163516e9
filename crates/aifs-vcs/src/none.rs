//! "None" adapter - versioning disabled or git unavailable

use crate::adapter::{CommitEntry, VersionControl};
use crate::error::Result;
use crate::rollback::{
    check_token, ConfirmationToken, RevisionRef, RollbackOutcome, RollbackPreview,
};

/// Fallback adapter that records nothing.
///
/// Selected when `[vcs].enabled` is false or the git binary cannot be found.
/// Every call succeeds without side effects. Rollback still goes through the
/// confirmation gate so callers see the same contract either way.
pub struct NoneAdapter;

impl NoneAdapter {
    pub fn new() -> Self {
        Self
    }
}

impl Default for NoneAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl VersionControl for NoneAdapter {
    fn commit(&self, summary: &str) -> Result<Option<CommitEntry>> {
        tracing::debug!(summary, "NoneAdapter: commit() - no-op");
        Ok(None)
    }

    fn checkpoint_manual(&self) -> Result<Option<CommitEntry>> {
        Ok(None)
    }

    fn list_recent(&self, _n: usize) -> Result<Vec<CommitEntry>> {
        tracing::debug!("NoneAdapter: list_recent() - no-op");
        Ok(Vec::new())
    }

    fn preview_rollback(&self, target: &RevisionRef) -> Result<RollbackPreview> {
        Ok(RollbackPreview {
            reference: target.to_string(),
            target: None,
            discarded: Vec::new(),
        })
    }

    fn rollback(
        &self,
        target: &RevisionRef,
        token: Option<&ConfirmationToken>,
        _clean_untracked: bool,
    ) -> Result<RollbackOutcome> {
        check_token(target, "", token)?;
        tracing::debug!("NoneAdapter: rollback() - no-op");
        Ok(RollbackOutcome {
            head: None,
            checkpoint: None,
        })
    }

    fn is_enabled(&self) -> bool {
        false
    }

    fn name(&self) -> &str {
        "none"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::VcsError;

    #[test]
    fn test_none_adapter_name() {
        let adapter = NoneAdapter::new();
        assert_eq!(adapter.name(), "none");
        assert!(!adapter.is_enabled());
    }

    #[test]
    fn test_none_adapter_commit_is_noop() {
        let adapter = NoneAdapter::new();
        assert!(adapter.commit("write a.txt").unwrap().is_none());
        assert!(adapter.list_recent(10).unwrap().is_empty());
    }

    #[test]
    fn test_none_adapter_rollback_still_needs_confirmation() {
        let adapter = NoneAdapter::new();
        let target = RevisionRef::Back(1);
        assert!(matches!(
            adapter.rollback(&target, None, false),
            Err(VcsError::ConfirmationRequired { .. })
        ));

        let token = adapter.preview_rollback(&target).unwrap().confirm();
        let outcome = adapter.rollback(&target, Some(&token), false).unwrap();
        assert!(outcome.head.is_none());
    }
}
