//! Version control for the aifs workspace
//!
//! Every mutating operation is committed on its own so that each change can
//! be inspected and rolled back individually. The core abstraction is the
//! [`VersionControl`] trait with a git implementation and a no-op fallback;
//! [`Repository`] selects between them once at startup so callers never
//! special-case an absent backend.

pub mod adapter;
pub mod config;
pub mod error;
pub mod git;
pub mod none;
pub mod repository;
pub mod rollback;

pub use adapter::{
    ChangeStatus, ChangedPath, CommitEntry, VersionControl, MACHINE_PREFIX, MANUAL_PREFIX,
};
pub use config::VcsConfig;
pub use error::VcsError;
pub use git::GitAdapter;
pub use none::NoneAdapter;
pub use repository::Repository;
pub use rollback::{ConfirmationToken, RevisionRef, RollbackOutcome, RollbackPreview};
