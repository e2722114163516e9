//! # aifs-connector-fs
//!
//! Sandboxed filesystem operations for aifs.
//!
//! [`FsConnector`] exposes list, search, read, stat, write, mkdir, copy,
//! move and delete, confined to one workspace root. Every call is a
//! transaction: validate through the path guard, perform, commit (one commit
//! per mutation when versioning is enabled), then record to the audit log.
//!
//! ## Flow
//!
//! 1. Caller builds a [`FsConnector`] from a validated `WorkspaceRoot` and a
//!    `Repository` (git or disabled)
//! 2. Each mutation returns an [`OperationReport`] carrying the record and
//!    the commit it produced
//! 3. Deletes are reversible: platform trash, or the workspace holding area
//!    ([`FsConnector::restore`])
//! 4. History and rollback go through the same connector so rollback blocks
//!    every other operation while it runs

pub mod config;
pub mod connector;
pub mod entry;
pub mod error;
pub mod holding;
mod ops;
pub mod search;
pub mod trash;

pub use config::FsConfig;
pub use connector::FsConnector;
pub use entry::{
    human_size, Entry, EntryKind, OperationReport, ReadOutput, ReadWindow, StatInfo,
    TransferOptions,
};
pub use error::FsError;
pub use holding::{HoldingArea, HoldingEntry};
pub use search::{Matcher, Search};
pub use trash::DeleteMode;
