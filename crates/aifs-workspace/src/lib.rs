//! # aifs-workspace
//!
//! The workspace boundary for aifs.
//!
//! Every filesystem operation is confined to a single configured directory.
//! This crate owns the validation of that directory and the resolution of
//! caller-supplied paths against it.
//!
//! ## Key components
//!
//! - [`WorkspaceRoot`] - absolute, canonical, writable directory; validated
//!   once at construction and passed explicitly to every component.
//! - [`PathGuard`] - resolves relative or absolute input to a
//!   [`ResolvedPath`], following `..` and symlinks physically, and rejects
//!   anything outside the root or inside a deny-listed entry.
//! - [`WorkspaceLayout`] - location of the service's own state (`.aifs/`).

pub mod error;
pub mod guard;
pub mod layout;
pub mod root;

pub use error::WorkspaceError;
pub use guard::{is_denied_name, is_reserved_name, PathGuard, ResolvedPath, DENIED_NAMES};
pub use layout::{WorkspaceLayout, DATA_DIR_NAME};
pub use root::WorkspaceRoot;
