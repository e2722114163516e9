//! # aifs-audit
//!
//! Append-only record of every operation aifs executes.
//!
//! The filesystem service builds one [`OperationRecord`] per operation,
//! successful or not. The record becomes the commit message for mutations
//! and is written to the audit log as an [`AuditEvent`], one JSON line per
//! event in a file per UTC day. Lines within a day are hash-chained so that
//! edits to the log are detectable.
//!
//! ```rust,no_run
//! use aifs_audit::{AuditEvent, AuditLog, OperationKind, OperationRecord};
//!
//! let mut log = AuditLog::open("/tmp/ws/.aifs/audit").unwrap();
//! let record = OperationRecord::success("agent-1", OperationKind::Write, vec!["notes.txt".into()])
//!     .with_bytes(8);
//! log.append(&mut AuditEvent::new(record)).unwrap();
//! ```

pub mod error;
pub mod event;
pub mod hasher;
pub mod log;
pub mod record;

pub use error::AuditError;
pub use event::AuditEvent;
pub use log::AuditLog;
pub use record::{OperationKind, OperationRecord, Outcome};
