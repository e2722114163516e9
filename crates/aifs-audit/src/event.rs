// event.rs - Audit event: an OperationRecord as written to the log.
//
// The event wraps the immutable record with the fields only the log cares
// about: a unique id, the commit the operation produced (if any), and the
// hash of the previous line for tamper detection.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::record::OperationRecord;

/// A single audit event - one line in a day's JSONL file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEvent {
    /// Unique identifier for this event.
    pub event_id: Uuid,

    /// The operation this event records. Flattened so each line reads as
    /// `{operation kind, targets, outcome, size/count, timestamp, ...}`.
    #[serde(flatten)]
    pub record: OperationRecord,

    /// Commit produced by the operation, when versioning is enabled.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub commit_id: Option<String>,

    /// Hash of the previous line in the same day file; `None` for the first.
    pub previous_hash: Option<String>,

    #[serde(default)]
    pub metadata: serde_json::Value,
}

impl AuditEvent {
    pub fn new(record: OperationRecord) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            record,
            commit_id: None,
            previous_hash: None,
            metadata: serde_json::Value::Null,
        }
    }

    pub fn with_commit(mut self, commit_id: impl Into<String>) -> Self {
        self.commit_id = Some(commit_id.into());
        self
    }

    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = metadata;
        self
    }
}
