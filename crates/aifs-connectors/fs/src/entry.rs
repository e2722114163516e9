// entry.rs - Result types returned by filesystem operations.

use std::borrow::Cow;
use std::fs::Metadata;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use aifs_audit::OperationRecord;
use aifs_vcs::CommitEntry;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    File,
    Directory,
    Symlink,
}

impl EntryKind {
    pub fn from_metadata(meta: &Metadata) -> Self {
        let ft = meta.file_type();
        if ft.is_symlink() {
            Self::Symlink
        } else if ft.is_dir() {
            Self::Directory
        } else {
            Self::File
        }
    }
}

/// One listed directory entry.
#[derive(Debug, Clone, Serialize)]
pub struct Entry {
    /// Path relative to the workspace root.
    pub path: String,
    pub kind: EntryKind,
    /// Size in bytes; 0 for directories.
    pub size: u64,
    pub modified: Option<DateTime<Utc>>,
    /// Depth below the listed directory, starting at 1.
    #[serde(skip)]
    pub depth: usize,
}

impl Entry {
    pub(crate) fn new(path: String, meta: &Metadata, depth: usize) -> Self {
        let kind = EntryKind::from_metadata(meta);
        Self {
            path,
            kind,
            size: if kind == EntryKind::Directory { 0 } else { meta.len() },
            modified: meta.modified().ok().map(DateTime::<Utc>::from),
            depth,
        }
    }

    /// Final path component.
    pub fn name(&self) -> &str {
        self.path.rsplit('/').next().unwrap_or(&self.path)
    }
}

/// Metadata for a single path.
#[derive(Debug, Clone, Serialize)]
pub struct StatInfo {
    pub path: String,
    pub kind: EntryKind,
    pub size: u64,
    pub human_size: String,
    pub modified: Option<DateTime<Utc>>,
    pub created: Option<DateTime<Utc>>,
    pub readonly: bool,
}

impl StatInfo {
    pub(crate) fn new(path: String, meta: &Metadata) -> Self {
        let size = meta.len();
        Self {
            path,
            kind: EntryKind::from_metadata(meta),
            size,
            human_size: human_size(size),
            modified: meta.modified().ok().map(DateTime::<Utc>::from),
            created: meta.created().ok().map(DateTime::<Utc>::from),
            readonly: meta.permissions().readonly(),
        }
    }
}

/// Byte window for a partial read.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReadWindow {
    pub offset: u64,
    /// `None` reads to the end of the file (still capped by `read_max_bytes`).
    pub length: Option<u64>,
}

impl ReadWindow {
    pub fn new(offset: u64, length: u64) -> Self {
        Self {
            offset,
            length: Some(length),
        }
    }
}

/// Content returned by `read`.
#[derive(Debug, Clone, Serialize)]
pub struct ReadOutput {
    pub path: String,
    #[serde(skip)]
    pub content: Vec<u8>,
    /// Total size of the file.
    pub size: u64,
    pub offset: u64,
    /// True when `content` is not the whole file.
    pub truncated: bool,
}

impl ReadOutput {
    /// Content decoded as UTF-8, with invalid sequences replaced.
    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.content)
    }
}

/// Options for copy and move.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferOptions {
    /// Replace an existing destination of the same kind.
    pub overwrite: bool,
}

impl Default for TransferOptions {
    fn default() -> Self {
        Self { overwrite: true }
    }
}

/// Confirmation returned by every mutating operation.
#[derive(Debug, Clone, Serialize)]
pub struct OperationReport {
    pub record: OperationRecord,
    /// The commit encapsulating this operation, when versioning is enabled.
    pub commit: Option<CommitEntry>,
    /// Holding-area id for deletes routed there; pass to `restore`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub holding_id: Option<String>,
}

impl OperationReport {
    /// Workspace-relative paths the operation touched.
    pub fn targets(&self) -> &[String] {
        &self.record.targets
    }
}

/// `1536` → `1.5 KB`.
pub fn human_size(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];
    if bytes < 1024 {
        return format!("{} B", bytes);
    }
    let mut size = bytes as f64;
    let mut unit = 0;
    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }
    format!("{:.1} {}", size, UNITS[unit])
}
