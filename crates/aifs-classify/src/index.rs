// index.rs - Fire-and-forget hand-off of relocated files to the indexer.
//
// After a classification run the engine queues the moved files. A worker
// thread drains the channel into an `IndexSink`; the engine never waits for
// it and sink failures are only logged. The default sink appends one JSON
// line per batch to `.aifs/index_queue.jsonl`, which the external indexer
// consumes.

use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::mpsc::{self, Sender};
use std::thread::{self, JoinHandle};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use aifs_workspace::WorkspaceLayout;

use crate::config::IndexConfig;

/// One relocated file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexItem {
    /// Where the file was.
    pub source: String,
    /// Where it is now.
    pub path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexBatch {
    pub queued_at: DateTime<Utc>,
    pub embedding_model: String,
    pub files: Vec<IndexItem>,
}

/// Receives batches on the worker thread.
pub trait IndexSink: Send + 'static {
    fn deliver(&mut self, batch: &IndexBatch) -> io::Result<()>;
}

/// Appends batches as JSON lines.
pub struct QueueFileSink {
    path: PathBuf,
}

impl QueueFileSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl IndexSink for QueueFileSink {
    fn deliver(&mut self, batch: &IndexBatch) -> io::Result<()> {
        let line = serde_json::to_string(batch)?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(file, "{}", line)
    }
}

/// Handle to the indexing worker, or a disabled stand-in.
///
/// Dropping the handle closes the channel and waits for queued batches to
/// be delivered.
pub struct IndexQueue {
    sender: Option<Sender<IndexBatch>>,
    worker: Option<JoinHandle<()>>,
    model: String,
}

impl IndexQueue {
    pub fn disabled() -> Self {
        Self {
            sender: None,
            worker: None,
            model: String::new(),
        }
    }

    /// Start a worker delivering to `sink`.
    pub fn spawn(embedding_model: impl Into<String>, sink: impl IndexSink) -> Self {
        let (sender, receiver) = mpsc::channel::<IndexBatch>();
        let mut sink = sink;
        let worker = thread::Builder::new()
            .name("aifs-index".to_string())
            .spawn(move || {
                for batch in receiver {
                    match sink.deliver(&batch) {
                        Ok(()) => tracing::debug!(files = batch.files.len(), "index batch delivered"),
                        Err(e) => tracing::warn!(error = %e, "index batch dropped"),
                    }
                }
            });
        match worker {
            Ok(handle) => Self {
                sender: Some(sender),
                worker: Some(handle),
                model: embedding_model.into(),
            },
            Err(e) => {
                tracing::warn!(error = %e, "could not start index worker; indexing disabled");
                Self::disabled()
            }
        }
    }

    /// Queue-file worker when `[index]` is active, otherwise disabled.
    pub fn from_config(config: &IndexConfig, layout: &WorkspaceLayout) -> Self {
        match (&config.embedding_model, config.is_active()) {
            (Some(model), true) => Self::spawn(model.clone(), QueueFileSink::new(&layout.index_queue)),
            _ => {
                if config.enabled {
                    tracing::warn!("indexing enabled but no embedding model configured; hook disabled");
                }
                Self::disabled()
            }
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.sender.is_some()
    }

    /// Queue files for indexing without waiting. Returns whether the batch
    /// was handed off.
    pub fn notify(&self, files: Vec<IndexItem>) -> bool {
        let Some(sender) = &self.sender else {
            return false;
        };
        if files.is_empty() {
            return false;
        }
        let batch = IndexBatch {
            queued_at: Utc::now(),
            embedding_model: self.model.clone(),
            files,
        };
        match sender.send(batch) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(error = %e, "index worker gone; batch not queued");
                false
            }
        }
    }
}

impl Drop for IndexQueue {
    fn drop(&mut self) {
        self.sender.take();
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                tracing::warn!("index worker panicked");
            }
        }
    }
}
