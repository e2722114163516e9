//! # aifs-classify
//!
//! Incremental classification of loose files at the top level of an aifs
//! workspace.
//!
//! A run reads a human-editable rule document, extracts a bounded content
//! signal from every loose file (text, Word, spreadsheet, PDF or an image
//! description), routes each file to the first matching block, grows the
//! rules additively when unmatched files share a keyword or extension, and
//! moves the files through [`aifs_connector_fs::FsConnector`] so that every
//! move is committed and audited on its own.
//!
//! ```no_run
//! use aifs_classify::{ClassificationEngine, ClassifyConfig};
//! # fn demo(fs: &aifs_connector_fs::FsConnector) -> Result<(), aifs_classify::ClassifyError> {
//! let engine = ClassificationEngine::new(fs, ClassifyConfig::default());
//! let report = engine.run()?;
//! println!("{}", report.summary());
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod config;
pub mod engine;
pub mod error;
pub mod extract;
pub mod index;
pub mod keywords;
pub mod reconcile;
pub mod rules;
pub mod signal;

pub use cache::SignalCache;
pub use config::{ClassifyConfig, IndexConfig};
pub use engine::{
    ClassificationDecision, ClassificationEngine, ClassificationPlan, MoveFailure, MovedFile,
    ReadFailure, RunReport,
};
pub use error::{ClassifyError, ExtractError};
pub use extract::{ContentExtractor, Extractors, ImageDescriber, ImageInfo};
pub use index::{IndexBatch, IndexItem, IndexQueue, IndexSink, QueueFileSink};
pub use rules::{RuleBlock, RuleChange, RuleDiff, RuleSet};
pub use signal::{Signal, SignalKind};
