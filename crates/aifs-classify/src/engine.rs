// engine.rs - One classification run over the workspace root.
//
//   1. Discover   loose files at the top level of the workspace
//   2. Load       the rule document, creating the skeleton if absent
//   3. Evaluate   each file's signal against the blocks, first match wins
//   4. Reconcile  propose additive rule changes for recurring unmatched files
//   5. Move       every file through the filesystem service (one commit each)
//   6. Notify     hand the relocated files to the indexer without waiting
//
// Unreadable files and failed moves are collected into the report; only
// problems with discovery or the rule document abort the run.

use std::collections::BTreeSet;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use serde::Serialize;

use aifs_audit::{hasher, OperationKind, OperationRecord};
use aifs_connector_fs::{EntryKind, FsConnector, FsError, TransferOptions};
use aifs_workspace::WorkspaceLayout;

use crate::cache::SignalCache;
use crate::config::ClassifyConfig;
use crate::error::{ClassifyError, ExtractError};
use crate::extract::Extractors;
use crate::index::{IndexItem, IndexQueue};
use crate::reconcile::{self, MatchedFile, UnmatchedFile};
use crate::rules::{Candidate, RuleDiff, RuleSet};
use crate::signal::{Signal, SignalKind};

/// Where one readable file goes, and why.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClassificationDecision {
    /// Workspace-relative path of the file now.
    pub source: String,
    /// Matching block, or `None` when the file is unclassified.
    pub block: Option<String>,
    /// Workspace-relative path the file moves to.
    pub destination: String,
    pub kind: SignalKind,
}

impl ClassificationDecision {
    pub fn is_unclassified(&self) -> bool {
        self.block.is_none()
    }
}

/// A file whose content could not be read. It still moves, to the
/// unclassified folder.
#[derive(Debug)]
pub struct ReadFailure {
    pub source: String,
    pub destination: String,
    pub error: ExtractError,
}

/// Everything decided before any file moves.
#[derive(Debug, Default)]
pub struct ClassificationPlan {
    /// The rule document did not exist and the skeleton was created.
    pub rules_created: bool,
    pub rule_diff: RuleDiff,
    pub decisions: Vec<ClassificationDecision>,
    pub read_errors: Vec<ReadFailure>,
}

impl ClassificationPlan {
    /// `(source, destination)` of every planned move.
    pub fn moves(&self) -> impl Iterator<Item = (&str, &str)> {
        self.decisions
            .iter()
            .map(|d| (d.source.as_str(), d.destination.as_str()))
            .chain(
                self.read_errors
                    .iter()
                    .map(|r| (r.source.as_str(), r.destination.as_str())),
            )
    }

    pub fn is_empty(&self) -> bool {
        self.decisions.is_empty() && self.read_errors.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MovedFile {
    pub source: String,
    pub destination: String,
    /// Short id of the commit recording the move, when versioning is on.
    pub commit: Option<String>,
    /// False when the move happened but its commit failed.
    pub committed: bool,
}

#[derive(Debug)]
pub struct MoveFailure {
    pub source: String,
    pub destination: String,
    pub error: FsError,
}

/// Result of [`ClassificationEngine::run`].
#[derive(Debug, Default)]
pub struct RunReport {
    pub plan: ClassificationPlan,
    pub moved: Vec<MovedFile>,
    pub move_failures: Vec<MoveFailure>,
    /// The moved files were handed to the indexer.
    pub indexed: bool,
}

impl RunReport {
    /// `4 moved, 1 failed, 1 unreadable; 1 block added, 0 blocks extended`
    pub fn summary(&self) -> String {
        format!(
            "{} moved, {} failed, {} unreadable; {}",
            self.moved.len(),
            self.move_failures.len(),
            self.plan.read_errors.len(),
            self.plan.rule_diff.summary()
        )
    }
}

/// A readable file and its signal, between evaluation passes.
struct Evaluated {
    path: String,
    name: String,
    extension: String,
    signal: Signal,
    block: Option<String>,
}

impl Evaluated {
    fn candidate(&self) -> Candidate<'_> {
        Candidate {
            name: &self.name,
            extension: &self.extension,
            signal: &self.signal,
        }
    }
}

pub struct ClassificationEngine<'a> {
    fs: &'a FsConnector,
    config: ClassifyConfig,
    layout: WorkspaceLayout,
    extractors: Extractors,
    index: IndexQueue,
}

impl<'a> ClassificationEngine<'a> {
    pub fn new(fs: &'a FsConnector, config: ClassifyConfig) -> Self {
        Self {
            layout: WorkspaceLayout::for_root(fs.root()),
            extractors: Extractors::standard(&config),
            index: IndexQueue::disabled(),
            config,
            fs,
        }
    }

    pub fn with_extractors(mut self, extractors: Extractors) -> Self {
        self.extractors = extractors;
        self
    }

    pub fn with_index(mut self, index: IndexQueue) -> Self {
        self.index = index;
        self
    }

    /// Location of the rule document. A relative `rules_file` is taken
    /// relative to the data directory.
    pub fn rules_path(&self) -> PathBuf {
        match &self.config.rules_file {
            Some(path) if path.is_absolute() => path.clone(),
            Some(path) => self.layout.data_dir.join(path),
            None => self.layout.rules_file.clone(),
        }
    }

    /// The current rule document, or the skeleton if none exists yet.
    /// Never writes.
    pub fn rules(&self) -> Result<RuleSet, ClassifyError> {
        Ok(RuleSet::load(self.rules_path())?
            .unwrap_or_else(|| RuleSet::skeleton(&self.config.unclassified_dir)))
    }

    /// Discover, evaluate and reconcile without writing rules or moving
    /// anything.
    pub fn plan(&self) -> Result<ClassificationPlan, ClassifyError> {
        self.prepare(false)
    }

    /// A full run. Individual read and move failures are reported, not
    /// returned.
    pub fn run(&self) -> Result<RunReport, ClassifyError> {
        let plan = self.prepare(true)?;
        if plan.is_empty() {
            tracing::info!("no loose files to classify");
            return Ok(RunReport {
                plan,
                ..RunReport::default()
            });
        }

        let mut moved = Vec::new();
        let mut move_failures = Vec::new();
        let options = TransferOptions { overwrite: false };
        for (source, destination) in plan.moves() {
            match self.fs.move_path(source, destination, options) {
                Ok(report) => moved.push(MovedFile {
                    source: source.to_string(),
                    destination: destination.to_string(),
                    commit: report.commit.map(|c| c.short_id),
                    committed: true,
                }),
                Err(FsError::Uncommitted { source: e, .. }) => {
                    tracing::warn!(file = source, error = %e, "moved without a commit");
                    moved.push(MovedFile {
                        source: source.to_string(),
                        destination: destination.to_string(),
                        commit: None,
                        committed: false,
                    });
                }
                Err(error) => {
                    tracing::warn!(file = source, error = %error, "move failed; continuing");
                    move_failures.push(MoveFailure {
                        source: source.to_string(),
                        destination: destination.to_string(),
                        error,
                    });
                }
            }
        }

        let items: Vec<IndexItem> = moved
            .iter()
            .map(|m| IndexItem {
                source: m.source.clone(),
                path: m.destination.clone(),
            })
            .collect();
        let indexed = self.index.notify(items);

        let report = RunReport {
            plan,
            moved,
            move_failures,
            indexed,
        };
        let targets = report.moved.iter().map(|m| m.destination.clone()).collect();
        let record = OperationRecord::success(self.fs.actor(), OperationKind::Classify, targets)
            .with_count(report.moved.len() as u64);
        self.fs.audit(record, None);
        tracing::info!(summary = %report.summary(), "classification run finished");
        Ok(report)
    }

    fn prepare(&self, persist: bool) -> Result<ClassificationPlan, ClassifyError> {
        let (files, occupied) = self.discover()?;
        let (rules, rules_created) = self.load_or_init(persist)?;
        tracing::info!(files = files.len(), blocks = rules.blocks.len(), "classifying");

        let mut cache = SignalCache::load(
            &self.layout.signal_cache,
            self.config.max_signal_chars,
            self.config.max_keywords,
        );
        let mut evaluated = Vec::new();
        let mut unreadable = Vec::new();
        for path in files {
            let (name, extension) = split_name(&path);
            match self.read_signal(&path, &extension, &mut cache) {
                Ok(signal) => {
                    let mut file = Evaluated {
                        path,
                        name,
                        extension,
                        signal,
                        block: None,
                    };
                    file.block = rules.first_match(&file.candidate()).map(|b| b.name.clone());
                    evaluated.push(file);
                }
                Err(error) => {
                    tracing::warn!(file = %path, error = %error, "unreadable; routing to unclassified");
                    unreadable.push((path, name, error));
                }
            }
        }
        if let Err(e) = cache.flush() {
            tracing::warn!(error = %e, "signal cache not saved");
        }

        let (rules, rule_diff) = self.reconcile(rules, &mut evaluated, &occupied, persist)?;

        let unclassified = rules
            .catch_all_destination()
            .unwrap_or(&self.config.unclassified_dir)
            .to_string();
        let mut taken = BTreeSet::new();
        let mut decisions = Vec::new();
        for file in evaluated {
            let dir = match &file.block {
                Some(block) => rules
                    .block(block)
                    .map(|b| b.destination.clone())
                    .unwrap_or_else(|| unclassified.clone()),
                None => unclassified.clone(),
            };
            decisions.push(ClassificationDecision {
                destination: self.unique_destination(&dir, &file.name, &mut taken),
                source: file.path,
                block: file.block,
                kind: file.signal.kind,
            });
        }
        let read_errors = unreadable
            .into_iter()
            .map(|(source, name, error)| ReadFailure {
                destination: self.unique_destination(&unclassified, &name, &mut taken),
                source,
                error,
            })
            .collect();

        Ok(ClassificationPlan {
            rules_created,
            rule_diff,
            decisions,
            read_errors,
        })
    }

    /// Regular files directly under the root, plus the lowercased names of
    /// every top-level entry that is not a folder. Dotfiles are left alone.
    fn discover(&self) -> Result<(Vec<String>, BTreeSet<String>), ClassifyError> {
        let entries = self.fs.list(".", false)?;
        let occupied = entries
            .iter()
            .filter(|e| e.kind != EntryKind::Directory)
            .map(|e| e.name().to_lowercase())
            .collect();
        let files = entries
            .into_iter()
            .filter(|e| e.kind == EntryKind::File && !e.name().starts_with('.'))
            .map(|e| e.path)
            .collect();
        Ok((files, occupied))
    }

    fn load_or_init(&self, persist: bool) -> Result<(RuleSet, bool), ClassifyError> {
        let path = self.rules_path();
        if let Some(rules) = RuleSet::load(&path)? {
            return Ok((rules, false));
        }
        let skeleton = RuleSet::skeleton(&self.config.unclassified_dir);
        if persist {
            skeleton.save(&path)?;
            tracing::info!(path = %path.display(), "created rule skeleton");
        }
        Ok((skeleton, true))
    }

    /// Propose and apply additive rule changes, then give the files no block
    /// matched a second chance against the new rules.
    fn reconcile(
        &self,
        rules: RuleSet,
        evaluated: &mut [Evaluated],
        occupied: &BTreeSet<String>,
        persist: bool,
    ) -> Result<(RuleSet, RuleDiff), ClassifyError> {
        let changes = {
            let matched: Vec<MatchedFile<'_>> = evaluated
                .iter()
                .filter_map(|f| {
                    f.block.as_deref().map(|block| MatchedFile {
                        block,
                        signal: &f.signal,
                    })
                })
                .collect();
            let unmatched: Vec<UnmatchedFile<'_>> = evaluated
                .iter()
                .filter(|f| f.block.is_none())
                .map(|f| UnmatchedFile {
                    path: &f.path,
                    extension: &f.extension,
                    signal: &f.signal,
                })
                .collect();
            reconcile::propose(&rules, &matched, &unmatched, occupied, self.config.min_support)
        };
        if changes.is_empty() {
            return Ok((rules, RuleDiff::default()));
        }

        let mut updated = rules.clone();
        let diff = updated.apply(&changes);
        updated.ensure_covers(&rules)?;
        updated.validate()?;
        if persist && !diff.is_empty() {
            updated.save(self.rules_path())?;
        }
        tracing::info!(changes = %diff.summary(), persisted = persist, "rules reconciled");

        for file in evaluated.iter_mut().filter(|f| f.block.is_none()) {
            file.block = updated.first_match(&file.candidate()).map(|b| b.name.clone());
        }
        Ok((updated, diff))
    }

    fn read_signal(
        &self,
        path: &str,
        extension: &str,
        cache: &mut SignalCache,
    ) -> Result<Signal, ExtractError> {
        let Some(family) = self.extractors.family_for(extension) else {
            return Ok(Signal::null());
        };
        let resolved = self.fs.guard().resolve(path)?;
        let io_err = |source| ExtractError::Io {
            path: path.to_string(),
            source,
        };

        let file = File::open(resolved.absolute()).map_err(io_err)?;
        let size = file.metadata().map_err(io_err)?.len();
        let limit = self.fs.config().read_max_bytes;
        if size > limit && !family.accepts_prefix() {
            return Err(ExtractError::TooLarge {
                path: path.to_string(),
                size,
                limit,
            });
        }
        let mut bytes = Vec::new();
        file.take(limit).read_to_end(&mut bytes).map_err(io_err)?;

        let key = SignalCache::key(family.kind(), &hasher::hash_bytes(&bytes));
        if let Some(signal) = cache.get(&key) {
            tracing::debug!(file = path, "signal cache hit");
            return Ok(signal.clone());
        }
        let signal = self.extractors.extract(path, extension, &bytes)?;
        cache.insert(key, signal.clone());
        Ok(signal)
    }

    /// `<dir>/<name>`, or `<dir>/<stem> (n).<ext>` when that is taken on disk
    /// or earlier in this plan.
    fn unique_destination(&self, dir: &str, name: &str, taken: &mut BTreeSet<String>) -> String {
        let dir = dir.trim_end_matches('/');
        let (stem, ext) = stem_and_extension(name);
        let mut n = 0;
        loop {
            let file_name = match (n, ext) {
                (0, _) => name.to_string(),
                (_, Some(ext)) => format!("{} ({}).{}", stem, n, ext),
                (_, None) => format!("{} ({})", stem, n),
            };
            let candidate = format!("{}/{}", dir, file_name);
            let on_disk = self
                .fs
                .guard()
                .resolve(&candidate)
                .map(|r| r.exists())
                .unwrap_or(false);
            if !on_disk && taken.insert(candidate.clone()) {
                return candidate;
            }
            n += 1;
        }
    }
}

/// File name and lowercase extension of a workspace-relative path.
fn split_name(path: &str) -> (String, String) {
    let p = Path::new(path);
    let name = p
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string());
    let extension = p
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    (name, extension)
}

fn stem_and_extension(name: &str) -> (&str, Option<&str>) {
    match name.rfind('.') {
        Some(i) if i > 0 => (&name[..i], Some(&name[i + 1..])),
        _ => (name, None),
    }
}
