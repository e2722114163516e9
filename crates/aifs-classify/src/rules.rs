//! # Classification rules
//!
//! The rule document is an ordered list of blocks stored as TOML in the
//! workspace data area. Blocks are evaluated in document order and the first
//! match wins. The document is human-editable; automated updates only ever
//! add blocks or extend existing ones.
//!
//! ```toml
//! [[block]]
//! name = "Invoices"
//! destination = "finance/invoices"
//! description = "Bills and invoices from vendors"
//! tags = ["invoice", "发票"]
//! extensions = []
//! patterns = ["inv_*"]
//!
//! [[block]]
//! name = "Unclassified"
//! destination = "unclassified"
//! catch_all = true
//! ```

use std::collections::BTreeSet;
use std::fmt;
use std::fs;
use std::path::{Component, Path};

use serde::{Deserialize, Serialize};

use aifs_workspace::{is_denied_name, is_reserved_name};

use crate::error::ClassifyError;
use crate::signal::Signal;

const HEADER: &str = "\
# aifs classification rules.
# Blocks are checked top to bottom; the first match decides the destination.
# A block matches when any tag, extension or file-name pattern matches.
# Automated updates only add blocks or extend tags; mark a block
# `deprecated = true` instead of deleting it.

";

/// One category: where its files go and how they are recognised.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleBlock {
    pub name: String,

    /// Workspace-relative folder.
    pub destination: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,

    /// Words matched against the file name and content signal.
    #[serde(default)]
    pub tags: Vec<String>,

    /// File extensions without the dot.
    #[serde(default)]
    pub extensions: Vec<String>,

    /// Glob patterns matched against the file name.
    #[serde(default)]
    pub patterns: Vec<String>,

    /// Routes files nothing else matched. Never matched directly.
    #[serde(default, skip_serializing_if = "is_false")]
    pub catch_all: bool,

    /// Kept for history; no longer matched.
    #[serde(default, skip_serializing_if = "is_false")]
    pub deprecated: bool,
}

fn is_false(value: &bool) -> bool {
    !*value
}

/// What a rule is evaluated against.
#[derive(Debug, Clone, Copy)]
pub struct Candidate<'a> {
    /// File name, including extension.
    pub name: &'a str,
    /// Lowercase extension without the dot; empty when there is none.
    pub extension: &'a str,
    pub signal: &'a Signal,
}

impl RuleBlock {
    pub fn new(name: impl Into<String>, destination: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            destination: destination.into(),
            description: String::new(),
            tags: Vec::new(),
            extensions: Vec::new(),
            patterns: Vec::new(),
            catch_all: false,
            deprecated: false,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags.extend(tags.into_iter().map(Into::into));
        self
    }

    pub fn with_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.extensions.extend(extensions.into_iter().map(Into::into));
        self
    }

    pub fn with_patterns<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.patterns.extend(patterns.into_iter().map(Into::into));
        self
    }

    /// Whether this block can claim files at all.
    pub fn is_active(&self) -> bool {
        !self.catch_all && !self.deprecated
    }

    pub fn matches(&self, candidate: &Candidate<'_>) -> bool {
        if !self.is_active() {
            return false;
        }
        self.extensions
            .iter()
            .any(|e| normalize_extension(e) == candidate.extension)
            || self.patterns.iter().any(|p| pattern_matches(p, candidate.name))
            || self.tags.iter().any(|t| tag_matches(t, candidate))
    }

    /// True when every criterion of `older` is still present here.
    fn extends(&self, older: &RuleBlock) -> bool {
        self.destination == older.destination
            && self.catch_all == older.catch_all
            && is_superset(&self.tags, &older.tags)
            && is_superset(&self.extensions, &older.extensions)
            && is_superset(&self.patterns, &older.patterns)
    }
}

fn is_superset(newer: &[String], older: &[String]) -> bool {
    older.iter().all(|o| newer.contains(o))
}

fn normalize_extension(ext: &str) -> String {
    ext.trim().trim_start_matches('.').to_lowercase()
}

fn pattern_matches(pattern: &str, name: &str) -> bool {
    let options = glob::MatchOptions {
        case_sensitive: false,
        ..glob::MatchOptions::default()
    };
    match glob::Pattern::new(pattern) {
        Ok(p) => p.matches_with(name, options),
        Err(_) => false,
    }
}

/// Lowercased words split on anything that is not a letter or digit.
fn words(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_lowercase)
}

fn tag_matches(tag: &str, candidate: &Candidate<'_>) -> bool {
    let tag = tag.trim().to_lowercase();
    if tag.is_empty() {
        return false;
    }
    if candidate.signal.keywords.contains(&tag) {
        return true;
    }
    let is_word = tag.chars().all(char::is_alphanumeric);
    if is_word && tag.is_ascii() {
        // Whole words only, so "art" does not match "partial".
        words(candidate.name).any(|w| w == tag) || words(&candidate.signal.text).any(|w| w == tag)
    } else {
        // Phrases, and scripts written without spaces.
        candidate.name.to_lowercase().contains(&tag) || candidate.signal.mentions(&tag)
    }
}

/// An automated, additive change to the rule document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleChange {
    AddBlock(RuleBlock),
    ExtendTags { block: String, tags: Vec<String> },
}

/// Summary of what an update changed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RuleDiff {
    /// `(name, destination)` of every new block.
    pub added: Vec<(String, String)>,
    /// `(name, new tags)` of every extended block.
    pub extended: Vec<(String, Vec<String>)>,
}

impl RuleDiff {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.extended.is_empty()
    }

    /// `2 blocks added, 1 block extended`
    pub fn summary(&self) -> String {
        if self.is_empty() {
            return "rules unchanged".to_string();
        }
        let plural = |n: usize| if n == 1 { "block" } else { "blocks" };
        format!(
            "{} {} added, {} {} extended",
            self.added.len(),
            plural(self.added.len()),
            self.extended.len(),
            plural(self.extended.len())
        )
    }
}

impl fmt::Display for RuleDiff {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return f.write_str("rules unchanged");
        }
        for (name, destination) in &self.added {
            writeln!(f, "+ {} -> {}", name, destination)?;
        }
        for (name, tags) in &self.extended {
            writeln!(f, "~ {}: +{}", name, tags.join(", +"))?;
        }
        Ok(())
    }
}

/// The ordered rule document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleSet {
    #[serde(default, rename = "block")]
    pub blocks: Vec<RuleBlock>,
}

impl RuleSet {
    /// A new document with only the catch-all block.
    pub fn skeleton(unclassified_dir: &str) -> Self {
        let mut catch_all = RuleBlock::new("Unclassified", unclassified_dir)
            .with_description("Files no other block matched; review and add rules for them");
        catch_all.catch_all = true;
        Self {
            blocks: vec![catch_all],
        }
    }

    /// Load the document, or `None` when the file does not exist.
    pub fn load(path: impl AsRef<Path>) -> Result<Option<Self>, ClassifyError> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(path).map_err(|source| ClassifyError::RulesRead {
            path: path.to_path_buf(),
            source,
        })?;
        let rules: RuleSet = toml::from_str(&content).map_err(|source| ClassifyError::RulesParse {
            path: path.to_path_buf(),
            source,
        })?;
        rules.validate()?;
        Ok(Some(rules))
    }

    /// Write the document, replacing the previous version atomically.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ClassifyError> {
        let path = path.as_ref();
        let write_err = |source| ClassifyError::RulesWrite {
            path: path.to_path_buf(),
            source,
        };
        let body = toml::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(write_err)?;
        }
        let tmp = path.with_extension("toml.tmp");
        fs::write(&tmp, format!("{}{}", HEADER, body)).map_err(write_err)?;
        fs::rename(&tmp, path).map_err(write_err)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ClassifyError> {
        let mut names = BTreeSet::new();
        for block in &self.blocks {
            let invalid = |reason: &str| ClassifyError::InvalidRule {
                block: block.name.clone(),
                reason: reason.to_string(),
            };
            if block.name.trim().is_empty() {
                return Err(invalid("name is empty"));
            }
            if !names.insert(block.name.to_lowercase()) {
                return Err(invalid("name is used by another block"));
            }
            let dest = Path::new(&block.destination);
            if block.destination.trim().is_empty() || block.destination.trim() == "." {
                return Err(invalid("destination must name a folder"));
            }
            if dest
                .components()
                .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir))
            {
                return Err(invalid("destination must be a relative path inside the workspace"));
            }
            if dest.components().any(|c| is_denied_name(c.as_os_str())) {
                return Err(invalid("destination is inside a protected folder"));
            }
            if dest.components().any(|c| match c {
                Component::Normal(n) => is_reserved_name(&n.to_string_lossy()),
                _ => false,
            }) {
                return Err(invalid("destination uses a reserved device name"));
            }
            for pattern in &block.patterns {
                if let Err(e) = glob::Pattern::new(pattern) {
                    return Err(invalid(&format!("bad pattern '{}': {}", pattern, e)));
                }
            }
        }
        Ok(())
    }

    /// First active block matching the candidate, in document order.
    pub fn first_match(&self, candidate: &Candidate<'_>) -> Option<&RuleBlock> {
        self.blocks.iter().find(|b| b.matches(candidate))
    }

    pub fn block(&self, name: &str) -> Option<&RuleBlock> {
        self.blocks
            .iter()
            .find(|b| b.name.eq_ignore_ascii_case(name))
    }

    /// Destination of the catch-all block, if the document has one.
    pub fn catch_all_destination(&self) -> Option<&str> {
        self.blocks
            .iter()
            .find(|b| b.catch_all)
            .map(|b| b.destination.as_str())
    }

    /// Every tag of every block, lowercased.
    pub fn known_tags(&self) -> BTreeSet<String> {
        self.blocks
            .iter()
            .flat_map(|b| b.tags.iter().map(|t| t.trim().to_lowercase()))
            .collect()
    }

    /// Check that every block of `older` survives unchanged or extended.
    pub fn ensure_covers(&self, older: &RuleSet) -> Result<(), ClassifyError> {
        for old in &older.blocks {
            let kept = self
                .blocks
                .iter()
                .any(|b| b.name == old.name && b.extends(old));
            if !kept {
                return Err(ClassifyError::NotAdditive {
                    block: old.name.clone(),
                });
            }
        }
        Ok(())
    }

    /// Apply additive changes. Adding a block whose name already exists
    /// extends that block instead. New blocks go before the catch-all.
    pub fn apply(&mut self, changes: &[RuleChange]) -> RuleDiff {
        let mut diff = RuleDiff::default();
        for change in changes {
            match change {
                RuleChange::AddBlock(block) => {
                    if let Some(existing) = self.block_mut(&block.name) {
                        let tags = merge_new(&mut existing.tags, &block.tags);
                        merge_new(&mut existing.extensions, &block.extensions);
                        merge_new(&mut existing.patterns, &block.patterns);
                        if !tags.is_empty() {
                            diff.extended.push((existing.name.clone(), tags));
                        }
                        continue;
                    }
                    let at = self
                        .blocks
                        .iter()
                        .position(|b| b.catch_all)
                        .unwrap_or(self.blocks.len());
                    self.blocks.insert(at, block.clone());
                    diff.added.push((block.name.clone(), block.destination.clone()));
                }
                RuleChange::ExtendTags { block, tags } => {
                    if let Some(existing) = self.block_mut(block) {
                        let added = merge_new(&mut existing.tags, tags);
                        if !added.is_empty() {
                            diff.extended.push((existing.name.clone(), added));
                        }
                    }
                }
            }
        }
        diff
    }

    fn block_mut(&mut self, name: &str) -> Option<&mut RuleBlock> {
        self.blocks
            .iter_mut()
            .find(|b| b.name.eq_ignore_ascii_case(name))
    }
}

/// Append the items of `incoming` not already in `existing`; returns them.
fn merge_new(existing: &mut Vec<String>, incoming: &[String]) -> Vec<String> {
    let mut added = Vec::new();
    for item in incoming {
        let present = existing.iter().any(|e| e.eq_ignore_ascii_case(item));
        if !present {
            existing.push(item.clone());
            added.push(item.clone());
        }
    }
    added
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signal::SignalKind;
    use tempfile::tempdir;

    fn text_signal(text: &str) -> Signal {
        Signal::from_text(SignalKind::Text, text, 1500, 8)
    }

    fn candidate<'a>(name: &'a str, ext: &'a str, signal: &'a Signal) -> Candidate<'a> {
        Candidate {
            name,
            extension: ext,
            signal,
        }
    }

    fn sample_rules() -> RuleSet {
        let mut rules = RuleSet::skeleton("unclassified");
        rules.apply(&[
            RuleChange::AddBlock(RuleBlock::new("Invoices", "finance/invoices").with_tags(["invoice"])),
            RuleChange::AddBlock(RuleBlock::new("Pictures", "media/pictures").with_extensions(["png", ".JPG"])),
            RuleChange::AddBlock(RuleBlock::new("Scans", "scans").with_patterns(["scan_*"])),
        ]);
        rules
    }

    #[test]
    fn skeleton_has_only_catch_all() {
        let rules = RuleSet::skeleton("unclassified");
        assert_eq!(rules.blocks.len(), 1);
        assert!(rules.blocks[0].catch_all);
        assert_eq!(rules.catch_all_destination(), Some("unclassified"));
    }

    #[test]
    fn catch_all_never_matches_directly() {
        let rules = RuleSet::skeleton("unclassified");
        let signal = text_signal("anything");
        assert!(rules.first_match(&candidate("a.txt", "txt", &signal)).is_none());
    }

    #[test]
    fn matches_by_tag_extension_and_pattern() {
        let rules = sample_rules();
        let invoice = text_signal("Invoice number 42 for consulting");
        let empty = Signal::null();

        let m = rules.first_match(&candidate("march.txt", "txt", &invoice)).unwrap();
        assert_eq!(m.name, "Invoices");
        let m = rules.first_match(&candidate("cat.jpg", "jpg", &empty)).unwrap();
        assert_eq!(m.name, "Pictures");
        let m = rules.first_match(&candidate("SCAN_001.tif", "tif", &empty)).unwrap();
        assert_eq!(m.name, "Scans");
        assert!(rules.first_match(&candidate("notes.txt", "txt", &empty)).is_none());
    }

    #[test]
    fn first_match_in_document_order_wins() {
        let rules = sample_rules();
        // Matches both Invoices (tag) and Pictures (extension).
        let signal = text_signal("invoice photo");
        let m = rules.first_match(&candidate("x.png", "png", &signal)).unwrap();
        assert_eq!(m.name, "Invoices");
    }

    #[test]
    fn ascii_tags_match_whole_words_only() {
        let block = RuleBlock::new("Art", "art").with_tags(["art"]);
        let partial = text_signal("a partial result");
        let exact = text_signal("modern art gallery");
        assert!(!block.matches(&candidate("p.txt", "txt", &partial)));
        assert!(block.matches(&candidate("e.txt", "txt", &exact)));
        assert!(block.matches(&candidate("art-history.txt", "txt", &Signal::null())));
    }

    #[test]
    fn cjk_tags_match_as_substrings() {
        let block = RuleBlock::new("发票", "finance").with_tags(["发票"]);
        let signal = text_signal("本月增值税发票汇总");
        assert!(block.matches(&candidate("a.txt", "txt", &signal)));
    }

    #[test]
    fn deprecated_blocks_do_not_match() {
        let mut block = RuleBlock::new("Old", "old").with_extensions(["txt"]);
        block.deprecated = true;
        assert!(!block.matches(&candidate("a.txt", "txt", &Signal::null())));
    }

    #[test]
    fn new_blocks_are_inserted_before_catch_all() {
        let rules = sample_rules();
        let names: Vec<&str> = rules.blocks.iter().map(|b| b.name.as_str()).collect();
        assert_eq!(names, vec!["Invoices", "Pictures", "Scans", "Unclassified"]);
    }

    #[test]
    fn apply_is_additive() {
        let before = sample_rules();
        let mut after = before.clone();
        let diff = after.apply(&[
            RuleChange::ExtendTags {
                block: "invoices".into(),
                tags: vec!["invoice".into(), "receipt".into()],
            },
            RuleChange::AddBlock(RuleBlock::new("Pictures", "ignored").with_tags(["photo"])),
            RuleChange::AddBlock(RuleBlock::new("Contracts", "legal").with_tags(["contract"])),
        ]);

        assert_eq!(diff.added, vec![("Contracts".to_string(), "legal".to_string())]);
        assert_eq!(
            diff.extended,
            vec![
                ("Invoices".to_string(), vec!["receipt".to_string()]),
                ("Pictures".to_string(), vec!["photo".to_string()]),
            ]
        );
        // Existing destinations are never rewritten.
        assert_eq!(after.block("pictures").unwrap().destination, "media/pictures");
        after.ensure_covers(&before).unwrap();
        assert_eq!(diff.summary(), "1 block added, 2 blocks extended");
    }

    #[test]
    fn removal_is_detected() {
        let before = sample_rules();
        let mut after = before.clone();
        after.blocks.retain(|b| b.name != "Scans");
        assert!(matches!(
            after.ensure_covers(&before),
            Err(ClassifyError::NotAdditive { block }) if block == "Scans"
        ));

        let mut narrowed = before.clone();
        narrowed.blocks[0].tags.clear();
        assert!(narrowed.ensure_covers(&before).is_err());
    }

    #[test]
    fn save_and_load_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("rules/classify_rules.toml");
        let rules = sample_rules();
        rules.save(&path).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("# aifs classification rules."));
        assert!(content.contains("[[block]]"));
        assert_eq!(RuleSet::load(&path).unwrap(), Some(rules));
    }

    #[test]
    fn missing_file_loads_as_none() {
        let dir = tempdir().unwrap();
        assert_eq!(RuleSet::load(dir.path().join("absent.toml")).unwrap(), None);
    }

    #[test]
    fn broken_document_is_a_parse_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("rules.toml");
        fs::write(&path, "[[block]]\nname = ").unwrap();
        assert!(matches!(RuleSet::load(&path), Err(ClassifyError::RulesParse { .. })));
    }

    #[test]
    fn escaping_destination_is_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("rules.toml");
        fs::write(&path, "[[block]]\nname = \"x\"\ndestination = \"../outside\"\n").unwrap();
        assert!(matches!(RuleSet::load(&path), Err(ClassifyError::InvalidRule { .. })));
    }

    #[test]
    fn reserved_device_destination_is_rejected() {
        let mut rules = RuleSet::skeleton("unclassified");
        rules.apply(&[RuleChange::AddBlock(RuleBlock::new("con", "con"))]);
        assert!(matches!(rules.validate(), Err(ClassifyError::InvalidRule { .. })));

        let mut rules = RuleSet::skeleton("unclassified");
        rules.apply(&[RuleChange::AddBlock(RuleBlock::new("Ports", "devices/COM1.old"))]);
        assert!(matches!(rules.validate(), Err(ClassifyError::InvalidRule { .. })));
    }

    #[test]
    fn protected_destination_is_rejected() {
        let mut rules = RuleSet::skeleton("unclassified");
        rules.apply(&[RuleChange::AddBlock(RuleBlock::new("Sneaky", ".git/hooks"))]);
        assert!(matches!(rules.validate(), Err(ClassifyError::InvalidRule { .. })));
    }

    #[test]
    fn hand_written_document_parses() {
        let rules: RuleSet = toml::from_str(
            r#"
            [[block]]
            name = "Reports"
            destination = "docs/reports"
            tags = ["report"]

            [[block]]
            name = "Unclassified"
            destination = "unclassified"
            catch_all = true
            "#,
        )
        .unwrap();
        rules.validate().unwrap();
        assert_eq!(rules.blocks.len(), 2);
        assert!(rules.blocks[0].extensions.is_empty());
    }
}
