// reconcile.rs - Propose additive rule changes from one run's outcomes.
//
// Files that matched no block are grouped by shared keywords, then by
// extension. A group with at least `min_support` members becomes a proposal:
// a tag on an existing block when files that block already claimed share
// the keyword, otherwise a new block.
//
// New destinations are plain folder names at the top of the workspace. A
// keyword that is a reserved device name is never proposed, and a folder
// name already used by a top-level file gets a numbered suffix.

use std::collections::{BTreeMap, BTreeSet};

use aifs_workspace::is_reserved_name;

use crate::rules::{RuleBlock, RuleChange, RuleSet};
use crate::signal::Signal;

/// A file some block claimed this run.
#[derive(Debug, Clone, Copy)]
pub struct MatchedFile<'a> {
    pub block: &'a str,
    pub signal: &'a Signal,
}

/// A file no block claimed this run.
#[derive(Debug, Clone, Copy)]
pub struct UnmatchedFile<'a> {
    pub path: &'a str,
    pub extension: &'a str,
    pub signal: &'a Signal,
}

/// Folder new extension-based blocks are placed under.
pub const BY_TYPE_DIR: &str = "by-type";

/// Changes that would let recurring unmatched files be classified.
/// Never proposes removing or rewriting anything.
///
/// `occupied` holds the lowercased names of top-level entries that are not
/// folders; new destinations avoid them.
pub fn propose(
    rules: &RuleSet,
    matched: &[MatchedFile<'_>],
    unmatched: &[UnmatchedFile<'_>],
    occupied: &BTreeSet<String>,
    min_support: usize,
) -> Vec<RuleChange> {
    let min_support = min_support.max(1);
    let known_tags = rules.known_tags();
    let mut claimed: BTreeSet<usize> = BTreeSet::new();
    let mut changes = Vec::new();

    // keyword -> indices of unmatched files carrying it
    let mut support: BTreeMap<&str, Vec<usize>> = BTreeMap::new();
    for (i, file) in unmatched.iter().enumerate() {
        let unique: BTreeSet<&str> = file.signal.keywords.iter().map(String::as_str).collect();
        for keyword in unique {
            if !known_tags.contains(keyword) && !is_reserved_name(keyword) {
                support.entry(keyword).or_default().push(i);
            }
        }
    }
    let mut candidates: Vec<(&str, Vec<usize>)> = support
        .into_iter()
        .filter(|(_, files)| files.len() >= min_support)
        .collect();
    // Widest support first; BTreeMap order breaks ties alphabetically.
    candidates.sort_by(|a, b| b.1.len().cmp(&a.1.len()));

    for (keyword, files) in candidates {
        let free: Vec<usize> = files.into_iter().filter(|i| !claimed.contains(i)).collect();
        if free.len() < min_support {
            continue;
        }
        claimed.extend(free.iter().copied());

        match related_block(rules, matched, keyword) {
            Some(block) => changes.push(RuleChange::ExtendTags {
                block: block.to_string(),
                tags: vec![keyword.to_string()],
            }),
            None => changes.push(RuleChange::AddBlock(
                RuleBlock::new(keyword, free_folder(keyword, occupied))
                    .with_description(format!(
                        "Files mentioning '{}' (proposed from {} unmatched files)",
                        keyword,
                        free.len()
                    ))
                    .with_tags([keyword]),
            )),
        }
    }

    let mut by_extension: BTreeMap<&str, usize> = BTreeMap::new();
    for (i, file) in unmatched.iter().enumerate() {
        if !claimed.contains(&i)
            && !file.extension.is_empty()
            && !is_reserved_name(file.extension)
        {
            *by_extension.entry(file.extension).or_insert(0) += 1;
        }
    }
    let by_type = free_folder(BY_TYPE_DIR, occupied);
    for (extension, count) in by_extension {
        if count < min_support {
            continue;
        }
        changes.push(RuleChange::AddBlock(
            RuleBlock::new(
                format!("{} files", extension),
                format!("{}/{}", by_type, extension),
            )
            .with_description(format!(
                "'.{}' files without a more specific rule (proposed from {} unmatched files)",
                extension, count
            ))
            .with_extensions([extension]),
        ));
    }

    changes
}

/// `name`, or `name (n)` when a top-level file already has that name.
fn free_folder(name: &str, occupied: &BTreeSet<String>) -> String {
    let mut candidate = name.to_string();
    let mut n = 0;
    while occupied.contains(&candidate.to_lowercase()) {
        n += 1;
        candidate = format!("{} ({})", name, n);
    }
    candidate
}

/// The active block whose already-claimed files most often carry `keyword`.
/// Ties go to the block earlier in the document.
fn related_block<'r>(rules: &'r RuleSet, matched: &[MatchedFile<'_>], keyword: &str) -> Option<&'r str> {
    let mut best: Option<(&'r str, usize)> = None;
    for block in rules.blocks.iter().filter(|b| b.is_active()) {
        let count = matched
            .iter()
            .filter(|m| m.block == block.name && m.signal.keywords.iter().any(|k| k == keyword))
            .count();
        if count > 0 && best.map(|(_, c)| count > c).unwrap_or(true) {
            best = Some((block.name.as_str(), count));
        }
    }
    best.map(|(name, _)| name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signal::SignalKind;

    fn signal(text: &str) -> Signal {
        Signal::from_text(SignalKind::Text, text, 1500, 8)
    }

    #[test]
    fn shared_keyword_becomes_new_block() {
        let rules = RuleSet::skeleton("unclassified");
        let a = signal("invoice from acme");
        let b = signal("invoice from globex");
        let c = signal("holiday plans");
        let unmatched = [
            UnmatchedFile { path: "a.txt", extension: "txt", signal: &a },
            UnmatchedFile { path: "b.txt", extension: "txt", signal: &b },
            UnmatchedFile { path: "c.md", extension: "md", signal: &c },
        ];
        let changes = propose(&rules, &[], &unmatched, &BTreeSet::new(), 2);
        assert_eq!(changes.len(), 1);
        match &changes[0] {
            RuleChange::AddBlock(block) => {
                assert_eq!(block.name, "invoice");
                assert_eq!(block.destination, "invoice");
                assert_eq!(block.tags, vec!["invoice"]);
            }
            other => panic!("unexpected change {:?}", other),
        }
    }

    #[test]
    fn keyword_seen_in_claimed_files_extends_that_block() {
        let mut rules = RuleSet::skeleton("unclassified");
        rules.apply(&[RuleChange::AddBlock(
            RuleBlock::new("Finance", "finance").with_tags(["invoice"]),
        )]);
        let claimed = signal("invoice receipt");
        let a = signal("receipt for lunch");
        let b = signal("receipt for taxi");
        let matched = [MatchedFile { block: "Finance", signal: &claimed }];
        let unmatched = [
            UnmatchedFile { path: "a.txt", extension: "txt", signal: &a },
            UnmatchedFile { path: "b.txt", extension: "txt", signal: &b },
        ];
        let changes = propose(&rules, &matched, &unmatched, &BTreeSet::new(), 2);
        assert_eq!(
            changes,
            vec![RuleChange::ExtendTags {
                block: "Finance".into(),
                tags: vec!["receipt".into()],
            }]
        );
    }

    #[test]
    fn leftover_files_group_by_extension() {
        let rules = RuleSet::skeleton("unclassified");
        let empty = Signal::null();
        let unmatched = [
            UnmatchedFile { path: "a.exe", extension: "exe", signal: &empty },
            UnmatchedFile { path: "b.exe", extension: "exe", signal: &empty },
            UnmatchedFile { path: "c.bin", extension: "bin", signal: &empty },
        ];
        let changes = propose(&rules, &[], &unmatched, &BTreeSet::new(), 2);
        assert_eq!(changes.len(), 1);
        match &changes[0] {
            RuleChange::AddBlock(block) => {
                assert_eq!(block.destination, "by-type/exe");
                assert_eq!(block.extensions, vec!["exe"]);
            }
            other => panic!("unexpected change {:?}", other),
        }
    }

    #[test]
    fn each_file_supports_one_proposal() {
        let rules = RuleSet::skeleton("unclassified");
        let a = signal("budget forecast");
        let b = signal("budget forecast");
        let unmatched = [
            UnmatchedFile { path: "a.txt", extension: "txt", signal: &a },
            UnmatchedFile { path: "b.txt", extension: "txt", signal: &b },
        ];
        let changes = propose(&rules, &[], &unmatched, &BTreeSet::new(), 2);
        // "budget" and "forecast" tie; only the alphabetically first wins.
        assert_eq!(changes.len(), 1);
        assert!(matches!(&changes[0], RuleChange::AddBlock(b) if b.name == "budget"));
    }

    #[test]
    fn reserved_device_names_are_not_proposed() {
        let rules = RuleSet::skeleton("unclassified");
        let a = signal("arroz con pollo con ajo");
        let b = signal("pan con queso con tomate");
        let unmatched = [
            UnmatchedFile { path: "receta.txt", extension: "txt", signal: &a },
            UnmatchedFile { path: "cena.txt", extension: "txt", signal: &b },
        ];
        let changes = propose(&rules, &[], &unmatched, &BTreeSet::new(), 2);
        assert_eq!(changes.len(), 1);
        match &changes[0] {
            RuleChange::AddBlock(block) => assert_eq!(block.destination, "by-type/txt"),
            other => panic!("unexpected change {:?}", other),
        }

        let x = Signal::null();
        let odd = [
            UnmatchedFile { path: "a.aux", extension: "aux", signal: &x },
            UnmatchedFile { path: "b.aux", extension: "aux", signal: &x },
        ];
        assert!(propose(&rules, &[], &odd, &BTreeSet::new(), 2).is_empty());
    }

    #[test]
    fn destination_taken_by_a_file_gets_a_suffix() {
        let rules = RuleSet::skeleton("unclassified");
        let a = signal("invoice from acme");
        let b = signal("invoice from globex");
        let unmatched = [
            UnmatchedFile { path: "a.txt", extension: "txt", signal: &a },
            UnmatchedFile { path: "b.txt", extension: "txt", signal: &b },
        ];
        let occupied: BTreeSet<String> = ["invoice".to_string()].into();
        let changes = propose(&rules, &[], &unmatched, &occupied, 2);
        match &changes[0] {
            RuleChange::AddBlock(block) => {
                assert_eq!(block.name, "invoice");
                assert_eq!(block.destination, "invoice (1)");
            }
            other => panic!("unexpected change {:?}", other),
        }
    }

    #[test]
    fn below_support_proposes_nothing() {
        let rules = RuleSet::skeleton("unclassified");
        let a = signal("lonely document");
        let unmatched = [UnmatchedFile { path: "a.txt", extension: "txt", signal: &a }];
        assert!(propose(&rules, &[], &unmatched, &BTreeSet::new(), 2).is_empty());
    }
}
