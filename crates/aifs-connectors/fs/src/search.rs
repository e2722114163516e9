// search.rs - Lazy pattern search over a directory tree.
//
// A search walks the tree on demand: matches are produced one at a time as
// the caller pulls them, and nothing is scanned past the last match the
// caller asks for. Each call re-scans; a finished search cannot restart.

use std::path::Path;

use glob::{MatchOptions, Pattern};
use walkdir::WalkDir;

use aifs_audit::{OperationKind, OperationRecord};
use aifs_workspace::is_denied_name;

use crate::connector::FsConnector;
use crate::error::FsError;

const GLOB_META: &[char] = &['*', '?', '['];

/// How a search pattern is compared against entries.
#[derive(Debug, Clone)]
pub enum Matcher {
    /// Case-insensitive substring of the file name.
    Substring(String),
    /// Glob against the file name, or against the path below the search
    /// base when the pattern contains `/`.
    Glob { pattern: Pattern, match_path: bool },
}

impl Matcher {
    /// Patterns containing `*`, `?` or `[` are globs; anything else is a
    /// substring.
    pub fn parse(pattern: &str) -> Result<Self, FsError> {
        if pattern.contains(GLOB_META) {
            let compiled = Pattern::new(pattern).map_err(|e| FsError::InvalidPattern {
                pattern: pattern.to_string(),
                reason: e.msg.to_string(),
            })?;
            Ok(Self::Glob {
                pattern: compiled,
                match_path: pattern.contains('/'),
            })
        } else {
            Ok(Self::Substring(pattern.to_lowercase()))
        }
    }

    /// `below_base` is the entry's POSIX path relative to the search base.
    pub fn is_match(&self, below_base: &str) -> bool {
        let name = below_base.rsplit('/').next().unwrap_or(below_base);
        match self {
            Self::Substring(needle) => name.to_lowercase().contains(needle.as_str()),
            Self::Glob {
                pattern,
                match_path,
            } => {
                let options = MatchOptions {
                    case_sensitive: false,
                    require_literal_separator: true,
                    require_literal_leading_dot: false,
                };
                let subject = if *match_path { below_base } else { name };
                pattern.matches_with(subject, options)
            }
        }
    }
}

/// A lazy sequence of workspace-relative paths matching a pattern.
///
/// The search is audited once, when it is exhausted or dropped, with the
/// number of matches actually produced.
pub struct Search<'a> {
    connector: &'a FsConnector,
    walker: Box<dyn Iterator<Item = walkdir::Result<walkdir::DirEntry>> + 'a>,
    base_absolute: std::path::PathBuf,
    base_relative: String,
    pattern: String,
    matcher: Matcher,
    limit: usize,
    matched: u64,
    finished: bool,
}

impl<'a> Search<'a> {
    pub(crate) fn new(
        connector: &'a FsConnector,
        base_absolute: &Path,
        base_relative: &str,
        pattern: &str,
        recursive: bool,
        limit: usize,
    ) -> Result<Self, FsError> {
        let matcher = Matcher::parse(pattern)?;
        let walker = WalkDir::new(base_absolute)
            .min_depth(1)
            .max_depth(if recursive { usize::MAX } else { 1 })
            .follow_links(false)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| !is_denied_name(e.file_name()));
        Ok(Self {
            connector,
            walker: Box::new(walker),
            base_absolute: base_absolute.to_path_buf(),
            base_relative: base_relative.to_string(),
            pattern: pattern.to_string(),
            matcher,
            limit,
            matched: 0,
            finished: false,
        })
    }

    /// Number of matches produced so far.
    pub fn matched(&self) -> u64 {
        self.matched
    }

    fn finish(&mut self) {
        if self.finished {
            return;
        }
        self.finished = true;
        let record = OperationRecord::success(
            self.connector.actor(),
            OperationKind::Search,
            vec![self.base_relative.clone(), self.pattern.clone()],
        )
        .with_count(self.matched);
        self.connector.audit(record, None);
    }
}

impl Iterator for Search<'_> {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        if self.finished {
            return None;
        }
        if self.limit > 0 && self.matched >= self.limit as u64 {
            self.finish();
            return None;
        }
        loop {
            let Some(entry) = self.walker.next() else {
                self.finish();
                return None;
            };
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    tracing::debug!(error = %e, "skipping unreadable entry during search");
                    continue;
                }
            };
            let Ok(below) = entry.path().strip_prefix(&self.base_absolute) else {
                continue;
            };
            let below = posix(below);
            if self.matcher.is_match(&below) {
                self.matched += 1;
                return Some(join_relative(&self.base_relative, &below));
            }
        }
    }
}

impl Drop for Search<'_> {
    fn drop(&mut self) {
        self.finish();
    }
}

pub(crate) fn posix(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

pub(crate) fn join_relative(base: &str, below: &str) -> String {
    if base == "." {
        below.to_string()
    } else {
        format!("{}/{}", base, below)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_pattern_is_case_insensitive_substring() {
        let m = Matcher::parse("Report").unwrap();
        assert!(m.is_match("docs/q3-report.pdf"));
        assert!(!m.is_match("report/notes.txt"));
    }

    #[test]
    fn glob_matches_name() {
        let m = Matcher::parse("*.TXT").unwrap();
        assert!(m.is_match("notes/todo.txt"));
        assert!(!m.is_match("notes/todo.md"));
    }

    #[test]
    fn glob_with_separator_matches_path() {
        let m = Matcher::parse("notes/*.txt").unwrap();
        assert!(m.is_match("notes/todo.txt"));
        assert!(!m.is_match("archive/notes/todo.txt"));
        assert!(!m.is_match("notes/deep/todo.txt"));
    }

    #[test]
    fn joins() {
        assert_eq!(join_relative(".", "a/b"), "a/b");
        assert_eq!(join_relative("docs", "a"), "docs/a");
        assert_eq!(posix(Path::new("a/b/c.txt")), "a/b/c.txt");
    }
}
