// guard.rs - Path Guard: resolve caller paths and keep them inside the root.
//
// Every path that reaches the filesystem goes through `PathGuard::resolve`.
// Resolution is physical, not lexical: each component is pushed in turn and
// any symlink found along the way is replaced by its target before the next
// component is applied. A `..` therefore climbs out of where a symlink really
// points, which is what the OS will do when the path is later opened.
//
// After resolution the path must be the root or a descendant of it, and no
// component may name a deny-listed entry (the VCS metadata directory and the
// workspace data area). Nothing here performs writes.

use std::collections::VecDeque;
use std::ffi::{OsStr, OsString};
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

use crate::error::WorkspaceError;
use crate::layout::DATA_DIR_NAME;
use crate::root::WorkspaceRoot;

/// Names hidden from every operation, matched case-insensitively against
/// each path component.
pub const DENIED_NAMES: &[&str] = &[".git", DATA_DIR_NAME];

/// Device names Windows refuses as file names, rejected everywhere so a
/// workspace stays portable.
const RESERVED_NAMES: &[&str] = &[
    "CON", "PRN", "AUX", "NUL", "COM1", "COM2", "COM3", "COM4", "COM5", "COM6", "COM7", "COM8",
    "COM9", "LPT1", "LPT2", "LPT3", "LPT4", "LPT5", "LPT6", "LPT7", "LPT8", "LPT9",
];

const MAX_SYMLINK_HOPS: usize = 40;

/// A path that has passed the guard.
///
/// Holds both the physical absolute path (for I/O) and the POSIX-style path
/// relative to the root (for results, audit records and commit messages,
/// so the host's directory layout never leaks).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPath {
    absolute: PathBuf,
    relative: String,
}

impl ResolvedPath {
    pub fn absolute(&self) -> &Path {
        &self.absolute
    }

    /// Relative POSIX path; the root itself is `"."`.
    pub fn relative(&self) -> &str {
        &self.relative
    }

    pub fn is_root(&self) -> bool {
        self.relative == "."
    }

    pub fn exists(&self) -> bool {
        // symlink_metadata so a dangling link still counts as present.
        fs::symlink_metadata(&self.absolute).is_ok()
    }

    pub fn is_dir(&self) -> bool {
        self.absolute.is_dir()
    }

    pub fn is_file(&self) -> bool {
        self.absolute.is_file()
    }

    /// Final component, if any.
    pub fn file_name(&self) -> Option<&OsStr> {
        if self.is_root() {
            None
        } else {
            self.absolute.file_name()
        }
    }
}

/// Resolves and validates paths against one [`WorkspaceRoot`].
#[derive(Debug, Clone)]
pub struct PathGuard {
    root: WorkspaceRoot,
}

impl PathGuard {
    pub fn new(root: WorkspaceRoot) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &WorkspaceRoot {
        &self.root
    }

    /// Resolve a relative (to the root) or absolute path.
    ///
    /// Fails with `InvalidPath` on malformed input, `PathViolation` when the
    /// physical location is outside the root, and `ForbiddenPath` when any
    /// component is deny-listed. The target itself need not exist.
    pub fn resolve(&self, input: &str) -> Result<ResolvedPath, WorkspaceError> {
        validate_input(input)?;

        let normalized = input.trim().replace('\\', "/");
        let candidate = Path::new(&normalized);
        let joined = if candidate.is_absolute() {
            candidate.to_path_buf()
        } else {
            self.root.path().join(candidate)
        };

        let physical = resolve_physical(&joined).map_err(|source| WorkspaceError::IoError {
            path: joined.clone(),
            source,
        })?;

        let relative = match relative_within(&physical, self.root.path()) {
            Some(rel) => rel,
            None => {
                tracing::warn!(path = input, "rejected path outside workspace");
                return Err(WorkspaceError::PathViolation {
                    path: input.to_string(),
                });
            }
        };

        if self.is_denied(Path::new(&relative)) {
            tracing::warn!(path = input, "rejected deny-listed path");
            return Err(WorkspaceError::ForbiddenPath {
                path: input.to_string(),
            });
        }

        Ok(ResolvedPath {
            absolute: physical,
            relative,
        })
    }

    /// True when any component of a root-relative path is deny-listed.
    pub fn is_denied(&self, relative: &Path) -> bool {
        relative.components().any(|c| match c {
            Component::Normal(name) => is_denied_name(name),
            _ => false,
        })
    }

    /// Root-relative POSIX path for an absolute path already known to be
    /// inside the root (e.g. an entry produced by walking a resolved dir).
    pub fn relative_of(&self, absolute: &Path) -> Option<String> {
        relative_within(absolute, self.root.path())
    }
}

/// True when a single path segment names a Windows device, with or without
/// an extension (`con`, `NUL.txt`).
pub fn is_reserved_name(segment: &str) -> bool {
    let stem = segment.split('.').next().unwrap_or("").trim();
    RESERVED_NAMES.iter().any(|r| r.eq_ignore_ascii_case(stem))
}

/// True when a single file name is deny-listed.
pub fn is_denied_name(name: &OsStr) -> bool {
    let name = name.to_string_lossy();
    DENIED_NAMES.iter().any(|d| d.eq_ignore_ascii_case(&name))
}

fn validate_input(input: &str) -> Result<(), WorkspaceError> {
    let invalid = |reason: &str| WorkspaceError::InvalidPath {
        path: input.to_string(),
        reason: reason.to_string(),
    };

    if input.trim().is_empty() {
        return Err(invalid("path is empty"));
    }
    if input.contains('\0') {
        return Err(invalid("path contains a NUL byte"));
    }
    if input.split(['/', '\\']).any(is_reserved_name) {
        return Err(invalid("path uses a reserved device name"));
    }
    Ok(())
}

enum Part {
    Anchor(OsString),
    Parent,
    Normal(OsString),
}

fn parts_of(path: &Path) -> Vec<Part> {
    path.components()
        .filter_map(|c| match c {
            Component::Prefix(_) | Component::RootDir => {
                Some(Part::Anchor(c.as_os_str().to_os_string()))
            }
            Component::CurDir => None,
            Component::ParentDir => Some(Part::Parent),
            Component::Normal(name) => Some(Part::Normal(name.to_os_string())),
        })
        .collect()
}

/// Resolve `..` and symlinks component by component. Components that do
/// not exist yet are kept verbatim.
fn resolve_physical(path: &Path) -> io::Result<PathBuf> {
    let mut resolved = PathBuf::new();
    let mut queue: VecDeque<Part> = parts_of(path).into();
    let mut hops = 0;

    while let Some(part) = queue.pop_front() {
        match part {
            Part::Anchor(anchor) => resolved.push(anchor),
            Part::Parent => {
                resolved.pop();
            }
            Part::Normal(name) => {
                resolved.push(&name);
                let is_link = fs::symlink_metadata(&resolved)
                    .map(|m| m.file_type().is_symlink())
                    .unwrap_or(false);
                if !is_link {
                    continue;
                }

                hops += 1;
                if hops > MAX_SYMLINK_HOPS {
                    return Err(io::Error::other("too many levels of symbolic links"));
                }

                let target = fs::read_link(&resolved)?;
                if target.is_absolute() {
                    resolved = PathBuf::new();
                } else {
                    resolved.pop();
                }
                for p in parts_of(&target).into_iter().rev() {
                    queue.push_front(p);
                }
            }
        }
    }

    Ok(resolved)
}

fn relative_within(path: &Path, root: &Path) -> Option<String> {
    let rel = strip_root(path, root)?;
    let parts: Vec<String> = rel
        .components()
        .filter_map(|c| match c {
            Component::Normal(n) => Some(n.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect();
    if parts.is_empty() {
        Some(".".to_string())
    } else {
        Some(parts.join("/"))
    }
}

// A case-insensitive volume (the macOS default) accepts input whose case
// differs from the canonical root; canonicalizing the existing part of the
// path recovers the on-disk spelling.
#[cfg(not(windows))]
fn strip_root(path: &Path, root: &Path) -> Option<PathBuf> {
    if let Ok(rel) = path.strip_prefix(root) {
        return Some(rel.to_path_buf());
    }
    let canonical = canonicalize_existing(path)?;
    canonical.strip_prefix(root).ok().map(Path::to_path_buf)
}

/// Canonicalize the longest existing ancestor of `path` and re-append the
/// components that do not exist yet.
#[cfg(not(windows))]
fn canonicalize_existing(path: &Path) -> Option<PathBuf> {
    let mut tail: Vec<&OsStr> = Vec::new();
    let mut current = path;
    loop {
        if let Ok(mut base) = fs::canonicalize(current) {
            base.extend(tail.iter().rev());
            return Some(base);
        }
        tail.push(current.file_name()?);
        current = current.parent()?;
    }
}

// NTFS is case-insensitive: compare component-wise ignoring case.
#[cfg(windows)]
fn strip_root(path: &Path, root: &Path) -> Option<PathBuf> {
    let mut path_iter = path.components();
    for root_c in root.components() {
        let path_c = path_iter.next()?;
        let a = root_c.as_os_str().to_string_lossy().to_lowercase();
        let b = path_c.as_os_str().to_string_lossy().to_lowercase();
        if a != b {
            return None;
        }
    }
    Some(path_iter.as_path().to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn guard() -> (tempfile::TempDir, PathGuard) {
        let dir = tempdir().unwrap();
        let root = WorkspaceRoot::new(dir.path()).unwrap();
        (dir, PathGuard::new(root))
    }

    #[test]
    fn resolves_relative_path() {
        let (_dir, guard) = guard();
        let resolved = guard.resolve("notes/todo.txt").unwrap();
        assert_eq!(resolved.relative(), "notes/todo.txt");
        assert!(resolved.absolute().starts_with(guard.root().path()));
    }

    #[test]
    fn root_resolves_to_dot() {
        let (_dir, guard) = guard();
        assert!(guard.resolve(".").unwrap().is_root());
        assert!(guard.resolve("a/..").unwrap().is_root());
    }

    #[test]
    fn dot_dot_escape_rejected() {
        let (_dir, guard) = guard();
        let result = guard.resolve("../escape.txt");
        assert!(matches!(result, Err(WorkspaceError::PathViolation { .. })));

        let result = guard.resolve("a/b/../../../escape.txt");
        assert!(matches!(result, Err(WorkspaceError::PathViolation { .. })));
    }

    #[test]
    fn absolute_path_through_root_parent_rejected() {
        let (_dir, guard) = guard();
        let input = format!("{}/../etc/passwd", guard.root().path().display());
        let result = guard.resolve(&input);
        assert!(matches!(result, Err(WorkspaceError::PathViolation { .. })));
    }

    #[test]
    fn absolute_path_inside_root_accepted() {
        let (_dir, guard) = guard();
        let input = format!("{}/docs/a.md", guard.root().path().display());
        assert_eq!(guard.resolve(&input).unwrap().relative(), "docs/a.md");
    }

    #[test]
    fn backslashes_are_separators() {
        let (_dir, guard) = guard();
        assert_eq!(guard.resolve("docs\\a.md").unwrap().relative(), "docs/a.md");
    }

    #[test]
    fn empty_and_nul_rejected() {
        let (_dir, guard) = guard();
        assert!(matches!(guard.resolve("  "), Err(WorkspaceError::InvalidPath { .. })));
        assert!(matches!(guard.resolve("a\0b"), Err(WorkspaceError::InvalidPath { .. })));
    }

    #[test]
    fn reserved_device_names_rejected() {
        let (_dir, guard) = guard();
        assert!(matches!(guard.resolve("docs/CON"), Err(WorkspaceError::InvalidPath { .. })));
        assert!(matches!(guard.resolve("nul.txt"), Err(WorkspaceError::InvalidPath { .. })));
        assert!(guard.resolve("console.txt").is_ok());
    }

    #[test]
    fn reserved_name_matches_stem_only() {
        assert!(is_reserved_name("con"));
        assert!(is_reserved_name("Lpt1.log"));
        assert!(!is_reserved_name("console"));
        assert!(!is_reserved_name("com10"));
    }

    #[test]
    fn deny_listed_paths_forbidden() {
        let (_dir, guard) = guard();
        assert!(matches!(guard.resolve(".git"), Err(WorkspaceError::ForbiddenPath { .. })));
        assert!(matches!(guard.resolve(".git/config"), Err(WorkspaceError::ForbiddenPath { .. })));
        assert!(matches!(guard.resolve(".GIT/HEAD"), Err(WorkspaceError::ForbiddenPath { .. })));
        assert!(matches!(guard.resolve(".aifs/classify_rules.toml"), Err(WorkspaceError::ForbiddenPath { .. })));
        // Lexically mentions .git but lands elsewhere.
        assert_eq!(guard.resolve(".git/../a.txt").unwrap().relative(), "a.txt");
    }

    #[cfg(unix)]
    #[test]
    fn symlink_escape_rejected() {
        let (dir, guard) = guard();
        let outside = tempdir().unwrap();
        std::os::unix::fs::symlink(outside.path(), dir.path().join("link")).unwrap();

        let result = guard.resolve("link/secret.txt");
        assert!(matches!(result, Err(WorkspaceError::PathViolation { .. })));
    }

    #[cfg(unix)]
    #[test]
    fn dangling_symlink_escape_rejected() {
        let (dir, guard) = guard();
        std::os::unix::fs::symlink("/nonexistent-aifs-target/file", dir.path().join("dangling"))
            .unwrap();

        let result = guard.resolve("dangling");
        assert!(matches!(result, Err(WorkspaceError::PathViolation { .. })));
    }

    #[cfg(unix)]
    #[test]
    fn symlink_into_git_dir_forbidden() {
        let (dir, guard) = guard();
        fs::create_dir(dir.path().join(".git")).unwrap();
        std::os::unix::fs::symlink(".git", dir.path().join("meta")).unwrap();

        let result = guard.resolve("meta/config");
        assert!(matches!(result, Err(WorkspaceError::ForbiddenPath { .. })));
    }

    #[cfg(unix)]
    #[test]
    fn symlink_within_root_followed() {
        let (dir, guard) = guard();
        fs::create_dir(dir.path().join("real")).unwrap();
        std::os::unix::fs::symlink("real", dir.path().join("alias")).unwrap();

        assert_eq!(guard.resolve("alias/x.txt").unwrap().relative(), "real/x.txt");
    }

    #[cfg(unix)]
    #[test]
    fn strip_root_recovers_through_existing_ancestor() {
        let (_dir, guard) = guard();
        let elsewhere = tempdir().unwrap();
        let alias = elsewhere.path().join("alias");
        std::os::unix::fs::symlink(guard.root().path(), &alias).unwrap();

        let rel = strip_root(&alias.join("new.txt"), guard.root().path());
        assert_eq!(rel, Some(PathBuf::from("new.txt")));
        assert_eq!(strip_root(&elsewhere.path().join("x.txt"), guard.root().path()), None);
    }

    #[cfg(target_os = "macos")]
    #[test]
    fn differently_cased_absolute_path_accepted() {
        let (dir, guard) = guard();
        fs::create_dir(dir.path().join("Docs")).unwrap();
        let input = format!("{}/docs/a.md", guard.root().path().display()).to_uppercase();
        // Only meaningful on the default case-insensitive volume.
        if Path::new(&input).parent().map(Path::exists).unwrap_or(false) {
            assert_eq!(guard.resolve(&input).unwrap().relative(), "Docs/A.MD");
        }
    }

    #[cfg(unix)]
    #[test]
    fn symlink_loop_is_an_error() {
        let (dir, guard) = guard();
        std::os::unix::fs::symlink("b", dir.path().join("a")).unwrap();
        std::os::unix::fs::symlink("a", dir.path().join("b")).unwrap();

        assert!(matches!(guard.resolve("a"), Err(WorkspaceError::IoError { .. })));
    }
}
