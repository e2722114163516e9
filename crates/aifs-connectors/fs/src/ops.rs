// ops.rs - Low-level tree operations shared by the connector and the
// holding area. Callers have already validated every path.

use std::fs;
use std::io;
use std::path::Path;

use walkdir::WalkDir;

use aifs_workspace::is_denied_name;

use crate::error::FsError;

/// Move `src` to `dst`, creating `dst`'s parents. Falls back to
/// copy-then-remove when a rename crosses filesystems.
pub(crate) fn relocate(src: &Path, dst: &Path) -> Result<(), FsError> {
    ensure_parent(dst)?;
    match fs::rename(src, dst) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Err(FsError::io(src, e)),
        Err(e) => {
            tracing::debug!(error = %e, "rename failed; copying instead");
            move_by_copy(src, dst)
        }
    }
}

/// Copy everything under `src` to `dst`, then remove `src`. Nothing is
/// skipped: a nested `.git` or a symlink arrives as it was.
pub(crate) fn move_by_copy(src: &Path, dst: &Path) -> Result<(), FsError> {
    ensure_parent(dst)?;
    copy_entries(src, dst, true)?;
    remove_any(src)
}

/// Copy a file or a directory tree. Returns the number of bytes copied.
///
/// Deny-listed names inside the tree (a nested `.git`) are skipped.
pub(crate) fn copy_tree(src: &Path, dst: &Path) -> Result<u64, FsError> {
    ensure_parent(dst)?;
    copy_entries(src, dst, false)
}

fn copy_entries(src: &Path, dst: &Path, verbatim: bool) -> Result<u64, FsError> {
    let meta = fs::symlink_metadata(src).map_err(|e| FsError::io(src, e))?;
    if verbatim && meta.file_type().is_symlink() {
        copy_link(src, dst)?;
        return Ok(0);
    }
    if !meta.is_dir() {
        return fs::copy(src, dst).map_err(|e| FsError::io(src, e));
    }

    let mut bytes = 0;
    let walker = WalkDir::new(src)
        .follow_links(false)
        .into_iter()
        .filter_entry(|e| verbatim || e.depth() == 0 || !is_denied_name(e.file_name()));
    for entry in walker {
        let entry = entry.map_err(|e| walk_error(src, e))?;
        let relative = entry.path().strip_prefix(src).unwrap_or(entry.path());
        let target = dst.join(relative);
        if entry.file_type().is_dir() {
            fs::create_dir_all(&target).map_err(|e| FsError::io(&target, e))?;
        } else if verbatim && entry.file_type().is_symlink() {
            copy_link(entry.path(), &target)?;
        } else {
            bytes += fs::copy(entry.path(), &target).map_err(|e| FsError::io(entry.path(), e))?;
        }
    }
    Ok(bytes)
}

#[cfg(unix)]
fn copy_link(src: &Path, dst: &Path) -> Result<(), FsError> {
    let target = fs::read_link(src).map_err(|e| FsError::io(src, e))?;
    std::os::unix::fs::symlink(&target, dst).map_err(|e| FsError::io(dst, e))
}

#[cfg(not(unix))]
fn copy_link(src: &Path, dst: &Path) -> Result<(), FsError> {
    fs::copy(src, dst).map(|_| ()).map_err(|e| FsError::io(src, e))
}

/// Remove a file, symlink or directory tree.
pub(crate) fn remove_any(path: &Path) -> Result<(), FsError> {
    let meta = fs::symlink_metadata(path).map_err(|e| FsError::io(path, e))?;
    let result = if meta.is_dir() {
        fs::remove_dir_all(path)
    } else {
        fs::remove_file(path)
    };
    result.map_err(|e| FsError::io(path, e))
}

/// Total size of the regular files under `path`.
pub(crate) fn tree_size(path: &Path) -> u64 {
    WalkDir::new(path)
        .follow_links(false)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter_map(|e| e.metadata().ok())
        .map(|m| m.len())
        .sum()
}

pub(crate) fn is_empty_dir(path: &Path) -> Result<bool, FsError> {
    let mut entries = fs::read_dir(path).map_err(|e| FsError::io(path, e))?;
    Ok(entries.next().is_none())
}

pub(crate) fn ensure_parent(path: &Path) -> Result<(), FsError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| FsError::io(parent, e))?;
    }
    Ok(())
}

pub(crate) fn walk_error(base: &Path, e: walkdir::Error) -> FsError {
    let path = e.path().unwrap_or(base).to_path_buf();
    let source = e
        .into_io_error()
        .unwrap_or_else(|| io::Error::other("filesystem loop detected"));
    FsError::io(path, source)
}
