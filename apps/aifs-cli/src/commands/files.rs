// files.rs - Workspace file commands: ls, find, cat, stat, write, cp, mv, rm, mkdir.

use std::io::{self, Read, Write};

use aifs_connector_fs::{human_size, EntryKind, OperationReport, ReadWindow, TransferOptions};

use super::Session;

pub fn list(session: &Session, path: &str, recursive: bool) -> anyhow::Result<()> {
    let entries = session.fs.list(path, recursive)?;
    if entries.is_empty() {
        println!("(empty)");
        return Ok(());
    }

    println!("{:<5} {:>10} {:<20} PATH", "KIND", "SIZE", "MODIFIED");
    println!("{}", "-".repeat(80));
    for entry in &entries {
        let kind = match entry.kind {
            EntryKind::File => "file",
            EntryKind::Directory => "dir",
            EntryKind::Symlink => "link",
        };
        let size = match entry.kind {
            EntryKind::Directory => "-".to_string(),
            _ => human_size(entry.size),
        };
        let modified = entry
            .modified
            .map(|m| m.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|| "-".to_string());
        println!("{:<5} {:>10} {:<20} {}", kind, size, modified, entry.path);
    }
    Ok(())
}

pub fn find(session: &Session, base: &str, pattern: &str, recursive: bool) -> anyhow::Result<()> {
    let mut search = session.fs.search(base, pattern, recursive)?;
    for path in search.by_ref() {
        println!("{}", path);
    }
    if search.matched() == 0 {
        println!("No matches for '{}' under {}.", pattern, base);
    }
    Ok(())
}

pub fn cat(
    session: &Session,
    path: &str,
    offset: u64,
    length: Option<u64>,
) -> anyhow::Result<()> {
    let window = ReadWindow { offset, length };
    let output = session.fs.read(path, Some(window))?;

    let mut stdout = io::stdout().lock();
    stdout.write_all(&output.content)?;
    stdout.flush()?;
    if output.truncated {
        eprintln!(
            "[{} of {} bytes shown, from offset {}]",
            output.content.len(),
            output.size,
            output.offset
        );
    }
    Ok(())
}

pub fn stat(session: &Session, path: &str) -> anyhow::Result<()> {
    let info = session.fs.stat(path)?;
    println!("{}", serde_json::to_string_pretty(&info)?);
    Ok(())
}

pub fn write(session: &Session, path: &str, content: Option<&str>) -> anyhow::Result<()> {
    let bytes = match content {
        Some(text) => text.as_bytes().to_vec(),
        None => {
            let mut buf = Vec::new();
            io::stdin().read_to_end(&mut buf)?;
            buf
        }
    };
    let report = session.fs.write(path, &bytes)?;
    print_report(&report);
    Ok(())
}

pub fn copy(session: &Session, src: &str, dst: &str, overwrite: bool) -> anyhow::Result<()> {
    let report = session.fs.copy(src, dst, TransferOptions { overwrite })?;
    print_report(&report);
    Ok(())
}

pub fn move_path(session: &Session, src: &str, dst: &str, overwrite: bool) -> anyhow::Result<()> {
    let report = session.fs.move_path(src, dst, TransferOptions { overwrite })?;
    print_report(&report);
    Ok(())
}

pub fn delete(session: &Session, path: &str, recursive: bool) -> anyhow::Result<()> {
    let report = session.fs.delete(path, recursive)?;
    print_report(&report);
    match &report.holding_id {
        Some(id) => println!("Held as {} (restore with `aifs holding restore {}`).", id, id),
        None => println!("Moved to the system trash."),
    }
    Ok(())
}

pub fn mkdir(session: &Session, path: &str) -> anyhow::Result<()> {
    let report = session.fs.mkdir(path)?;
    print_report(&report);
    Ok(())
}

/// One line for the operation, one for its commit when there is one.
pub(crate) fn print_report(report: &OperationReport) {
    println!("{}", report.record.summary());
    if let Some(commit) = &report.commit {
        println!("  commit {}", commit);
    }
}
