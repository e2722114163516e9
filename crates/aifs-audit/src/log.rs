// log.rs - Append-only JSONL audit log, rotated by day.
//
// Events are written to `<dir>/audit-YYYY-MM-DD.jsonl`, one JSON object per
// line, choosing the file from the event's own UTC timestamp. Within a day
// file each event carries the SHA-256 of the previous raw line, so inserting,
// deleting or editing a line breaks the chain. A new day starts a new chain.

use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::NaiveDate;

use crate::error::AuditError;
use crate::event::AuditEvent;
use crate::hasher;

const FILE_PREFIX: &str = "audit-";
const FILE_SUFFIX: &str = ".jsonl";

struct DayFile {
    day: NaiveDate,
    writer: BufWriter<File>,
    path: PathBuf,
    last_hash: Option<String>,
}

/// An append-only audit log backed by one JSONL file per day.
pub struct AuditLog {
    dir: PathBuf,
    current: Option<DayFile>,
}

impl AuditLog {
    /// Open (or create) the audit directory. Day files are opened lazily on
    /// the first append.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self, AuditError> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir).map_err(|source| AuditError::OpenFailed {
            path: dir.clone(),
            source,
        })?;
        Ok(Self { dir, current: None })
    }

    /// Append an event, linking it to the previous line of its day file.
    /// Flushes after every event.
    pub fn append(&mut self, event: &mut AuditEvent) -> Result<(), AuditError> {
        let day = event.record.timestamp.date_naive();
        let day_file = self.day_file(day)?;

        event.previous_hash = day_file.last_hash.clone();
        let json = serde_json::to_string(event)?;
        day_file.last_hash = Some(hasher::hash_str(&json));

        writeln!(day_file.writer, "{}", json)?;
        day_file.writer.flush()?;
        Ok(())
    }

    /// The audit directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the file holding a given day's events.
    pub fn path_for_day(dir: &Path, day: NaiveDate) -> PathBuf {
        dir.join(format!("{}{}{}", FILE_PREFIX, day.format("%Y-%m-%d"), FILE_SUFFIX))
    }

    /// All day files in `dir`, oldest first.
    pub fn day_files(dir: impl AsRef<Path>) -> Result<Vec<PathBuf>, AuditError> {
        let dir = dir.as_ref();
        if !dir.exists() {
            return Ok(Vec::new());
        }
        let entries = fs::read_dir(dir).map_err(|source| AuditError::OpenFailed {
            path: dir.to_path_buf(),
            source,
        })?;

        let mut files = Vec::new();
        for entry in entries {
            let path = entry?.path();
            let is_day_file = path
                .file_name()
                .and_then(|n| n.to_str())
                .map(|n| n.starts_with(FILE_PREFIX) && n.ends_with(FILE_SUFFIX))
                .unwrap_or(false);
            if is_day_file {
                files.push(path);
            }
        }
        // ISO dates sort chronologically as strings.
        files.sort();
        Ok(files)
    }

    /// Read all events from one day file, in order.
    pub fn read_file(path: impl AsRef<Path>) -> Result<Vec<AuditEvent>, AuditError> {
        let reader = open_reader(path.as_ref())?;
        let mut events = Vec::new();
        for line in reader.lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            events.push(serde_json::from_str(&line)?);
        }
        Ok(events)
    }

    /// Read every event in the directory, oldest day first.
    pub fn read_all(dir: impl AsRef<Path>) -> Result<Vec<AuditEvent>, AuditError> {
        let mut events = Vec::new();
        for path in Self::day_files(dir)? {
            events.extend(Self::read_file(&path)?);
        }
        Ok(events)
    }

    /// Verify the hash chain of a single day file. Returns the number of
    /// events checked.
    pub fn verify_file(path: impl AsRef<Path>) -> Result<usize, AuditError> {
        let path = path.as_ref();
        let reader = open_reader(path)?;
        let mut previous_hash: Option<String> = None;
        let mut count = 0;

        for (line_num, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let event: AuditEvent = serde_json::from_str(&line)?;
            if event.previous_hash != previous_hash {
                return Err(AuditError::IntegrityViolation {
                    path: path.to_path_buf(),
                    line: line_num + 1,
                    expected: previous_hash.unwrap_or_else(|| "None".to_string()),
                    actual: event.previous_hash.unwrap_or_else(|| "None".to_string()),
                });
            }
            // Hash the raw line; re-serializing could reorder fields.
            previous_hash = Some(hasher::hash_str(&line));
            count += 1;
        }
        Ok(count)
    }

    /// Verify every day file in the directory. Returns the total number of
    /// events checked.
    pub fn verify_all(dir: impl AsRef<Path>) -> Result<usize, AuditError> {
        let mut total = 0;
        for path in Self::day_files(dir)? {
            total += Self::verify_file(&path)?;
        }
        Ok(total)
    }

    fn day_file(&mut self, day: NaiveDate) -> Result<&mut DayFile, AuditError> {
        let stale = self.current.as_ref().map(|c| c.day != day).unwrap_or(true);
        if stale {
            let path = Self::path_for_day(&self.dir, day);
            let last_hash = if path.exists() {
                read_last_hash(&path)?
            } else {
                None
            };
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&path)
                .map_err(|source| AuditError::OpenFailed {
                    path: path.clone(),
                    source,
                })?;
            tracing::debug!(path = %path.display(), "audit day file opened");
            self.current = Some(DayFile {
                day,
                writer: BufWriter::new(file),
                path,
                last_hash,
            });
        }
        match self.current.as_mut() {
            Some(current) => Ok(current),
            None => unreachable!("day file initialised above"),
        }
    }

    /// Path of the day file currently open for appends, if any.
    pub fn current_path(&self) -> Option<&Path> {
        self.current.as_ref().map(|c| c.path.as_path())
    }
}

fn open_reader(path: &Path) -> Result<BufReader<File>, AuditError> {
    let file = File::open(path).map_err(|source| AuditError::OpenFailed {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(BufReader::new(file))
}

fn read_last_hash(path: &Path) -> Result<Option<String>, AuditError> {
    let reader = open_reader(path)?;
    let mut last_line: Option<String> = None;
    for line in reader.lines() {
        let line = line?;
        if !line.trim().is_empty() {
            last_line = Some(line);
        }
    }
    Ok(last_line.map(|line| hasher::hash_str(&line)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{OperationKind, OperationRecord};
    use chrono::{TimeZone, Utc};
    use tempfile::tempdir;

    fn event(kind: OperationKind) -> AuditEvent {
        AuditEvent::new(OperationRecord::success("tester", kind, vec!["a.txt".into()]))
    }

    fn event_on(year: i32, month: u32, day: u32) -> AuditEvent {
        let mut e = event(OperationKind::Write);
        e.record.timestamp = Utc.with_ymd_and_hms(year, month, day, 12, 0, 0).unwrap();
        e
    }

    #[test]
    fn append_and_read_round_trip() {
        let dir = tempdir().unwrap();
        {
            let mut log = AuditLog::open(dir.path()).unwrap();
            log.append(&mut event(OperationKind::Write)).unwrap();
            log.append(&mut event(OperationKind::Read)).unwrap();
        }

        let events = AuditLog::read_all(dir.path()).unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].record.kind, OperationKind::Write);
        assert_eq!(events[1].record.kind, OperationKind::Read);
        assert!(events[0].previous_hash.is_none());
        assert!(events[1].previous_hash.is_some());
    }

    #[test]
    fn events_rotate_by_day() {
        let dir = tempdir().unwrap();
        let mut log = AuditLog::open(dir.path()).unwrap();
        log.append(&mut event_on(2026, 3, 1)).unwrap();
        log.append(&mut event_on(2026, 3, 1)).unwrap();
        log.append(&mut event_on(2026, 3, 2)).unwrap();

        let files = AuditLog::day_files(dir.path()).unwrap();
        assert_eq!(files.len(), 2);
        assert!(files[0].ends_with("audit-2026-03-01.jsonl"));
        assert!(files[1].ends_with("audit-2026-03-02.jsonl"));

        // Each day starts its own chain.
        let second_day = AuditLog::read_file(&files[1]).unwrap();
        assert!(second_day[0].previous_hash.is_none());
        assert_eq!(AuditLog::verify_all(dir.path()).unwrap(), 3);
    }

    #[test]
    fn reopen_continues_chain() {
        let dir = tempdir().unwrap();
        {
            let mut log = AuditLog::open(dir.path()).unwrap();
            log.append(&mut event_on(2026, 5, 4)).unwrap();
        }
        {
            let mut log = AuditLog::open(dir.path()).unwrap();
            log.append(&mut event_on(2026, 5, 4)).unwrap();
        }
        assert_eq!(AuditLog::verify_all(dir.path()).unwrap(), 2);
    }

    #[test]
    fn tampering_is_detected() {
        let dir = tempdir().unwrap();
        {
            let mut log = AuditLog::open(dir.path()).unwrap();
            for _ in 0..3 {
                log.append(&mut event_on(2026, 1, 9)).unwrap();
            }
        }
        let path = AuditLog::path_for_day(dir.path(), NaiveDate::from_ymd_opt(2026, 1, 9).unwrap());
        let content = fs::read_to_string(&path).unwrap();
        let mut lines: Vec<&str> = content.lines().collect();
        lines.remove(1);
        fs::write(&path, lines.join("\n")).unwrap();

        let result = AuditLog::verify_file(&path);
        assert!(matches!(result, Err(AuditError::IntegrityViolation { line: 2, .. })));
    }

    #[test]
    fn missing_dir_reads_empty() {
        let dir = tempdir().unwrap();
        let events = AuditLog::read_all(dir.path().join("absent")).unwrap();
        assert!(events.is_empty());
    }
}
