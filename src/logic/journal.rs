//! Outcome Journal
//!
//! Append-only JSONL file of every item outcome, one line per item, tagged
//! with the batch run id. Rotates to a new file past a size limit.

use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::logic::pipeline::ItemOutcome;

// ============================================================================
// CONSTANTS
// ============================================================================

/// Maximum file size before rotation (50 MB)
const MAX_FILE_SIZE: u64 = 50 * 1024 * 1024;

/// Journal file extension
const JOURNAL_EXT: &str = "jsonl";

// ============================================================================
// ENTRY
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JournalEntry {
    pub run_id: Uuid,
    pub recorded_at: String,
    #[serde(flatten)]
    pub outcome: ItemOutcome,
}

// ============================================================================
// JOURNAL
// ============================================================================

pub struct Journal {
    writer: BufWriter<File>,
    current_file: PathBuf,
    current_size: u64,
    max_file_size: u64,
    base_dir: PathBuf,
    sequence: u32,
    entries_written: u64,
}

impl Journal {
    /// Open a fresh journal file in `base_dir`
    pub fn new(base_dir: impl Into<PathBuf>) -> std::io::Result<Self> {
        let base_dir = base_dir.into();
        std::fs::create_dir_all(&base_dir)?;
        let (file_path, file) = Self::open_new_file(&base_dir, 0)?;

        Ok(Self {
            writer: BufWriter::new(file),
            current_file: file_path,
            current_size: 0,
            max_file_size: MAX_FILE_SIZE,
            base_dir,
            sequence: 0,
            entries_written: 0,
        })
    }

    pub fn with_max_file_size(mut self, bytes: u64) -> Self {
        self.max_file_size = bytes;
        self
    }

    fn open_new_file(base_dir: &Path, sequence: u32) -> std::io::Result<(PathBuf, File)> {
        let filename = format!(
            "journal_{}_{:03}.{}",
            Utc::now().format("%Y_%m_%d_%H%M%S"),
            sequence,
            JOURNAL_EXT
        );
        let file_path = base_dir.join(filename);

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&file_path)?;

        tracing::info!(path = %file_path.display(), "Opened outcome journal");
        Ok((file_path, file))
    }

    /// Append one outcome
    pub fn record(&mut self, run_id: Uuid, outcome: &ItemOutcome) -> std::io::Result<()> {
        let entry = JournalEntry {
            run_id,
            recorded_at: Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true),
            outcome: outcome.clone(),
        };
        let line = serde_json::to_string(&entry)?;
        let bytes = line.as_bytes();

        if self.current_size > 0 && self.current_size + bytes.len() as u64 + 1 > self.max_file_size {
            self.rotate()?;
        }

        self.writer.write_all(bytes)?;
        self.writer.write_all(b"\n")?;
        self.current_size += bytes.len() as u64 + 1;
        self.writer.flush()?;

        self.entries_written += 1;
        Ok(())
    }

    fn rotate(&mut self) -> std::io::Result<()> {
        self.writer.flush()?;

        self.sequence += 1;
        let (new_path, new_file) = Self::open_new_file(&self.base_dir, self.sequence)?;
        self.writer = BufWriter::new(new_file);

        tracing::info!(from = %self.current_file.display(), to = %new_path.display(), "Rotated journal");
        self.current_file = new_path;
        self.current_size = 0;
        Ok(())
    }

    pub fn current_file(&self) -> &Path {
        &self.current_file
    }

    pub fn entries_written(&self) -> u64 {
        self.entries_written
    }

    pub fn flush(&mut self) -> std::io::Result<()> {
        self.writer.flush()
    }
}

// ============================================================================
// QUERY API
// ============================================================================

/// Read every parsable entry from a journal file
pub fn read_entries(file_path: &Path) -> std::io::Result<Vec<JournalEntry>> {
    let reader = BufReader::new(File::open(file_path)?);
    let mut entries = Vec::new();

    for line in reader.lines() {
        let line = line?;
        if line.is_empty() {
            continue;
        }
        match serde_json::from_str::<JournalEntry>(&line) {
            Ok(entry) => entries.push(entry),
            Err(e) => tracing::warn!(path = %file_path.display(), error = %e, "Skipping bad journal line"),
        }
    }

    Ok(entries)
}

/// Journal files in `dir`, oldest first
pub fn list_journal_files(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    if dir.is_dir() {
        for entry in std::fs::read_dir(dir)? {
            let path = entry?.path();
            if path.extension().map_or(false, |e| e == JOURNAL_EXT) {
                files.push(path);
            }
        }
    }

    // Names carry the timestamp and sequence
    files.sort();
    Ok(files)
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::error::ErrorKind;
    use tempfile::TempDir;

    fn failed(index: usize) -> ItemOutcome {
        let mut o = ItemOutcome::pending(index);
        o.fail(ErrorKind::Validation, "Missing required fields: protocol");
        o
    }

    #[test]
    fn test_journal_creation() {
        let temp_dir = TempDir::new().unwrap();
        let journal = Journal::new(temp_dir.path()).unwrap();
        assert!(journal.current_file().exists());
        assert_eq!(journal.entries_written(), 0);
    }

    #[test]
    fn test_record_and_read_back() {
        let temp_dir = TempDir::new().unwrap();
        let mut journal = Journal::new(temp_dir.path()).unwrap();
        let run_id = Uuid::new_v4();

        journal.record(run_id, &failed(0)).unwrap();
        journal.record(run_id, &failed(1)).unwrap();

        let entries = read_entries(journal.current_file()).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[1].run_id, run_id);
        assert_eq!(entries[1].outcome.index, 1);
        assert_eq!(entries[0].outcome.error_kind, Some(ErrorKind::Validation));
    }

    #[test]
    fn test_jsonl_format() {
        let temp_dir = TempDir::new().unwrap();
        let mut journal = Journal::new(temp_dir.path()).unwrap();
        for i in 0..3 {
            journal.record(Uuid::new_v4(), &failed(i)).unwrap();
        }

        let content = std::fs::read_to_string(journal.current_file()).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 3);
        for line in lines {
            let v: serde_json::Value = serde_json::from_str(line).unwrap();
            assert!(v.get("run_id").is_some());
            assert_eq!(v["success"], false);
        }
    }

    #[test]
    fn test_rotation_splits_files() {
        let temp_dir = TempDir::new().unwrap();
        let mut journal = Journal::new(temp_dir.path()).unwrap().with_max_file_size(64);

        for i in 0..3 {
            journal.record(Uuid::new_v4(), &failed(i)).unwrap();
        }

        let files = list_journal_files(temp_dir.path()).unwrap();
        assert_eq!(files.len(), 3);

        let total: usize = files.iter().map(|f| read_entries(f).unwrap().len()).sum();
        assert_eq!(total, 3);
        assert_eq!(journal.entries_written(), 3);
    }

    #[test]
    fn test_list_ignores_other_files() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(temp_dir.path().join("notes.txt"), "x").unwrap();
        let _journal = Journal::new(temp_dir.path()).unwrap();

        assert_eq!(list_journal_files(temp_dir.path()).unwrap().len(), 1);
    }
}
