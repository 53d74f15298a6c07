//! Append-only dose log on disk.
//!
//! One JSON object per line. Writers hold an exclusive `fs2` lock and
//! readers a shared one, so several `medtrack` processes can share a file.

use crate::{MedicationLog, Result};
use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

/// JSONL-based dose log with file locking
pub struct JsonlLog {
    path: PathBuf,
}

impl JsonlLog {
    /// Create a new JSONL log for the given path
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one entry as a single line under an exclusive lock
    pub fn append(&self, log: &MedicationLog) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;

        file.lock_exclusive()?;

        // One write per entry so concurrent appenders never interleave
        let mut line = serde_json::to_string(log)?;
        line.push('\n');
        (&file).write_all(line.as_bytes())?;

        file.unlock()?;

        tracing::debug!("Appended dose log {} to {:?}", log.id, self.path);
        Ok(())
    }

    /// Read every entry, skipping lines that fail to parse
    pub fn read_all(&self) -> Result<Vec<MedicationLog>> {
        read_logs(&self.path)
    }
}

/// Read all dose logs from a JSONL file
///
/// A missing file is an empty log.
pub fn read_logs(path: &Path) -> Result<Vec<MedicationLog>> {
    if !path.exists() {
        return Ok(Vec::new());
    }

    let file = File::open(path)?;
    file.lock_shared()?;

    let mut logs = Vec::new();
    for (index, line) in BufReader::new(&file).lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }

        match serde_json::from_str::<MedicationLog>(&line) {
            Ok(log) => logs.push(log),
            Err(e) => {
                tracing::warn!(
                    "Skipping malformed dose log at {:?} line {}: {}",
                    path,
                    index + 1,
                    e
                );
            }
        }
    }

    file.unlock()?;
    tracing::debug!("Read {} dose logs from {:?}", logs.len(), path);
    Ok(logs)
}
