//! File-backed repository with file locking.
//!
//! Layout under the data directory:
//! - `users/<user_id>/medications.json` — the medication list, replaced
//!   atomically on every save
//! - `users/<user_id>/medication_logs.jsonl` — the append-only dose log

use crate::repository::MedicationRepository;
use crate::wal::JsonlLog;
use crate::{Error, Medication, MedicationLog, Result};
use fs2::FileExt;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use uuid::Uuid;

const MEDICATIONS_FILE: &str = "medications.json";
const LOGS_FILE: &str = "medication_logs.jsonl";

/// Repository rooted at a data directory
#[derive(Clone, Debug)]
pub struct FileRepository {
    data_dir: PathBuf,
}

impl FileRepository {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn user_dir(&self, user_id: Uuid) -> PathBuf {
        self.data_dir.join("users").join(user_id.to_string())
    }

    pub fn medications_path(&self, user_id: Uuid) -> PathBuf {
        self.user_dir(user_id).join(MEDICATIONS_FILE)
    }

    pub fn logs_path(&self, user_id: Uuid) -> PathBuf {
        self.user_dir(user_id).join(LOGS_FILE)
    }
}

impl MedicationRepository for FileRepository {
    fn load_medications(&self, user_id: Uuid) -> Result<Vec<Medication>> {
        Ok(read_json(&self.medications_path(user_id))?.unwrap_or_default())
    }

    fn save_medications(&mut self, user_id: Uuid, medications: &[Medication]) -> Result<()> {
        write_json_atomic(&self.medications_path(user_id), medications)?;
        tracing::info!(
            "Saved {} medications for user {}",
            medications.len(),
            user_id
        );
        Ok(())
    }

    fn load_logs(&self, user_id: Uuid) -> Result<Vec<MedicationLog>> {
        JsonlLog::new(self.logs_path(user_id)).read_all()
    }

    fn append_log(&mut self, user_id: Uuid, log: &MedicationLog) -> Result<()> {
        JsonlLog::new(self.logs_path(user_id)).append(log)
    }
}

/// Read a JSON document under a shared lock
///
/// Returns `None` if the file doesn't exist. A file that exists but fails
/// to parse is an error.
pub(crate) fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    if !path.exists() {
        tracing::debug!("No file at {:?}", path);
        return Ok(None);
    }

    let file = File::open(path)?;
    file.lock_shared()?;

    let mut contents = String::new();
    let read = std::io::BufReader::new(&file).read_to_string(&mut contents);
    file.unlock()?;
    read?;

    let value = serde_json::from_str(&contents).map_err(|e| {
        tracing::warn!("Failed to parse {:?}: {}", path, e);
        Error::Json(e)
    })?;
    tracing::debug!("Loaded {:?}", path);
    Ok(Some(value))
}

/// Write a JSON document atomically
///
/// Writes to a temp file in the same directory under an exclusive lock,
/// syncs it, then renames it over the target.
pub(crate) fn write_json_atomic<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let parent = path
        .parent()
        .ok_or_else(|| Error::Other(format!("{:?} has no parent directory", path)))?;
    std::fs::create_dir_all(parent)?;

    let temp = NamedTempFile::new_in(parent)?;
    temp.as_file().lock_exclusive()?;

    {
        let mut writer = std::io::BufWriter::new(temp.as_file());
        let contents = serde_json::to_string_pretty(value)?;
        writer.write_all(contents.as_bytes())?;
        writer.flush()?;
    }

    temp.as_file().sync_all()?;
    temp.as_file().unlock()?;

    temp.persist(path).map_err(|e| Error::Io(e.error))?;

    tracing::debug!("Wrote {:?}", path);
    Ok(())
}

/// Remove a file if it exists
pub(crate) fn remove_if_exists(path: &Path) -> Result<bool> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{DoseTime, Frequency};
    use chrono::Utc;

    fn create_test_medication(user_id: Uuid, name: &str) -> Medication {
        Medication {
            id: Uuid::new_v4(),
            name: name.into(),
            dosage: "5mg".into(),
            frequency: Frequency::Daily,
            time_to_take: vec![DoseTime::new(8, 0).unwrap(), DoseTime::new(20, 0).unwrap()],
            user_id,
            created_at: Utc::now(),
            is_active: true,
        }
    }

    #[test]
    fn test_save_and_load_medications() {
        let temp_dir = tempfile::tempdir().unwrap();
        let mut repo = FileRepository::new(temp_dir.path());
        let user = Uuid::new_v4();

        let meds = vec![
            create_test_medication(user, "Aspirin"),
            create_test_medication(user, "Vitamin D"),
        ];
        repo.save_medications(user, &meds).unwrap();

        let loaded = repo.load_medications(user).unwrap();
        assert_eq!(loaded, meds);
        assert!(repo.medications_path(user).exists());
    }

    #[test]
    fn test_missing_files_load_empty() {
        let temp_dir = tempfile::tempdir().unwrap();
        let repo = FileRepository::new(temp_dir.path());
        let user = Uuid::new_v4();

        assert!(repo.load_medications(user).unwrap().is_empty());
        assert!(repo.load_logs(user).unwrap().is_empty());
    }

    #[test]
    fn test_corrupted_medications_is_an_error() {
        let temp_dir = tempfile::tempdir().unwrap();
        let repo = FileRepository::new(temp_dir.path());
        let user = Uuid::new_v4();

        let path = repo.medications_path(user);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "{ invalid json }").unwrap();

        assert!(matches!(repo.load_medications(user), Err(Error::Json(_))));
    }

    #[test]
    fn test_append_and_load_logs() {
        let temp_dir = tempfile::tempdir().unwrap();
        let mut repo = FileRepository::new(temp_dir.path());
        let user = Uuid::new_v4();

        let log = MedicationLog {
            id: Uuid::new_v4(),
            medication_id: Uuid::new_v4(),
            user_id: user,
            taken_at: Utc::now(),
            scheduled_time: DoseTime::new(8, 0).unwrap(),
            notes: None,
        };
        repo.append_log(user, &log).unwrap();
        repo.append_log(user, &log).unwrap();

        assert_eq!(repo.load_logs(user).unwrap().len(), 2);
        assert!(repo.load_logs(Uuid::new_v4()).unwrap().is_empty());
    }

    #[test]
    fn test_atomic_save_leaves_no_temp_files() {
        let temp_dir = tempfile::tempdir().unwrap();
        let mut repo = FileRepository::new(temp_dir.path());
        let user = Uuid::new_v4();

        repo.save_medications(user, &[create_test_medication(user, "A")])
            .unwrap();
        repo.save_medications(user, &[]).unwrap();

        let entries: Vec<_> = std::fs::read_dir(repo.user_dir(user))
            .unwrap()
            .filter_map(|e| e.ok())
            .map(|e| e.file_name())
            .collect();
        assert_eq!(entries, vec![std::ffi::OsString::from(MEDICATIONS_FILE)]);
        assert!(repo.load_medications(user).unwrap().is_empty());
    }

    #[test]
    fn test_remove_if_exists() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("session.json");

        assert!(!remove_if_exists(&path).unwrap());
        std::fs::write(&path, "{}").unwrap();
        assert!(remove_if_exists(&path).unwrap());
        assert!(!path.exists());
    }
}
