//! Storage abstraction for medications and dose logs.
//!
//! Everything is keyed by user id. The calculators never see a repository;
//! callers load a snapshot and hand the lists over.

use crate::{Medication, MedicationLog, Result};
use std::collections::HashMap;
use uuid::Uuid;

/// Per-user storage of medications and the append-only dose log
pub trait MedicationRepository {
    /// All medications for a user, in stored order (empty if none)
    fn load_medications(&self, user_id: Uuid) -> Result<Vec<Medication>>;

    /// Replace the user's medication list
    fn save_medications(&mut self, user_id: Uuid, medications: &[Medication]) -> Result<()>;

    /// All dose logs for a user, in append order (empty if none)
    fn load_logs(&self, user_id: Uuid) -> Result<Vec<MedicationLog>>;

    /// Append one dose log
    fn append_log(&mut self, user_id: Uuid, log: &MedicationLog) -> Result<()>;
}

/// In-memory repository
#[derive(Clone, Debug, Default)]
pub struct InMemoryRepository {
    medications: HashMap<Uuid, Vec<Medication>>,
    logs: HashMap<Uuid, Vec<MedicationLog>>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

impl MedicationRepository for InMemoryRepository {
    fn load_medications(&self, user_id: Uuid) -> Result<Vec<Medication>> {
        Ok(self.medications.get(&user_id).cloned().unwrap_or_default())
    }

    fn save_medications(&mut self, user_id: Uuid, medications: &[Medication]) -> Result<()> {
        self.medications.insert(user_id, medications.to_vec());
        Ok(())
    }

    fn load_logs(&self, user_id: Uuid) -> Result<Vec<MedicationLog>> {
        Ok(self.logs.get(&user_id).cloned().unwrap_or_default())
    }

    fn append_log(&mut self, user_id: Uuid, log: &MedicationLog) -> Result<()> {
        self.logs.entry(user_id).or_default().push(log.clone());
        Ok(())
    }
}
