//! Medication mutators and dose logging.
//!
//! These are the only functions that write through a repository. They load
//! the user's full list, change it and save it back; last write wins.

use crate::repository::MedicationRepository;
use crate::{DoseTime, Error, Frequency, Medication, MedicationLog, Result};
use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use uuid::Uuid;

/// Hourly slots offered by the time picker, 06:00 through 22:00
pub static DEFAULT_TIME_OPTIONS: Lazy<Vec<DoseTime>> =
    Lazy::new(|| (6..=22).filter_map(|hour| DoseTime::new(hour, 0)).collect());

/// Editable fields of a medication
#[derive(Clone, Debug, PartialEq)]
pub struct MedicationDraft {
    pub name: String,
    pub dosage: String,
    pub frequency: Frequency,
    pub time_to_take: Vec<DoseTime>,
    pub is_active: bool,
}

impl Default for MedicationDraft {
    fn default() -> Self {
        Self {
            name: String::new(),
            dosage: String::new(),
            frequency: Frequency::Daily,
            time_to_take: DoseTime::new(8, 0).into_iter().collect(),
            is_active: true,
        }
    }
}

impl MedicationDraft {
    /// Start a draft from an existing medication (edit form)
    pub fn from_medication(medication: &Medication) -> Self {
        Self {
            name: medication.name.clone(),
            dosage: medication.dosage.clone(),
            frequency: medication.frequency,
            time_to_take: medication.time_to_take.clone(),
            is_active: medication.is_active,
        }
    }

    /// Check required fields
    ///
    /// Returns every problem found, empty if the draft is valid.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.name.trim().is_empty() {
            errors.push("Medication name is required".to_string());
        }
        if self.dosage.trim().is_empty() {
            errors.push("Dosage is required".to_string());
        }
        if self.time_to_take.is_empty() {
            errors.push("At least one time is required".to_string());
        }

        errors
    }

    fn validated(mut self) -> Result<Self> {
        let errors = self.validate();
        if !errors.is_empty() {
            return Err(Error::Validation(errors.join("; ")));
        }

        self.name = self.name.trim().to_string();
        self.dosage = self.dosage.trim().to_string();
        self.time_to_take.sort();
        self.time_to_take.dedup();
        Ok(self)
    }
}

/// Check or uncheck a slot, keeping the list sorted and unique
pub fn toggle_time(times: &mut Vec<DoseTime>, time: DoseTime, checked: bool) {
    if checked {
        if !times.contains(&time) {
            times.push(time);
            times.sort();
        }
    } else {
        times.retain(|t| *t != time);
    }
}

/// Register a new medication for a user
pub fn add_medication<R: MedicationRepository + ?Sized>(
    repo: &mut R,
    user_id: Uuid,
    draft: MedicationDraft,
    now: DateTime<Utc>,
) -> Result<Medication> {
    let draft = draft.validated()?;
    let mut medications = repo.load_medications(user_id)?;

    let medication = Medication {
        id: Uuid::new_v4(),
        name: draft.name,
        dosage: draft.dosage,
        frequency: draft.frequency,
        time_to_take: draft.time_to_take,
        user_id,
        created_at: now,
        is_active: draft.is_active,
    };

    medications.push(medication.clone());
    repo.save_medications(user_id, &medications)?;

    tracing::info!("Added medication {} ({})", medication.name, medication.id);
    Ok(medication)
}

/// Replace the editable fields of an existing medication
///
/// `id`, `user_id` and `created_at` are kept.
pub fn update_medication<R: MedicationRepository + ?Sized>(
    repo: &mut R,
    user_id: Uuid,
    medication_id: Uuid,
    draft: MedicationDraft,
) -> Result<Medication> {
    let draft = draft.validated()?;
    let mut medications = repo.load_medications(user_id)?;

    let medication = medications
        .iter_mut()
        .find(|m| m.id == medication_id)
        .ok_or_else(|| Error::NotFound(format!("medication {}", medication_id)))?;

    medication.name = draft.name;
    medication.dosage = draft.dosage;
    medication.frequency = draft.frequency;
    medication.time_to_take = draft.time_to_take;
    medication.is_active = draft.is_active;
    let updated = medication.clone();

    repo.save_medications(user_id, &medications)?;

    tracing::info!("Updated medication {} ({})", updated.name, updated.id);
    Ok(updated)
}

/// Delete a medication
///
/// Its dose logs stay in the log and become orphaned.
pub fn delete_medication<R: MedicationRepository + ?Sized>(
    repo: &mut R,
    user_id: Uuid,
    medication_id: Uuid,
) -> Result<Medication> {
    let mut medications = repo.load_medications(user_id)?;

    let index = medications
        .iter()
        .position(|m| m.id == medication_id)
        .ok_or_else(|| Error::NotFound(format!("medication {}", medication_id)))?;
    let removed = medications.remove(index);

    repo.save_medications(user_id, &medications)?;

    tracing::info!("Deleted medication {} ({})", removed.name, removed.id);
    Ok(removed)
}

/// Record a dose as taken
///
/// The medication is not looked up; the log only references it by id.
pub fn mark_taken<R: MedicationRepository + ?Sized>(
    repo: &mut R,
    user_id: Uuid,
    medication_id: Uuid,
    scheduled_time: DoseTime,
    notes: Option<String>,
    now: DateTime<Utc>,
) -> Result<MedicationLog> {
    let log = MedicationLog {
        id: Uuid::new_v4(),
        medication_id,
        user_id,
        taken_at: now,
        scheduled_time,
        notes: notes.filter(|n| !n.trim().is_empty()),
    };

    repo.append_log(user_id, &log)?;

    tracing::info!(
        "Marked medication {} taken for {} slot",
        medication_id,
        scheduled_time
    );
    Ok(log)
}

/// Resolve a log's weak medication reference
pub fn find_medication(medications: &[Medication], medication_id: Uuid) -> Option<&Medication> {
    medications.iter().find(|m| m.id == medication_id)
}

/// Logs whose medication no longer exists
pub fn orphaned_logs<'a>(
    medications: &[Medication],
    logs: &'a [MedicationLog],
) -> Vec<&'a MedicationLog> {
    logs.iter()
        .filter(|log| find_medication(medications, log.medication_id).is_none())
        .collect()
}
