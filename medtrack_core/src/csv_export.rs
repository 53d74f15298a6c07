//! CSV export of the dose log.
//!
//! Appends log rows to a CSV file, writing the header only when the file is
//! new, and syncs the file before returning.

use crate::medications::find_medication;
use crate::{Medication, MedicationLog, Result};
use std::fs::OpenOptions;
use std::path::Path;

/// A row in the CSV output
#[derive(Debug, serde::Serialize)]
struct CsvRow<'a> {
    id: String,
    medication_id: String,
    medication_name: &'a str,
    scheduled_time: String,
    taken_at: String,
    notes: Option<&'a str>,
}

impl<'a> CsvRow<'a> {
    fn new(log: &'a MedicationLog, medications: &'a [Medication]) -> Self {
        CsvRow {
            id: log.id.to_string(),
            medication_id: log.medication_id.to_string(),
            // Empty for logs whose medication was deleted
            medication_name: find_medication(medications, log.medication_id)
                .map(|m| m.name.as_str())
                .unwrap_or(""),
            scheduled_time: log.scheduled_time.to_string(),
            taken_at: log.taken_at.to_rfc3339(),
            notes: log.notes.as_deref(),
        }
    }
}

/// Export dose logs to CSV
///
/// Returns the number of rows written.
pub fn export_logs(medications: &[Medication], logs: &[MedicationLog], csv_path: &Path) -> Result<usize> {
    if let Some(parent) = csv_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(csv_path)?;

    let needs_headers = file.metadata()?.len() == 0;

    let mut writer = csv::WriterBuilder::new()
        .has_headers(needs_headers)
        .from_writer(file);

    for log in logs {
        writer.serialize(CsvRow::new(log, medications))?;
    }

    writer.flush()?;
    let file = writer
        .into_inner()
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e.to_string()))?;
    file.sync_all()?;

    tracing::info!("Exported {} dose logs to {:?}", logs.len(), csv_path);
    Ok(logs.len())
}
