//! Today's dose schedule.
//!
//! Expands every medication's time slots into dose entries for the current
//! calendar day and marks the ones that already have a matching log.

use crate::{DoseEntry, DoseTime, Medication, MedicationLog};
use chrono::{DateTime, TimeZone};

/// Expand the medication list into today's doses
///
/// Entries follow medication order, then each medication's stored slot
/// order. Inactive medications are included.
///
/// A dose counts as taken when a log for the same medication and slot was
/// recorded on the same calendar day as `now`, evaluated in `now`'s time
/// zone.
pub fn expand_today<'a, Tz: TimeZone>(
    medications: &'a [Medication],
    logs: &[MedicationLog],
    now: &DateTime<Tz>,
) -> Vec<DoseEntry<'a>> {
    let today = now.date_naive();
    let tz = now.timezone();

    let mut entries = Vec::new();
    for medication in medications {
        for &time in &medication.time_to_take {
            let taken = logs.iter().any(|log| {
                log.medication_id == medication.id
                    && log.scheduled_time == time
                    && log.taken_at.with_timezone(&tz).date_naive() == today
            });
            entries.push(DoseEntry {
                medication,
                time,
                taken,
            });
        }
    }

    tracing::debug!(
        "Expanded {} medications into {} doses for {}",
        medications.len(),
        entries.len(),
        today
    );

    entries
}

/// Doses that still need to be marked as taken
pub fn pending_doses<'a, 'b>(entries: &'b [DoseEntry<'a>]) -> Vec<&'b DoseEntry<'a>> {
    entries.iter().filter(|entry| !entry.taken).collect()
}

/// Whether the given slot is part of today's schedule for a medication
pub fn is_scheduled(medication: &Medication, time: DoseTime) -> bool {
    medication.time_to_take.contains(&time)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Frequency;
    use chrono::{Duration, FixedOffset, Utc};
    use uuid::Uuid;

    fn time(s: &str) -> DoseTime {
        s.parse().unwrap()
    }

    fn create_test_medication(times: &[&str]) -> Medication {
        Medication {
            id: Uuid::new_v4(),
            name: "Metformin".into(),
            dosage: "500mg".into(),
            frequency: Frequency::TwiceDaily,
            time_to_take: times.iter().map(|t| time(t)).collect(),
            user_id: Uuid::new_v4(),
            created_at: Utc::now(),
            is_active: true,
        }
    }

    fn create_test_log(med: &Medication, slot: &str, taken_at: DateTime<Utc>) -> MedicationLog {
        MedicationLog {
            id: Uuid::new_v4(),
            medication_id: med.id,
            user_id: med.user_id,
            taken_at,
            scheduled_time: time(slot),
            notes: None,
        }
    }

    fn noon() -> DateTime<Utc> {
        "2024-03-10T12:00:00Z".parse().unwrap()
    }

    #[test]
    fn test_no_logs_means_nothing_taken() {
        let meds = vec![create_test_medication(&["08:00", "20:00"])];

        let entries = expand_today(&meds, &[], &noon());

        assert_eq!(entries.len(), 2);
        assert!(entries.iter().all(|e| !e.taken));
        assert_eq!(entries[0].time, time("08:00"));
        assert_eq!(entries[1].time, time("20:00"));
    }

    #[test]
    fn test_log_today_marks_matching_slot_only() {
        let meds = vec![create_test_medication(&["08:00", "20:00"])];
        let logs = vec![create_test_log(&meds[0], "08:00", noon() - Duration::hours(3))];

        let entries = expand_today(&meds, &logs, &noon());

        assert!(entries[0].taken);
        assert!(!entries[1].taken);
    }

    #[test]
    fn test_yesterdays_log_does_not_count() {
        let meds = vec![create_test_medication(&["08:00"])];
        // Less than 24h ago but on the previous calendar day
        let logs = vec![create_test_log(&meds[0], "08:00", noon() - Duration::hours(13))];

        let entries = expand_today(&meds, &logs, &noon());

        assert!(!entries[0].taken);
    }

    #[test]
    fn test_log_for_other_medication_is_ignored() {
        let meds = vec![
            create_test_medication(&["08:00"]),
            create_test_medication(&["08:00"]),
        ];
        let logs = vec![create_test_log(&meds[1], "08:00", noon())];

        let entries = expand_today(&meds, &logs, &noon());

        assert!(!entries[0].taken);
        assert!(entries[1].taken);
    }

    #[test]
    fn test_calendar_day_uses_now_timezone() {
        let meds = vec![create_test_medication(&["22:00"])];
        // 23:30 in UTC-05:00 is 04:30 the next day in UTC
        let tz = FixedOffset::west_opt(5 * 3600).unwrap();
        let now = tz.with_ymd_and_hms(2024, 3, 10, 23, 45, 0).unwrap();
        let taken_at = tz
            .with_ymd_and_hms(2024, 3, 10, 23, 30, 0)
            .unwrap()
            .with_timezone(&Utc);
        let logs = vec![create_test_log(&meds[0], "22:00", taken_at)];

        let entries = expand_today(&meds, &logs, &now);
        assert!(entries[0].taken);

        let entries_utc = expand_today(&meds, &logs, &now.with_timezone(&Utc));
        assert!(entries_utc[0].taken);

        let morning_utc: DateTime<Utc> = "2024-03-10T23:00:00Z".parse().unwrap();
        let entries_prev = expand_today(&meds, &logs, &morning_utc);
        assert!(!entries_prev[0].taken);
    }

    #[test]
    fn test_inactive_medications_are_included() {
        let mut inactive = create_test_medication(&["09:00"]);
        inactive.is_active = false;
        let meds = vec![create_test_medication(&["08:00"]), inactive];

        let entries = expand_today(&meds, &[], &noon());

        assert_eq!(entries.len(), 2);
        assert_eq!(entries[1].medication.id, meds[1].id);
    }

    #[test]
    fn test_entry_count_matches_total_slots() {
        let meds = vec![
            create_test_medication(&["08:00", "14:00", "20:00"]),
            create_test_medication(&[]),
            create_test_medication(&["07:00"]),
        ];
        let logs = vec![create_test_log(&meds[0], "14:00", noon())];

        let entries = expand_today(&meds, &logs, &noon());

        let expected: usize = meds.iter().map(|m| m.time_to_take.len()).sum();
        assert_eq!(entries.len(), expected);
        assert_eq!(entries, expand_today(&meds, &logs, &noon()));
    }

    #[test]
    fn test_pending_doses() {
        let meds = vec![create_test_medication(&["08:00", "20:00"])];
        let logs = vec![create_test_log(&meds[0], "20:00", noon())];

        let entries = expand_today(&meds, &logs, &noon());
        let pending = pending_doses(&entries);

        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].time, time("08:00"));
        assert!(is_scheduled(&meds[0], time("20:00")));
        assert!(!is_scheduled(&meds[0], time("12:00")));
    }
}
