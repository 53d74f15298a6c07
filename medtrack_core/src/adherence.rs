//! Weekly adherence and streak calculation.
//!
//! Both calculations work on a snapshot of the medication list and the dose
//! log and never touch storage:
//! - Expected doses assume every medication ran for the full trailing week
//! - Taken doses are all logs at or after `now - 7 days` (no upper bound)
//! - The streak is a coarse proxy: the log count capped at 7, as long as
//!   the latest log is at most one day old

use crate::{AdherenceStats, Medication, MedicationLog};
use chrono::{DateTime, Days, Duration, TimeZone, Utc};

/// Length of the trailing adherence window
pub const WINDOW_DAYS: u64 = 7;

/// Upper bound for the streak
pub const STREAK_CAP: u32 = 7;

/// Expected vs. logged doses over the trailing week
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Adherence {
    pub total_doses: u32,
    pub taken_doses: u32,
    pub percentage: u32,
}

/// Compute weekly adherence
///
/// The window starts seven calendar days before `now`, at the same time of
/// day. Every medication contributes `slots * 7` expected doses whether or
/// not it is active or existed for the whole week.
pub fn compute_adherence<Tz: TimeZone>(
    medications: &[Medication],
    logs: &[MedicationLog],
    now: &DateTime<Tz>,
) -> Adherence {
    if medications.is_empty() {
        return Adherence::default();
    }

    let total_doses: u32 = medications
        .iter()
        .map(|m| m.time_to_take.len() as u32 * WINDOW_DAYS as u32)
        .sum();

    let start_of_week = window_start(now);
    let taken_doses = logs
        .iter()
        .filter(|log| log.taken_at >= start_of_week)
        .count() as u32;

    let percentage = percentage_of(taken_doses, total_doses);

    tracing::debug!(
        "Adherence since {}: {}/{} doses ({}%)",
        start_of_week,
        taken_doses,
        total_doses,
        percentage
    );

    Adherence {
        total_doses,
        taken_doses,
        percentage,
    }
}

/// Compute the streak from the dose log
///
/// Returns `min(logs, 7)` when the most recent log is at most one whole day
/// before `now` (partial days truncate), otherwise 0.
pub fn compute_streak<Tz: TimeZone>(logs: &[MedicationLog], now: &DateTime<Tz>) -> u32 {
    let mut sorted: Vec<&MedicationLog> = logs.iter().collect();
    sorted.sort_by(|a, b| b.taken_at.cmp(&a.taken_at));

    let Some(last_log) = sorted.first() else {
        return 0;
    };

    let days_diff = (now.with_timezone(&Utc) - last_log.taken_at).num_days();
    if days_diff <= 1 {
        (sorted.len() as u32).min(STREAK_CAP)
    } else {
        tracing::debug!("Last dose was {} days ago, streak reset", days_diff);
        0
    }
}

/// Full dashboard statistics
///
/// With no medications every field is zero, including the streak.
pub fn adherence_stats<Tz: TimeZone>(
    medications: &[Medication],
    logs: &[MedicationLog],
    now: &DateTime<Tz>,
) -> AdherenceStats {
    if medications.is_empty() {
        return AdherenceStats::default();
    }

    let adherence = compute_adherence(medications, logs, now);
    AdherenceStats {
        total_doses: adherence.total_doses,
        taken_doses: adherence.taken_doses,
        percentage: adherence.percentage,
        streak: compute_streak(logs, now),
    }
}

fn window_start<Tz: TimeZone>(now: &DateTime<Tz>) -> DateTime<Utc> {
    now.clone()
        .checked_sub_days(Days::new(WINDOW_DAYS))
        .map(|start| start.with_timezone(&Utc))
        .unwrap_or_else(|| now.with_timezone(&Utc) - Duration::days(WINDOW_DAYS as i64))
}

// Rounded half-up; more logs than expected doses still reads as 100%.
fn percentage_of(taken: u32, total: u32) -> u32 {
    if total == 0 {
        return 0;
    }
    let pct = (f64::from(taken) / f64::from(total) * 100.0).round() as u32;
    pct.min(100)
}
