//! Core domain types for MedTrack.
//!
//! This module defines the fundamental types used throughout the system:
//! - Medications, their frequency and scheduled time slots
//! - Dose logs (append-only)
//! - Derived schedule entries and adherence statistics
//! - Users and roles

use chrono::{DateTime, NaiveTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

// ============================================================================
// Frequency
// ============================================================================

/// How often a medication is meant to be taken.
///
/// Informational only: expected doses are derived from the scheduled
/// time slots, never from the frequency.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum Frequency {
    #[default]
    Daily,
    TwiceDaily,
    ThreeTimesDaily,
    Weekly,
    AsNeeded,
}

impl FromStr for Frequency {
    type Err = crate::Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        match s.trim().to_lowercase().replace('_', "-").as_str() {
            "daily" => Ok(Self::Daily),
            "twice-daily" => Ok(Self::TwiceDaily),
            "three-times-daily" => Ok(Self::ThreeTimesDaily),
            "weekly" => Ok(Self::Weekly),
            "as-needed" => Ok(Self::AsNeeded),
            other => Err(crate::Error::Validation(format!(
                "Unknown frequency: {}",
                other
            ))),
        }
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Daily => "daily",
            Self::TwiceDaily => "twice daily",
            Self::ThreeTimesDaily => "three times daily",
            Self::Weekly => "weekly",
            Self::AsNeeded => "as needed",
        };
        f.write_str(label)
    }
}

// ============================================================================
// Dose time slot
// ============================================================================

/// A time-of-day slot, written as `HH:MM`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DoseTime(NaiveTime);

impl DoseTime {
    pub fn new(hour: u32, minute: u32) -> Option<Self> {
        NaiveTime::from_hms_opt(hour, minute, 0).map(Self)
    }

    pub fn as_naive(&self) -> NaiveTime {
        self.0
    }
}

impl FromStr for DoseTime {
    type Err = crate::Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        let s = s.trim();
        let invalid = || crate::Error::Validation(format!("Invalid time slot {:?}, expected HH:MM", s));

        if s.len() != 5 {
            return Err(invalid());
        }
        NaiveTime::parse_from_str(s, "%H:%M")
            .map(Self)
            .map_err(|_| invalid())
    }
}

impl fmt::Display for DoseTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%H:%M"))
    }
}

impl Serialize for DoseTime {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for DoseTime {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

// ============================================================================
// Medication and Log Types
// ============================================================================

/// A medication registered by a patient
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Medication {
    pub id: Uuid,
    pub name: String,
    pub dosage: String,
    pub frequency: Frequency,
    /// Scheduled slots, kept ascending and unique by the mutators
    pub time_to_take: Vec<DoseTime>,
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub is_active: bool,
}

/// A dose marked as taken.
///
/// `medication_id` is a weak reference: the medication may have been
/// deleted since, and logs are never cleaned up.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MedicationLog {
    pub id: Uuid,
    pub medication_id: Uuid,
    pub user_id: Uuid,
    pub taken_at: DateTime<Utc>,
    pub scheduled_time: DoseTime,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

// ============================================================================
// Derived Types
// ============================================================================

/// One scheduled dose for today
#[derive(Clone, Debug, PartialEq)]
pub struct DoseEntry<'a> {
    pub medication: &'a Medication,
    pub time: DoseTime,
    pub taken: bool,
}

/// Weekly adherence summary shown on the dashboard
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AdherenceStats {
    pub total_doses: u32,
    pub taken_doses: u32,
    pub percentage: u32,
    pub streak: u32,
}

// ============================================================================
// User Types
// ============================================================================

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    #[default]
    Patient,
    Caretaker,
}

impl FromStr for UserRole {
    type Err = crate::Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "patient" => Ok(Self::Patient),
            "caretaker" => Ok(Self::Caretaker),
            other => Err(crate::Error::Validation(format!("Unknown role: {}", other))),
        }
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Patient => f.write_str("patient"),
            Self::Caretaker => f.write_str("caretaker"),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: UserRole,
    pub created_at: DateTime<Utc>,
}
