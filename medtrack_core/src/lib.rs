#![forbid(unsafe_code)]

//! Core domain model and business logic for MedTrack.
//!
//! This crate provides:
//! - Domain types (medications, dose logs, users, adherence stats)
//! - Schedule expansion, adherence and streak calculation
//! - Repository abstraction with in-memory and file-backed stores
//! - Medication mutators, user registry and session
//! - CSV export of the dose log

pub mod types;
pub mod error;
pub mod config;
pub mod logging;
pub mod schedule;
pub mod adherence;
pub mod repository;
pub mod store;
pub mod wal;
pub mod medications;
pub mod users;
pub mod csv_export;

// Re-export commonly used types
pub use error::{Error, Result};
pub use types::*;
pub use config::Config;
pub use schedule::{expand_today, pending_doses};
pub use adherence::{adherence_stats, compute_adherence, compute_streak, Adherence};
pub use repository::{InMemoryRepository, MedicationRepository};
pub use store::FileRepository;
pub use medications::{
    add_medication, delete_medication, find_medication, mark_taken, orphaned_logs,
    update_medication, MedicationDraft,
};
pub use users::{Session, SignupRequest, UserRegistry};
pub use csv_export::export_logs;
