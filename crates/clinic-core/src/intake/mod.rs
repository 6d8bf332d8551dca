//! Synchronization of pending bookings from the upstream intake source.
//!
//! Each intake entry is keyed by `<external_ref_prefix>-<user id>`. An
//! entry whose key is already on a booking is skipped, so the job can be
//! rerun at will. Entries are processed independently: one failing entry
//! is reported and the rest of the batch still runs.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use crate::booking::{external_reference, BookingError, BookingService};
use crate::config::ClinicConfig;
use crate::db::{Database, DbError, SequenceAllocator};
use crate::models::{AppointmentState, Booking, IntakeEntry, NewBooking, Patient};

/// Intake errors.
#[derive(Error, Debug)]
pub enum IntakeError {
    #[error("Intake source error: {0}")]
    Source(String),

    #[error("Database error: {0}")]
    Database(#[from] DbError),

    #[error("Booking error: {0}")]
    Booking(#[from] BookingError),
}

impl IntakeError {
    /// Another writer created the same sync key first.
    pub fn is_duplicate(&self) -> bool {
        match self {
            IntakeError::Database(e) | IntakeError::Booking(BookingError::Database(e)) => {
                e.is_unique_violation()
            }
            _ => false,
        }
    }
}

pub type IntakeResult<T> = Result<T, IntakeError>;

/// Something that can list the pending intake entries.
pub trait IntakeSource {
    fn pending_entries(&self) -> IntakeResult<Vec<IntakeEntry>>;
}

impl IntakeSource for Vec<IntakeEntry> {
    fn pending_entries(&self) -> IntakeResult<Vec<IntakeEntry>> {
        Ok(self.clone())
    }
}

impl IntakeSource for [IntakeEntry] {
    fn pending_entries(&self) -> IntakeResult<Vec<IntakeEntry>> {
        Ok(self.to_vec())
    }
}

/// An entry that could not be synced.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SyncFailure {
    pub user_id: i64,
    pub external_ref: String,
    pub reason: String,
}

/// Outcome of one sync run.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SyncReport {
    /// Ids of the bookings created
    pub created: Vec<i64>,
    /// Sync keys already present
    pub skipped: Vec<String>,
    pub failed: Vec<SyncFailure>,
}

impl SyncReport {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

/// The sync job.
pub struct IntakeSync<'a> {
    db: &'a Database,
    config: &'a ClinicConfig,
    bookings: BookingService<'a>,
}

impl<'a> IntakeSync<'a> {
    pub fn new(db: &'a Database, sequence: &'a dyn SequenceAllocator, config: &'a ClinicConfig) -> Self {
        Self {
            db,
            config,
            bookings: BookingService::new(db, sequence, config),
        }
    }

    /// Sync using today's local date for entries without a booking date.
    pub fn run<S: IntakeSource + ?Sized>(&self, source: &S) -> IntakeResult<SyncReport> {
        self.run_as_of(source, chrono::Local::now().date_naive())
    }

    /// Sync, defaulting missing booking dates to `today`.
    ///
    /// Only a failure to read the source fails the run; per-entry failures
    /// are collected in the report.
    pub fn run_as_of<S: IntakeSource + ?Sized>(&self, source: &S, today: NaiveDate) -> IntakeResult<SyncReport> {
        let entries = source.pending_entries()?;
        let mut report = SyncReport::default();

        for entry in &entries {
            let key = external_reference(&self.config.external_ref_prefix, entry.user_id);

            match self.sync_entry(entry, &key, today) {
                Ok(Some(booking)) => {
                    info!(
                        booking_id = booking.id,
                        external_ref = %key,
                        patient_name = %entry.patient_name,
                        "Synced intake entry"
                    );
                    report.created.push(booking.id);
                }
                Ok(None) => report.skipped.push(key),
                Err(e) if e.is_duplicate() => {
                    info!(external_ref = %key, "Intake entry synced concurrently, skipping");
                    report.skipped.push(key);
                }
                Err(e) => {
                    warn!(external_ref = %key, error = %e, "Failed to sync intake entry");
                    report.failed.push(SyncFailure {
                        user_id: entry.user_id,
                        external_ref: key,
                        reason: e.to_string(),
                    });
                }
            }
        }

        info!(
            entries = entries.len(),
            created = report.created.len(),
            skipped = report.skipped.len(),
            failed = report.failed.len(),
            "Intake sync finished"
        );

        Ok(report)
    }

    /// Create the booking for one entry, or `None` when its key exists.
    fn sync_entry(&self, entry: &IntakeEntry, key: &str, today: NaiveDate) -> IntakeResult<Option<Booking>> {
        if self.db.find_booking_by_external_ref(key)?.is_some() {
            return Ok(None);
        }

        self.db.with_transaction(|db| {
            let mut patient = Patient::new(entry.user_id, entry.patient_name.clone());
            patient.email = entry.email.clone();
            patient.phone = entry.phone.clone();
            db.ensure_patient(&patient)?;

            let new = NewBooking {
                patient_id: Some(entry.user_id),
                appointment_date: Some(entry.booking_date.unwrap_or(today)),
                email: entry.email.clone(),
                phone: entry.phone.clone(),
                state: Some(AppointmentState::Booked),
                reference_id: Some(key.to_string()),
                external_ref: Some(key.to_string()),
                ..Default::default()
            };
            let booking = self.bookings.create_booking_in_transaction(new)?;
            Ok(Some(booking))
        })
    }
}
