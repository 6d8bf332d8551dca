//! Patient reference identifiers and new/old classification.

use crate::config::ClinicConfig;
use crate::db::{Database, DbResult};
use crate::models::PatientType;

/// Deterministic reference identifier for a patient, e.g. `EHH-000042`.
pub fn generate_reference_id(prefix: &str, width: usize, patient_id: i64) -> String {
    format!("{}-{:0width$}", prefix, patient_id, width = width)
}

/// Intake sync key for an upstream user, e.g. `TAF-7`.
pub fn external_reference(prefix: &str, user_id: i64) -> String {
    format!("{}-{}", prefix, user_id)
}

/// Looks up or synthesizes the reference identifier a patient is known by.
pub struct ReferenceResolver<'a> {
    db: &'a Database,
    config: &'a ClinicConfig,
}

impl<'a> ReferenceResolver<'a> {
    pub fn new(db: &'a Database, config: &'a ClinicConfig) -> Self {
        Self { db, config }
    }

    /// The identifier already assigned to the patient, if any booking or
    /// visit carries one. Bookings are consulted first; the earliest wins.
    pub fn existing(&self, patient_id: i64) -> DbResult<Option<String>> {
        if let Some(reference) = self.db.first_booking_reference(patient_id)? {
            return Ok(Some(reference));
        }
        self.db.first_visit_reference(patient_id)
    }

    /// The identifier formula applied to the patient id.
    pub fn generate(&self, patient_id: i64) -> String {
        generate_reference_id(
            &self.config.reference_prefix,
            self.config.reference_width,
            patient_id,
        )
    }

    /// Existing identifier, else the generated one. Idempotent; persists
    /// nothing.
    pub fn resolve(&self, patient_id: i64) -> DbResult<String> {
        match self.existing(patient_id)? {
            Some(reference) => Ok(reference),
            None => Ok(self.generate(patient_id)),
        }
    }

    /// `Old` when the patient holds any booking other than `exclude`.
    pub fn classify(&self, patient_id: i64, exclude: Option<i64>) -> DbResult<PatientType> {
        let others = self.db.count_bookings_for_patient(patient_id, exclude)?;
        Ok(PatientType::from_prior_count(others))
    }
}
