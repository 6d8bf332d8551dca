//! Read-only history views over a patient's past visits.
//!
//! Every view is recomputed on request and never written back. All of
//! them are read inside one transaction so they agree with each other.

mod narrative;

pub use narrative::*;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::db::{Database, DbError};
use crate::models::{PrescriptionLine, Visit};

/// History errors.
#[derive(Error, Debug)]
pub enum HistoryError {
    #[error("Database error: {0}")]
    Database(#[from] DbError),

    #[error("Visit not found: {0}")]
    VisitNotFound(i64),
}

pub type HistoryResult<T> = Result<T, HistoryError>;

/// What the doctor sees about earlier visits when opening a visit.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct VisitHistory {
    /// Markup summary of past complaints and health parameters
    pub narrative: String,
    /// Past visits, newest first
    pub previous_visits: Vec<Visit>,
    /// Prescription lines of the past visits, grouped by visit newest first
    pub previous_prescriptions: Vec<PrescriptionLine>,
    /// The newest past visit
    pub last_visit: Option<Visit>,
}

impl VisitHistory {
    pub fn is_empty(&self) -> bool {
        self.previous_visits.is_empty()
    }
}

/// Builds [`VisitHistory`] views.
pub struct HistoryBuilder<'a> {
    db: &'a Database,
}

impl<'a> HistoryBuilder<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// History of the visit's patient strictly before the visit's date.
    pub fn for_visit(&self, visit: &Visit) -> HistoryResult<VisitHistory> {
        self.for_patient_before(visit.patient_id, visit.appointment_date, Some(visit.id))
    }

    /// Like [`HistoryBuilder::for_visit`], loading the visit first.
    pub fn for_visit_id(&self, visit_id: i64) -> HistoryResult<VisitHistory> {
        self.db.with_transaction(|db| {
            let visit = db
                .get_visit(visit_id)?
                .ok_or(HistoryError::VisitNotFound(visit_id))?;
            Self::collect(db, visit.patient_id, visit.appointment_date, Some(visit.id))
        })
    }

    /// History of `patient_id` strictly before `before`, leaving out visit
    /// `exclude`. Used when a visit's patient or date is being edited and
    /// the visit row does not reflect the new values yet.
    pub fn for_patient_before(
        &self,
        patient_id: i64,
        before: NaiveDate,
        exclude: Option<i64>,
    ) -> HistoryResult<VisitHistory> {
        self.db
            .with_transaction(|db| Self::collect(db, patient_id, before, exclude))
    }

    fn collect(
        db: &Database,
        patient_id: i64,
        before: NaiveDate,
        exclude: Option<i64>,
    ) -> HistoryResult<VisitHistory> {
        let previous_visits = db.prior_visits(patient_id, before, exclude, None)?;
        let previous_prescriptions = db.prior_prescription_lines(patient_id, before, exclude)?;
        let narrative = render_narrative(&previous_visits);
        let last_visit = previous_visits.first().cloned();

        debug!(
            patient_id,
            %before,
            visits = previous_visits.len(),
            prescriptions = previous_prescriptions.len(),
            "Visit history computed"
        );

        Ok(VisitHistory {
            narrative,
            previous_visits,
            previous_prescriptions,
            last_visit,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::booking::BookingService;
    use crate::config::ClinicConfig;
    use crate::models::{NewBooking, NewPrescriptionLine, Patient, VisitNotesUpdate};

    fn date(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    fn book(db: &Database, patient_id: i64, day: &str) -> Visit {
        let config = ClinicConfig::default();
        let service = BookingService::with_database_sequence(db, &config);
        let booking = service.create_booking(NewBooking::new(patient_id, date(day))).unwrap();
        db.get_visit(booking.visit_id.unwrap()).unwrap().unwrap()
    }

    #[test]
    fn test_first_visit_has_no_history() {
        let db = Database::open_in_memory().unwrap();
        db.insert_patient(&Patient::new(42, "Anita Menon".into())).unwrap();
        let visit = book(&db, 42, "2024-01-10");

        let history = HistoryBuilder::new(&db).for_visit(&visit).unwrap();
        assert!(history.is_empty());
        assert_eq!(history, VisitHistory::default());
    }

    #[test]
    fn test_same_day_visits_are_not_history() {
        let db = Database::open_in_memory().unwrap();
        db.insert_patient(&Patient::new(42, "Anita Menon".into())).unwrap();
        book(&db, 42, "2024-01-10");
        let second = book(&db, 42, "2024-01-10");

        let history = HistoryBuilder::new(&db).for_visit(&second).unwrap();
        assert!(history.is_empty());
    }

    #[test]
    fn test_other_patients_excluded() {
        let db = Database::open_in_memory().unwrap();
        db.insert_patient(&Patient::new(42, "Anita Menon".into())).unwrap();
        db.insert_patient(&Patient::new(43, "Ravi Kumar".into())).unwrap();
        book(&db, 43, "2024-01-01");
        let visit = book(&db, 42, "2024-02-10");

        assert!(HistoryBuilder::new(&db).for_visit(&visit).unwrap().is_empty());
    }

    #[test]
    fn test_prescriptions_of_past_visits() {
        let db = Database::open_in_memory().unwrap();
        db.insert_patient(&Patient::new(42, "Anita Menon".into())).unwrap();
        let medicine = db.insert_medicine("Triphala Churna").unwrap();

        let first = book(&db, 42, "2024-01-10");
        let second = book(&db, 42, "2024-02-10");
        let current = book(&db, 42, "2024-03-10");

        for visit in [&first, &second, &current] {
            db.insert_prescription_line(
                visit.id,
                &NewPrescriptionLine {
                    medicine_id: Some(medicine),
                    days: 7,
                    ..Default::default()
                },
            )
            .unwrap();
        }

        let mut notes = VisitNotesUpdate::default();
        notes.notes.chief_complaint = Some("joint pain".into());
        db.update_visit_notes(second.id, &notes).unwrap();

        let history = HistoryBuilder::new(&db).for_visit_id(current.id).unwrap();
        let visit_ids: Vec<i64> = history.previous_visits.iter().map(|v| v.id).collect();
        assert_eq!(visit_ids, vec![second.id, first.id]);

        let line_visits: Vec<i64> = history
            .previous_prescriptions
            .iter()
            .map(|l| l.visit_id)
            .collect();
        assert_eq!(line_visits, vec![second.id, first.id]);

        assert_eq!(history.last_visit.map(|v| v.id), Some(second.id));
        assert!(history
            .narrative
            .starts_with("<b>Date:</b> 2024-02-10<br/><b>Chief Complaint:</b> joint pain<br/>"));
    }

    #[test]
    fn test_for_patient_before_uses_requested_date() {
        let db = Database::open_in_memory().unwrap();
        db.insert_patient(&Patient::new(42, "Anita Menon".into())).unwrap();
        let early = book(&db, 42, "2024-01-10");
        let visit = book(&db, 42, "2024-02-10");

        let builder = HistoryBuilder::new(&db);
        let moved_back = builder
            .for_patient_before(42, date("2024-01-05"), Some(visit.id))
            .unwrap();
        assert!(moved_back.is_empty());

        let moved_forward = builder
            .for_patient_before(42, date("2024-06-01"), Some(visit.id))
            .unwrap();
        assert_eq!(moved_forward.last_visit.map(|v| v.id), Some(early.id));
    }

    #[test]
    fn test_unknown_visit() {
        let db = Database::open_in_memory().unwrap();
        assert!(matches!(
            HistoryBuilder::new(&db).for_visit_id(5),
            Err(HistoryError::VisitNotFound(5))
        ));
    }
}
