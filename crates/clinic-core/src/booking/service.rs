//! Booking creation, cancellation and state transitions.

use tracing::{debug, info};

use crate::config::ClinicConfig;
use crate::db::{BookingPatientSnapshot, Database, SequenceAllocator};
use crate::models::{AppointmentState, Booking, NewBooking, PatientType, Visit};

use super::identity::ReferenceResolver;
use super::{BookingError, BookingResult};

/// OP number placeholder meaning "allocate one for me".
const OP_NUMBER_PLACEHOLDER: &str = "New";

/// Front-desk operations over bookings and their linked visits.
pub struct BookingService<'a> {
    db: &'a Database,
    sequence: &'a dyn SequenceAllocator,
    config: &'a ClinicConfig,
}

impl<'a> BookingService<'a> {
    /// Create a service drawing OP numbers from `sequence`.
    pub fn new(db: &'a Database, sequence: &'a dyn SequenceAllocator, config: &'a ClinicConfig) -> Self {
        Self { db, sequence, config }
    }

    /// Create a service drawing OP numbers from the database's own sequences.
    pub fn with_database_sequence(db: &'a Database, config: &'a ClinicConfig) -> Self {
        Self::new(db, db, config)
    }

    pub fn resolver(&self) -> ReferenceResolver<'a> {
        ReferenceResolver::new(self.db, self.config)
    }

    /// Create a booking and its visit in one transaction.
    ///
    /// Either both rows exist and point at each other afterwards, or
    /// neither exists.
    pub fn create_booking(&self, new: NewBooking) -> BookingResult<Booking> {
        self.db
            .with_transaction(|_| self.create_booking_in_transaction(new))
    }

    /// Body of [`BookingService::create_booking`] for callers that already
    /// hold a transaction.
    pub(crate) fn create_booking_in_transaction(&self, new: NewBooking) -> BookingResult<Booking> {
        let patient_id = new.patient_id.ok_or(BookingError::MissingField("patient_id"))?;
        let appointment_date = new
            .appointment_date
            .ok_or(BookingError::MissingField("appointment_date"))?;
        let patient = self
            .db
            .get_patient(patient_id)?
            .ok_or(BookingError::PatientNotFound(patient_id))?;

        // An identifier already held by the patient always wins.
        let resolver = self.resolver();
        let reference_id = match resolver.existing(patient_id)? {
            Some(existing) => existing,
            None => new
                .reference_id
                .filter(|r| !r.trim().is_empty())
                .unwrap_or_else(|| resolver.generate(patient_id)),
        };

        let op_number = match new.op_number.filter(|n| !n.is_empty() && n.as_str() != OP_NUMBER_PLACEHOLDER) {
            Some(supplied) => supplied,
            None => self.sequence.next_value(&self.config.op_number_sequence)?,
        };

        let patient_type = resolver.classify(patient_id, None)?;
        let now = chrono::Utc::now().to_rfc3339();

        let mut booking = Booking {
            id: 0,
            patient_id,
            name: patient.name,
            reference_id,
            gender: new.gender.or(patient.gender),
            date_of_birth: new.date_of_birth.or(patient.date_of_birth),
            phone: new.phone.or(patient.phone),
            email: new.email.or(patient.email),
            appointment_date,
            op_number,
            department: new.department,
            consultation_doctor: new.consultation_doctor,
            consultation_mode: new.consultation_mode,
            if_online: new.if_online,
            referral: new.referral,
            priority: new.priority,
            notes: new.notes,
            patient_type,
            state: new.state.unwrap_or_default(),
            visit_id: None,
            external_ref: new.external_ref,
            created_at: now.clone(),
            updated_at: now,
        };
        booking.id = self.db.insert_booking(&booking)?;

        let visit_id = self.db.insert_visit(&Visit::for_booking(&booking))?;
        self.db.link_booking_visit(booking.id, visit_id)?;

        info!(
            booking_id = booking.id,
            visit_id,
            patient_id,
            reference_id = %booking.reference_id,
            op_number = %booking.op_number,
            patient_type = booking.patient_type.as_str(),
            "Booking created"
        );

        self.db
            .get_booking(booking.id)?
            .ok_or(BookingError::BookingNotFound(booking.id))
    }

    /// Cancel a booking and, when linked, its visit.
    ///
    /// Cancelling a visit directly never touches its booking.
    pub fn cancel_booking(&self, booking_id: i64) -> BookingResult<Booking> {
        self.db.with_transaction(|db| {
            let mut booking = db
                .get_booking(booking_id)?
                .ok_or(BookingError::BookingNotFound(booking_id))?;

            db.set_booking_state(booking_id, AppointmentState::Cancelled)?;
            booking.state = AppointmentState::Cancelled;

            if let Some(visit_id) = booking.visit_id {
                db.set_visit_state(visit_id, AppointmentState::Cancelled)?;
            }

            info!(booking_id, visit_id = ?booking.visit_id, "Booking cancelled");
            Ok(booking)
        })
    }

    /// Move a booking to `state`. Cancelling goes through
    /// [`BookingService::cancel_booking`]; other states leave the linked
    /// visit alone.
    pub fn set_booking_state(&self, booking_id: i64, state: AppointmentState) -> BookingResult<Booking> {
        if state == AppointmentState::Cancelled {
            return self.cancel_booking(booking_id);
        }
        if !self.db.set_booking_state(booking_id, state)? {
            return Err(BookingError::BookingNotFound(booking_id));
        }
        debug!(booking_id, state = state.as_str(), "Booking state changed");
        self.db
            .get_booking(booking_id)?
            .ok_or(BookingError::BookingNotFound(booking_id))
    }

    /// Move a visit to `state` without touching its booking.
    pub fn set_visit_state(&self, visit_id: i64, state: AppointmentState) -> BookingResult<Visit> {
        if !self.db.set_visit_state(visit_id, state)? {
            return Err(BookingError::VisitNotFound(visit_id));
        }
        debug!(visit_id, state = state.as_str(), "Visit state changed");
        self.db
            .get_visit(visit_id)?
            .ok_or(BookingError::VisitNotFound(visit_id))
    }

    /// Point a booking at a different patient, refreshing the name, contact
    /// details, reference identifier and classification from the new
    /// patient. The linked visit keeps its original patient.
    pub fn reassign_patient(&self, booking_id: i64, patient_id: i64) -> BookingResult<Booking> {
        self.db.with_transaction(|db| {
            if db.get_booking(booking_id)?.is_none() {
                return Err(BookingError::BookingNotFound(booking_id));
            }
            let patient = db
                .get_patient(patient_id)?
                .ok_or(BookingError::PatientNotFound(patient_id))?;

            let resolver = self.resolver();
            let snapshot = BookingPatientSnapshot {
                patient_id,
                name: patient.name,
                phone: patient.phone,
                email: patient.email,
                reference_id: resolver.resolve(patient_id)?,
                patient_type: resolver.classify(patient_id, Some(booking_id))?,
            };
            db.update_booking_patient(booking_id, &snapshot)?;

            info!(
                booking_id,
                patient_id,
                reference_id = %snapshot.reference_id,
                "Booking reassigned to patient"
            );

            db.get_booking(booking_id)?
                .ok_or(BookingError::BookingNotFound(booking_id))
        })
    }

    /// Recompute and store whether the booking's patient is new or old.
    pub fn refresh_patient_type(&self, booking_id: i64) -> BookingResult<PatientType> {
        let booking = self
            .db
            .get_booking(booking_id)?
            .ok_or(BookingError::BookingNotFound(booking_id))?;

        let patient_type = self.resolver().classify(booking.patient_id, Some(booking_id))?;
        self.db.set_booking_patient_type(booking_id, patient_type)?;
        Ok(patient_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::AtomicSequence;
    use crate::models::{Department, Patient};
    use chrono::NaiveDate;

    fn setup_db() -> Database {
        let db = Database::open_in_memory().unwrap();
        let mut patient = Patient::new(42, "Anita Menon".into());
        patient.phone = Some("98470 00000".into());
        db.insert_patient(&patient).unwrap();
        db.insert_patient(&Patient::new(43, "Ravi Kumar".into())).unwrap();
        db
    }

    fn date(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    #[test]
    fn test_create_booking_links_visit() {
        let db = setup_db();
        let config = ClinicConfig::default();
        let service = BookingService::with_database_sequence(&db, &config);

        let booking = service.create_booking(NewBooking::new(42, date("2024-01-10"))).unwrap();

        assert_eq!(booking.name, "Anita Menon");
        assert_eq!(booking.reference_id, "EHH-000042");
        assert_eq!(booking.op_number, "0001");
        assert_eq!(booking.phone, Some("98470 00000".into()));
        assert_eq!(booking.patient_type, PatientType::New);

        let visit_id = booking.visit_id.unwrap();
        let visit = db.get_visit(visit_id).unwrap().unwrap();
        assert_eq!(visit.booking_id, Some(booking.id));
        assert_eq!(visit.patient_id, 42);
        assert_eq!(visit.reference_id, Some("EHH-000042".into()));
        assert_eq!(visit.appointment_date, date("2024-01-10"));
        assert_eq!(visit.state, AppointmentState::Booked);

        let stored = db.get_booking(booking.id).unwrap().unwrap();
        assert_eq!(stored, booking);
    }

    #[test]
    fn test_missing_fields_rejected_before_persistence() {
        let db = setup_db();
        let config = ClinicConfig::default();
        let service = BookingService::with_database_sequence(&db, &config);

        let err = service
            .create_booking(NewBooking {
                appointment_date: Some(date("2024-01-10")),
                ..Default::default()
            })
            .unwrap_err();
        assert!(matches!(err, BookingError::MissingField("patient_id")));

        let err = service
            .create_booking(NewBooking {
                patient_id: Some(42),
                ..Default::default()
            })
            .unwrap_err();
        assert!(matches!(err, BookingError::MissingField("appointment_date")));

        assert_eq!(db.count_bookings_for_patient(42, None).unwrap(), 0);
        // No OP number was consumed
        assert_eq!(db.next_by_code("appointment.op_number").unwrap(), "0001");
    }

    #[test]
    fn test_unknown_patient() {
        let db = setup_db();
        let config = ClinicConfig::default();
        let service = BookingService::with_database_sequence(&db, &config);

        let err = service.create_booking(NewBooking::new(99, date("2024-01-10"))).unwrap_err();
        assert!(matches!(err, BookingError::PatientNotFound(99)));
    }

    #[test]
    fn test_negative_patient_cannot_be_booked() {
        let db = setup_db();
        let config = ClinicConfig::default();
        let service = BookingService::with_database_sequence(&db, &config);

        assert!(db.insert_patient(&Patient::new(-42, "Nobody".into())).is_err());

        let err = service.create_booking(NewBooking::new(-42, date("2024-01-10"))).unwrap_err();
        assert!(matches!(err, BookingError::PatientNotFound(-42)));
        assert_eq!(db.count_bookings_for_patient(-42, None).unwrap(), 0);
    }

    #[test]
    fn test_failed_visit_rolls_back_booking() {
        let db = setup_db();
        let config = ClinicConfig::default();
        let service = BookingService::with_database_sequence(&db, &config);

        // Visits can no longer be inserted, so step 5 fails after the
        // booking row was written.
        db.conn()
            .execute_batch(
                "CREATE TRIGGER block_visits BEFORE INSERT ON visits BEGIN SELECT RAISE(ABORT, 'blocked'); END;",
            )
            .unwrap();

        let result = service.create_booking(NewBooking::new(42, date("2024-01-10")));
        assert!(matches!(result, Err(BookingError::Database(_))));
        assert_eq!(db.count_bookings_for_patient(42, None).unwrap(), 0);
    }

    #[test]
    fn test_supplied_op_number_kept() {
        let db = setup_db();
        let config = ClinicConfig::default();
        let service = BookingService::with_database_sequence(&db, &config);

        let mut new = NewBooking::new(42, date("2024-01-10"));
        new.op_number = Some("OP-77".into());
        assert_eq!(service.create_booking(new).unwrap().op_number, "OP-77");

        let mut placeholder = NewBooking::new(42, date("2024-01-11"));
        placeholder.op_number = Some("New".into());
        assert_eq!(service.create_booking(placeholder).unwrap().op_number, "0001");
    }

    #[test]
    fn test_injected_sequence() {
        let db = setup_db();
        let config = ClinicConfig::default();
        let sequence = AtomicSequence::new("OP", 5, 100);
        let service = BookingService::new(&db, &sequence, &config);

        let first = service.create_booking(NewBooking::new(42, date("2024-01-10"))).unwrap();
        let second = service.create_booking(NewBooking::new(43, date("2024-01-10"))).unwrap();
        assert_eq!(first.op_number, "OP00100");
        assert_eq!(second.op_number, "OP00101");
    }

    #[test]
    fn test_cancel_propagates_to_visit() {
        let db = setup_db();
        let config = ClinicConfig::default();
        let service = BookingService::with_database_sequence(&db, &config);

        let booking = service.create_booking(NewBooking::new(42, date("2024-01-10"))).unwrap();
        let cancelled = service.cancel_booking(booking.id).unwrap();

        assert_eq!(cancelled.state, AppointmentState::Cancelled);
        let visit = db.get_visit(booking.visit_id.unwrap()).unwrap().unwrap();
        assert_eq!(visit.state, AppointmentState::Cancelled);
    }

    #[test]
    fn test_cancel_without_visit_only_touches_booking() {
        let db = setup_db();
        let config = ClinicConfig::default();
        let service = BookingService::with_database_sequence(&db, &config);

        let booking = service.create_booking(NewBooking::new(42, date("2024-01-10"))).unwrap();
        let other = service.create_booking(NewBooking::new(42, date("2024-02-10"))).unwrap();
        db.delete_visit(booking.visit_id.unwrap()).unwrap();

        let cancelled = service.cancel_booking(booking.id).unwrap();
        assert_eq!(cancelled.state, AppointmentState::Cancelled);
        assert_eq!(cancelled.visit_id, None);

        let untouched = db.get_visit(other.visit_id.unwrap()).unwrap().unwrap();
        assert_eq!(untouched.state, AppointmentState::Booked);
    }

    #[test]
    fn test_cancelling_visit_leaves_booking() {
        let db = setup_db();
        let config = ClinicConfig::default();
        let service = BookingService::with_database_sequence(&db, &config);

        let booking = service.create_booking(NewBooking::new(42, date("2024-01-10"))).unwrap();
        service
            .set_visit_state(booking.visit_id.unwrap(), AppointmentState::Cancelled)
            .unwrap();

        let stored = db.get_booking(booking.id).unwrap().unwrap();
        assert_eq!(stored.state, AppointmentState::Booked);
    }

    #[test]
    fn test_completing_booking_leaves_visit() {
        let db = setup_db();
        let config = ClinicConfig::default();
        let service = BookingService::with_database_sequence(&db, &config);

        let booking = service.create_booking(NewBooking::new(42, date("2024-01-10"))).unwrap();
        let completed = service
            .set_booking_state(booking.id, AppointmentState::Completed)
            .unwrap();
        assert_eq!(completed.state, AppointmentState::Completed);

        let visit = db.get_visit(booking.visit_id.unwrap()).unwrap().unwrap();
        assert_eq!(visit.state, AppointmentState::Booked);

        assert!(matches!(
            service.set_booking_state(999, AppointmentState::Completed),
            Err(BookingError::BookingNotFound(999))
        ));
    }

    #[test]
    fn test_set_booking_state_cancelled_propagates() {
        let db = setup_db();
        let config = ClinicConfig::default();
        let service = BookingService::with_database_sequence(&db, &config);

        let booking = service.create_booking(NewBooking::new(42, date("2024-01-10"))).unwrap();
        service
            .set_booking_state(booking.id, AppointmentState::Cancelled)
            .unwrap();

        let visit = db.get_visit(booking.visit_id.unwrap()).unwrap().unwrap();
        assert_eq!(visit.state, AppointmentState::Cancelled);
    }

    #[test]
    fn test_reassign_patient() {
        let db = setup_db();
        let config = ClinicConfig::default();
        let service = BookingService::with_database_sequence(&db, &config);

        service.create_booking(NewBooking::new(43, date("2024-01-01"))).unwrap();
        let mut new = NewBooking::new(42, date("2024-01-10"));
        new.department = Some(Department::Shalakyam);
        let booking = service.create_booking(new).unwrap();

        let moved = service.reassign_patient(booking.id, 43).unwrap();
        assert_eq!(moved.patient_id, 43);
        assert_eq!(moved.name, "Ravi Kumar");
        assert_eq!(moved.reference_id, "EHH-000043");
        assert_eq!(moved.patient_type, PatientType::Old);
        assert_eq!(moved.department, Some(Department::Shalakyam));
    }

    #[test]
    fn test_refresh_patient_type_excludes_self() {
        let db = setup_db();
        let config = ClinicConfig::default();
        let service = BookingService::with_database_sequence(&db, &config);

        let first = service.create_booking(NewBooking::new(42, date("2024-01-10"))).unwrap();
        assert_eq!(service.refresh_patient_type(first.id).unwrap(), PatientType::New);

        service.create_booking(NewBooking::new(42, date("2024-02-10"))).unwrap();
        assert_eq!(service.refresh_patient_type(first.id).unwrap(), PatientType::Old);
        assert_eq!(
            db.get_booking(first.id).unwrap().unwrap().patient_type,
            PatientType::Old
        );
    }
}
