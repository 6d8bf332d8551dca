//! Clinic Core Library
//!
//! Appointment booking and doctor-visit records for an outpatient clinic.
//!
//! # Architecture
//!
//! ```text
//!   Front desk                       Intake source
//!       │                                  │
//!       ▼                                  ▼
//!  BookingService ◄──────────────── IntakeSync
//!       │   reference id · OP number · new/old
//!       │
//!       ├─────────────── one transaction ───────────────┐
//!       ▼                                               ▼
//!    Booking  ◄──────────── visit_id / booking_id ────► Visit
//!                                                       │
//!                                                       ▼
//!                                              HistoryBuilder
//!                                  (past visits, prescriptions, narrative)
//! ```
//!
//! # Modules
//!
//! - [`config`]: Clinic settings (identifier prefixes, OP sequence)
//! - [`db`]: SQLite persistence, one file per entity
//! - [`models`]: Domain types (Patient, Booking, Visit, PrescriptionLine, ...)
//! - [`booking`]: Booking creation, cancellation and state transitions
//! - [`history`]: Read-only views over a patient's past visits
//! - [`intake`]: Idempotent sync of pending bookings from an intake source

pub mod booking;
pub mod config;
pub mod db;
pub mod history;
pub mod intake;
pub mod models;

// Re-export commonly used types
pub use booking::{BookingError, BookingService, ReferenceResolver};
pub use config::ClinicConfig;
pub use db::{Database, SequenceAllocator};
pub use history::{HistoryBuilder, VisitHistory};
pub use intake::{IntakeSource, IntakeSync, SyncReport};
pub use models::{
    AppointmentState, Booking, IntakeEntry, NewBooking, NewPrescriptionLine, Patient,
    PatientType, PrescriptionLine, Visit, VisitNotesUpdate,
};

// UniFFI setup - using proc macros
uniffi::setup_scaffolding!();

use std::sync::{Arc, Mutex};

use chrono::NaiveDate;

use models::{
    ClinicalNotes, ConsultationMode, Course, Department, Gender, HealthParameters, Vitals,
};

// =========================================================================
// FFI Error Type
// =========================================================================

#[derive(Debug, thiserror::Error, uniffi::Error)]
pub enum ClinicError {
    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Sync error: {0}")]
    SyncError(String),
}

impl From<db::DbError> for ClinicError {
    fn from(e: db::DbError) -> Self {
        match e {
            db::DbError::NotFound(what) => ClinicError::NotFound(what),
            db::DbError::Constraint(msg) => ClinicError::InvalidInput(msg),
            other => ClinicError::DatabaseError(other.to_string()),
        }
    }
}

impl From<config::ConfigError> for ClinicError {
    fn from(e: config::ConfigError) -> Self {
        ClinicError::InvalidInput(e.to_string())
    }
}

impl From<BookingError> for ClinicError {
    fn from(e: BookingError) -> Self {
        match e {
            BookingError::Database(e) => e.into(),
            BookingError::MissingField(_) => ClinicError::InvalidInput(e.to_string()),
            BookingError::PatientNotFound(_)
            | BookingError::BookingNotFound(_)
            | BookingError::VisitNotFound(_) => ClinicError::NotFound(e.to_string()),
        }
    }
}

impl From<history::HistoryError> for ClinicError {
    fn from(e: history::HistoryError) -> Self {
        match e {
            history::HistoryError::Database(e) => e.into(),
            history::HistoryError::VisitNotFound(_) => ClinicError::NotFound(e.to_string()),
        }
    }
}

impl From<intake::IntakeError> for ClinicError {
    fn from(e: intake::IntakeError) -> Self {
        match e {
            intake::IntakeError::Source(msg) => ClinicError::SyncError(msg),
            intake::IntakeError::Database(e) => e.into(),
            intake::IntakeError::Booking(e) => e.into(),
        }
    }
}

impl<T> From<std::sync::PoisonError<T>> for ClinicError {
    fn from(e: std::sync::PoisonError<T>) -> Self {
        ClinicError::DatabaseError(format!("Lock poisoned: {}", e))
    }
}

// =========================================================================
// Factory Functions (exported to FFI)
// =========================================================================

/// Open or create a database at the given path.
#[uniffi::export]
pub fn open_database(path: String) -> Result<Arc<ClinicCore>, ClinicError> {
    let db = Database::open(&path)?;
    Ok(ClinicCore::wrap(db, ClinicConfig::default()))
}

/// Open or create a database with settings from a JSON config.
#[uniffi::export]
pub fn open_database_with_config(
    path: String,
    config_json: String,
) -> Result<Arc<ClinicCore>, ClinicError> {
    let config = ClinicConfig::from_json(&config_json)?;
    let db = Database::open(&path)?;
    Ok(ClinicCore::wrap(db, config))
}

/// Create an in-memory database (for testing).
#[uniffi::export]
pub fn open_database_in_memory() -> Result<Arc<ClinicCore>, ClinicError> {
    let db = Database::open_in_memory()?;
    Ok(ClinicCore::wrap(db, ClinicConfig::default()))
}

// =========================================================================
// Main API Object
// =========================================================================

/// Thread-safe database wrapper for FFI.
#[derive(uniffi::Object)]
pub struct ClinicCore {
    db: Arc<Mutex<Database>>,
    config: ClinicConfig,
}

impl ClinicCore {
    fn wrap(db: Database, config: ClinicConfig) -> Arc<Self> {
        Arc::new(Self {
            db: Arc::new(Mutex::new(db)),
            config,
        })
    }
}

#[uniffi::export]
impl ClinicCore {
    // =========================================================================
    // Patient Operations
    // =========================================================================

    /// Add or update a patient contact.
    pub fn upsert_patient(&self, patient: FfiPatient) -> Result<(), ClinicError> {
        let patient = Patient::try_from(patient)?;
        let db = self.db.lock()?;
        db.upsert_patient(&patient)?;
        Ok(())
    }

    /// Get a patient by id.
    pub fn get_patient(&self, id: i64) -> Result<Option<FfiPatient>, ClinicError> {
        let db = self.db.lock()?;
        Ok(db.get_patient(id)?.map(Into::into))
    }

    /// Search patients by name prefix.
    pub fn search_patients(&self, query: String, limit: u32) -> Result<Vec<FfiPatient>, ClinicError> {
        let db = self.db.lock()?;
        let patients = db.search_patients(&query, limit as usize)?;
        Ok(patients.into_iter().map(Into::into).collect())
    }

    // =========================================================================
    // Booking Operations
    // =========================================================================

    /// Create a booking together with its visit.
    pub fn create_booking(&self, booking: FfiNewBooking) -> Result<FfiBooking, ClinicError> {
        let new = NewBooking::try_from(booking)?;
        let db = self.db.lock()?;
        let service = BookingService::with_database_sequence(&db, &self.config);
        Ok(service.create_booking(new)?.into())
    }

    /// Get a booking by id.
    pub fn get_booking(&self, id: i64) -> Result<Option<FfiBooking>, ClinicError> {
        let db = self.db.lock()?;
        Ok(db.get_booking(id)?.map(Into::into))
    }

    /// All bookings of a patient, newest first.
    pub fn list_bookings_for_patient(&self, patient_id: i64) -> Result<Vec<FfiBooking>, ClinicError> {
        let db = self.db.lock()?;
        let bookings = db.list_bookings_for_patient(patient_id)?;
        Ok(bookings.into_iter().map(Into::into).collect())
    }

    /// Cancel a booking and its linked visit.
    pub fn cancel_booking(&self, id: i64) -> Result<FfiBooking, ClinicError> {
        let db = self.db.lock()?;
        let service = BookingService::with_database_sequence(&db, &self.config);
        Ok(service.cancel_booking(id)?.into())
    }

    /// Move a booking to `booked`, `completed` or `cancelled`.
    pub fn set_booking_state(&self, id: i64, state: String) -> Result<FfiBooking, ClinicError> {
        let state = parse_enum("state", &state, AppointmentState::parse)?;
        let db = self.db.lock()?;
        let service = BookingService::with_database_sequence(&db, &self.config);
        Ok(service.set_booking_state(id, state)?.into())
    }

    /// Point a booking at a different patient.
    pub fn reassign_booking_patient(
        &self,
        booking_id: i64,
        patient_id: i64,
    ) -> Result<FfiBooking, ClinicError> {
        let db = self.db.lock()?;
        let service = BookingService::with_database_sequence(&db, &self.config);
        Ok(service.reassign_patient(booking_id, patient_id)?.into())
    }

    // =========================================================================
    // Visit Operations
    // =========================================================================

    /// Get a visit by id.
    pub fn get_visit(&self, id: i64) -> Result<Option<FfiVisit>, ClinicError> {
        let db = self.db.lock()?;
        Ok(db.get_visit(id)?.map(Into::into))
    }

    /// Move a visit to `booked`, `completed` or `cancelled`.
    pub fn set_visit_state(&self, id: i64, state: String) -> Result<FfiVisit, ClinicError> {
        let state = parse_enum("state", &state, AppointmentState::parse)?;
        let db = self.db.lock()?;
        let service = BookingService::with_database_sequence(&db, &self.config);
        Ok(service.set_visit_state(id, state)?.into())
    }

    /// Replace the clinical record of a visit.
    pub fn update_visit_notes(&self, id: i64, notes: FfiVisitNotes) -> Result<FfiVisit, ClinicError> {
        let db = self.db.lock()?;
        if !db.update_visit_notes(id, &notes.into())? {
            return Err(ClinicError::NotFound(format!("Visit {}", id)));
        }
        db.get_visit(id)?
            .map(Into::into)
            .ok_or_else(|| ClinicError::NotFound(format!("Visit {}", id)))
    }

    /// Add a prescription line to a visit.
    pub fn add_prescription_line(
        &self,
        visit_id: i64,
        line: FfiNewPrescriptionLine,
    ) -> Result<FfiPrescriptionLine, ClinicError> {
        let line = NewPrescriptionLine::try_from(line)?;
        let db = self.db.lock()?;
        if db.get_visit(visit_id)?.is_none() {
            return Err(ClinicError::NotFound(format!("Visit {}", visit_id)));
        }
        let id = db.insert_prescription_line(visit_id, &line)?;
        db.get_prescription_line(id)?
            .map(Into::into)
            .ok_or_else(|| ClinicError::NotFound(format!("Prescription line {}", id)))
    }

    /// Remove a prescription line.
    pub fn delete_prescription_line(&self, id: i64) -> Result<bool, ClinicError> {
        let db = self.db.lock()?;
        Ok(db.delete_prescription_line(id)?)
    }

    /// Prescription lines of a visit, in entry order.
    pub fn list_prescription_lines(&self, visit_id: i64) -> Result<Vec<FfiPrescriptionLine>, ClinicError> {
        let db = self.db.lock()?;
        let lines = db.list_prescription_lines(visit_id)?;
        Ok(lines.into_iter().map(Into::into).collect())
    }

    /// Past visits, prescriptions and narrative for a visit.
    pub fn get_visit_history(&self, visit_id: i64) -> Result<FfiVisitHistory, ClinicError> {
        let db = self.db.lock()?;
        let history = HistoryBuilder::new(&db).for_visit_id(visit_id)?;
        Ok(history.into())
    }

    // =========================================================================
    // Catalog Operations
    // =========================================================================

    /// Add a medicine to the catalog, returning its id.
    pub fn add_medicine(&self, name: String) -> Result<i64, ClinicError> {
        let db = self.db.lock()?;
        Ok(db.insert_medicine(&name)?)
    }

    /// Add a dosage to the catalog, returning its id.
    pub fn add_dosage(&self, name: String) -> Result<i64, ClinicError> {
        let db = self.db.lock()?;
        Ok(db.insert_dosage(&name)?)
    }

    /// All medicines as (id, name), sorted by name.
    pub fn list_medicines(&self) -> Result<Vec<FfiCatalogEntry>, ClinicError> {
        let db = self.db.lock()?;
        let medicines = db.list_medicines()?;
        Ok(medicines
            .into_iter()
            .map(|m| FfiCatalogEntry { id: m.id, name: m.name })
            .collect())
    }

    /// All dosages as (id, name), sorted by name.
    pub fn list_dosages(&self) -> Result<Vec<FfiCatalogEntry>, ClinicError> {
        let db = self.db.lock()?;
        let dosages = db.list_dosages()?;
        Ok(dosages
            .into_iter()
            .map(|d| FfiCatalogEntry { id: d.id, name: d.name })
            .collect())
    }

    // =========================================================================
    // Intake Sync
    // =========================================================================

    /// Sync pending intake entries. Entries without a booking date are
    /// booked for today.
    pub fn sync_intake_entries(&self, entries: Vec<FfiIntakeEntry>) -> Result<FfiSyncReport, ClinicError> {
        let entries = entries
            .into_iter()
            .map(IntakeEntry::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        let db = self.db.lock()?;
        let sync = IntakeSync::new(&db, &*db, &self.config);
        Ok(sync.run(&entries)?.into())
    }
}

// =========================================================================
// Conversion Helpers
// =========================================================================

fn parse_date(field: &str, value: &str) -> Result<NaiveDate, ClinicError> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|_| ClinicError::InvalidInput(format!("{}: expected YYYY-MM-DD, got {:?}", field, value)))
}

fn parse_optional_date(field: &str, value: Option<String>) -> Result<Option<NaiveDate>, ClinicError> {
    value.map(|v| parse_date(field, &v)).transpose()
}

fn parse_enum<T>(field: &str, value: &str, parse: fn(&str) -> Option<T>) -> Result<T, ClinicError> {
    parse(value).ok_or_else(|| ClinicError::InvalidInput(format!("{}: unknown value {:?}", field, value)))
}

fn parse_optional_enum<T>(
    field: &str,
    value: Option<String>,
    parse: fn(&str) -> Option<T>,
) -> Result<Option<T>, ClinicError> {
    value.map(|v| parse_enum(field, &v, parse)).transpose()
}

// =========================================================================
// FFI Types
// =========================================================================

/// FFI-safe patient.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiPatient {
    pub id: i64,
    pub name: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub gender: Option<String>,
    pub date_of_birth: Option<String>,
}

impl From<Patient> for FfiPatient {
    fn from(patient: Patient) -> Self {
        Self {
            id: patient.id,
            name: patient.name,
            phone: patient.phone,
            email: patient.email,
            gender: patient.gender.map(|g| g.as_str().to_string()),
            date_of_birth: patient.date_of_birth.map(|d| d.to_string()),
        }
    }
}

impl TryFrom<FfiPatient> for Patient {
    type Error = ClinicError;

    fn try_from(p: FfiPatient) -> Result<Self, Self::Error> {
        let mut patient = Patient::new(p.id, p.name);
        patient.phone = p.phone;
        patient.email = p.email;
        patient.gender = parse_optional_enum("gender", p.gender, Gender::parse)?;
        patient.date_of_birth = parse_optional_date("date_of_birth", p.date_of_birth)?;
        Ok(patient)
    }
}

/// FFI-safe booking request.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiNewBooking {
    pub patient_id: i64,
    pub appointment_date: String,
    pub gender: Option<String>,
    pub date_of_birth: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub op_number: Option<String>,
    pub department: Option<String>,
    pub consultation_doctor: Option<String>,
    pub consultation_mode: Option<String>,
    pub if_online: Option<String>,
    pub referral: Option<String>,
    pub priority: Option<String>,
    pub notes: Option<String>,
}

impl TryFrom<FfiNewBooking> for NewBooking {
    type Error = ClinicError;

    fn try_from(b: FfiNewBooking) -> Result<Self, Self::Error> {
        Ok(NewBooking {
            patient_id: Some(b.patient_id),
            appointment_date: Some(parse_date("appointment_date", &b.appointment_date)?),
            gender: parse_optional_enum("gender", b.gender, Gender::parse)?,
            date_of_birth: parse_optional_date("date_of_birth", b.date_of_birth)?,
            phone: b.phone,
            email: b.email,
            op_number: b.op_number,
            department: parse_optional_enum("department", b.department, Department::parse)?,
            consultation_doctor: b.consultation_doctor,
            consultation_mode: parse_optional_enum(
                "consultation_mode",
                b.consultation_mode,
                ConsultationMode::parse,
            )?,
            if_online: b.if_online,
            referral: b.referral,
            priority: b.priority,
            notes: b.notes,
            ..Default::default()
        })
    }
}

/// FFI-safe booking.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiBooking {
    pub id: i64,
    pub patient_id: i64,
    pub name: String,
    pub reference_id: String,
    pub gender: Option<String>,
    pub date_of_birth: Option<String>,
    /// Whole years today; 0 without a birth date
    pub age: i32,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub appointment_date: String,
    pub op_number: String,
    pub department: Option<String>,
    pub consultation_doctor: Option<String>,
    pub consultation_mode: Option<String>,
    pub if_online: Option<String>,
    pub referral: Option<String>,
    pub priority: Option<String>,
    pub notes: Option<String>,
    pub patient_type: String,
    pub state: String,
    pub visit_id: Option<i64>,
    pub external_ref: Option<String>,
}

impl From<Booking> for FfiBooking {
    fn from(b: Booking) -> Self {
        let age = b.age();
        Self {
            id: b.id,
            patient_id: b.patient_id,
            name: b.name,
            reference_id: b.reference_id,
            gender: b.gender.map(|g| g.as_str().to_string()),
            date_of_birth: b.date_of_birth.map(|d| d.to_string()),
            age,
            phone: b.phone,
            email: b.email,
            appointment_date: b.appointment_date.to_string(),
            op_number: b.op_number,
            department: b.department.map(|d| d.as_str().to_string()),
            consultation_doctor: b.consultation_doctor,
            consultation_mode: b.consultation_mode.map(|m| m.as_str().to_string()),
            if_online: b.if_online,
            referral: b.referral,
            priority: b.priority,
            notes: b.notes,
            patient_type: b.patient_type.as_str().to_string(),
            state: b.state.as_str().to_string(),
            visit_id: b.visit_id,
            external_ref: b.external_ref,
        }
    }
}

/// FFI-safe clinical record of a visit.
#[derive(Debug, Clone, Default, uniffi::Record)]
pub struct FfiVisitNotes {
    pub chief_complaint: Option<String>,
    pub associated_complaint: Option<String>,
    pub past_history: Option<String>,
    pub family_history: Option<String>,
    pub present_history: Option<String>,
    pub diagnosis: Option<String>,
    pub investigations: Option<String>,
    pub others: Option<String>,
    pub panchakarma_advice: Option<String>,
    pub artava: Option<String>,
    pub nadi: Option<String>,
    pub agni: Option<String>,
    pub mala: Option<String>,
    pub mutra: Option<String>,
    pub nidra: Option<String>,
    pub manas: Option<String>,
    pub htn: String,
    pub dm: String,
    pub th: String,
    pub prescribed_details: Option<String>,
}

impl From<FfiVisitNotes> for VisitNotesUpdate {
    fn from(n: FfiVisitNotes) -> Self {
        VisitNotesUpdate {
            notes: ClinicalNotes {
                chief_complaint: n.chief_complaint,
                associated_complaint: n.associated_complaint,
                past_history: n.past_history,
                family_history: n.family_history,
                present_history: n.present_history,
                diagnosis: n.diagnosis,
                investigations: n.investigations,
                others: n.others,
                panchakarma_advice: n.panchakarma_advice,
            },
            health: HealthParameters {
                artava: n.artava,
                nadi: n.nadi,
                agni: n.agni,
                mala: n.mala,
                mutra: n.mutra,
                nidra: n.nidra,
                manas: n.manas,
            },
            vitals: Vitals {
                htn: n.htn,
                dm: n.dm,
                th: n.th,
            },
            prescribed_details: n.prescribed_details,
        }
    }
}

/// FFI-safe visit.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiVisit {
    pub id: i64,
    pub booking_id: Option<i64>,
    pub patient_id: i64,
    pub patient_name: String,
    pub reference_id: Option<String>,
    pub appointment_date: String,
    pub state: String,
    pub notes: FfiVisitNotes,
}

impl From<Visit> for FfiVisit {
    fn from(v: Visit) -> Self {
        Self {
            id: v.id,
            booking_id: v.booking_id,
            patient_id: v.patient_id,
            patient_name: v.patient_name,
            reference_id: v.reference_id,
            appointment_date: v.appointment_date.to_string(),
            state: v.state.as_str().to_string(),
            notes: FfiVisitNotes {
                chief_complaint: v.notes.chief_complaint,
                associated_complaint: v.notes.associated_complaint,
                past_history: v.notes.past_history,
                family_history: v.notes.family_history,
                present_history: v.notes.present_history,
                diagnosis: v.notes.diagnosis,
                investigations: v.notes.investigations,
                others: v.notes.others,
                panchakarma_advice: v.notes.panchakarma_advice,
                artava: v.health.artava,
                nadi: v.health.nadi,
                agni: v.health.agni,
                mala: v.health.mala,
                mutra: v.health.mutra,
                nidra: v.health.nidra,
                manas: v.health.manas,
                htn: v.vitals.htn,
                dm: v.vitals.dm,
                th: v.vitals.th,
                prescribed_details: v.prescribed_details,
            },
        }
    }
}

/// FFI-safe prescription line request.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiNewPrescriptionLine {
    pub medicine_id: Option<i64>,
    pub dosage_id: Option<i64>,
    pub usage: Option<String>,
    pub days: u32,
    /// "1" to "4"
    pub course: Option<String>,
    pub quantity: u32,
}

impl TryFrom<FfiNewPrescriptionLine> for NewPrescriptionLine {
    type Error = ClinicError;

    fn try_from(l: FfiNewPrescriptionLine) -> Result<Self, Self::Error> {
        Ok(NewPrescriptionLine {
            medicine_id: l.medicine_id,
            dosage_id: l.dosage_id,
            usage: l.usage,
            days: l.days,
            course: parse_optional_enum("course", l.course, Course::parse)?,
            quantity: l.quantity,
        })
    }
}

/// FFI-safe prescription line.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiPrescriptionLine {
    pub id: i64,
    pub visit_id: i64,
    pub medicine_id: Option<i64>,
    pub dosage_id: Option<i64>,
    pub usage: Option<String>,
    pub days: u32,
    pub course: Option<String>,
    pub quantity: u32,
}

impl From<PrescriptionLine> for FfiPrescriptionLine {
    fn from(l: PrescriptionLine) -> Self {
        Self {
            id: l.id,
            visit_id: l.visit_id,
            medicine_id: l.medicine_id,
            dosage_id: l.dosage_id,
            usage: l.usage,
            days: l.days,
            course: l.course.map(|c| c.as_str().to_string()),
            quantity: l.quantity,
        }
    }
}

/// FFI-safe visit history.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiVisitHistory {
    pub narrative: String,
    pub previous_visits: Vec<FfiVisit>,
    pub previous_prescriptions: Vec<FfiPrescriptionLine>,
    pub last_visit: Option<FfiVisit>,
}

impl From<VisitHistory> for FfiVisitHistory {
    fn from(h: VisitHistory) -> Self {
        Self {
            narrative: h.narrative,
            previous_visits: h.previous_visits.into_iter().map(Into::into).collect(),
            previous_prescriptions: h.previous_prescriptions.into_iter().map(Into::into).collect(),
            last_visit: h.last_visit.map(Into::into),
        }
    }
}

/// FFI-safe medicine or dosage.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiCatalogEntry {
    pub id: i64,
    pub name: String,
}

/// FFI-safe intake entry.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiIntakeEntry {
    pub user_id: i64,
    pub patient_name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub booking_date: Option<String>,
}

impl TryFrom<FfiIntakeEntry> for IntakeEntry {
    type Error = ClinicError;

    fn try_from(e: FfiIntakeEntry) -> Result<Self, Self::Error> {
        Ok(IntakeEntry {
            user_id: e.user_id,
            patient_name: e.patient_name,
            email: e.email,
            phone: e.phone,
            booking_date: parse_optional_date("booking_date", e.booking_date)?,
        })
    }
}

/// FFI-safe sync failure.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiSyncFailure {
    pub user_id: i64,
    pub external_ref: String,
    pub reason: String,
}

/// FFI-safe sync report.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiSyncReport {
    pub created: Vec<i64>,
    pub skipped: Vec<String>,
    pub failed: Vec<FfiSyncFailure>,
}

impl From<SyncReport> for FfiSyncReport {
    fn from(r: SyncReport) -> Self {
        Self {
            created: r.created,
            skipped: r.skipped,
            failed: r
                .failed
                .into_iter()
                .map(|f| FfiSyncFailure {
                    user_id: f.user_id,
                    external_ref: f.external_ref,
                    reason: f.reason,
                })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn patient(id: i64, name: &str) -> FfiPatient {
        FfiPatient {
            id,
            name: name.into(),
            phone: None,
            email: None,
            gender: Some("female".into()),
            date_of_birth: Some("1990-06-15".into()),
        }
    }

    fn booking_request(patient_id: i64, date: &str) -> FfiNewBooking {
        FfiNewBooking {
            patient_id,
            appointment_date: date.into(),
            gender: None,
            date_of_birth: None,
            phone: None,
            email: None,
            op_number: None,
            department: Some("kayachikitsa".into()),
            consultation_doctor: None,
            consultation_mode: Some("offline".into()),
            if_online: None,
            referral: None,
            priority: None,
            notes: None,
        }
    }

    #[test]
    fn test_ffi_booking_flow() {
        let core = open_database_in_memory().unwrap();
        core.upsert_patient(patient(42, "Anita Menon")).unwrap();

        let booking = core.create_booking(booking_request(42, "2024-01-10")).unwrap();
        assert_eq!(booking.reference_id, "EHH-000042");
        assert_eq!(booking.patient_type, "new");
        assert_eq!(booking.state, "booked");
        assert_eq!(booking.gender.as_deref(), Some("female"));

        let visit = core.get_visit(booking.visit_id.unwrap()).unwrap().unwrap();
        assert_eq!(visit.notes.htn, "Non HTN");

        let cancelled = core.cancel_booking(booking.id).unwrap();
        assert_eq!(cancelled.state, "cancelled");
        let visit = core.get_visit(visit.id).unwrap().unwrap();
        assert_eq!(visit.state, "cancelled");
    }

    #[test]
    fn test_ffi_history_and_prescriptions() {
        let core = open_database_in_memory().unwrap();
        core.upsert_patient(patient(42, "Anita Menon")).unwrap();
        let medicine = core.add_medicine("Triphala Churna".into()).unwrap();

        let first = core.create_booking(booking_request(42, "2024-01-10")).unwrap();
        let second = core.create_booking(booking_request(42, "2024-02-10")).unwrap();
        let first_visit = first.visit_id.unwrap();

        let mut notes = FfiVisitNotes {
            htn: "HTN".into(),
            dm: "Non DM".into(),
            th: "Non TH".into(),
            ..Default::default()
        };
        notes.chief_complaint = Some("headache".into());
        let updated = core.update_visit_notes(first_visit, notes).unwrap();
        assert_eq!(updated.notes.htn, "HTN");

        let line = core
            .add_prescription_line(
                first_visit,
                FfiNewPrescriptionLine {
                    medicine_id: Some(medicine),
                    dosage_id: None,
                    usage: Some("after food".into()),
                    days: 14,
                    course: Some("2".into()),
                    quantity: 1,
                },
            )
            .unwrap();
        assert_eq!(line.course.as_deref(), Some("2"));

        let history = core.get_visit_history(second.visit_id.unwrap()).unwrap();
        assert_eq!(history.previous_visits.len(), 1);
        assert_eq!(history.previous_prescriptions.len(), 1);
        assert_eq!(history.last_visit.map(|v| v.id), Some(first_visit));
        assert!(history.narrative.contains("<b>Chief Complaint:</b> headache"));
    }

    #[test]
    fn test_ffi_rejects_bad_input() {
        let core = open_database_in_memory().unwrap();
        core.upsert_patient(patient(42, "Anita Menon")).unwrap();

        assert!(matches!(
            core.create_booking(booking_request(42, "10/01/2024")),
            Err(ClinicError::InvalidInput(_))
        ));
        assert!(matches!(
            core.set_booking_state(1, "archived".into()),
            Err(ClinicError::InvalidInput(_))
        ));
        assert!(matches!(
            core.create_booking(booking_request(99, "2024-01-10")),
            Err(ClinicError::NotFound(_))
        ));
        assert!(matches!(
            core.update_visit_notes(404, FfiVisitNotes::default()),
            Err(ClinicError::NotFound(_))
        ));
        assert!(matches!(
            core.upsert_patient(patient(-42, "Nobody")),
            Err(ClinicError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_ffi_sync_is_idempotent() {
        let core = open_database_in_memory().unwrap();
        let entry = FfiIntakeEntry {
            user_id: 7,
            patient_name: "Lakshmi Nair".into(),
            email: None,
            phone: None,
            booking_date: Some("2024-03-01".into()),
        };

        let first = core.sync_intake_entries(vec![entry.clone()]).unwrap();
        assert_eq!(first.created.len(), 1);

        let second = core.sync_intake_entries(vec![entry]).unwrap();
        assert!(second.created.is_empty());
        assert_eq!(second.skipped, vec!["TAF-7".to_string()]);
    }

    #[test]
    fn test_open_with_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clinic.db").to_string_lossy().to_string();
        let core = open_database_with_config(path, r#"{"reference_prefix": "AVK"}"#.into()).unwrap();
        core.upsert_patient(patient(5, "Devi")).unwrap();

        let booking = core.create_booking(booking_request(5, "2024-01-10")).unwrap();
        assert_eq!(booking.reference_id, "AVK-000005");
    }
}
