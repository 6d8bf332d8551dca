//! Booking database operations.

use chrono::NaiveDate;
use rusqlite::{params, OptionalExtension, Row};

use super::{Database, DbError, DbResult};
use crate::models::{
    AppointmentState, Booking, ConsultationMode, Department, Gender, PatientType,
};

const BOOKING_COLUMNS: &str = r#"
    id, patient_id, name, reference_id, gender, date_of_birth, phone, email,
    appointment_date, op_number, department, consultation_doctor, consultation_mode,
    if_online, referral, priority, notes, patient_type, state, visit_id,
    external_ref, created_at, updated_at
"#;

/// Patient-derived fields rewritten when a booking changes hands.
#[derive(Debug, Clone)]
pub struct BookingPatientSnapshot {
    pub patient_id: i64,
    pub name: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub reference_id: String,
    pub patient_type: PatientType,
}

impl Database {
    /// Insert a new booking, returning its row id. `booking.id` is ignored.
    pub fn insert_booking(&self, booking: &Booking) -> DbResult<i64> {
        self.conn.execute(
            r#"
            INSERT INTO bookings (
                patient_id, name, reference_id, gender, date_of_birth, phone, email,
                appointment_date, op_number, department, consultation_doctor,
                consultation_mode, if_online, referral, priority, notes,
                patient_type, state, visit_id, external_ref, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15,
                      ?16, ?17, ?18, ?19, ?20, ?21, ?22)
            "#,
            params![
                booking.patient_id,
                booking.name,
                booking.reference_id,
                booking.gender.map(|g| g.as_str()),
                booking.date_of_birth,
                booking.phone,
                booking.email,
                booking.appointment_date,
                booking.op_number,
                booking.department.map(|d| d.as_str()),
                booking.consultation_doctor,
                booking.consultation_mode.map(|m| m.as_str()),
                booking.if_online,
                booking.referral,
                booking.priority,
                booking.notes,
                booking.patient_type.as_str(),
                booking.state.as_str(),
                booking.visit_id,
                booking.external_ref,
                booking.created_at,
                booking.updated_at,
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Get a booking by id.
    pub fn get_booking(&self, id: i64) -> DbResult<Option<Booking>> {
        self.conn
            .query_row(
                &format!("SELECT {BOOKING_COLUMNS} FROM bookings WHERE id = ?"),
                [id],
                BookingRow::read,
            )
            .optional()?
            .map(Booking::try_from)
            .transpose()
    }

    /// Find the booking created by the intake sync for `external_ref`.
    pub fn find_booking_by_external_ref(&self, external_ref: &str) -> DbResult<Option<Booking>> {
        self.conn
            .query_row(
                &format!("SELECT {BOOKING_COLUMNS} FROM bookings WHERE external_ref = ? LIMIT 1"),
                [external_ref],
                BookingRow::read,
            )
            .optional()?
            .map(Booking::try_from)
            .transpose()
    }

    /// List a patient's bookings, newest appointment first.
    pub fn list_bookings_for_patient(&self, patient_id: i64) -> DbResult<Vec<Booking>> {
        let mut stmt = self.conn.prepare(&format!(
            r#"
            SELECT {BOOKING_COLUMNS}
            FROM bookings
            WHERE patient_id = ?
            ORDER BY appointment_date DESC, id DESC
            "#
        ))?;

        let rows = stmt.query_map([patient_id], BookingRow::read)?;

        let mut bookings = Vec::new();
        for row in rows {
            bookings.push(row?.try_into()?);
        }
        Ok(bookings)
    }

    /// Count a patient's bookings, optionally leaving one booking out.
    pub fn count_bookings_for_patient(&self, patient_id: i64, exclude: Option<i64>) -> DbResult<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM bookings WHERE patient_id = ?1 AND (?2 IS NULL OR id != ?2)",
            params![patient_id, exclude],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    /// Reference identifier of the patient's earliest booking, if any.
    pub fn first_booking_reference(&self, patient_id: i64) -> DbResult<Option<String>> {
        self.conn
            .query_row(
                r#"
                SELECT reference_id FROM bookings
                WHERE patient_id = ? AND reference_id != ''
                ORDER BY id
                LIMIT 1
                "#,
                [patient_id],
                |row| row.get(0),
            )
            .optional()
            .map_err(Into::into)
    }

    /// Point a booking at its visit.
    pub fn link_booking_visit(&self, booking_id: i64, visit_id: i64) -> DbResult<bool> {
        let rows_affected = self.conn.execute(
            "UPDATE bookings SET visit_id = ?1, updated_at = datetime('now') WHERE id = ?2",
            params![visit_id, booking_id],
        )?;
        Ok(rows_affected > 0)
    }

    /// Set a booking's lifecycle state.
    pub fn set_booking_state(&self, booking_id: i64, state: AppointmentState) -> DbResult<bool> {
        let rows_affected = self.conn.execute(
            "UPDATE bookings SET state = ?1, updated_at = datetime('now') WHERE id = ?2",
            params![state.as_str(), booking_id],
        )?;
        Ok(rows_affected > 0)
    }

    /// Store a recomputed new/old classification.
    pub fn set_booking_patient_type(&self, booking_id: i64, patient_type: PatientType) -> DbResult<bool> {
        let rows_affected = self.conn.execute(
            "UPDATE bookings SET patient_type = ?1, updated_at = datetime('now') WHERE id = ?2",
            params![patient_type.as_str(), booking_id],
        )?;
        Ok(rows_affected > 0)
    }

    /// Rewrite the patient-derived fields of a booking.
    pub fn update_booking_patient(&self, booking_id: i64, snapshot: &BookingPatientSnapshot) -> DbResult<bool> {
        let rows_affected = self.conn.execute(
            r#"
            UPDATE bookings SET
                patient_id = ?2,
                name = ?3,
                phone = ?4,
                email = ?5,
                reference_id = ?6,
                patient_type = ?7,
                updated_at = datetime('now')
            WHERE id = ?1
            "#,
            params![
                booking_id,
                snapshot.patient_id,
                snapshot.name,
                snapshot.phone,
                snapshot.email,
                snapshot.reference_id,
                snapshot.patient_type.as_str(),
            ],
        )?;
        Ok(rows_affected > 0)
    }
}

/// Intermediate row struct for database mapping.
struct BookingRow {
    id: i64,
    patient_id: i64,
    name: String,
    reference_id: String,
    gender: Option<String>,
    date_of_birth: Option<NaiveDate>,
    phone: Option<String>,
    email: Option<String>,
    appointment_date: NaiveDate,
    op_number: String,
    department: Option<String>,
    consultation_doctor: Option<String>,
    consultation_mode: Option<String>,
    if_online: Option<String>,
    referral: Option<String>,
    priority: Option<String>,
    notes: Option<String>,
    patient_type: String,
    state: String,
    visit_id: Option<i64>,
    external_ref: Option<String>,
    created_at: String,
    updated_at: String,
}

impl BookingRow {
    fn read(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            patient_id: row.get(1)?,
            name: row.get(2)?,
            reference_id: row.get(3)?,
            gender: row.get(4)?,
            date_of_birth: row.get(5)?,
            phone: row.get(6)?,
            email: row.get(7)?,
            appointment_date: row.get(8)?,
            op_number: row.get(9)?,
            department: row.get(10)?,
            consultation_doctor: row.get(11)?,
            consultation_mode: row.get(12)?,
            if_online: row.get(13)?,
            referral: row.get(14)?,
            priority: row.get(15)?,
            notes: row.get(16)?,
            patient_type: row.get(17)?,
            state: row.get(18)?,
            visit_id: row.get(19)?,
            external_ref: row.get(20)?,
            created_at: row.get(21)?,
            updated_at: row.get(22)?,
        })
    }
}

impl TryFrom<BookingRow> for Booking {
    type Error = DbError;

    fn try_from(row: BookingRow) -> Result<Self, Self::Error> {
        let gender = row
            .gender
            .map(|g| Gender::parse(&g).ok_or_else(|| unknown("gender", &g)))
            .transpose()?;
        let department = row
            .department
            .map(|d| Department::parse(&d).ok_or_else(|| unknown("department", &d)))
            .transpose()?;
        let consultation_mode = row
            .consultation_mode
            .map(|m| ConsultationMode::parse(&m).ok_or_else(|| unknown("consultation mode", &m)))
            .transpose()?;
        let patient_type = PatientType::parse(&row.patient_type)
            .ok_or_else(|| unknown("patient type", &row.patient_type))?;
        let state = string_to_state(&row.state)?;

        Ok(Booking {
            id: row.id,
            patient_id: row.patient_id,
            name: row.name,
            reference_id: row.reference_id,
            gender,
            date_of_birth: row.date_of_birth,
            phone: row.phone,
            email: row.email,
            appointment_date: row.appointment_date,
            op_number: row.op_number,
            department,
            consultation_doctor: row.consultation_doctor,
            consultation_mode,
            if_online: row.if_online,
            referral: row.referral,
            priority: row.priority,
            notes: row.notes,
            patient_type,
            state,
            visit_id: row.visit_id,
            external_ref: row.external_ref,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

fn unknown(what: &str, value: &str) -> DbError {
    DbError::Constraint(format!("Unknown {}: {}", what, value))
}

pub(crate) fn string_to_state(s: &str) -> Result<AppointmentState, DbError> {
    AppointmentState::parse(s).ok_or_else(|| unknown("appointment state", s))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Patient;

    fn setup_db() -> Database {
        let db = Database::open_in_memory().unwrap();
        db.insert_patient(&Patient::new(42, "Anita".into())).unwrap();
        db.insert_patient(&Patient::new(43, "Ravi".into())).unwrap();
        db
    }

    fn make_booking(patient_id: i64, date: &str, op_number: &str) -> Booking {
        let now = chrono::Utc::now().to_rfc3339();
        Booking {
            id: 0,
            patient_id,
            name: "Anita".into(),
            reference_id: format!("EHH-{:06}", patient_id),
            gender: Some(Gender::Female),
            date_of_birth: None,
            phone: None,
            email: None,
            appointment_date: date.parse().unwrap(),
            op_number: op_number.into(),
            department: Some(Department::Panchakarma),
            consultation_doctor: Some("Dr. Nair".into()),
            consultation_mode: Some(ConsultationMode::Offline),
            if_online: None,
            referral: None,
            priority: None,
            notes: None,
            patient_type: PatientType::New,
            state: AppointmentState::Booked,
            visit_id: None,
            external_ref: None,
            created_at: now.clone(),
            updated_at: now,
        }
    }

    #[test]
    fn test_insert_and_get_booking() {
        let db = setup_db();

        let id = db.insert_booking(&make_booking(42, "2024-01-10", "0001")).unwrap();

        let retrieved = db.get_booking(id).unwrap().unwrap();
        assert_eq!(retrieved.id, id);
        assert_eq!(retrieved.reference_id, "EHH-000042");
        assert_eq!(retrieved.op_number, "0001");
        assert_eq!(retrieved.department, Some(Department::Panchakarma));
        assert_eq!(retrieved.consultation_mode, Some(ConsultationMode::Offline));
        assert_eq!(retrieved.state, AppointmentState::Booked);
        assert_eq!(retrieved.appointment_date.to_string(), "2024-01-10");
    }

    #[test]
    fn test_count_excludes_given_booking() {
        let db = setup_db();

        let first = db.insert_booking(&make_booking(42, "2024-01-10", "0001")).unwrap();
        db.insert_booking(&make_booking(42, "2024-02-10", "0002")).unwrap();
        db.insert_booking(&make_booking(43, "2024-02-10", "0003")).unwrap();

        assert_eq!(db.count_bookings_for_patient(42, None).unwrap(), 2);
        assert_eq!(db.count_bookings_for_patient(42, Some(first)).unwrap(), 1);
        assert_eq!(db.count_bookings_for_patient(99, None).unwrap(), 0);
    }

    #[test]
    fn test_first_booking_reference_is_earliest() {
        let db = setup_db();
        assert_eq!(db.first_booking_reference(42).unwrap(), None);

        let mut first = make_booking(42, "2024-03-01", "0001");
        first.reference_id = "TAF-42".into();
        db.insert_booking(&first).unwrap();
        db.insert_booking(&make_booking(42, "2024-01-01", "0002")).unwrap();

        assert_eq!(db.first_booking_reference(42).unwrap(), Some("TAF-42".into()));
    }

    #[test]
    fn test_list_bookings_newest_first() {
        let db = setup_db();

        let a = db.insert_booking(&make_booking(42, "2024-01-10", "0001")).unwrap();
        let b = db.insert_booking(&make_booking(42, "2024-02-10", "0002")).unwrap();
        let c = db.insert_booking(&make_booking(42, "2024-02-10", "0003")).unwrap();

        let ids: Vec<i64> = db
            .list_bookings_for_patient(42)
            .unwrap()
            .into_iter()
            .map(|b| b.id)
            .collect();
        assert_eq!(ids, vec![c, b, a]);
    }

    #[test]
    fn test_find_by_external_ref() {
        let db = setup_db();

        let mut booking = make_booking(42, "2024-01-10", "0001");
        booking.external_ref = Some("TAF-42".into());
        let id = db.insert_booking(&booking).unwrap();

        let found = db.find_booking_by_external_ref("TAF-42").unwrap().unwrap();
        assert_eq!(found.id, id);
        assert!(db.find_booking_by_external_ref("TAF-43").unwrap().is_none());
    }

    #[test]
    fn test_set_state_and_patient_type() {
        let db = setup_db();
        let id = db.insert_booking(&make_booking(42, "2024-01-10", "0001")).unwrap();

        assert!(db.set_booking_state(id, AppointmentState::Completed).unwrap());
        assert!(db.set_booking_patient_type(id, PatientType::Old).unwrap());
        assert!(!db.set_booking_state(id + 100, AppointmentState::Completed).unwrap());

        let retrieved = db.get_booking(id).unwrap().unwrap();
        assert_eq!(retrieved.state, AppointmentState::Completed);
        assert_eq!(retrieved.patient_type, PatientType::Old);
    }

    #[test]
    fn test_update_booking_patient() {
        let db = setup_db();
        let id = db.insert_booking(&make_booking(42, "2024-01-10", "0001")).unwrap();

        let snapshot = BookingPatientSnapshot {
            patient_id: 43,
            name: "Ravi".into(),
            phone: Some("12345".into()),
            email: None,
            reference_id: "EHH-000043".into(),
            patient_type: PatientType::New,
        };
        assert!(db.update_booking_patient(id, &snapshot).unwrap());

        let retrieved = db.get_booking(id).unwrap().unwrap();
        assert_eq!(retrieved.patient_id, 43);
        assert_eq!(retrieved.name, "Ravi");
        assert_eq!(retrieved.reference_id, "EHH-000043");
        assert_eq!(retrieved.phone, Some("12345".into()));
    }
}
