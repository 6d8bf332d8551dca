//! Patient database operations.

use chrono::NaiveDate;
use rusqlite::{params, OptionalExtension, Row};

use super::{Database, DbError, DbResult};
use crate::models::{Gender, Patient};

const PATIENT_COLUMNS: &str =
    "id, name, phone, email, gender, date_of_birth, created_at, updated_at";

impl Database {
    /// Insert a new patient.
    pub fn insert_patient(&self, patient: &Patient) -> DbResult<()> {
        check_patient_id(patient.id)?;
        self.conn.execute(
            r#"
            INSERT INTO patients (
                id, name, phone, email, gender, date_of_birth, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
            params![
                patient.id,
                patient.name,
                patient.phone,
                patient.email,
                patient.gender.map(|g| g.as_str()),
                patient.date_of_birth,
                patient.created_at,
                patient.updated_at,
            ],
        )?;
        Ok(())
    }

    /// Insert or update a patient contact.
    pub fn upsert_patient(&self, patient: &Patient) -> DbResult<()> {
        check_patient_id(patient.id)?;
        self.conn.execute(
            r#"
            INSERT INTO patients (
                id, name, phone, email, gender, date_of_birth, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                phone = excluded.phone,
                email = excluded.email,
                gender = excluded.gender,
                date_of_birth = excluded.date_of_birth,
                updated_at = datetime('now')
            "#,
            params![
                patient.id,
                patient.name,
                patient.phone,
                patient.email,
                patient.gender.map(|g| g.as_str()),
                patient.date_of_birth,
                patient.created_at,
                patient.updated_at,
            ],
        )?;
        Ok(())
    }

    /// Insert the patient only if no contact with that id exists yet.
    ///
    /// Returns true when a row was inserted.
    pub fn ensure_patient(&self, patient: &Patient) -> DbResult<bool> {
        check_patient_id(patient.id)?;
        let rows_affected = self.conn.execute(
            r#"
            INSERT OR IGNORE INTO patients (
                id, name, phone, email, gender, date_of_birth, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
            params![
                patient.id,
                patient.name,
                patient.phone,
                patient.email,
                patient.gender.map(|g| g.as_str()),
                patient.date_of_birth,
                patient.created_at,
                patient.updated_at,
            ],
        )?;
        Ok(rows_affected > 0)
    }

    /// Get a patient by id.
    pub fn get_patient(&self, id: i64) -> DbResult<Option<Patient>> {
        self.conn
            .query_row(
                &format!("SELECT {PATIENT_COLUMNS} FROM patients WHERE id = ?"),
                [id],
                PatientRow::read,
            )
            .optional()?
            .map(Patient::try_from)
            .transpose()
    }

    /// Search patients by name (prefix match).
    pub fn search_patients(&self, query: &str, limit: usize) -> DbResult<Vec<Patient>> {
        let pattern = format!("{}%", query);
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {PATIENT_COLUMNS} FROM patients WHERE name LIKE ? ORDER BY name LIMIT ?"
        ))?;

        let rows = stmt.query_map(params![pattern, limit as i64], PatientRow::read)?;

        let mut patients = Vec::new();
        for row in rows {
            patients.push(row?.try_into()?);
        }
        Ok(patients)
    }

    /// List all patients.
    pub fn list_patients(&self) -> DbResult<Vec<Patient>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {PATIENT_COLUMNS} FROM patients ORDER BY name, id"
        ))?;

        let rows = stmt.query_map([], PatientRow::read)?;

        let mut patients = Vec::new();
        for row in rows {
            patients.push(row?.try_into()?);
        }
        Ok(patients)
    }

    /// Delete a patient. Fails while bookings or visits still reference them.
    pub fn delete_patient(&self, id: i64) -> DbResult<bool> {
        let rows_affected = self.conn.execute("DELETE FROM patients WHERE id = ?", [id])?;
        Ok(rows_affected > 0)
    }
}

/// Contact ids are positive; reference identifiers are built from them.
fn check_patient_id(id: i64) -> DbResult<()> {
    if id <= 0 {
        return Err(DbError::Constraint(format!("Patient id must be positive, got {}", id)));
    }
    Ok(())
}

/// Intermediate row struct for database mapping.
struct PatientRow {
    id: i64,
    name: String,
    phone: Option<String>,
    email: Option<String>,
    gender: Option<String>,
    date_of_birth: Option<NaiveDate>,
    created_at: String,
    updated_at: String,
}

impl PatientRow {
    fn read(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            name: row.get(1)?,
            phone: row.get(2)?,
            email: row.get(3)?,
            gender: row.get(4)?,
            date_of_birth: row.get(5)?,
            created_at: row.get(6)?,
            updated_at: row.get(7)?,
        })
    }
}

impl TryFrom<PatientRow> for Patient {
    type Error = DbError;

    fn try_from(row: PatientRow) -> Result<Self, Self::Error> {
        let gender = row
            .gender
            .map(|g| {
                Gender::parse(&g).ok_or_else(|| DbError::Constraint(format!("Unknown gender: {}", g)))
            })
            .transpose()?;

        Ok(Patient {
            id: row.id,
            name: row.name,
            phone: row.phone,
            email: row.email,
            gender,
            date_of_birth: row.date_of_birth,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}
