//! Visit database operations.

use chrono::NaiveDate;
use rusqlite::{params, OptionalExtension, Row};

use super::bookings::string_to_state;
use super::{Database, DbError, DbResult};
use crate::models::{
    AppointmentState, ClinicalNotes, HealthParameters, Visit, VisitNotesUpdate, Vitals,
};

const VISIT_SELECT: &str = r#"
    SELECT v.id, v.booking_id, v.patient_id, p.name, v.reference_id, v.appointment_date,
           v.chief_complaint, v.associated_complaint, v.past_history, v.family_history,
           v.present_history, v.diagnosis, v.investigations, v.others, v.panchakarma_advice,
           v.artava, v.nadi, v.agni, v.mala, v.mutra, v.nidra, v.manas,
           v.htn, v.dm, v.th, v.prescribed_details, v.state, v.created_at
    FROM visits v
    JOIN patients p ON p.id = v.patient_id
"#;

impl Database {
    /// Insert a new visit, returning its row id. `visit.id` and
    /// `visit.patient_name` are ignored.
    pub fn insert_visit(&self, visit: &Visit) -> DbResult<i64> {
        self.conn.execute(
            r#"
            INSERT INTO visits (
                booking_id, patient_id, reference_id, appointment_date,
                chief_complaint, associated_complaint, past_history, family_history,
                present_history, diagnosis, investigations, others, panchakarma_advice,
                artava, nadi, agni, mala, mutra, nidra, manas,
                htn, dm, th, prescribed_details, state, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15,
                      ?16, ?17, ?18, ?19, ?20, ?21, ?22, ?23, ?24, ?25, ?26)
            "#,
            params![
                visit.booking_id,
                visit.patient_id,
                visit.reference_id,
                visit.appointment_date,
                visit.notes.chief_complaint,
                visit.notes.associated_complaint,
                visit.notes.past_history,
                visit.notes.family_history,
                visit.notes.present_history,
                visit.notes.diagnosis,
                visit.notes.investigations,
                visit.notes.others,
                visit.notes.panchakarma_advice,
                visit.health.artava,
                visit.health.nadi,
                visit.health.agni,
                visit.health.mala,
                visit.health.mutra,
                visit.health.nidra,
                visit.health.manas,
                visit.vitals.htn,
                visit.vitals.dm,
                visit.vitals.th,
                visit.prescribed_details,
                visit.state.as_str(),
                visit.created_at,
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Get a visit by id.
    pub fn get_visit(&self, id: i64) -> DbResult<Option<Visit>> {
        self.conn
            .query_row(&format!("{VISIT_SELECT} WHERE v.id = ?"), [id], VisitRow::read)
            .optional()?
            .map(Visit::try_from)
            .transpose()
    }

    /// Get the visit created for a booking.
    pub fn get_visit_for_booking(&self, booking_id: i64) -> DbResult<Option<Visit>> {
        self.conn
            .query_row(
                &format!("{VISIT_SELECT} WHERE v.booking_id = ?"),
                [booking_id],
                VisitRow::read,
            )
            .optional()?
            .map(Visit::try_from)
            .transpose()
    }

    /// List a patient's visits, newest first.
    pub fn list_visits_for_patient(&self, patient_id: i64) -> DbResult<Vec<Visit>> {
        let mut stmt = self.conn.prepare(&format!(
            "{VISIT_SELECT} WHERE v.patient_id = ? ORDER BY v.appointment_date DESC, v.id DESC"
        ))?;

        let rows = stmt.query_map([patient_id], VisitRow::read)?;

        let mut visits = Vec::new();
        for row in rows {
            visits.push(row?.try_into()?);
        }
        Ok(visits)
    }

    /// Visits of `patient_id` dated strictly before `before`, newest first.
    ///
    /// Same-day visits are ordered by descending id so the result is stable.
    pub fn prior_visits(
        &self,
        patient_id: i64,
        before: NaiveDate,
        exclude: Option<i64>,
        limit: Option<usize>,
    ) -> DbResult<Vec<Visit>> {
        let mut stmt = self.conn.prepare(&format!(
            r#"
            {VISIT_SELECT}
            WHERE v.patient_id = ?1
              AND v.appointment_date < ?2
              AND (?3 IS NULL OR v.id != ?3)
            ORDER BY v.appointment_date DESC, v.id DESC
            LIMIT ?4
            "#
        ))?;

        let limit = limit.map(|l| l as i64).unwrap_or(-1);
        let rows = stmt.query_map(params![patient_id, before, exclude, limit], VisitRow::read)?;

        let mut visits = Vec::new();
        for row in rows {
            visits.push(row?.try_into()?);
        }
        Ok(visits)
    }

    /// Reference identifier of the patient's earliest visit, if any.
    pub fn first_visit_reference(&self, patient_id: i64) -> DbResult<Option<String>> {
        self.conn
            .query_row(
                r#"
                SELECT reference_id FROM visits
                WHERE patient_id = ? AND reference_id IS NOT NULL AND reference_id != ''
                ORDER BY id
                LIMIT 1
                "#,
                [patient_id],
                |row| row.get(0),
            )
            .optional()
            .map_err(Into::into)
    }

    /// Replace the clinical data of a visit.
    pub fn update_visit_notes(&self, visit_id: i64, update: &VisitNotesUpdate) -> DbResult<bool> {
        let rows_affected = self.conn.execute(
            r#"
            UPDATE visits SET
                chief_complaint = ?2,
                associated_complaint = ?3,
                past_history = ?4,
                family_history = ?5,
                present_history = ?6,
                diagnosis = ?7,
                investigations = ?8,
                others = ?9,
                panchakarma_advice = ?10,
                artava = ?11,
                nadi = ?12,
                agni = ?13,
                mala = ?14,
                mutra = ?15,
                nidra = ?16,
                manas = ?17,
                htn = ?18,
                dm = ?19,
                th = ?20,
                prescribed_details = ?21,
                updated_at = datetime('now')
            WHERE id = ?1
            "#,
            params![
                visit_id,
                update.notes.chief_complaint,
                update.notes.associated_complaint,
                update.notes.past_history,
                update.notes.family_history,
                update.notes.present_history,
                update.notes.diagnosis,
                update.notes.investigations,
                update.notes.others,
                update.notes.panchakarma_advice,
                update.health.artava,
                update.health.nadi,
                update.health.agni,
                update.health.mala,
                update.health.mutra,
                update.health.nidra,
                update.health.manas,
                update.vitals.htn,
                update.vitals.dm,
                update.vitals.th,
                update.prescribed_details,
            ],
        )?;
        Ok(rows_affected > 0)
    }

    /// Set a visit's lifecycle state.
    pub fn set_visit_state(&self, visit_id: i64, state: AppointmentState) -> DbResult<bool> {
        let rows_affected = self.conn.execute(
            "UPDATE visits SET state = ?1, updated_at = datetime('now') WHERE id = ?2",
            params![state.as_str(), visit_id],
        )?;
        Ok(rows_affected > 0)
    }

    /// Delete a visit together with its prescription lines.
    pub fn delete_visit(&self, visit_id: i64) -> DbResult<bool> {
        let rows_affected = self.conn.execute("DELETE FROM visits WHERE id = ?", [visit_id])?;
        Ok(rows_affected > 0)
    }
}

/// Intermediate row struct for database mapping.
struct VisitRow {
    id: i64,
    booking_id: Option<i64>,
    patient_id: i64,
    patient_name: String,
    reference_id: Option<String>,
    appointment_date: NaiveDate,
    notes: ClinicalNotes,
    health: HealthParameters,
    vitals: Vitals,
    prescribed_details: Option<String>,
    state: String,
    created_at: String,
}

impl VisitRow {
    fn read(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            booking_id: row.get(1)?,
            patient_id: row.get(2)?,
            patient_name: row.get(3)?,
            reference_id: row.get(4)?,
            appointment_date: row.get(5)?,
            notes: ClinicalNotes {
                chief_complaint: row.get(6)?,
                associated_complaint: row.get(7)?,
                past_history: row.get(8)?,
                family_history: row.get(9)?,
                present_history: row.get(10)?,
                diagnosis: row.get(11)?,
                investigations: row.get(12)?,
                others: row.get(13)?,
                panchakarma_advice: row.get(14)?,
            },
            health: HealthParameters {
                artava: row.get(15)?,
                nadi: row.get(16)?,
                agni: row.get(17)?,
                mala: row.get(18)?,
                mutra: row.get(19)?,
                nidra: row.get(20)?,
                manas: row.get(21)?,
            },
            vitals: Vitals {
                htn: row.get(22)?,
                dm: row.get(23)?,
                th: row.get(24)?,
            },
            prescribed_details: row.get(25)?,
            state: row.get(26)?,
            created_at: row.get(27)?,
        })
    }
}

impl TryFrom<VisitRow> for Visit {
    type Error = DbError;

    fn try_from(row: VisitRow) -> Result<Self, Self::Error> {
        let state = string_to_state(&row.state)?;

        Ok(Visit {
            id: row.id,
            booking_id: row.booking_id,
            patient_id: row.patient_id,
            patient_name: row.patient_name,
            reference_id: row.reference_id,
            appointment_date: row.appointment_date,
            notes: row.notes,
            health: row.health,
            vitals: row.vitals,
            prescribed_details: row.prescribed_details,
            state,
            created_at: row.created_at,
        })
    }
}
