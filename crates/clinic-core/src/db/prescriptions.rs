//! Prescription line database operations.

use chrono::NaiveDate;
use rusqlite::{params, OptionalExtension, Row};

use super::{Database, DbError, DbResult};
use crate::models::{Course, NewPrescriptionLine, PrescriptionLine};

const LINE_COLUMNS: &str =
    "l.id, l.visit_id, l.medicine_id, l.dosage_id, l.usage, l.days, l.course, l.quantity";

impl Database {
    /// Add a prescription line to a visit, returning its row id.
    pub fn insert_prescription_line(&self, visit_id: i64, line: &NewPrescriptionLine) -> DbResult<i64> {
        self.conn.execute(
            r#"
            INSERT INTO prescription_lines (
                visit_id, medicine_id, dosage_id, usage, days, course, quantity
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
            params![
                visit_id,
                line.medicine_id,
                line.dosage_id,
                line.usage,
                line.days,
                line.course.map(|c| c.as_str()),
                line.quantity,
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Get a prescription line by id.
    pub fn get_prescription_line(&self, id: i64) -> DbResult<Option<PrescriptionLine>> {
        self.conn
            .query_row(
                &format!("SELECT {LINE_COLUMNS} FROM prescription_lines l WHERE l.id = ?"),
                [id],
                LineRow::read,
            )
            .optional()?
            .map(PrescriptionLine::try_from)
            .transpose()
    }

    /// List the lines of one visit in entry order.
    pub fn list_prescription_lines(&self, visit_id: i64) -> DbResult<Vec<PrescriptionLine>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {LINE_COLUMNS} FROM prescription_lines l WHERE l.visit_id = ? ORDER BY l.id"
        ))?;

        let rows = stmt.query_map([visit_id], LineRow::read)?;

        let mut lines = Vec::new();
        for row in rows {
            lines.push(row?.try_into()?);
        }
        Ok(lines)
    }

    /// Lines of every visit of `patient_id` dated strictly before `before`.
    ///
    /// Grouped by visit in the same order as [`Database::prior_visits`],
    /// entry order within a visit.
    pub fn prior_prescription_lines(
        &self,
        patient_id: i64,
        before: NaiveDate,
        exclude: Option<i64>,
    ) -> DbResult<Vec<PrescriptionLine>> {
        let mut stmt = self.conn.prepare(&format!(
            r#"
            SELECT {LINE_COLUMNS}
            FROM prescription_lines l
            JOIN visits v ON v.id = l.visit_id
            WHERE v.patient_id = ?1
              AND v.appointment_date < ?2
              AND (?3 IS NULL OR v.id != ?3)
            ORDER BY v.appointment_date DESC, v.id DESC, l.id
            "#
        ))?;

        let rows = stmt.query_map(params![patient_id, before, exclude], LineRow::read)?;

        let mut lines = Vec::new();
        for row in rows {
            lines.push(row?.try_into()?);
        }
        Ok(lines)
    }

    /// Update an existing line. The owning visit cannot change.
    pub fn update_prescription_line(&self, line: &PrescriptionLine) -> DbResult<bool> {
        let rows_affected = self.conn.execute(
            r#"
            UPDATE prescription_lines SET
                medicine_id = ?2,
                dosage_id = ?3,
                usage = ?4,
                days = ?5,
                course = ?6,
                quantity = ?7
            WHERE id = ?1
            "#,
            params![
                line.id,
                line.medicine_id,
                line.dosage_id,
                line.usage,
                line.days,
                line.course.map(|c| c.as_str()),
                line.quantity,
            ],
        )?;
        Ok(rows_affected > 0)
    }

    /// Delete a prescription line.
    pub fn delete_prescription_line(&self, id: i64) -> DbResult<bool> {
        let rows_affected = self
            .conn
            .execute("DELETE FROM prescription_lines WHERE id = ?", [id])?;
        Ok(rows_affected > 0)
    }
}

/// Intermediate row struct for database mapping.
struct LineRow {
    id: i64,
    visit_id: i64,
    medicine_id: Option<i64>,
    dosage_id: Option<i64>,
    usage: Option<String>,
    days: u32,
    course: Option<String>,
    quantity: u32,
}

impl LineRow {
    fn read(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            visit_id: row.get(1)?,
            medicine_id: row.get(2)?,
            dosage_id: row.get(3)?,
            usage: row.get(4)?,
            days: row.get(5)?,
            course: row.get(6)?,
            quantity: row.get(7)?,
        })
    }
}

impl TryFrom<LineRow> for PrescriptionLine {
    type Error = DbError;

    fn try_from(row: LineRow) -> Result<Self, Self::Error> {
        let course = row
            .course
            .map(|c| Course::parse(&c).ok_or_else(|| DbError::Constraint(format!("Unknown course: {}", c))))
            .transpose()?;

        Ok(PrescriptionLine {
            id: row.id,
            visit_id: row.visit_id,
            medicine_id: row.medicine_id,
            dosage_id: row.dosage_id,
            usage: row.usage,
            days: row.days,
            course,
            quantity: row.quantity,
        })
    }
}
