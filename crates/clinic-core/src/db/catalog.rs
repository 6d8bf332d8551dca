//! Medicine and dosage catalog database operations.

use rusqlite::OptionalExtension;

use super::{Database, DbResult};
use crate::models::{Dosage, Medicine};

impl Database {
    /// Add a medicine to the catalog, returning its id.
    pub fn insert_medicine(&self, name: &str) -> DbResult<i64> {
        self.conn
            .execute("INSERT INTO medicines (name) VALUES (?)", [name])?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Get a medicine by id.
    pub fn get_medicine(&self, id: i64) -> DbResult<Option<Medicine>> {
        self.conn
            .query_row("SELECT id, name FROM medicines WHERE id = ?", [id], |row| {
                Ok(Medicine {
                    id: row.get(0)?,
                    name: row.get(1)?,
                })
            })
            .optional()
            .map_err(Into::into)
    }

    /// List all medicines by name.
    pub fn list_medicines(&self) -> DbResult<Vec<Medicine>> {
        let mut stmt = self.conn.prepare("SELECT id, name FROM medicines ORDER BY name")?;
        let rows = stmt.query_map([], |row| {
            Ok(Medicine {
                id: row.get(0)?,
                name: row.get(1)?,
            })
        })?;

        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    /// Add a dosage to the catalog, returning its id.
    pub fn insert_dosage(&self, name: &str) -> DbResult<i64> {
        self.conn
            .execute("INSERT INTO dosages (name) VALUES (?)", [name])?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Get a dosage by id.
    pub fn get_dosage(&self, id: i64) -> DbResult<Option<Dosage>> {
        self.conn
            .query_row("SELECT id, name FROM dosages WHERE id = ?", [id], |row| {
                Ok(Dosage {
                    id: row.get(0)?,
                    name: row.get(1)?,
                })
            })
            .optional()
            .map_err(Into::into)
    }

    /// List all dosages by name.
    pub fn list_dosages(&self) -> DbResult<Vec<Dosage>> {
        let mut stmt = self.conn.prepare("SELECT id, name FROM dosages ORDER BY name")?;
        let rows = stmt.query_map([], |row| {
            Ok(Dosage {
                id: row.get(0)?,
                name: row.get(1)?,
            })
        })?;

        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }
}
