//! Named monotonic sequences (OP numbers and the like).

use std::sync::atomic::{AtomicU64, Ordering};

use rusqlite::{params, OptionalExtension};

use super::{Database, DbError, DbResult};

/// Hands out the next value of a named sequence.
///
/// Implementations must never return the same value twice for a code, even
/// under concurrent callers.
pub trait SequenceAllocator {
    fn next_value(&self, code: &str) -> DbResult<String>;
}

impl Database {
    /// Create a sequence if it does not exist yet.
    pub fn ensure_sequence(&self, code: &str, prefix: &str, padding: u32) -> DbResult<()> {
        self.conn.execute(
            "INSERT OR IGNORE INTO sequences (code, prefix, padding, next_value) VALUES (?1, ?2, ?3, 1)",
            params![code, prefix, padding],
        )?;
        Ok(())
    }

    /// Atomically take the next value of sequence `code`.
    pub fn next_by_code(&self, code: &str) -> DbResult<String> {
        let taken: Option<(String, u32, i64)> = self
            .conn
            .query_row(
                r#"
                UPDATE sequences
                SET next_value = next_value + 1, updated_at = datetime('now')
                WHERE code = ?
                RETURNING prefix, padding, next_value - 1
                "#,
                [code],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .optional()?;

        let (prefix, padding, value) =
            taken.ok_or_else(|| DbError::NotFound(format!("sequence {}", code)))?;
        Ok(format_sequence_value(&prefix, padding as usize, value as u64))
    }
}

impl SequenceAllocator for Database {
    fn next_value(&self, code: &str) -> DbResult<String> {
        self.next_by_code(code)
    }
}

/// Process-local counter, for callers that keep sequence state outside
/// the database. Ignores the code: every code shares the counter.
#[derive(Debug)]
pub struct AtomicSequence {
    prefix: String,
    padding: usize,
    next: AtomicU64,
}

impl AtomicSequence {
    pub fn new(prefix: impl Into<String>, padding: usize, start: u64) -> Self {
        Self {
            prefix: prefix.into(),
            padding,
            next: AtomicU64::new(start),
        }
    }
}

impl SequenceAllocator for AtomicSequence {
    fn next_value(&self, _code: &str) -> DbResult<String> {
        let value = self.next.fetch_add(1, Ordering::SeqCst);
        Ok(format_sequence_value(&self.prefix, self.padding, value))
    }
}

fn format_sequence_value(prefix: &str, padding: usize, value: u64) -> String {
    format!("{}{:0width$}", prefix, value, width = padding)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_op_number_sequence_is_seeded() {
        let db = Database::open_in_memory().unwrap();

        assert_eq!(db.next_by_code("appointment.op_number").unwrap(), "0001");
        assert_eq!(db.next_by_code("appointment.op_number").unwrap(), "0002");
        assert_eq!(db.next_by_code("appointment.op_number").unwrap(), "0003");
    }

    #[test]
    fn test_unknown_sequence() {
        let db = Database::open_in_memory().unwrap();
        let err = db.next_by_code("nope").unwrap_err();
        assert!(matches!(err, DbError::NotFound(_)));
    }

    #[test]
    fn test_ensure_sequence_with_prefix() {
        let db = Database::open_in_memory().unwrap();
        db.ensure_sequence("lab.token", "LAB/", 3).unwrap();
        db.ensure_sequence("lab.token", "IGNORED/", 9).unwrap();

        assert_eq!(db.next_by_code("lab.token").unwrap(), "LAB/001");
        assert_eq!(db.next_by_code("lab.token").unwrap(), "LAB/002");
    }

    #[test]
    fn test_sequence_rolls_back_with_transaction() {
        let db = Database::open_in_memory().unwrap();

        let _: DbResult<()> = db.with_transaction(|db| {
            db.next_by_code("appointment.op_number")?;
            Err(DbError::Constraint("abort".into()))
        });

        assert_eq!(db.next_by_code("appointment.op_number").unwrap(), "0001");
    }

    #[test]
    fn test_atomic_sequence_across_threads() {
        let seq = std::sync::Arc::new(AtomicSequence::new("OP", 5, 1));

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let seq = seq.clone();
                std::thread::spawn(move || {
                    (0..25)
                        .map(|_| seq.next_value("any").unwrap())
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        let mut all: Vec<String> = handles.into_iter().flat_map(|h| h.join().unwrap()).collect();
        all.sort();
        all.dedup();
        assert_eq!(all.len(), 100);
        assert_eq!(all[0], "OP00001");
        assert_eq!(all[99], "OP00100");
    }
}
