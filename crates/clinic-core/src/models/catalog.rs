//! Medicine and dosage catalog models.

use serde::{Deserialize, Serialize};

/// A dispensable medicine.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Medicine {
    pub id: i64,
    pub name: String,
}

/// A dosage instruction (e.g. "1-0-1 after food").
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Dosage {
    pub id: i64,
    pub name: String,
}
