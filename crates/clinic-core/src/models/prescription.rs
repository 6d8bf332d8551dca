//! Prescription line models.

use serde::{Deserialize, Serialize};

/// Number of courses a medicine is taken per day.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Course {
    #[serde(rename = "1")]
    One,
    #[serde(rename = "2")]
    Two,
    #[serde(rename = "3")]
    Three,
    #[serde(rename = "4")]
    Four,
}

impl Course {
    pub fn as_str(&self) -> &'static str {
        match self {
            Course::One => "1",
            Course::Two => "2",
            Course::Three => "3",
            Course::Four => "4",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "1" => Some(Course::One),
            "2" => Some(Course::Two),
            "3" => Some(Course::Three),
            "4" => Some(Course::Four),
            _ => None,
        }
    }
}

/// A medicine prescribed during a visit. Owned by exactly one visit and
/// removed with it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PrescriptionLine {
    /// Row id
    pub id: i64,
    /// Owning visit
    pub visit_id: i64,
    /// Catalog medicine
    pub medicine_id: Option<i64>,
    /// Catalog dosage
    pub dosage_id: Option<i64>,
    /// How to take it
    pub usage: Option<String>,
    pub days: u32,
    pub course: Option<Course>,
    pub quantity: u32,
}

/// Input for adding a prescription line to a visit.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct NewPrescriptionLine {
    pub medicine_id: Option<i64>,
    pub dosage_id: Option<i64>,
    pub usage: Option<String>,
    pub days: u32,
    pub course: Option<Course>,
    pub quantity: u32,
}
