//! Pending bookings reported by the upstream intake source.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One pending entry from the intake source.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IntakeEntry {
    /// Upstream user id; doubles as the patient contact id
    pub user_id: i64,
    pub patient_name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    /// Requested date; today when absent
    pub booking_date: Option<NaiveDate>,
}

impl IntakeEntry {
    pub fn new(user_id: i64, patient_name: String) -> Self {
        Self {
            user_id,
            patient_name,
            email: None,
            phone: None,
            booking_date: None,
        }
    }
}
