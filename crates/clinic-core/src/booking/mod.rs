//! Front-desk booking logic.
//!
//! Creating a booking resolves the patient's reference identifier, draws
//! an OP number, classifies the patient as new or old, and writes the
//! booking together with its visit in a single transaction.

mod identity;
mod service;

pub use identity::*;
pub use service::*;

pub use crate::models::age_on;

use crate::db::DbError;
use thiserror::Error;

/// Booking errors.
#[derive(Error, Debug)]
pub enum BookingError {
    #[error("Database error: {0}")]
    Database(#[from] DbError),

    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    #[error("Patient not found: {0}")]
    PatientNotFound(i64),

    #[error("Booking not found: {0}")]
    BookingNotFound(i64),

    #[error("Visit not found: {0}")]
    VisitNotFound(i64),
}

pub type BookingResult<T> = Result<T, BookingError>;
