//! Domain models for the clinic booking system.

mod booking;
mod catalog;
mod intake;
mod patient;
mod prescription;
mod visit;

pub use booking::*;
pub use catalog::*;
pub use intake::*;
pub use patient::*;
pub use prescription::*;
pub use visit::*;
