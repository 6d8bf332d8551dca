//! Intake feed adapter for clinic bookings.
//!
//! Reads the pending-bookings feed exported by the upstream intake source
//! and exposes it as an [`clinic_core::intake::IntakeSource`] so the sync
//! job can consume it.

pub mod feed;

pub use feed::*;
