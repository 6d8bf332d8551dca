//! Runtime configuration.
//!
//! Resolved once at startup and passed by reference into services, so that
//! request handling never reads process-wide state.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Configuration errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid config JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Clinic-wide settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ClinicConfig {
    /// Prefix of generated patient reference identifiers
    pub reference_prefix: String,
    /// Zero-padded width of the patient id in a reference identifier
    pub reference_width: usize,
    /// Prefix of the intake sync key
    pub external_ref_prefix: String,
    /// Sequence code OP numbers are drawn from
    pub op_number_sequence: String,
}

impl Default for ClinicConfig {
    fn default() -> Self {
        Self {
            reference_prefix: "EHH".into(),
            reference_width: 6,
            external_ref_prefix: "TAF".into(),
            op_number_sequence: "appointment.op_number".into(),
        }
    }
}

impl ClinicConfig {
    /// Parse and validate a JSON config. Missing keys take their defaults.
    pub fn from_json(json: &str) -> ConfigResult<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a JSON config file.
    pub fn load<P: AsRef<Path>>(path: P) -> ConfigResult<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.reference_prefix.trim().is_empty() {
            return Err(ConfigError::Invalid("reference_prefix cannot be empty".into()));
        }
        if !(1..=18).contains(&self.reference_width) {
            return Err(ConfigError::Invalid(format!(
                "reference_width must be between 1 and 18, got {}",
                self.reference_width
            )));
        }
        if self.external_ref_prefix.trim().is_empty() {
            return Err(ConfigError::Invalid("external_ref_prefix cannot be empty".into()));
        }
        if self.op_number_sequence.trim().is_empty() {
            return Err(ConfigError::Invalid("op_number_sequence cannot be empty".into()));
        }
        Ok(())
    }
}
