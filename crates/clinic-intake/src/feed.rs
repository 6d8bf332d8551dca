//! JSON intake feed parsing.
//!
//! The upstream intake collaborator hands over pending bookings as a JSON
//! document of the form `{"entries": [...]}`, occasionally wrapped in log
//! noise. Only the outermost object is read.

use std::path::Path;

use chrono::NaiveDate;
use clinic_core::intake::{IntakeError, IntakeResult, IntakeSource};
use clinic_core::models::IntakeEntry;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Feed errors.
#[derive(Error, Debug)]
pub enum FeedError {
    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("Invalid feed format: {0}")]
    InvalidFormat(String),

    #[error("Invalid user id: {0}")]
    InvalidUserId(i64),

    #[error("Invalid booking date for user {user_id}: {value:?}")]
    InvalidDate { user_id: i64, value: String },

    #[error("Failed to read feed: {0}")]
    Io(#[from] std::io::Error),
}

pub type FeedResult<T> = Result<T, FeedError>;

/// Raw feed document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntakeFeed {
    pub entries: Vec<FeedEntry>,
}

/// One pending booking as the upstream source reports it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedEntry {
    pub user_id: i64,
    pub patient_name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    /// `YYYY-MM-DD`; missing or empty means today
    #[serde(default)]
    pub booking_date: Option<String>,
}

impl FeedEntry {
    pub fn to_intake_entry(&self) -> FeedResult<IntakeEntry> {
        if self.user_id <= 0 {
            return Err(FeedError::InvalidUserId(self.user_id));
        }
        let booking_date = match self.booking_date.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(value) => Some(NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|_| {
                FeedError::InvalidDate {
                    user_id: self.user_id,
                    value: value.to_string(),
                }
            })?),
        };

        Ok(IntakeEntry {
            user_id: self.user_id,
            patient_name: self.patient_name.clone(),
            email: non_empty(&self.email),
            phone: non_empty(&self.phone),
            booking_date,
        })
    }
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(String::from)
}

/// Parse a feed document.
pub fn parse_intake_feed(json: &str) -> FeedResult<IntakeFeed> {
    let json_start = json
        .find('{')
        .ok_or_else(|| FeedError::InvalidFormat("No JSON object found in feed".into()))?;
    let json_end = json
        .rfind('}')
        .ok_or_else(|| FeedError::InvalidFormat("No closing brace found in feed".into()))?;
    if json_end < json_start {
        return Err(FeedError::InvalidFormat("Closing brace before opening brace".into()));
    }

    let feed: IntakeFeed = serde_json::from_str(&json[json_start..=json_end])?;
    Ok(feed)
}

/// A parsed feed usable as an [`IntakeSource`].
#[derive(Debug, Clone)]
pub struct FeedSource {
    entries: Vec<IntakeEntry>,
}

impl FeedSource {
    /// Parse a feed, rejecting it whole if any entry is malformed.
    pub fn from_json(json: &str) -> FeedResult<Self> {
        let feed = parse_intake_feed(json)?;
        let entries = feed
            .entries
            .iter()
            .map(FeedEntry::to_intake_entry)
            .collect::<FeedResult<Vec<_>>>()?;
        Ok(Self { entries })
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> FeedResult<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl IntakeSource for FeedSource {
    fn pending_entries(&self) -> IntakeResult<Vec<IntakeEntry>> {
        Ok(self.entries.clone())
    }
}

impl From<FeedError> for IntakeError {
    fn from(e: FeedError) -> Self {
        IntakeError::Source(e.to_string())
    }
}
