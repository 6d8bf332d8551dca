//! Visit models: the doctor's consultation record.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::booking::{AppointmentState, Booking};

/// Complaint and history notes taken by the doctor.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ClinicalNotes {
    pub chief_complaint: Option<String>,
    pub associated_complaint: Option<String>,
    pub past_history: Option<String>,
    pub family_history: Option<String>,
    pub present_history: Option<String>,
    pub diagnosis: Option<String>,
    pub investigations: Option<String>,
    pub others: Option<String>,
    pub panchakarma_advice: Option<String>,
}

/// Ayurvedic health parameters.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct HealthParameters {
    pub artava: Option<String>,
    pub nadi: Option<String>,
    pub agni: Option<String>,
    pub mala: Option<String>,
    pub mutra: Option<String>,
    pub nidra: Option<String>,
    pub manas: Option<String>,
}

/// Hypertension / diabetes / thyroid status.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Vitals {
    pub htn: String,
    pub dm: String,
    pub th: String,
}

impl Default for Vitals {
    fn default() -> Self {
        Self {
            htn: "Non HTN".into(),
            dm: "Non DM".into(),
            th: "Non TH".into(),
        }
    }
}

/// A persisted visit.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Visit {
    /// Row id
    pub id: i64,
    /// Booking that created this visit
    pub booking_id: Option<i64>,
    pub patient_id: i64,
    /// Patient display name (read from the contact)
    pub patient_name: String,
    /// Reference identifier inherited from the booking
    pub reference_id: Option<String>,
    pub appointment_date: NaiveDate,
    pub notes: ClinicalNotes,
    pub health: HealthParameters,
    pub vitals: Vitals,
    /// Free-text prescription details
    pub prescribed_details: Option<String>,
    pub state: AppointmentState,
    /// Creation timestamp
    pub created_at: String,
}

impl Visit {
    /// Build the visit that accompanies a freshly persisted booking.
    pub fn for_booking(booking: &Booking) -> Self {
        Self {
            id: 0,
            booking_id: Some(booking.id),
            patient_id: booking.patient_id,
            patient_name: booking.name.clone(),
            reference_id: Some(booking.reference_id.clone()),
            appointment_date: booking.appointment_date,
            notes: ClinicalNotes::default(),
            health: HealthParameters::default(),
            vitals: Vitals::default(),
            prescribed_details: None,
            state: booking.state,
            created_at: chrono::Utc::now().to_rfc3339(),
        }
    }

    /// Look up a clinical or health-parameter field by its column name.
    pub fn history_field(&self, field: &str) -> Option<&str> {
        let value = match field {
            "chief_complaint" => &self.notes.chief_complaint,
            "associated_complaint" => &self.notes.associated_complaint,
            "past_history" => &self.notes.past_history,
            "family_history" => &self.notes.family_history,
            "present_history" => &self.notes.present_history,
            "diagnosis" => &self.notes.diagnosis,
            "investigations" => &self.notes.investigations,
            "others" => &self.notes.others,
            "panchakarma_advice" => &self.notes.panchakarma_advice,
            "artava" => &self.health.artava,
            "nadi" => &self.health.nadi,
            "agni" => &self.health.agni,
            "mala" => &self.health.mala,
            "mutra" => &self.health.mutra,
            "nidra" => &self.health.nidra,
            "manas" => &self.health.manas,
            _ => return None,
        };
        value.as_deref().filter(|v| !v.is_empty())
    }
}

/// Clinical data the doctor edits on an existing visit.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct VisitNotesUpdate {
    pub notes: ClinicalNotes,
    pub health: HealthParameters,
    pub vitals: Vitals,
    pub prescribed_details: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vitals_defaults() {
        let vitals = Vitals::default();
        assert_eq!(vitals.htn, "Non HTN");
        assert_eq!(vitals.dm, "Non DM");
        assert_eq!(vitals.th, "Non TH");
    }

    #[test]
    fn test_history_field_skips_empty_values() {
        let mut visit = Visit {
            id: 1,
            booking_id: None,
            patient_id: 42,
            patient_name: "Anita".into(),
            reference_id: None,
            appointment_date: NaiveDate::from_ymd_opt(2024, 1, 10).unwrap(),
            notes: ClinicalNotes::default(),
            health: HealthParameters::default(),
            vitals: Vitals::default(),
            prescribed_details: None,
            state: AppointmentState::Booked,
            created_at: String::new(),
        };
        visit.notes.chief_complaint = Some("cough".into());
        visit.notes.diagnosis = Some(String::new());
        visit.health.nadi = Some("vata".into());

        assert_eq!(visit.history_field("chief_complaint"), Some("cough"));
        assert_eq!(visit.history_field("diagnosis"), None);
        assert_eq!(visit.history_field("nadi"), Some("vata"));
        assert_eq!(visit.history_field("htn"), None);
    }
}
