//! Booking models: the appointment request taken at the front desk.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use super::patient::Gender;

/// Lifecycle state shared by bookings and visits.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentState {
    /// Appointment booked
    #[default]
    Booked,
    /// Consultation completed
    Completed,
    /// Cancelled
    Cancelled,
}

impl AppointmentState {
    pub fn as_str(&self) -> &'static str {
        match self {
            AppointmentState::Booked => "booked",
            AppointmentState::Completed => "completed",
            AppointmentState::Cancelled => "cancelled",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "booked" => Some(AppointmentState::Booked),
            "completed" => Some(AppointmentState::Completed),
            "cancelled" => Some(AppointmentState::Cancelled),
            _ => None,
        }
    }
}

/// New vs. returning patient, decided by whether other bookings exist.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum PatientType {
    #[default]
    New,
    Old,
}

impl PatientType {
    /// Classify from the number of *other* bookings held by the patient.
    pub fn from_prior_count(count: u64) -> Self {
        if count > 0 {
            PatientType::Old
        } else {
            PatientType::New
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PatientType::New => "new",
            PatientType::Old => "old",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "new" => Some(PatientType::New),
            "old" => Some(PatientType::Old),
            _ => None,
        }
    }
}

/// Clinic department the booking is routed to.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Department {
    Kayachikitsa,
    Panchakarma,
    StreerogamPrasutitantra,
    Kaumarabrityam,
    Shalyam,
    Shalakyam,
    Swastavrittan,
    Emergency,
    Ip,
    CounterSales,
}

impl Department {
    pub fn as_str(&self) -> &'static str {
        match self {
            Department::Kayachikitsa => "kayachikitsa",
            Department::Panchakarma => "panchakarma",
            Department::StreerogamPrasutitantra => "streerogam_prasutitantra",
            Department::Kaumarabrityam => "kaumarabrityam",
            Department::Shalyam => "shalyam",
            Department::Shalakyam => "shalakyam",
            Department::Swastavrittan => "swastavrittan",
            Department::Emergency => "emergency",
            Department::Ip => "ip",
            Department::CounterSales => "counter_sales",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "kayachikitsa" => Some(Department::Kayachikitsa),
            "panchakarma" => Some(Department::Panchakarma),
            "streerogam_prasutitantra" => Some(Department::StreerogamPrasutitantra),
            "kaumarabrityam" => Some(Department::Kaumarabrityam),
            "shalyam" => Some(Department::Shalyam),
            "shalakyam" => Some(Department::Shalakyam),
            "swastavrittan" => Some(Department::Swastavrittan),
            "emergency" => Some(Department::Emergency),
            "ip" => Some(Department::Ip),
            "counter_sales" => Some(Department::CounterSales),
            _ => None,
        }
    }

    /// Label printed on the OP slip.
    pub fn label(&self) -> &'static str {
        match self {
            Department::Kayachikitsa => "KAYACHIKITSA",
            Department::Panchakarma => "PANCHAKARMA",
            Department::StreerogamPrasutitantra => "STREEROGAM & PRASUTITANTRA",
            Department::Kaumarabrityam => "KAUMARABRITYAM",
            Department::Shalyam => "SHALAYAM",
            Department::Shalakyam => "SHALAKYAM",
            Department::Swastavrittan => "SWASTAVRITTAN",
            Department::Emergency => "EMERGENCY",
            Department::Ip => "IP",
            Department::CounterSales => "COUNTER SALES",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ConsultationMode {
    Online,
    Offline,
}

impl ConsultationMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConsultationMode::Online => "online",
            ConsultationMode::Offline => "offline",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "online" => Some(ConsultationMode::Online),
            "offline" => Some(ConsultationMode::Offline),
            _ => None,
        }
    }
}

/// A persisted booking.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Booking {
    /// Row id
    pub id: i64,
    /// Patient contact id
    pub patient_id: i64,
    /// Patient display name, copied from the contact at creation
    pub name: String,
    /// Patient-scoped reference identifier (e.g. `EHH-000042`)
    pub reference_id: String,
    pub gender: Option<Gender>,
    pub date_of_birth: Option<NaiveDate>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub appointment_date: NaiveDate,
    /// Sequential OP number, assigned once at creation
    pub op_number: String,
    pub department: Option<Department>,
    pub consultation_doctor: Option<String>,
    pub consultation_mode: Option<ConsultationMode>,
    /// Call link or instructions for online consultations
    pub if_online: Option<String>,
    pub referral: Option<String>,
    pub priority: Option<String>,
    pub notes: Option<String>,
    pub patient_type: PatientType,
    pub state: AppointmentState,
    /// Linked visit, set right after creation
    pub visit_id: Option<i64>,
    /// Intake sync key, present only on bookings created by the sync job
    pub external_ref: Option<String>,
    /// Creation timestamp
    pub created_at: String,
    /// Last update timestamp
    pub updated_at: String,
}

impl Booking {
    /// Age in whole years on `today`.
    pub fn age_on(&self, today: NaiveDate) -> i32 {
        age_on(self.date_of_birth, today)
    }

    /// Age in whole years as of the local date.
    pub fn age(&self) -> i32 {
        self.age_on(chrono::Local::now().date_naive())
    }

    pub fn is_cancelled(&self) -> bool {
        self.state == AppointmentState::Cancelled
    }
}

/// Input for creating a booking.
///
/// `patient_id` and `appointment_date` are required; they are optional here
/// so that a missing value surfaces as a field-level validation error rather
/// than a type error at the call site.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct NewBooking {
    pub patient_id: Option<i64>,
    pub appointment_date: Option<NaiveDate>,
    pub gender: Option<Gender>,
    pub date_of_birth: Option<NaiveDate>,
    /// Falls back to the patient's phone
    pub phone: Option<String>,
    /// Falls back to the patient's email
    pub email: Option<String>,
    /// Pre-assigned OP number; `None` or `"New"` allocates one
    pub op_number: Option<String>,
    pub department: Option<Department>,
    pub consultation_doctor: Option<String>,
    pub consultation_mode: Option<ConsultationMode>,
    pub if_online: Option<String>,
    pub referral: Option<String>,
    pub priority: Option<String>,
    pub notes: Option<String>,
    /// Initial state, `Booked` when absent
    pub state: Option<AppointmentState>,
    /// Reference to use when the patient has none yet
    pub reference_id: Option<String>,
    pub external_ref: Option<String>,
}

impl NewBooking {
    /// Minimal booking for a patient on a date.
    pub fn new(patient_id: i64, appointment_date: NaiveDate) -> Self {
        Self {
            patient_id: Some(patient_id),
            appointment_date: Some(appointment_date),
            ..Default::default()
        }
    }
}

/// Whole years between `birth` and `today`; zero when no birth date is known.
pub fn age_on(birth: Option<NaiveDate>, today: NaiveDate) -> i32 {
    match birth {
        Some(birth) => {
            let before_birthday = (today.month(), today.day()) < (birth.month(), birth.day());
            today.year() - birth.year() - i32::from(before_birthday)
        }
        None => 0,
    }
}
