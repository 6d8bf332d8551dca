//! SQLite schema definition.

/// Complete database schema for the clinic record store.
pub const SCHEMA: &str = r#"
-- Enable foreign keys
PRAGMA foreign_keys = ON;

-- ============================================================================
-- Patients (contact directory; ids are assigned upstream)
-- ============================================================================

CREATE TABLE IF NOT EXISTS patients (
    id INTEGER PRIMARY KEY CHECK (id > 0),
    name TEXT NOT NULL,
    phone TEXT,
    email TEXT,
    gender TEXT CHECK (gender IN ('male', 'female', 'others')),
    date_of_birth TEXT,
    created_at TEXT NOT NULL DEFAULT (datetime('now')),
    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE INDEX IF NOT EXISTS idx_patients_name ON patients(name);

-- ============================================================================
-- Bookings
-- ============================================================================

CREATE TABLE IF NOT EXISTS bookings (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    patient_id INTEGER NOT NULL REFERENCES patients(id),
    name TEXT NOT NULL,
    reference_id TEXT NOT NULL,
    gender TEXT CHECK (gender IN ('male', 'female', 'others')),
    date_of_birth TEXT,
    phone TEXT,
    email TEXT,
    appointment_date TEXT NOT NULL,
    op_number TEXT NOT NULL,
    department TEXT,
    consultation_doctor TEXT,
    consultation_mode TEXT CHECK (consultation_mode IN ('online', 'offline')),
    if_online TEXT,
    referral TEXT,
    priority TEXT,
    notes TEXT,
    patient_type TEXT NOT NULL DEFAULT 'new' CHECK (patient_type IN ('new', 'old')),
    state TEXT NOT NULL DEFAULT 'booked' CHECK (state IN ('booked', 'completed', 'cancelled')),
    visit_id INTEGER REFERENCES visits(id) ON DELETE SET NULL,
    external_ref TEXT UNIQUE,                    -- intake sync key, NULL for desk bookings
    created_at TEXT NOT NULL DEFAULT (datetime('now')),
    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE INDEX IF NOT EXISTS idx_bookings_patient ON bookings(patient_id);
CREATE INDEX IF NOT EXISTS idx_bookings_op_number ON bookings(op_number);

-- ============================================================================
-- Visits (doctor consultation records, 1:1 with bookings)
-- ============================================================================

CREATE TABLE IF NOT EXISTS visits (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    booking_id INTEGER UNIQUE REFERENCES bookings(id) ON DELETE SET NULL,
    patient_id INTEGER NOT NULL REFERENCES patients(id),
    reference_id TEXT,
    appointment_date TEXT NOT NULL,
    chief_complaint TEXT,
    associated_complaint TEXT,
    past_history TEXT,
    family_history TEXT,
    present_history TEXT,
    diagnosis TEXT,
    investigations TEXT,
    others TEXT,
    panchakarma_advice TEXT,
    artava TEXT,
    nadi TEXT,
    agni TEXT,
    mala TEXT,
    mutra TEXT,
    nidra TEXT,
    manas TEXT,
    htn TEXT NOT NULL DEFAULT 'Non HTN',
    dm TEXT NOT NULL DEFAULT 'Non DM',
    th TEXT NOT NULL DEFAULT 'Non TH',
    prescribed_details TEXT,
    state TEXT NOT NULL DEFAULT 'booked' CHECK (state IN ('booked', 'completed', 'cancelled')),
    created_at TEXT NOT NULL DEFAULT (datetime('now')),
    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
);

-- History lookups: same patient, earlier date
CREATE INDEX IF NOT EXISTS idx_visits_patient_date ON visits(patient_id, appointment_date);

-- ============================================================================
-- Medicine Catalog
-- ============================================================================

CREATE TABLE IF NOT EXISTS medicines (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL UNIQUE
);

CREATE TABLE IF NOT EXISTS dosages (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL UNIQUE
);

-- ============================================================================
-- Prescription Lines (owned by a visit)
-- ============================================================================

CREATE TABLE IF NOT EXISTS prescription_lines (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    visit_id INTEGER NOT NULL REFERENCES visits(id) ON DELETE CASCADE,
    medicine_id INTEGER REFERENCES medicines(id),
    dosage_id INTEGER REFERENCES dosages(id),
    usage TEXT,
    days INTEGER NOT NULL DEFAULT 0,
    course TEXT CHECK (course IN ('1', '2', '3', '4')),
    quantity INTEGER NOT NULL DEFAULT 0
);

CREATE INDEX IF NOT EXISTS idx_prescription_lines_visit ON prescription_lines(visit_id);

-- ============================================================================
-- Sequences
-- ============================================================================

CREATE TABLE IF NOT EXISTS sequences (
    code TEXT PRIMARY KEY,
    prefix TEXT NOT NULL DEFAULT '',
    padding INTEGER NOT NULL DEFAULT 0,
    next_value INTEGER NOT NULL DEFAULT 1,
    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
);

INSERT OR IGNORE INTO sequences (code, prefix, padding, next_value)
VALUES ('appointment.op_number', '', 4, 1);
"#;
