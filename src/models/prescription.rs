use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Issued against exactly one completed appointment. `patient_id` and
/// `doctor_id` are denormalized from the appointment for query convenience
/// and must stay consistent with it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Prescription {
    pub id: Uuid,
    pub appointment_id: Uuid,
    pub patient_id: Uuid,
    pub doctor_id: Uuid,
    pub diagnosis: String,
    pub medications: Vec<Medication>,
    pub additional_notes: Option<String>,
    pub follow_up_date: Option<NaiveDate>,
    pub is_paid: bool,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

/// One row of a prescription's medication list. Never addressable outside
/// its prescription.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Medication {
    pub name: String,
    pub dosage: String,
    pub frequency: String,
    pub duration: String,
    pub instructions: Option<String>,
}

/// Inbound prescription request (transport-agnostic boundary contract).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrescriptionRequest {
    pub appointment_id: Uuid,
    pub diagnosis: String,
    pub medications: Vec<Medication>,
    pub additional_notes: Option<String>,
    pub follow_up_date: Option<NaiveDate>,
}
