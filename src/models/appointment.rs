use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::{AppointmentStatus, Role};

/// A booked slot: one (doctor, date, time) triple held by one patient.
///
/// `consultation_fee` is snapshotted at booking time; later changes to the
/// doctor's fee never alter it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Appointment {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub doctor_id: Uuid,
    pub appointment_date: NaiveDate,
    pub appointment_time: NaiveTime,
    pub consultation_fee: f64,
    pub status: AppointmentStatus,
    pub reason: String,
    pub notes: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

/// Inbound booking request (transport-agnostic boundary contract).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingRequest {
    pub doctor_id: Uuid,
    pub appointment_date: NaiveDate,
    pub appointment_time: NaiveTime,
    pub consultation_fee: f64,
    pub reason: String,
    pub notes: Option<String>,
}

/// Caller-initiated status transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionAction {
    /// Patient withdraws a scheduled appointment.
    Cancel,
    /// Doctor withdraws a scheduled appointment.
    DoctorCancel,
    /// Doctor marks the visit as held.
    Complete,
}

impl TransitionAction {
    /// Status the appointment ends up in when the transition applies.
    pub fn target_status(self) -> AppointmentStatus {
        match self {
            Self::Cancel => AppointmentStatus::CancelledByPatient,
            Self::DoctorCancel => AppointmentStatus::CancelledByDoctor,
            Self::Complete => AppointmentStatus::Completed,
        }
    }

    /// Role whose profile must own the appointment for this action.
    pub fn acting_role(self) -> Role {
        match self {
            Self::Cancel => Role::Patient,
            Self::DoctorCancel | Self::Complete => Role::Doctor,
        }
    }
}
