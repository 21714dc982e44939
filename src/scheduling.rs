//! Scheduling engine — appointment booking, visibility, and the status
//! state machine.
//!
//! Booking exclusivity is guaranteed by the partial unique index on
//! (doctor, date, time) where status = 'scheduled': the advisory pre-check
//! gives the friendly error, and a lost insert race surfaces as a unique
//! violation which also maps to `SlotUnavailable`. Transitions are a
//! single-statement compare-and-swap on `status = 'scheduled'`, so a race
//! between complete and cancel has exactly one winner.

use chrono::Local;
use rusqlite::Connection;
use tracing::info;
use uuid::Uuid;

use crate::access::{ensure_access, Caller};
use crate::db;
use crate::error::CoreError;
use crate::models::{
    Appointment, AppointmentStatus, BookingRequest, Role, TransitionAction,
};
use crate::validate::{require_non_empty, require_positive};

/// Books a slot for the calling patient. The consultation fee is stored as
/// a snapshot; later doctor fee changes never alter it.
pub fn book(
    conn: &Connection,
    caller: &Caller,
    request: &BookingRequest,
) -> Result<Appointment, CoreError> {
    let patient_id = match (caller.is_patient(), caller.patient_id) {
        (true, Some(id)) => id,
        _ => return Err(CoreError::Forbidden),
    };

    require_positive("consultation_fee", request.consultation_fee)?;
    require_non_empty("reason", &request.reason)?;

    // Doctor must exist before we touch the slot.
    db::get_doctor(conn, &request.doctor_id)?;

    if db::find_scheduled_conflict(
        conn,
        &request.doctor_id,
        &request.appointment_date,
        &request.appointment_time,
    )?
    .is_some()
    {
        return Err(CoreError::SlotUnavailable);
    }

    let now = Local::now().naive_local();
    let appointment = Appointment {
        id: Uuid::new_v4(),
        patient_id,
        doctor_id: request.doctor_id,
        appointment_date: request.appointment_date,
        appointment_time: request.appointment_time,
        consultation_fee: request.consultation_fee,
        status: AppointmentStatus::Scheduled,
        reason: request.reason.trim().to_string(),
        notes: request.notes.clone(),
        created_at: now,
        updated_at: now,
    };

    match db::insert_appointment(conn, &appointment) {
        Ok(()) => {}
        // Lost the slot race: the partial unique index fired.
        Err(e) if e.is_unique_violation() => return Err(CoreError::SlotUnavailable),
        Err(e) => return Err(e.into()),
    }

    info!(
        appointment_id = %appointment.id,
        doctor_id = %appointment.doctor_id,
        date = %appointment.appointment_date,
        "Appointment booked"
    );
    Ok(appointment)
}

/// Returns the appointment if the caller is the owning patient, the owning
/// doctor, or an admin.
pub fn get(conn: &Connection, caller: &Caller, id: &Uuid) -> Result<Appointment, CoreError> {
    let appointment = db::get_appointment(conn, id)?;
    ensure_access(
        caller,
        Some(&appointment.patient_id),
        Some(&appointment.doctor_id),
    )?;
    Ok(appointment)
}

/// Caller-scoped listing: patient's own, doctor's own, admin all. Never
/// forbidden; possibly empty.
pub fn list(conn: &Connection, caller: &Caller) -> Result<Vec<Appointment>, CoreError> {
    if caller.is_admin() {
        return Ok(db::list_all_appointments(conn)?);
    }
    if let Some(patient_id) = caller.patient_id.filter(|_| caller.is_patient()) {
        return Ok(db::list_appointments_by_patient(conn, &patient_id)?);
    }
    if let Some(doctor_id) = caller.doctor_id.filter(|_| caller.is_doctor()) {
        return Ok(db::list_appointments_by_doctor(conn, &doctor_id)?);
    }
    Ok(Vec::new())
}

/// Applies a status transition. Ownership is per action: the patient
/// cancels, the doctor doctor-cancels or completes. Terminal states admit
/// nothing; a lost race reports the status that won.
pub fn transition(
    conn: &Connection,
    caller: &Caller,
    id: &Uuid,
    action: TransitionAction,
) -> Result<Appointment, CoreError> {
    let appointment = db::get_appointment(conn, id)?;

    let owns = match action.acting_role() {
        Role::Patient => caller.patient_id == Some(appointment.patient_id),
        Role::Doctor => caller.doctor_id == Some(appointment.doctor_id),
        Role::Admin => false,
    };
    if !owns {
        return Err(CoreError::Forbidden);
    }

    if appointment.status.is_terminal() {
        return Err(CoreError::InvalidTransition {
            current: appointment.status,
        });
    }

    if !db::update_status_if_scheduled(conn, id, action.target_status())? {
        // Row exists (fetched above) but is no longer scheduled.
        let current = db::get_appointment(conn, id)?.status;
        return Err(CoreError::InvalidTransition { current });
    }

    info!(
        appointment_id = %id,
        target = action.target_status().as_str(),
        "Appointment transitioned"
    );
    db::get_appointment(conn, id).map_err(CoreError::from)
}

// ─── Tests ────────────────────────────────────────────────────────────────────
