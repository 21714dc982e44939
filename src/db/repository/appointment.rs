use chrono::{NaiveDate, NaiveTime};
use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use super::user::{parse_date, parse_datetime, parse_enum, parse_time, parse_uuid};
use crate::db::DatabaseError;
use crate::models::{Appointment, AppointmentStatus};

const APPOINTMENT_COLUMNS: &str = "id, patient_id, doctor_id, appointment_date, \
     appointment_time, consultation_fee, status, reason, notes, created_at, updated_at";

pub fn insert_appointment(conn: &Connection, appt: &Appointment) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO appointments (id, patient_id, doctor_id, appointment_date, appointment_time,
         consultation_fee, status, reason, notes, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
        params![
            appt.id.to_string(),
            appt.patient_id.to_string(),
            appt.doctor_id.to_string(),
            appt.appointment_date.to_string(),
            appt.appointment_time.format("%H:%M:%S").to_string(),
            appt.consultation_fee,
            appt.status.as_str(),
            appt.reason,
            appt.notes,
            appt.created_at.format("%Y-%m-%d %H:%M:%S").to_string(),
            appt.updated_at.format("%Y-%m-%d %H:%M:%S").to_string(),
        ],
    )?;
    Ok(())
}

pub fn get_appointment(conn: &Connection, id: &Uuid) -> Result<Appointment, DatabaseError> {
    conn.query_row(
        &format!("SELECT {APPOINTMENT_COLUMNS} FROM appointments WHERE id = ?1"),
        params![id.to_string()],
        appointment_from_row,
    )
    .optional()?
    .ok_or_else(|| DatabaseError::NotFound {
        entity_type: "Appointment".into(),
        id: id.to_string(),
    })
}

/// The SCHEDULED appointment holding the given slot, if any. Advisory check:
/// the partial unique index is what actually guarantees exclusivity.
pub fn find_scheduled_conflict(
    conn: &Connection,
    doctor_id: &Uuid,
    date: &NaiveDate,
    time: &NaiveTime,
) -> Result<Option<Appointment>, DatabaseError> {
    conn.query_row(
        &format!(
            "SELECT {APPOINTMENT_COLUMNS} FROM appointments
             WHERE doctor_id = ?1 AND appointment_date = ?2 AND appointment_time = ?3
               AND status = 'scheduled'"
        ),
        params![
            doctor_id.to_string(),
            date.to_string(),
            time.format("%H:%M:%S").to_string(),
        ],
        appointment_from_row,
    )
    .optional()
    .map_err(DatabaseError::from)
}

pub fn list_appointments_by_patient(
    conn: &Connection,
    patient_id: &Uuid,
) -> Result<Vec<Appointment>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {APPOINTMENT_COLUMNS} FROM appointments WHERE patient_id = ?1
         ORDER BY appointment_date DESC, appointment_time DESC"
    ))?;
    let rows = stmt.query_map(params![patient_id.to_string()], appointment_from_row)?;
    rows.map(|r| r.map_err(DatabaseError::from)).collect()
}

pub fn list_appointments_by_doctor(
    conn: &Connection,
    doctor_id: &Uuid,
) -> Result<Vec<Appointment>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {APPOINTMENT_COLUMNS} FROM appointments WHERE doctor_id = ?1
         ORDER BY appointment_date DESC, appointment_time DESC"
    ))?;
    let rows = stmt.query_map(params![doctor_id.to_string()], appointment_from_row)?;
    rows.map(|r| r.map_err(DatabaseError::from)).collect()
}

pub fn list_all_appointments(conn: &Connection) -> Result<Vec<Appointment>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {APPOINTMENT_COLUMNS} FROM appointments
         ORDER BY appointment_date DESC, appointment_time DESC"
    ))?;
    let rows = stmt.query_map([], appointment_from_row)?;
    rows.map(|r| r.map_err(DatabaseError::from)).collect()
}

/// Compare-and-swap: applies the transition only while the row is still
/// SCHEDULED. Returns false when the row was missing or no longer scheduled;
/// the caller re-reads to tell the two apart.
pub fn update_status_if_scheduled(
    conn: &Connection,
    id: &Uuid,
    target: AppointmentStatus,
) -> Result<bool, DatabaseError> {
    let changed = conn.execute(
        "UPDATE appointments SET status = ?1, updated_at = datetime('now')
         WHERE id = ?2 AND status = 'scheduled'",
        params![target.as_str(), id.to_string()],
    )?;
    Ok(changed == 1)
}

fn appointment_from_row(row: &rusqlite::Row) -> rusqlite::Result<Appointment> {
    Ok(Appointment {
        id: parse_uuid(row, 0)?,
        patient_id: parse_uuid(row, 1)?,
        doctor_id: parse_uuid(row, 2)?,
        appointment_date: parse_date(row, 3)?,
        appointment_time: parse_time(row, 4)?,
        consultation_fee: row.get(5)?,
        status: parse_enum(row, 6)?,
        reason: row.get(7)?,
        notes: row.get(8)?,
        created_at: parse_datetime(row, 9)?,
        updated_at: parse_datetime(row, 10)?,
    })
}
