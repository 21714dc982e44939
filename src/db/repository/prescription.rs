use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use super::user::{parse_datetime, parse_uuid};
use crate::db::DatabaseError;
use crate::models::{Medication, Prescription};

const PRESCRIPTION_COLUMNS: &str = "id, appointment_id, patient_id, doctor_id, diagnosis, \
     additional_notes, follow_up_date, is_paid, created_at, updated_at";

/// Writes the prescription and its medication list in one transaction.
pub fn insert_prescription(conn: &Connection, rx: &Prescription) -> Result<(), DatabaseError> {
    let tx = conn.unchecked_transaction()?;
    tx.execute(
        "INSERT INTO prescriptions (id, appointment_id, patient_id, doctor_id, diagnosis,
         additional_notes, follow_up_date, is_paid, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        params![
            rx.id.to_string(),
            rx.appointment_id.to_string(),
            rx.patient_id.to_string(),
            rx.doctor_id.to_string(),
            rx.diagnosis,
            rx.additional_notes,
            rx.follow_up_date.map(|d| d.to_string()),
            rx.is_paid as i32,
            rx.created_at.format("%Y-%m-%d %H:%M:%S").to_string(),
            rx.updated_at.format("%Y-%m-%d %H:%M:%S").to_string(),
        ],
    )?;
    for (position, med) in rx.medications.iter().enumerate() {
        tx.execute(
            "INSERT INTO medications (prescription_id, position, name, dosage, frequency,
             duration, instructions)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                rx.id.to_string(),
                position as i64,
                med.name,
                med.dosage,
                med.frequency,
                med.duration,
                med.instructions,
            ],
        )?;
    }
    tx.commit()?;
    Ok(())
}

pub fn get_prescription(conn: &Connection, id: &Uuid) -> Result<Prescription, DatabaseError> {
    let rx = conn
        .query_row(
            &format!("SELECT {PRESCRIPTION_COLUMNS} FROM prescriptions WHERE id = ?1"),
            params![id.to_string()],
            prescription_from_row,
        )
        .optional()?
        .ok_or_else(|| DatabaseError::NotFound {
            entity_type: "Prescription".into(),
            id: id.to_string(),
        })?;
    load_medications(conn, rx)
}

/// Uniqueness probe: whether the appointment already has a prescription.
pub fn prescription_exists_for_appointment(
    conn: &Connection,
    appointment_id: &Uuid,
) -> Result<bool, DatabaseError> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM prescriptions WHERE appointment_id = ?1",
        params![appointment_id.to_string()],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

pub fn list_prescriptions_by_patient(
    conn: &Connection,
    patient_id: &Uuid,
) -> Result<Vec<Prescription>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {PRESCRIPTION_COLUMNS} FROM prescriptions WHERE patient_id = ?1
         ORDER BY created_at DESC"
    ))?;
    let rows = stmt.query_map(params![patient_id.to_string()], prescription_from_row)?;

    let mut out = Vec::new();
    for row in rows {
        out.push(load_medications(conn, row?)?);
    }
    Ok(out)
}

pub fn list_prescriptions_by_doctor(
    conn: &Connection,
    doctor_id: &Uuid,
) -> Result<Vec<Prescription>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {PRESCRIPTION_COLUMNS} FROM prescriptions WHERE doctor_id = ?1
         ORDER BY created_at DESC"
    ))?;
    let rows = stmt.query_map(params![doctor_id.to_string()], prescription_from_row)?;

    let mut out = Vec::new();
    for row in rows {
        out.push(load_medications(conn, row?)?);
    }
    Ok(out)
}

pub fn list_all_prescriptions(conn: &Connection) -> Result<Vec<Prescription>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {PRESCRIPTION_COLUMNS} FROM prescriptions ORDER BY created_at DESC"
    ))?;
    let rows = stmt.query_map([], prescription_from_row)?;

    let mut out = Vec::new();
    for row in rows {
        out.push(load_medications(conn, row?)?);
    }
    Ok(out)
}

/// Sets the paid flag. Idempotent by construction: re-marking a paid row
/// changes nothing and still reports success.
pub fn set_paid(conn: &Connection, id: &Uuid) -> Result<(), DatabaseError> {
    let changed = conn.execute(
        "UPDATE prescriptions SET is_paid = 1, updated_at = datetime('now') WHERE id = ?1",
        params![id.to_string()],
    )?;
    if changed == 0 {
        return Err(DatabaseError::NotFound {
            entity_type: "Prescription".into(),
            id: id.to_string(),
        });
    }
    Ok(())
}

fn load_medications(conn: &Connection, mut rx: Prescription) -> Result<Prescription, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT name, dosage, frequency, duration, instructions
         FROM medications WHERE prescription_id = ?1 ORDER BY position",
    )?;
    let rows = stmt.query_map(params![rx.id.to_string()], |row| {
        Ok(Medication {
            name: row.get(0)?,
            dosage: row.get(1)?,
            frequency: row.get(2)?,
            duration: row.get(3)?,
            instructions: row.get(4)?,
        })
    })?;
    for row in rows {
        rx.medications.push(row?);
    }
    Ok(rx)
}

fn prescription_from_row(row: &rusqlite::Row) -> rusqlite::Result<Prescription> {
    let follow_up: Option<String> = row.get(6)?;
    let follow_up_date = match follow_up {
        Some(raw) => Some(
            chrono::NaiveDate::parse_from_str(&raw, "%Y-%m-%d").map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(
                    6,
                    rusqlite::types::Type::Text,
                    Box::new(e),
                )
            })?,
        ),
        None => None,
    };
    Ok(Prescription {
        id: parse_uuid(row, 0)?,
        appointment_id: parse_uuid(row, 1)?,
        patient_id: parse_uuid(row, 2)?,
        doctor_id: parse_uuid(row, 3)?,
        diagnosis: row.get(4)?,
        medications: Vec::new(),
        additional_notes: row.get(5)?,
        follow_up_date,
        is_paid: row.get::<_, i64>(7)? != 0,
        created_at: parse_datetime(row, 8)?,
        updated_at: parse_datetime(row, 9)?,
    })
}
