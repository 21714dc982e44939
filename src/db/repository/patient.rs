use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use super::user::{parse_date, parse_enum, parse_uuid};
use crate::db::DatabaseError;
use crate::models::Patient;

pub fn insert_patient(conn: &Connection, patient: &Patient) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO patients (id, user_id, date_of_birth, blood_group, allergies, medical_history)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            patient.id.to_string(),
            patient.user_id.to_string(),
            patient.date_of_birth.to_string(),
            patient.blood_group.as_str(),
            patient.allergies,
            patient.medical_history,
        ],
    )?;
    Ok(())
}

pub fn get_patient(conn: &Connection, id: &Uuid) -> Result<Patient, DatabaseError> {
    conn.query_row(
        "SELECT id, user_id, date_of_birth, blood_group, allergies, medical_history
         FROM patients WHERE id = ?1",
        params![id.to_string()],
        patient_from_row,
    )
    .optional()?
    .ok_or_else(|| DatabaseError::NotFound {
        entity_type: "Patient".into(),
        id: id.to_string(),
    })
}

/// Directory lookup: the patient record owned by an identity subject, if any.
pub fn find_patient_by_user(
    conn: &Connection,
    user_id: &Uuid,
) -> Result<Option<Patient>, DatabaseError> {
    conn.query_row(
        "SELECT id, user_id, date_of_birth, blood_group, allergies, medical_history
         FROM patients WHERE user_id = ?1",
        params![user_id.to_string()],
        patient_from_row,
    )
    .optional()
    .map_err(DatabaseError::from)
}

fn patient_from_row(row: &rusqlite::Row) -> rusqlite::Result<Patient> {
    Ok(Patient {
        id: parse_uuid(row, 0)?,
        user_id: parse_uuid(row, 1)?,
        date_of_birth: parse_date(row, 2)?,
        blood_group: parse_enum(row, 3)?,
        allergies: row.get(4)?,
        medical_history: row.get(5)?,
    })
}
