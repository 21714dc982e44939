use std::str::FromStr;

use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use super::user::{parse_enum, parse_uuid};
use crate::db::DatabaseError;
use crate::models::{Doctor, Specialization, Weekday};

pub fn insert_doctor(conn: &Connection, doctor: &Doctor) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO doctors (id, user_id, specialization, consultation_fee, experience_years,
         education, biography)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            doctor.id.to_string(),
            doctor.user_id.to_string(),
            doctor.specialization.as_str(),
            doctor.consultation_fee,
            doctor.experience_years,
            doctor.education,
            doctor.biography,
        ],
    )?;
    replace_availability(conn, doctor)?;
    Ok(())
}

pub fn get_doctor(conn: &Connection, id: &Uuid) -> Result<Doctor, DatabaseError> {
    let doctor = conn
        .query_row(
            "SELECT id, user_id, specialization, consultation_fee, experience_years,
             education, biography
             FROM doctors WHERE id = ?1",
            params![id.to_string()],
            doctor_from_row,
        )
        .optional()?
        .ok_or_else(|| DatabaseError::NotFound {
            entity_type: "Doctor".into(),
            id: id.to_string(),
        })?;
    load_availability(conn, doctor)
}

/// Directory lookup: the doctor record owned by an identity subject, if any.
pub fn find_doctor_by_user(
    conn: &Connection,
    user_id: &Uuid,
) -> Result<Option<Doctor>, DatabaseError> {
    let doctor = conn
        .query_row(
            "SELECT id, user_id, specialization, consultation_fee, experience_years,
             education, biography
             FROM doctors WHERE user_id = ?1",
            params![user_id.to_string()],
            doctor_from_row,
        )
        .optional()?;
    match doctor {
        Some(d) => Ok(Some(load_availability(conn, d)?)),
        None => Ok(None),
    }
}

pub fn list_doctors(conn: &Connection) -> Result<Vec<Doctor>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT id, user_id, specialization, consultation_fee, experience_years,
         education, biography
         FROM doctors ORDER BY specialization, id",
    )?;
    let rows = stmt.query_map([], doctor_from_row)?;

    let mut doctors = Vec::new();
    for row in rows {
        doctors.push(load_availability(conn, row?)?);
    }
    Ok(doctors)
}

pub fn list_doctors_by_specialization(
    conn: &Connection,
    specialization: Specialization,
) -> Result<Vec<Doctor>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT id, user_id, specialization, consultation_fee, experience_years,
         education, biography
         FROM doctors WHERE specialization = ?1 ORDER BY id",
    )?;
    let rows = stmt.query_map(params![specialization.as_str()], doctor_from_row)?;

    let mut doctors = Vec::new();
    for row in rows {
        doctors.push(load_availability(conn, row?)?);
    }
    Ok(doctors)
}

pub fn update_doctor(conn: &Connection, doctor: &Doctor) -> Result<(), DatabaseError> {
    let tx = conn.unchecked_transaction()?;
    let changed = tx.execute(
        "UPDATE doctors SET specialization = ?1, consultation_fee = ?2, experience_years = ?3,
         education = ?4, biography = ?5
         WHERE id = ?6",
        params![
            doctor.specialization.as_str(),
            doctor.consultation_fee,
            doctor.experience_years,
            doctor.education,
            doctor.biography,
            doctor.id.to_string(),
        ],
    )?;
    if changed == 0 {
        return Err(DatabaseError::NotFound {
            entity_type: "Doctor".into(),
            id: doctor.id.to_string(),
        });
    }
    replace_availability(&tx, doctor)?;
    tx.commit()?;
    Ok(())
}

/// Removes the doctor profile row; availability rows cascade. The owning
/// user account is deleted separately.
pub fn delete_doctor(conn: &Connection, id: &Uuid) -> Result<(), DatabaseError> {
    let changed = conn.execute("DELETE FROM doctors WHERE id = ?1", params![id.to_string()])?;
    if changed == 0 {
        return Err(DatabaseError::NotFound {
            entity_type: "Doctor".into(),
            id: id.to_string(),
        });
    }
    Ok(())
}

fn replace_availability(conn: &Connection, doctor: &Doctor) -> Result<(), DatabaseError> {
    let id = doctor.id.to_string();
    conn.execute("DELETE FROM doctor_available_days WHERE doctor_id = ?1", params![id])?;
    conn.execute(
        "DELETE FROM doctor_available_time_slots WHERE doctor_id = ?1",
        params![id],
    )?;
    for day in &doctor.available_days {
        conn.execute(
            "INSERT OR IGNORE INTO doctor_available_days (doctor_id, day) VALUES (?1, ?2)",
            params![id, day.as_str()],
        )?;
    }
    for slot in &doctor.available_time_slots {
        conn.execute(
            "INSERT OR IGNORE INTO doctor_available_time_slots (doctor_id, time_slot)
             VALUES (?1, ?2)",
            params![id, slot],
        )?;
    }
    Ok(())
}

fn load_availability(conn: &Connection, mut doctor: Doctor) -> Result<Doctor, DatabaseError> {
    let id = doctor.id.to_string();

    let mut stmt =
        conn.prepare("SELECT day FROM doctor_available_days WHERE doctor_id = ?1 ORDER BY day")?;
    let rows = stmt.query_map(params![id], |row| row.get::<_, String>(0))?;
    for row in rows {
        doctor.available_days.push(Weekday::from_str(&row?)?);
    }

    let mut stmt = conn.prepare(
        "SELECT time_slot FROM doctor_available_time_slots WHERE doctor_id = ?1 ORDER BY time_slot",
    )?;
    let rows = stmt.query_map(params![id], |row| row.get::<_, String>(0))?;
    for row in rows {
        doctor.available_time_slots.push(row?);
    }

    Ok(doctor)
}

fn doctor_from_row(row: &rusqlite::Row) -> rusqlite::Result<Doctor> {
    Ok(Doctor {
        id: parse_uuid(row, 0)?,
        user_id: parse_uuid(row, 1)?,
        specialization: parse_enum(row, 2)?,
        consultation_fee: row.get(3)?,
        available_days: Vec::new(),
        available_time_slots: Vec::new(),
        experience_years: row.get(4)?,
        education: row.get(5)?,
        biography: row.get(6)?,
    })
}
