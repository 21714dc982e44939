use std::str::FromStr;

use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use crate::db::DatabaseError;
use crate::models::{Gender, Role, User};

pub fn insert_user(conn: &Connection, user: &User) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO users (id, first_name, last_name, email, phone, password_hash, gender,
         created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        params![
            user.id.to_string(),
            user.first_name,
            user.last_name,
            user.email,
            user.phone,
            user.password_hash,
            user.gender.as_str(),
            user.created_at.to_string(),
            user.updated_at.to_string(),
        ],
    )?;
    for role in &user.roles {
        conn.execute(
            "INSERT OR IGNORE INTO user_roles (user_id, role) VALUES (?1, ?2)",
            params![user.id.to_string(), role.as_str()],
        )?;
    }
    Ok(())
}

pub fn get_user(conn: &Connection, id: &Uuid) -> Result<User, DatabaseError> {
    let mut user = conn
        .query_row(
            "SELECT id, first_name, last_name, email, phone, password_hash, gender,
             created_at, updated_at
             FROM users WHERE id = ?1",
            params![id.to_string()],
            user_from_row,
        )
        .optional()?
        .ok_or_else(|| DatabaseError::NotFound {
            entity_type: "User".into(),
            id: id.to_string(),
        })?;
    user.roles = get_user_roles(conn, id)?;
    Ok(user)
}

pub fn email_exists(conn: &Connection, email: &str) -> Result<bool, DatabaseError> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM users WHERE email = ?1",
        params![email],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

pub fn get_user_roles(conn: &Connection, user_id: &Uuid) -> Result<Vec<Role>, DatabaseError> {
    let mut stmt =
        conn.prepare("SELECT role FROM user_roles WHERE user_id = ?1 ORDER BY role")?;
    let rows = stmt.query_map(params![user_id.to_string()], |row| row.get::<_, String>(0))?;

    let mut roles = Vec::new();
    for row in rows {
        roles.push(Role::from_str(&row?)?);
    }
    Ok(roles)
}

pub fn delete_user(conn: &Connection, id: &Uuid) -> Result<(), DatabaseError> {
    let changed = conn.execute("DELETE FROM users WHERE id = ?1", params![id.to_string()])?;
    if changed == 0 {
        return Err(DatabaseError::NotFound {
            entity_type: "User".into(),
            id: id.to_string(),
        });
    }
    Ok(())
}

fn user_from_row(row: &rusqlite::Row) -> rusqlite::Result<User> {
    Ok(User {
        id: parse_uuid(row, 0)?,
        first_name: row.get(1)?,
        last_name: row.get(2)?,
        email: row.get(3)?,
        phone: row.get(4)?,
        password_hash: row.get(5)?,
        gender: parse_enum::<Gender>(row, 6)?,
        roles: Vec::new(),
        created_at: parse_datetime(row, 7)?,
        updated_at: parse_datetime(row, 8)?,
    })
}

// ─── Row parsing helpers (shared by sibling repositories) ────────────────────

pub(crate) fn parse_uuid(row: &rusqlite::Row, idx: usize) -> rusqlite::Result<Uuid> {
    let raw: String = row.get(idx)?;
    Uuid::parse_str(&raw).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}

pub(crate) fn parse_enum<T: FromStr<Err = DatabaseError>>(
    row: &rusqlite::Row,
    idx: usize,
) -> rusqlite::Result<T> {
    let raw: String = row.get(idx)?;
    T::from_str(&raw).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(
            idx,
            rusqlite::types::Type::Text,
            Box::new(std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string())),
        )
    })
}

pub(crate) fn parse_date(row: &rusqlite::Row, idx: usize) -> rusqlite::Result<chrono::NaiveDate> {
    let raw: String = row.get(idx)?;
    chrono::NaiveDate::parse_from_str(&raw, "%Y-%m-%d").map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}

pub(crate) fn parse_time(row: &rusqlite::Row, idx: usize) -> rusqlite::Result<chrono::NaiveTime> {
    let raw: String = row.get(idx)?;
    chrono::NaiveTime::parse_from_str(&raw, "%H:%M:%S").map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}

pub(crate) fn parse_datetime(
    row: &rusqlite::Row,
    idx: usize,
) -> rusqlite::Result<chrono::NaiveDateTime> {
    let raw: String = row.get(idx)?;
    chrono::NaiveDateTime::parse_from_str(&raw, "%Y-%m-%d %H:%M:%S")
        .or_else(|_| chrono::NaiveDateTime::parse_from_str(&raw, "%Y-%m-%d %H:%M:%S%.f"))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
        })
}
