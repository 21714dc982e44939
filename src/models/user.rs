use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::{BloodGroup, Gender, Role, Specialization, Weekday};

/// Identity anchor. The password hash is opaque to the core — credential
/// verification lives in the external auth collaborator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub gender: Gender,
    pub roles: Vec<Role>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl User {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// One-to-one extension of a User with role patient.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Patient {
    pub id: Uuid,
    pub user_id: Uuid,
    pub date_of_birth: NaiveDate,
    pub blood_group: BloodGroup,
    pub allergies: Option<String>,
    pub medical_history: Option<String>,
}

/// One-to-one extension of a User with role doctor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Doctor {
    pub id: Uuid,
    pub user_id: Uuid,
    pub specialization: Specialization,
    pub consultation_fee: f64,
    pub available_days: Vec<Weekday>,
    pub available_time_slots: Vec<String>,
    pub experience_years: i32,
    pub education: String,
    pub biography: Option<String>,
}
