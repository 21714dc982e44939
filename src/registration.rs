//! Account registration and admin-side doctor maintenance.
//!
//! The role is a closed tagged variant resolved once at registration:
//! {admin, doctor, patient}, each carrying its required profile fields.
//! An unrecognized tag fails deserialization and maps to `ValidationFailed`
//! — never a silent patient default.

use chrono::{Local, NaiveDate};
use rusqlite::{Connection, Transaction, TransactionBehavior};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::access::{ensure_admin, Caller};
use crate::db::{self, DatabaseError};
use crate::error::CoreError;
use crate::models::{BloodGroup, Doctor, Gender, Patient, Role, Specialization, User, Weekday};
use crate::validate::{require_email_shape, require_non_empty, require_positive};

// ─── Request types ────────────────────────────────────────────────────────────

/// Role-specific profile fields, resolved from the `role` tag.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "snake_case")]
pub enum RoleDetails {
    Admin,
    Doctor {
        specialization: Specialization,
        consultation_fee: f64,
        available_days: Vec<Weekday>,
        available_time_slots: Vec<String>,
        experience_years: i32,
        education: String,
        biography: Option<String>,
    },
    Patient {
        date_of_birth: NaiveDate,
        blood_group: BloodGroup,
        allergies: Option<String>,
        medical_history: Option<String>,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignupRequest {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    /// Opaque credential produced by the auth collaborator.
    pub password_hash: String,
    pub gender: Gender,
    #[serde(flatten)]
    pub details: RoleDetails,
}

impl SignupRequest {
    /// Boundary parse. Unknown role tags and malformed fields surface as
    /// `ValidationFailed`, not as a fallback role.
    pub fn from_json(raw: &str) -> Result<Self, CoreError> {
        serde_json::from_str(raw)
            .map_err(|e| CoreError::validation("signup", &e.to_string()))
    }
}

/// Registration outcome: the account plus whichever profile was created.
#[derive(Debug, Clone, Serialize)]
pub struct RegisteredAccount {
    pub user: User,
    pub patient: Option<Patient>,
    pub doctor: Option<Doctor>,
}

// ─── Registration ─────────────────────────────────────────────────────────────

/// Registers an account. Patient signup is open; doctor and admin creation
/// are administrative writes and require an admin caller.
pub fn register(
    conn: &Connection,
    caller: Option<&Caller>,
    request: &SignupRequest,
) -> Result<RegisteredAccount, CoreError> {
    require_non_empty("first_name", &request.first_name)?;
    require_non_empty("last_name", &request.last_name)?;
    require_email_shape(&request.email)?;
    require_non_empty("phone", &request.phone)?;
    require_non_empty("password_hash", &request.password_hash)?;

    let role = match &request.details {
        RoleDetails::Admin => Role::Admin,
        RoleDetails::Doctor { .. } => Role::Doctor,
        RoleDetails::Patient { .. } => Role::Patient,
    };
    if role != Role::Patient {
        let caller = caller.ok_or(CoreError::Forbidden)?;
        ensure_admin(caller)?;
    }

    if let RoleDetails::Doctor {
        consultation_fee,
        available_days,
        available_time_slots,
        experience_years,
        education,
        ..
    } = &request.details
    {
        require_positive("consultation_fee", *consultation_fee)?;
        if *experience_years <= 0 {
            return Err(CoreError::validation(
                "experience_years",
                "must be strictly positive",
            ));
        }
        require_non_empty("education", education)?;
        if available_days.is_empty() {
            return Err(CoreError::validation("available_days", "must not be empty"));
        }
        if available_time_slots.is_empty() {
            return Err(CoreError::validation(
                "available_time_slots",
                "must not be empty",
            ));
        }
    }

    let email = request.email.trim();
    let email_taken = || CoreError::AlreadyExists {
        entity: "User".into(),
        detail: format!("email {email} is already in use"),
    };
    if db::email_exists(conn, email)? {
        return Err(email_taken());
    }

    let now = Local::now().naive_local();
    let user = User {
        id: Uuid::new_v4(),
        first_name: request.first_name.trim().to_string(),
        last_name: request.last_name.trim().to_string(),
        email: request.email.trim().to_string(),
        phone: request.phone.trim().to_string(),
        password_hash: request.password_hash.clone(),
        gender: request.gender,
        roles: vec![role],
        created_at: now,
        updated_at: now,
    };

    let mut account = RegisteredAccount {
        user,
        patient: None,
        doctor: None,
    };

    // Account, role rows, and profile land together or not at all. Immediate
    // so the write lock is taken before the first row, honoring the busy
    // timeout under concurrent registrations.
    let tx = Transaction::new_unchecked(conn, TransactionBehavior::Immediate)
        .map_err(DatabaseError::from)?;

    match db::insert_user(&tx, &account.user) {
        Ok(()) => {}
        // Lost an email race to a concurrent registration.
        Err(e) if e.is_unique_violation() => return Err(email_taken()),
        Err(e) => return Err(e.into()),
    }

    match &request.details {
        RoleDetails::Admin => {}
        RoleDetails::Patient {
            date_of_birth,
            blood_group,
            allergies,
            medical_history,
        } => {
            let patient = Patient {
                id: Uuid::new_v4(),
                user_id: account.user.id,
                date_of_birth: *date_of_birth,
                blood_group: *blood_group,
                allergies: allergies.clone(),
                medical_history: medical_history.clone(),
            };
            db::insert_patient(&tx, &patient)?;
            account.patient = Some(patient);
        }
        RoleDetails::Doctor {
            specialization,
            consultation_fee,
            available_days,
            available_time_slots,
            experience_years,
            education,
            biography,
        } => {
            let doctor = Doctor {
                id: Uuid::new_v4(),
                user_id: account.user.id,
                specialization: *specialization,
                consultation_fee: *consultation_fee,
                available_days: available_days.clone(),
                available_time_slots: available_time_slots.clone(),
                experience_years: *experience_years,
                education: education.trim().to_string(),
                biography: biography.clone(),
            };
            db::insert_doctor(&tx, &doctor)?;
            account.doctor = Some(doctor);
        }
    }

    tx.commit().map_err(DatabaseError::from)?;

    info!(user_id = %account.user.id, role = role.as_str(), "Account registered");
    Ok(account)
}

// ─── Doctor maintenance (admin-only) ─────────────────────────────────────────

pub fn update_doctor(
    conn: &Connection,
    caller: &Caller,
    doctor: &Doctor,
) -> Result<(), CoreError> {
    ensure_admin(caller)?;
    require_positive("consultation_fee", doctor.consultation_fee)?;
    require_non_empty("education", &doctor.education)?;
    db::update_doctor(conn, doctor)?;
    info!(doctor_id = %doctor.id, "Doctor profile updated");
    Ok(())
}

/// Removes a doctor profile and its user account. Fails on the foreign key
/// while any appointment still references the doctor.
pub fn delete_doctor(conn: &Connection, caller: &Caller, id: &Uuid) -> Result<(), CoreError> {
    ensure_admin(caller)?;
    let doctor = db::get_doctor(conn, id)?;

    // Profile and account rows go together or not at all.
    let tx = Transaction::new_unchecked(conn, TransactionBehavior::Immediate)
        .map_err(DatabaseError::from)?;
    db::delete_doctor(&tx, id)?;
    db::delete_user(&tx, &doctor.user_id)?;
    tx.commit().map_err(DatabaseError::from)?;

    info!(doctor_id = %id, "Doctor deleted");
    Ok(())
}

// ─── Bootstrap ────────────────────────────────────────────────────────────────

/// Seeds the initial admin account. No-op when the email is already taken.
pub fn seed_admin(
    conn: &Connection,
    email: &str,
    password_hash: &str,
) -> Result<Option<User>, CoreError> {
    if db::email_exists(conn, email)? {
        return Ok(None);
    }
    let now = Local::now().naive_local();
    let user = User {
        id: Uuid::new_v4(),
        first_name: "Admin".into(),
        last_name: "User".into(),
        email: email.to_string(),
        phone: "0000000000".into(),
        password_hash: password_hash.to_string(),
        gender: Gender::Other,
        roles: vec![Role::Admin],
        created_at: now,
        updated_at: now,
    };
    db::insert_user(conn, &user)?;
    info!(user_id = %user.id, "Admin account seeded");
    Ok(Some(user))
}

// ─── Tests ────────────────────────────────────────────────────────────────────
