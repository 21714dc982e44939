//! Row-level access guard.
//!
//! Implements the 3-rule ownership cascade applied identically by the
//! scheduling and prescription engines:
//! 1. Admin → ALLOW
//! 2. Caller's patient record owns the resource → ALLOW
//! 3. Caller's doctor record owns the resource → ALLOW
//! 4. Default → DENY
//!
//! Default-deny, checked in order. Pure given a resolved caller; no ambient
//! identity lookup — every engine operation takes the caller explicitly.

use rusqlite::Connection;
use uuid::Uuid;

use crate::db::{self, DatabaseError};
use crate::error::CoreError;
use crate::models::Role;

/// Authenticated identity plus its resolved clinical profiles.
///
/// The identity context (external) supplies `user_id` and `roles`; the
/// directory resolves which patient/doctor rows the caller owns.
#[derive(Debug, Clone)]
pub struct Caller {
    pub user_id: Uuid,
    pub roles: Vec<Role>,
    pub patient_id: Option<Uuid>,
    pub doctor_id: Option<Uuid>,
}

impl Caller {
    /// Resolve a caller's patient/doctor records via the directory.
    pub fn resolve(
        conn: &Connection,
        user_id: Uuid,
        roles: Vec<Role>,
    ) -> Result<Self, DatabaseError> {
        let patient_id = db::find_patient_by_user(conn, &user_id)?.map(|p| p.id);
        let doctor_id = db::find_doctor_by_user(conn, &user_id)?.map(|d| d.id);
        Ok(Self {
            user_id,
            roles,
            patient_id,
            doctor_id,
        })
    }

    pub fn is_admin(&self) -> bool {
        self.roles.contains(&Role::Admin)
    }

    pub fn is_patient(&self) -> bool {
        self.roles.contains(&Role::Patient)
    }

    pub fn is_doctor(&self) -> bool {
        self.roles.contains(&Role::Doctor)
    }
}

/// Why access was granted (or denied).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessReason {
    /// Admin role: unrestricted reads and administrative writes.
    Admin,
    /// Caller's patient record owns the resource.
    OwnPatientRecord,
    /// Caller's doctor record owns the resource.
    OwnDoctorRecord,
    /// No matching rule — access denied.
    Denied,
}

/// Result of an authorization check.
#[derive(Debug, Clone, Copy)]
pub struct AccessDecision {
    pub allowed: bool,
    pub reason: AccessReason,
}

impl AccessDecision {
    fn allow(reason: AccessReason) -> Self {
        Self {
            allowed: true,
            reason,
        }
    }

    fn deny() -> Self {
        Self {
            allowed: false,
            reason: AccessReason::Denied,
        }
    }
}

/// Pure ownership predicate over a resource's (patient, doctor) owners.
pub fn authorize(
    caller: &Caller,
    owner_patient_id: Option<&Uuid>,
    owner_doctor_id: Option<&Uuid>,
) -> AccessDecision {
    if caller.is_admin() {
        return AccessDecision::allow(AccessReason::Admin);
    }
    if let (Some(own), Some(owner)) = (caller.patient_id.as_ref(), owner_patient_id) {
        if own == owner {
            return AccessDecision::allow(AccessReason::OwnPatientRecord);
        }
    }
    if let (Some(own), Some(owner)) = (caller.doctor_id.as_ref(), owner_doctor_id) {
        if own == owner {
            return AccessDecision::allow(AccessReason::OwnDoctorRecord);
        }
    }
    AccessDecision::deny()
}

/// `authorize` lifted to the engines' error type.
pub fn ensure_access(
    caller: &Caller,
    owner_patient_id: Option<&Uuid>,
    owner_doctor_id: Option<&Uuid>,
) -> Result<AccessDecision, CoreError> {
    let decision = authorize(caller, owner_patient_id, owner_doctor_id);
    if decision.allowed {
        Ok(decision)
    } else {
        Err(CoreError::Forbidden)
    }
}

/// Admin gate for administrative writes (doctor registration/update/delete).
pub fn ensure_admin(caller: &Caller) -> Result<(), CoreError> {
    if caller.is_admin() {
        Ok(())
    } else {
        Err(CoreError::Forbidden)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn caller(roles: Vec<Role>, patient: Option<Uuid>, doctor: Option<Uuid>) -> Caller {
        Caller {
            user_id: Uuid::new_v4(),
            roles,
            patient_id: patient,
            doctor_id: doctor,
        }
    }

    #[test]
    fn admin_allowed_on_any_resource() {
        let admin = caller(vec![Role::Admin], None, None);
        let decision = authorize(&admin, Some(&Uuid::new_v4()), Some(&Uuid::new_v4()));
        assert!(decision.allowed);
        assert_eq!(decision.reason, AccessReason::Admin);
    }

    #[test]
    fn patient_allowed_on_own_resource_only() {
        let pid = Uuid::new_v4();
        let patient = caller(vec![Role::Patient], Some(pid), None);

        let own = authorize(&patient, Some(&pid), Some(&Uuid::new_v4()));
        assert!(own.allowed);
        assert_eq!(own.reason, AccessReason::OwnPatientRecord);

        let other = authorize(&patient, Some(&Uuid::new_v4()), Some(&Uuid::new_v4()));
        assert!(!other.allowed);
        assert_eq!(other.reason, AccessReason::Denied);
    }

    #[test]
    fn doctor_allowed_on_own_resource_only() {
        let did = Uuid::new_v4();
        let doctor = caller(vec![Role::Doctor], None, Some(did));

        assert!(authorize(&doctor, Some(&Uuid::new_v4()), Some(&did)).allowed);
        assert!(!authorize(&doctor, Some(&Uuid::new_v4()), Some(&Uuid::new_v4())).allowed);
    }

    #[test]
    fn caller_without_profile_denied() {
        let bare = caller(vec![Role::Patient], None, None);
        assert!(!authorize(&bare, Some(&Uuid::new_v4()), None).allowed);
    }

    #[test]
    fn ensure_access_maps_denial_to_forbidden() {
        let bare = caller(vec![], None, None);
        let err = ensure_access(&bare, Some(&Uuid::new_v4()), None).unwrap_err();
        assert!(matches!(err, CoreError::Forbidden));
    }

    #[test]
    fn ensure_admin_rejects_non_admin() {
        let doctor = caller(vec![Role::Doctor], None, Some(Uuid::new_v4()));
        assert!(matches!(ensure_admin(&doctor), Err(CoreError::Forbidden)));
        let admin = caller(vec![Role::Admin], None, None);
        assert!(ensure_admin(&admin).is_ok());
    }
}
