//! Prescription engine — issuance gated on a completed appointment, paid
//! flag, and the read-only projection handed to the document renderer.

use chrono::Local;
use rusqlite::Connection;
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use crate::access::{ensure_access, Caller};
use crate::db;
use crate::error::CoreError;
use crate::models::{
    AppointmentStatus, Medication, Prescription, PrescriptionRequest, Specialization,
};
use crate::validate::require_non_empty;

/// Issues a prescription for a completed appointment. Caller must be the
/// appointment's doctor; at most one prescription per appointment.
pub fn issue(
    conn: &Connection,
    caller: &Caller,
    request: &PrescriptionRequest,
) -> Result<Prescription, CoreError> {
    let appointment = db::get_appointment(conn, &request.appointment_id)?;

    if caller.doctor_id != Some(appointment.doctor_id) {
        return Err(CoreError::Forbidden);
    }

    if appointment.status != AppointmentStatus::Completed {
        return Err(CoreError::PrecursorNotMet {
            status: appointment.status,
        });
    }

    if db::prescription_exists_for_appointment(conn, &appointment.id)? {
        return Err(CoreError::AlreadyExists {
            entity: "Prescription".into(),
            detail: format!("appointment {} already has a prescription", appointment.id),
        });
    }

    require_non_empty("diagnosis", &request.diagnosis)?;
    if request.medications.is_empty() {
        return Err(CoreError::validation("medications", "at least one entry required"));
    }
    for med in &request.medications {
        require_non_empty("medication.name", &med.name)?;
        require_non_empty("medication.dosage", &med.dosage)?;
        require_non_empty("medication.frequency", &med.frequency)?;
        require_non_empty("medication.duration", &med.duration)?;
    }

    let now = Local::now().naive_local();
    let prescription = Prescription {
        id: Uuid::new_v4(),
        appointment_id: appointment.id,
        patient_id: appointment.patient_id,
        doctor_id: appointment.doctor_id,
        diagnosis: request.diagnosis.trim().to_string(),
        medications: request.medications.clone(),
        additional_notes: request.additional_notes.clone(),
        follow_up_date: request.follow_up_date,
        is_paid: false,
        created_at: now,
        updated_at: now,
    };

    match db::insert_prescription(conn, &prescription) {
        Ok(()) => {}
        // Duplicate-issue race on the unique appointment_id column.
        Err(e) if e.is_unique_violation() => {
            return Err(CoreError::AlreadyExists {
                entity: "Prescription".into(),
                detail: format!("appointment {} already has a prescription", appointment.id),
            })
        }
        Err(e) => return Err(e.into()),
    }

    info!(
        prescription_id = %prescription.id,
        appointment_id = %appointment.id,
        "Prescription issued"
    );
    Ok(prescription)
}

/// Returns the prescription if the caller is the owning patient, the owning
/// doctor, or an admin.
pub fn get(conn: &Connection, caller: &Caller, id: &Uuid) -> Result<Prescription, CoreError> {
    let prescription = db::get_prescription(conn, id)?;
    ensure_access(
        caller,
        Some(&prescription.patient_id),
        Some(&prescription.doctor_id),
    )?;
    Ok(prescription)
}

/// Caller-scoped listing, same rules as appointments.
pub fn list(conn: &Connection, caller: &Caller) -> Result<Vec<Prescription>, CoreError> {
    if caller.is_admin() {
        return Ok(db::list_all_prescriptions(conn)?);
    }
    if let Some(patient_id) = caller.patient_id.filter(|_| caller.is_patient()) {
        return Ok(db::list_prescriptions_by_patient(conn, &patient_id)?);
    }
    if let Some(doctor_id) = caller.doctor_id.filter(|_| caller.is_doctor()) {
        return Ok(db::list_prescriptions_by_doctor(conn, &doctor_id)?);
    }
    Ok(Vec::new())
}

/// Marks the prescription paid. Owning patient or admin; idempotent.
pub fn mark_paid(conn: &Connection, caller: &Caller, id: &Uuid) -> Result<Prescription, CoreError> {
    let prescription = db::get_prescription(conn, id)?;

    let allowed = caller.is_admin()
        || (caller.is_patient() && caller.patient_id == Some(prescription.patient_id));
    if !allowed {
        return Err(CoreError::Forbidden);
    }

    db::set_paid(conn, id)?;
    info!(prescription_id = %id, "Prescription marked paid");
    db::get_prescription(conn, id).map_err(CoreError::from)
}

// ─── Renderer projection ──────────────────────────────────────────────────────

/// Read-only projection consumed by the document renderer. Assembled here;
/// the renderer itself holds no business rules.
#[derive(Debug, Clone, Serialize)]
pub struct PrescriptionView {
    pub prescription_id: Uuid,
    pub patient_name: String,
    pub doctor_name: String,
    pub doctor_specialization: Specialization,
    pub diagnosis: String,
    pub medications: Vec<Medication>,
    pub additional_notes: Option<String>,
    pub follow_up_date: Option<chrono::NaiveDate>,
    pub created_at: chrono::NaiveDateTime,
}

/// Builds the renderer projection. Same access rule as `get`.
pub fn render_view(
    conn: &Connection,
    caller: &Caller,
    id: &Uuid,
) -> Result<PrescriptionView, CoreError> {
    let prescription = get(conn, caller, id)?;

    let patient = db::get_patient(conn, &prescription.patient_id)?;
    let patient_user = db::get_user(conn, &patient.user_id)?;
    let doctor = db::get_doctor(conn, &prescription.doctor_id)?;
    let doctor_user = db::get_user(conn, &doctor.user_id)?;

    Ok(PrescriptionView {
        prescription_id: prescription.id,
        patient_name: patient_user.full_name(),
        doctor_name: doctor_user.full_name(),
        doctor_specialization: doctor.specialization,
        diagnosis: prescription.diagnosis,
        medications: prescription.medications,
        additional_notes: prescription.additional_notes,
        follow_up_date: prescription.follow_up_date,
        created_at: prescription.created_at,
    })
}

// ─── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveTime};

    use crate::db::sqlite::open_memory_database;
    use crate::models::{
        BloodGroup, BookingRequest, Gender, Role, TransitionAction, Weekday,
    };
    use crate::registration::{register, seed_admin, RoleDetails, SignupRequest};
    use crate::scheduling;

    struct Clinic {
        patient: Caller,
        second_patient: Caller,
        doctor: Caller,
        doctor_id: Uuid,
        admin: Caller,
    }

    fn seed_clinic(conn: &Connection) -> Clinic {
        let admin_user = seed_admin(conn, "admin@clinic.test", "hash").unwrap().unwrap();
        let admin = Caller::resolve(conn, admin_user.id, vec![Role::Admin]).unwrap();

        let doctor_account = register(
            conn,
            Some(&admin),
            &SignupRequest {
                first_name: "Bob".into(),
                last_name: "Nguyen".into(),
                email: "bob@clinic.test".into(),
                phone: "5559876543".into(),
                password_hash: "hash".into(),
                gender: Gender::Male,
                details: RoleDetails::Doctor {
                    specialization: Specialization::GeneralMedicine,
                    consultation_fee: 50.0,
                    available_days: vec![Weekday::Saturday],
                    available_time_slots: vec!["10:00-10:30".into()],
                    experience_years: 8,
                    education: "MD".into(),
                    biography: None,
                },
            },
        )
        .unwrap();
        let doctor = Caller::resolve(conn, doctor_account.user.id, vec![Role::Doctor]).unwrap();
        let doctor_id = doctor_account.doctor.unwrap().id;

        let patient_caller = |email: &str| {
            let account = register(
                conn,
                None,
                &SignupRequest {
                    first_name: "Alice".into(),
                    last_name: "Martin".into(),
                    email: email.into(),
                    phone: "5551234567".into(),
                    password_hash: "hash".into(),
                    gender: Gender::Female,
                    details: RoleDetails::Patient {
                        date_of_birth: NaiveDate::from_ymd_opt(1990, 4, 12).unwrap(),
                        blood_group: BloodGroup::OPositive,
                        allergies: None,
                        medical_history: None,
                    },
                },
            )
            .unwrap();
            Caller::resolve(conn, account.user.id, vec![Role::Patient]).unwrap()
        };
        let patient = patient_caller("alice@clinic.test");
        let second_patient = patient_caller("carol@clinic.test");

        Clinic {
            patient,
            second_patient,
            doctor,
            doctor_id,
            admin,
        }
    }

    fn completed_appointment(conn: &Connection, clinic: &Clinic) -> Uuid {
        let appt = scheduling::book(
            conn,
            &clinic.patient,
            &BookingRequest {
                doctor_id: clinic.doctor_id,
                appointment_date: NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
                appointment_time: NaiveTime::from_hms_opt(10, 0, 0).unwrap(),
                consultation_fee: 50.0,
                reason: "checkup".into(),
                notes: None,
            },
        )
        .unwrap();
        scheduling::transition(conn, &clinic.doctor, &appt.id, TransitionAction::Complete)
            .unwrap();
        appt.id
    }

    fn flu_request(appointment_id: Uuid) -> PrescriptionRequest {
        PrescriptionRequest {
            appointment_id,
            diagnosis: "flu".into(),
            medications: vec![Medication {
                name: "Oseltamivir".into(),
                dosage: "75mg".into(),
                frequency: "2x daily".into(),
                duration: "5 days".into(),
                instructions: Some("with food".into()),
            }],
            additional_notes: None,
            follow_up_date: Some(NaiveDate::from_ymd_opt(2024, 6, 15).unwrap()),
        }
    }

    #[test]
    fn issue_requires_completed_status() {
        let conn = open_memory_database().unwrap();
        let clinic = seed_clinic(&conn);

        let appt = scheduling::book(
            &conn,
            &clinic.patient,
            &BookingRequest {
                doctor_id: clinic.doctor_id,
                appointment_date: NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
                appointment_time: NaiveTime::from_hms_opt(10, 0, 0).unwrap(),
                consultation_fee: 50.0,
                reason: "checkup".into(),
                notes: None,
            },
        )
        .unwrap();

        // Still scheduled.
        let err = issue(&conn, &clinic.doctor, &flu_request(appt.id)).unwrap_err();
        assert!(matches!(
            err,
            CoreError::PrecursorNotMet { status: AppointmentStatus::Scheduled }
        ));

        // Cancelled.
        scheduling::transition(&conn, &clinic.patient, &appt.id, TransitionAction::Cancel)
            .unwrap();
        let err = issue(&conn, &clinic.doctor, &flu_request(appt.id)).unwrap_err();
        assert!(matches!(
            err,
            CoreError::PrecursorNotMet { status: AppointmentStatus::CancelledByPatient }
        ));
    }

    #[test]
    fn issue_only_by_owning_doctor() {
        let conn = open_memory_database().unwrap();
        let clinic = seed_clinic(&conn);
        let appt_id = completed_appointment(&conn, &clinic);

        assert!(matches!(
            issue(&conn, &clinic.patient, &flu_request(appt_id)).unwrap_err(),
            CoreError::Forbidden
        ));
        // Admin does not bypass the issuance rule either.
        assert!(matches!(
            issue(&conn, &clinic.admin, &flu_request(appt_id)).unwrap_err(),
            CoreError::Forbidden
        ));
    }

    #[test]
    fn duplicate_issue_rejected_regardless_of_caller() {
        let conn = open_memory_database().unwrap();
        let clinic = seed_clinic(&conn);
        let appt_id = completed_appointment(&conn, &clinic);

        issue(&conn, &clinic.doctor, &flu_request(appt_id)).unwrap();
        let err = issue(&conn, &clinic.doctor, &flu_request(appt_id)).unwrap_err();
        assert!(matches!(err, CoreError::AlreadyExists { .. }));
    }

    #[test]
    fn medication_fields_validated() {
        let conn = open_memory_database().unwrap();
        let clinic = seed_clinic(&conn);
        let appt_id = completed_appointment(&conn, &clinic);

        let mut empty_meds = flu_request(appt_id);
        empty_meds.medications.clear();
        assert!(matches!(
            issue(&conn, &clinic.doctor, &empty_meds).unwrap_err(),
            CoreError::ValidationFailed { .. }
        ));

        let mut blank_dosage = flu_request(appt_id);
        blank_dosage.medications[0].dosage = "".into();
        assert!(matches!(
            issue(&conn, &clinic.doctor, &blank_dosage).unwrap_err(),
            CoreError::ValidationFailed { .. }
        ));
    }

    #[test]
    fn issued_prescription_copies_owners_from_appointment() {
        let conn = open_memory_database().unwrap();
        let clinic = seed_clinic(&conn);
        let appt_id = completed_appointment(&conn, &clinic);

        let rx = issue(&conn, &clinic.doctor, &flu_request(appt_id)).unwrap();
        assert_eq!(rx.patient_id, clinic.patient.patient_id.unwrap());
        assert_eq!(rx.doctor_id, clinic.doctor_id);
        assert!(!rx.is_paid);
        assert_eq!(rx.medications.len(), 1);

        let stored = db::get_prescription(&conn, &rx.id).unwrap();
        assert_eq!(stored.medications[0].name, "Oseltamivir");
    }

    #[test]
    fn ownership_scoping_on_get_and_list() {
        let conn = open_memory_database().unwrap();
        let clinic = seed_clinic(&conn);
        let appt_id = completed_appointment(&conn, &clinic);
        let rx = issue(&conn, &clinic.doctor, &flu_request(appt_id)).unwrap();

        assert!(get(&conn, &clinic.patient, &rx.id).is_ok());
        assert!(get(&conn, &clinic.doctor, &rx.id).is_ok());
        assert!(get(&conn, &clinic.admin, &rx.id).is_ok());
        assert!(matches!(
            get(&conn, &clinic.second_patient, &rx.id).unwrap_err(),
            CoreError::Forbidden
        ));

        assert_eq!(list(&conn, &clinic.patient).unwrap().len(), 1);
        assert_eq!(list(&conn, &clinic.doctor).unwrap().len(), 1);
        assert_eq!(list(&conn, &clinic.admin).unwrap().len(), 1);
        assert!(list(&conn, &clinic.second_patient).unwrap().is_empty());
    }

    #[test]
    fn mark_paid_idempotent() {
        let conn = open_memory_database().unwrap();
        let clinic = seed_clinic(&conn);
        let appt_id = completed_appointment(&conn, &clinic);
        let rx = issue(&conn, &clinic.doctor, &flu_request(appt_id)).unwrap();

        let first = mark_paid(&conn, &clinic.patient, &rx.id).unwrap();
        assert!(first.is_paid);
        let second = mark_paid(&conn, &clinic.patient, &rx.id).unwrap();
        assert!(second.is_paid);
    }

    #[test]
    fn mark_paid_owner_or_admin_only() {
        let conn = open_memory_database().unwrap();
        let clinic = seed_clinic(&conn);
        let appt_id = completed_appointment(&conn, &clinic);
        let rx = issue(&conn, &clinic.doctor, &flu_request(appt_id)).unwrap();

        assert!(matches!(
            mark_paid(&conn, &clinic.doctor, &rx.id).unwrap_err(),
            CoreError::Forbidden
        ));
        assert!(matches!(
            mark_paid(&conn, &clinic.second_patient, &rx.id).unwrap_err(),
            CoreError::Forbidden
        ));
        assert!(mark_paid(&conn, &clinic.admin, &rx.id).unwrap().is_paid);
    }

    #[test]
    fn render_view_resolves_names() {
        let conn = open_memory_database().unwrap();
        let clinic = seed_clinic(&conn);
        let appt_id = completed_appointment(&conn, &clinic);
        let rx = issue(&conn, &clinic.doctor, &flu_request(appt_id)).unwrap();

        let view = render_view(&conn, &clinic.patient, &rx.id).unwrap();
        assert_eq!(view.patient_name, "Alice Martin");
        assert_eq!(view.doctor_name, "Bob Nguyen");
        assert_eq!(view.doctor_specialization, Specialization::GeneralMedicine);
        assert_eq!(view.diagnosis, "flu");
        assert_eq!(view.medications.len(), 1);

        assert!(matches!(
            render_view(&conn, &clinic.second_patient, &rx.id).unwrap_err(),
            CoreError::Forbidden
        ));
    }

    /// End-to-end: book at 50.00, raise the fee, complete, issue, pay.
    #[test]
    fn booking_to_payment_flow() {
        let conn = open_memory_database().unwrap();
        let clinic = seed_clinic(&conn);

        let appt = scheduling::book(
            &conn,
            &clinic.patient,
            &BookingRequest {
                doctor_id: clinic.doctor_id,
                appointment_date: NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
                appointment_time: NaiveTime::from_hms_opt(10, 0, 0).unwrap(),
                consultation_fee: 50.0,
                reason: "checkup".into(),
                notes: None,
            },
        )
        .unwrap();
        assert_eq!(appt.status, AppointmentStatus::Scheduled);

        // Doctor raises his fee; the booked snapshot must not move.
        let mut doctor = db::get_doctor(&conn, &clinic.doctor_id).unwrap();
        doctor.consultation_fee = 75.0;
        crate::registration::update_doctor(&conn, &clinic.admin, &doctor).unwrap();

        let completed =
            scheduling::transition(&conn, &clinic.doctor, &appt.id, TransitionAction::Complete)
                .unwrap();
        assert_eq!(completed.status, AppointmentStatus::Completed);
        assert_eq!(completed.consultation_fee, 50.0);

        let rx = issue(&conn, &clinic.doctor, &flu_request(appt.id)).unwrap();
        assert!(!rx.is_paid);

        assert!(matches!(
            issue(&conn, &clinic.doctor, &flu_request(appt.id)).unwrap_err(),
            CoreError::AlreadyExists { .. }
        ));

        let paid = mark_paid(&conn, &clinic.patient, &rx.id).unwrap();
        assert!(paid.is_paid);
    }
}
