//! Domain error kinds shared by both engines.
//!
//! Every failed invariant check surfaces as a typed variant; nothing is
//! swallowed or translated on the way to the caller. `code()` gives the
//! stable string a transport layer can branch on.

use thiserror::Error;

use crate::db::DatabaseError;
use crate::models::AppointmentStatus;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("{entity} not found with id {id}")]
    NotFound { entity: String, id: String },

    #[error("Caller is not authorized for this resource")]
    Forbidden,

    #[error("This time slot is already booked")]
    SlotUnavailable,

    #[error("No transition permitted from status {current}")]
    InvalidTransition { current: AppointmentStatus },

    #[error("Appointment is {status}, not completed")]
    PrecursorNotMet { status: AppointmentStatus },

    #[error("{entity} already exists: {detail}")]
    AlreadyExists { entity: String, detail: String },

    #[error("Invalid {field}: {reason}")]
    ValidationFailed { field: String, reason: String },

    #[error("Service unavailable: {0}")]
    Unavailable(String),
}

impl CoreError {
    pub fn not_found(entity: &str, id: impl ToString) -> Self {
        Self::NotFound {
            entity: entity.into(),
            id: id.to_string(),
        }
    }

    pub fn validation(field: &str, reason: &str) -> Self {
        Self::ValidationFailed {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Stable machine-readable kind for caller branching.
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "NOT_FOUND",
            Self::Forbidden => "FORBIDDEN",
            Self::SlotUnavailable => "SLOT_UNAVAILABLE",
            Self::InvalidTransition { .. } => "INVALID_TRANSITION",
            Self::PrecursorNotMet { .. } => "PRECURSOR_NOT_MET",
            Self::AlreadyExists { .. } => "ALREADY_EXISTS",
            Self::ValidationFailed { .. } => "VALIDATION_FAILED",
            Self::Unavailable(_) => "UNAVAILABLE",
        }
    }

    /// Transient infrastructure failures may be retried as-is;
    /// `SlotUnavailable` must not be retried without re-choosing a slot.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }
}

impl From<DatabaseError> for CoreError {
    fn from(err: DatabaseError) -> Self {
        match err {
            DatabaseError::NotFound { entity_type, id } => CoreError::NotFound {
                entity: entity_type,
                id,
            },
            other => CoreError::Unavailable(other.to_string()),
        }
    }
}
