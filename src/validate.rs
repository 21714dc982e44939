//! Field-level validation helpers shared by registration and both engines.

use crate::error::CoreError;

pub fn require_non_empty(field: &str, value: &str) -> Result<(), CoreError> {
    if value.trim().is_empty() {
        return Err(CoreError::validation(field, "must not be empty"));
    }
    Ok(())
}

pub fn require_positive(field: &str, value: f64) -> Result<(), CoreError> {
    if !(value > 0.0) {
        return Err(CoreError::validation(field, "must be strictly positive"));
    }
    Ok(())
}

/// Minimal shape check; real address verification belongs to the auth
/// collaborator.
pub fn require_email_shape(value: &str) -> Result<(), CoreError> {
    let trimmed = value.trim();
    let well_formed = match trimmed.split_once('@') {
        Some((local, domain)) => !local.is_empty() && domain.contains('.') && !domain.ends_with('.'),
        None => false,
    };
    if !well_formed {
        return Err(CoreError::validation("email", "not a valid address"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_and_whitespace_rejected() {
        assert!(require_non_empty("reason", "").is_err());
        assert!(require_non_empty("reason", "   ").is_err());
        assert!(require_non_empty("reason", "checkup").is_ok());
    }

    #[test]
    fn positive_boundary() {
        assert!(require_positive("fee", 0.0).is_err());
        assert!(require_positive("fee", -50.0).is_err());
        assert!(require_positive("fee", f64::NAN).is_err());
        assert!(require_positive("fee", 0.01).is_ok());
    }

    #[test]
    fn email_shape() {
        assert!(require_email_shape("alice@example.com").is_ok());
        assert!(require_email_shape("alice").is_err());
        assert!(require_email_shape("@example.com").is_err());
        assert!(require_email_shape("alice@nodot").is_err());
        assert!(require_email_shape("alice@example.").is_err());
    }

    #[test]
    fn validation_error_carries_field() {
        let err = require_positive("fee", -1.0).unwrap_err();
        match err {
            CoreError::ValidationFailed { field, .. } => assert_eq!(field, "fee"),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
