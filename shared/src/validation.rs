//! Input validation functions
//!
//! Custom validators plugged into the `validator` derive macros on the
//! input types in [`crate::models`].

use validator::ValidationError;

/// Reject text that is empty once surrounding whitespace is removed
pub fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new("blank"));
    }
    Ok(())
}

/// Reject NaN and infinite values, which slip through range checks
pub fn finite(value: f64) -> Result<(), ValidationError> {
    if !value.is_finite() {
        return Err(ValidationError::new("not_finite"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_not_blank() {
        assert!(not_blank("Bench press").is_ok());
        assert!(not_blank("").is_err());
        assert!(not_blank("   \t").is_err());
    }

    #[test]
    fn test_finite_rejects_nan_and_infinity() {
        assert!(finite(f64::NAN).is_err());
        assert!(finite(f64::INFINITY).is_err());
        assert!(finite(f64::NEG_INFINITY).is_err());
    }

    proptest! {
        #[test]
        fn prop_finite_accepts_regular_numbers(value in -1.0e9f64..1.0e9) {
            prop_assert!(finite(value).is_ok());
        }
    }
}
