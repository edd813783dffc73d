//! Shared validation utilities
//!
//! Input checks applied by commands before anything is encrypted or stored.

use thiserror::Error;

/// Inclusive age bounds accepted for a patient profile
pub const MIN_AGE: i32 = 0;
pub const MAX_AGE: i32 = 120;

/// Errors that can occur during age validation
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AgeValidationError {
    #[error("Age must be between {MIN_AGE} and {MAX_AGE}, got {0}")]
    OutOfRange(i32),
}

/// Errors that can occur during contact number validation
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ContactNumberValidationError {
    #[error("Contact number must be at most {max_length} characters")]
    TooLong { max_length: usize },

    #[error("Contact number may only contain digits, spaces, '+', '-', '(' and ')'")]
    InvalidFormat,
}

/// Errors that can occur during free-text validation
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TextValidationError {
    #[error("{field_name} is required and cannot be empty")]
    Required { field_name: String },

    #[error("{field_name} must be at most {max_length} characters")]
    TooLong {
        field_name: String,
        max_length: usize,
    },
}

/// Validate an age in years
pub fn validate_age(age: i32) -> Result<(), AgeValidationError> {
    if !(MIN_AGE..=MAX_AGE).contains(&age) {
        return Err(AgeValidationError::OutOfRange(age));
    }
    Ok(())
}

/// Validate a phone-style contact number
///
/// Blank values are accepted; they are stored as null.
pub fn validate_contact_number(
    number: &str,
    max_length: usize,
) -> Result<(), ContactNumberValidationError> {
    if number.chars().count() > max_length {
        return Err(ContactNumberValidationError::TooLong { max_length });
    }

    if !number
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, ' ' | '+' | '-' | '(' | ')'))
    {
        return Err(ContactNumberValidationError::InvalidFormat);
    }

    Ok(())
}

/// Validate required free text, counting characters rather than bytes
pub fn validate_text(
    value: &str,
    field_name: &str,
    max_length: usize,
) -> Result<(), TextValidationError> {
    if value.trim().is_empty() {
        return Err(TextValidationError::Required {
            field_name: field_name.to_string(),
        });
    }

    if value.chars().count() > max_length {
        return Err(TextValidationError::TooLong {
            field_name: field_name.to_string(),
            max_length,
        });
    }

    Ok(())
}
