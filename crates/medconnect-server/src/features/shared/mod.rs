//! Shared utilities and types for feature modules
//!
//! # Contents
//!
//! - **validation**: Input validation utilities
//! - **test_helpers**: Test fixtures and utilities (test-only)

pub mod validation;

#[cfg(test)]
pub mod test_helpers;

pub use validation::{
    validate_age, validate_contact_number, validate_text, AgeValidationError,
    ContactNumberValidationError, TextValidationError,
};
