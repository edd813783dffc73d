//! Create or replace the caller's patient profile
//!
//! Sensitive fields are encrypted before the write. The audit entry is
//! `create` for a new row and `update` for an existing one.

use medconnect_common::hash_sensitive_data;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::audit::{AuditAction, RequestOrigin, ResourceType};
use crate::crypto::CryptoError;
use crate::features::patients::types::{Gender, PatientProfile, ProfileRow, PROFILE_COLUMNS};
use crate::features::shared::validation::{
    validate_age, validate_contact_number, AgeValidationError, ContactNumberValidationError,
};
use crate::features::FeatureState;

/// Maximum contact number length, in characters
pub const MAX_CONTACT_NUMBER_LENGTH: usize = 32;

/// Command to create or replace a patient profile
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpsertProfileCommand {
    /// Age in years, 0 to 120
    pub age: i32,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gender: Option<Gender>,

    /// Free-text medical history (encrypted at rest)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub medical_history: Option<String>,

    /// Phone number (encrypted at rest)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact_number: Option<String>,
}

/// Response from upserting a profile
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpsertProfileResponse {
    /// Whether a new profile row was created
    pub created: bool,
    #[serde(flatten)]
    pub profile: PatientProfile,
}

/// Errors that can occur when upserting a profile
#[derive(Debug, thiserror::Error)]
pub enum UpsertProfileError {
    #[error("Age validation failed: {0}")]
    AgeValidation(#[from] AgeValidationError),

    #[error("Contact number validation failed: {0}")]
    ContactNumberValidation(#[from] ContactNumberValidationError),

    #[error("Field encryption failed: {0}")]
    Crypto(#[from] CryptoError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl UpsertProfileCommand {
    /// Validates the command parameters
    pub fn validate(&self) -> Result<(), UpsertProfileError> {
        validate_age(self.age)?;

        if let Some(ref number) = self.contact_number {
            validate_contact_number(number, MAX_CONTACT_NUMBER_LENGTH)?;
        }

        Ok(())
    }
}

#[derive(Debug, sqlx::FromRow)]
struct UpsertedRow {
    #[sqlx(flatten)]
    profile: ProfileRow,
    inserted: bool,
}

/// Handler function for upserting a patient profile
#[tracing::instrument(skip(state, origin, command), fields(user_id = user_id, age = command.age))]
pub async fn handle(
    state: &FeatureState,
    user_id: i64,
    origin: &RequestOrigin,
    command: UpsertProfileCommand,
) -> Result<UpsertProfileResponse, UpsertProfileError> {
    command.validate()?;

    let medical_history = state.codec.encode(command.medical_history.as_deref())?;
    let contact_number = state.codec.encode(command.contact_number.as_deref())?;
    let contact_number_hash = command
        .contact_number
        .as_deref()
        .map(str::trim)
        .and_then(hash_sensitive_data);

    let row = sqlx::query_as::<_, UpsertedRow>(&format!(
        r#"
        INSERT INTO patient_profiles (
            user_id, age, gender, medical_history, contact_number, contact_number_hash
        )
        VALUES ($1, $2, $3, $4, $5, $6)
        ON CONFLICT (user_id) DO UPDATE SET
            age = EXCLUDED.age,
            gender = EXCLUDED.gender,
            medical_history = EXCLUDED.medical_history,
            contact_number = EXCLUDED.contact_number,
            contact_number_hash = EXCLUDED.contact_number_hash,
            updated_at = NOW()
        RETURNING {}, (xmax = 0) AS inserted
        "#,
        PROFILE_COLUMNS
    ))
    .bind(user_id)
    .bind(command.age)
    .bind(command.gender.map(|g| g.as_str()))
    .bind(medical_history)
    .bind(contact_number)
    .bind(contact_number_hash)
    .fetch_one(&state.db)
    .await?;

    let action = if row.inserted {
        AuditAction::Create
    } else {
        AuditAction::Update
    };

    state
        .auditor
        .record(
            Some(user_id),
            action,
            ResourceType::PatientProfile,
            user_id,
            Some(origin),
            Some(json!({ "view": "upsert_profile" })),
        )
        .await;

    tracing::info!(created = row.inserted, "Patient profile saved");

    Ok(UpsertProfileResponse {
        created: row.inserted,
        profile: row.profile.decode(&state.codec)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn command(age: i32) -> UpsertProfileCommand {
        UpsertProfileCommand {
            age,
            gender: Some(Gender::Male),
            medical_history: Some("Hypertension".to_string()),
            contact_number: Some("+1-555-2020".to_string()),
        }
    }

    #[test]
    fn test_validate_success() {
        assert!(command(30).validate().is_ok());
    }

    #[test]
    fn test_validate_age_out_of_range() {
        assert!(matches!(
            command(121).validate(),
            Err(UpsertProfileError::AgeValidation(_))
        ));
        assert!(matches!(
            command(-1).validate(),
            Err(UpsertProfileError::AgeValidation(_))
        ));
    }

    #[test]
    fn test_validate_contact_number() {
        let mut cmd = command(30);
        cmd.contact_number = Some("not a number".to_string());
        assert!(matches!(
            cmd.validate(),
            Err(UpsertProfileError::ContactNumberValidation(_))
        ));
    }

    #[test]
    fn test_command_deserialization_defaults() {
        let cmd: UpsertProfileCommand = serde_json::from_str(r#"{"age": 52}"#).unwrap();
        assert_eq!(cmd.age, 52);
        assert!(cmd.gender.is_none());
        assert!(cmd.medical_history.is_none());
    }

    #[sqlx::test(migrations = "../../migrations")]
    #[ignore] // Requires database
    async fn test_upsert_creates_then_updates(pool: sqlx::PgPool) -> sqlx::Result<()> {
        let (mut state, store) = crate::features::shared::test_helpers::test_state();
        state.db = pool.clone();
        let origin = RequestOrigin::default();

        let first = handle(&state, 9, &origin, command(30)).await.unwrap();
        assert!(first.created);
        assert_eq!(first.profile.medical_history.as_deref(), Some("Hypertension"));

        let second = handle(&state, 9, &origin, command(31)).await.unwrap();
        assert!(!second.created);
        assert_eq!(second.profile.age, 31);

        let stored: (Option<String>, Option<String>) = sqlx::query_as(
            "SELECT medical_history, contact_number_hash FROM patient_profiles WHERE user_id = 9",
        )
        .fetch_one(&pool)
        .await?;
        assert_ne!(stored.0.as_deref(), Some("Hypertension"));
        assert_eq!(stored.1, hash_sensitive_data("+1-555-2020"));

        let actions: Vec<String> = store.entries().into_iter().map(|e| e.action).collect();
        assert_eq!(actions, vec!["create", "update"]);

        Ok(())
    }
}
