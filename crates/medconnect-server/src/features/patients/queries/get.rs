use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::audit::{AuditAction, RequestOrigin, ResourceType};
use crate::crypto::CryptoError;
use crate::features::patients::types::{PatientProfile, ProfileRow, PROFILE_COLUMNS};
use crate::features::FeatureState;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetProfileQuery {
    pub user_id: i64,
}

#[derive(Debug, thiserror::Error)]
pub enum GetProfileError {
    #[error("Patient profile not found")]
    NotFound,
    #[error("Field decryption failed: {0}")]
    Crypto(#[from] CryptoError),
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Load and decrypt a profile, recording a `view` of the medical history
#[tracing::instrument(skip(state, origin))]
pub async fn handle(
    state: &FeatureState,
    actor: i64,
    origin: &RequestOrigin,
    query: GetProfileQuery,
) -> Result<PatientProfile, GetProfileError> {
    let row = sqlx::query_as::<_, ProfileRow>(&format!(
        "SELECT {} FROM patient_profiles WHERE user_id = $1",
        PROFILE_COLUMNS
    ))
    .bind(query.user_id)
    .fetch_optional(&state.db)
    .await?
    .ok_or(GetProfileError::NotFound)?;

    let profile = row.decode(&state.codec)?;

    state
        .auditor
        .record(
            Some(actor),
            AuditAction::View,
            ResourceType::MedicalHistory,
            query.user_id,
            Some(origin),
            Some(json!({ "view": "get_profile" })),
        )
        .await;

    Ok(profile)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::shared::test_helpers::test_state;

    #[sqlx::test(migrations = "../../migrations")]
    #[ignore] // Requires database
    async fn test_get_missing_profile(pool: sqlx::PgPool) {
        let (mut state, store) = test_state();
        state.db = pool;

        let result = handle(&state, 1, &RequestOrigin::default(), GetProfileQuery { user_id: 1 }).await;
        assert!(matches!(result, Err(GetProfileError::NotFound)));
        assert!(store.is_empty());
    }

    #[sqlx::test(migrations = "../../migrations")]
    #[ignore] // Requires database
    async fn test_get_reads_legacy_plaintext(pool: sqlx::PgPool) -> sqlx::Result<()> {
        sqlx::query(
            "INSERT INTO patient_profiles (user_id, age, medical_history, contact_number) \
             VALUES (4, 61, 'Type 2 diabetes', '555-1234')",
        )
        .execute(&pool)
        .await?;

        let (mut state, store) = test_state();
        state.db = pool;

        let profile = handle(&state, 4, &RequestOrigin::default(), GetProfileQuery { user_id: 4 })
            .await
            .unwrap();
        assert_eq!(profile.medical_history.as_deref(), Some("Type 2 diabetes"));
        assert_eq!(profile.contact_number.as_deref(), Some("555-1234"));

        let entries = store.entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].action, "view");
        assert_eq!(entries[0].resource_type, "medical_history");
        assert_eq!(entries[0].resource_id, "4");

        Ok(())
    }
}
