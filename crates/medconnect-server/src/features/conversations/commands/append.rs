//! Append a prompt/response exchange to a chat session
//!
//! Both texts are encrypted before the insert. The first exchange of a
//! session names it after the prompt.

use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use crate::audit::{AuditAction, RequestOrigin, ResourceType};
use crate::crypto::CryptoError;
use crate::features::conversations::types::{
    derive_title, lock_visible_session, Conversation, ConversationRow,
};
use crate::features::shared::validation::{validate_text, TextValidationError};
use crate::features::FeatureState;

/// Maximum prompt length, in characters
pub const MAX_PROMPT_LENGTH: usize = 10_000;

/// Maximum response length, in characters
pub const MAX_RESPONSE_LENGTH: usize = 100_000;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppendConversationCommand {
    pub prompt: String,
    pub response: String,
}

#[derive(Debug, thiserror::Error)]
pub enum AppendConversationError {
    #[error("Validation failed: {0}")]
    Validation(#[from] TextValidationError),

    #[error("Chat session '{0}' not found")]
    SessionNotFound(Uuid),

    #[error("Field encryption failed: {0}")]
    Crypto(#[from] CryptoError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl AppendConversationCommand {
    /// Both texts are required; a blank response means nothing was generated
    pub fn validate(&self) -> Result<(), AppendConversationError> {
        validate_text(&self.prompt, "prompt", MAX_PROMPT_LENGTH)?;
        validate_text(&self.response, "response", MAX_RESPONSE_LENGTH)?;
        Ok(())
    }
}

#[tracing::instrument(skip(state, origin, command), fields(session_id = %session_id))]
pub async fn handle(
    state: &FeatureState,
    actor: Option<i64>,
    origin: &RequestOrigin,
    session_id: Uuid,
    command: AppendConversationCommand,
) -> Result<Conversation, AppendConversationError> {
    command.validate()?;

    let prompt = command.prompt;
    let response = command.response.trim().to_string();

    let stored_prompt = state.codec.encode(Some(&prompt))?;
    let stored_response = state.codec.encode(Some(&response))?;

    let mut tx = state.db.begin().await?;

    // Held until commit, so a concurrent append counts this one's row
    lock_visible_session(&mut *tx, session_id, actor)
        .await?
        .ok_or(AppendConversationError::SessionNotFound(session_id))?;

    let row = sqlx::query_as::<_, ConversationRow>(
        r#"
        INSERT INTO conversations (session_id, prompt, response)
        VALUES ($1, $2, $3)
        RETURNING id, session_id, prompt, response, created_at
        "#,
    )
    .bind(session_id)
    .bind(stored_prompt)
    .bind(stored_response)
    .fetch_one(&mut *tx)
    .await?;

    let (count,): (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM conversations WHERE session_id = $1")
            .bind(session_id)
            .fetch_one(&mut *tx)
            .await?;

    if count == 1 {
        sqlx::query("UPDATE chat_sessions SET title = $2, updated_at = NOW() WHERE id = $1")
            .bind(session_id)
            .bind(derive_title(&prompt))
            .execute(&mut *tx)
            .await?;
    } else {
        sqlx::query("UPDATE chat_sessions SET updated_at = NOW() WHERE id = $1")
            .bind(session_id)
            .execute(&mut *tx)
            .await?;
    }

    tx.commit().await?;

    state
        .auditor
        .record(
            actor,
            AuditAction::Create,
            ResourceType::Conversation,
            row.id,
            Some(origin),
            Some(json!({
                "prompt_length": prompt.chars().count(),
                "response_length": response.chars().count(),
                "session_id": session_id.to_string(),
            })),
        )
        .await;

    Ok(row.decode(&state.codec)?)
}
