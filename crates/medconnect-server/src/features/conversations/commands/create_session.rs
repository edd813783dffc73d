use serde::{Deserialize, Serialize};

use crate::features::conversations::types::{derive_title, ChatSession};
use crate::features::FeatureState;

/// Command to open a chat session
///
/// The title is normally filled in from the first prompt; a caller may
/// supply one up front.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateSessionCommand {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum CreateSessionError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

#[tracing::instrument(skip(state, command))]
pub async fn handle(
    state: &FeatureState,
    user_id: Option<i64>,
    command: CreateSessionCommand,
) -> Result<ChatSession, CreateSessionError> {
    let title = command
        .title
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(derive_title)
        .unwrap_or_default();

    let session = sqlx::query_as::<_, ChatSession>(
        r#"
        INSERT INTO chat_sessions (user_id, title)
        VALUES ($1, $2)
        RETURNING id, user_id, title, created_at, updated_at
        "#,
    )
    .bind(user_id)
    .bind(title)
    .fetch_one(&state.db)
    .await?;

    tracing::info!(session_id = %session.id, "Chat session created");

    Ok(session)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::shared::test_helpers::test_state;

    #[sqlx::test(migrations = "../../migrations")]
    #[ignore] // Requires database
    async fn test_create_session(pool: sqlx::PgPool) {
        let (mut state, _) = test_state();
        state.db = pool;

        let owned = handle(&state, Some(5), CreateSessionCommand::default()).await.unwrap();
        assert_eq!(owned.user_id, Some(5));
        assert_eq!(owned.title, "");

        let anonymous = handle(
            &state,
            None,
            CreateSessionCommand {
                title: Some("Follow-up".to_string()),
            },
        )
        .await
        .unwrap();
        assert_eq!(anonymous.user_id, None);
        assert_eq!(anonymous.title, "Follow-up");
    }
}
