use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use crate::audit::{AuditAction, RequestOrigin, ResourceType, MULTIPLE_RESOURCES};
use crate::crypto::CryptoError;
use crate::features::conversations::types::{
    find_visible_session, Conversation, ConversationRow,
};
use crate::features::FeatureState;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListConversationsQuery {
    pub session_id: Uuid,
}

#[derive(Debug, thiserror::Error)]
pub enum ListConversationsError {
    #[error("Chat session '{0}' not found")]
    SessionNotFound(Uuid),
    #[error("Field decryption failed: {0}")]
    Crypto(#[from] CryptoError),
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Decrypted history of a session, oldest first
#[tracing::instrument(skip(state, origin))]
pub async fn handle(
    state: &FeatureState,
    actor: Option<i64>,
    origin: &RequestOrigin,
    query: ListConversationsQuery,
) -> Result<Vec<Conversation>, ListConversationsError> {
    find_visible_session(&state.db, query.session_id, actor)
        .await?
        .ok_or(ListConversationsError::SessionNotFound(query.session_id))?;

    let rows = sqlx::query_as::<_, ConversationRow>(
        r#"
        SELECT id, session_id, prompt, response, created_at
        FROM conversations
        WHERE session_id = $1
        ORDER BY created_at ASC, id ASC
        "#,
    )
    .bind(query.session_id)
    .fetch_all(&state.db)
    .await?;

    let conversations = rows
        .into_iter()
        .map(|row| row.decode(&state.codec))
        .collect::<Result<Vec<_>, _>>()?;

    state
        .auditor
        .record(
            actor,
            AuditAction::View,
            ResourceType::Conversation,
            MULTIPLE_RESOURCES,
            Some(origin),
            Some(json!({
                "session_id": query.session_id.to_string(),
                "count": conversations.len(),
            })),
        )
        .await;

    Ok(conversations)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::conversations::commands::append::{self, AppendConversationCommand};
    use crate::features::conversations::commands::create_session::{self, CreateSessionCommand};
    use crate::features::shared::test_helpers::test_state;

    #[sqlx::test(migrations = "../../migrations")]
    #[ignore] // Requires database
    async fn test_list_in_insertion_order(pool: sqlx::PgPool) {
        let (mut state, store) = test_state();
        state.db = pool;
        let origin = RequestOrigin::default();

        let session = create_session::handle(&state, None, CreateSessionCommand::default())
            .await
            .unwrap();

        for (prompt, response) in [("first", "one"), ("second", "two"), ("third", "three")] {
            append::handle(
                &state,
                None,
                &origin,
                session.id,
                AppendConversationCommand {
                    prompt: prompt.to_string(),
                    response: response.to_string(),
                },
            )
            .await
            .unwrap();
        }

        let conversations = handle(
            &state,
            None,
            &origin,
            ListConversationsQuery {
                session_id: session.id,
            },
        )
        .await
        .unwrap();

        let prompts: Vec<_> = conversations.iter().map(|c| c.prompt.as_str()).collect();
        assert_eq!(prompts, vec!["first", "second", "third"]);

        let entries = store.entries();
        assert_eq!(entries.len(), 4);
        let view = &entries[3];
        assert_eq!(view.action, "view");
        assert_eq!(view.resource_id, MULTIPLE_RESOURCES);
        assert_eq!(view.details["count"], 3);
    }

    #[sqlx::test(migrations = "../../migrations")]
    #[ignore] // Requires database
    async fn test_list_unknown_session(pool: sqlx::PgPool) {
        let (mut state, store) = test_state();
        state.db = pool;

        let result = handle(
            &state,
            Some(1),
            &RequestOrigin::default(),
            ListConversationsQuery {
                session_id: Uuid::new_v4(),
            },
        )
        .await;

        assert!(matches!(result, Err(ListConversationsError::SessionNotFound(_))));
        assert!(store.is_empty());
    }
}
