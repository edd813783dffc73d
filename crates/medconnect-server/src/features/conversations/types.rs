//! Chat session and conversation types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgExecutor;
use uuid::Uuid;

use crate::crypto::{CryptoError, FieldCodec};

/// Characters of the first prompt kept as the session title
pub const TITLE_PREFIX_CHARS: usize = 50;

/// Session title derived from a prompt: the first 50 characters, with `...`
/// appended when the prompt was longer
pub fn derive_title(prompt: &str) -> String {
    match prompt.char_indices().nth(TITLE_PREFIX_CHARS) {
        Some((idx, _)) => format!("{}...", &prompt[..idx]),
        None => prompt.to_string(),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct ChatSession {
    pub id: Uuid,
    pub user_id: Option<i64>,
    pub title: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ChatSession {
    /// Sessions owned by a user are visible only to that user; anonymous
    /// sessions are visible to anyone holding the id
    pub fn is_visible_to(&self, actor: Option<i64>) -> bool {
        match self.user_id {
            Some(owner) => actor == Some(owner),
            None => true,
        }
    }
}

/// Load a session the actor may see
pub async fn find_visible_session<'e, E>(
    executor: E,
    session_id: Uuid,
    actor: Option<i64>,
) -> Result<Option<ChatSession>, sqlx::Error>
where
    E: PgExecutor<'e>,
{
    let session = sqlx::query_as::<_, ChatSession>(
        "SELECT id, user_id, title, created_at, updated_at FROM chat_sessions WHERE id = $1",
    )
    .bind(session_id)
    .fetch_optional(executor)
    .await?;

    Ok(session.filter(|s| s.is_visible_to(actor)))
}

/// Like [`find_visible_session`], but takes a row lock held until the
/// enclosing transaction ends. Appends to one session are serialized by it.
pub async fn lock_visible_session<'e, E>(
    executor: E,
    session_id: Uuid,
    actor: Option<i64>,
) -> Result<Option<ChatSession>, sqlx::Error>
where
    E: PgExecutor<'e>,
{
    let session = sqlx::query_as::<_, ChatSession>(
        r#"
        SELECT id, user_id, title, created_at, updated_at
        FROM chat_sessions
        WHERE id = $1
        FOR UPDATE
        "#,
    )
    .bind(session_id)
    .fetch_optional(executor)
    .await?;

    Ok(session.filter(|s| s.is_visible_to(actor)))
}

/// Conversation as stored
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ConversationRow {
    pub id: i64,
    pub session_id: Uuid,
    pub prompt: String,
    pub response: String,
    pub created_at: DateTime<Utc>,
}

/// Decrypted prompt/response exchange
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conversation {
    pub id: i64,
    pub session_id: Uuid,
    pub prompt: String,
    pub response: String,
    pub created_at: DateTime<Utc>,
}

impl ConversationRow {
    pub fn decode(self, codec: &FieldCodec) -> Result<Conversation, CryptoError> {
        Ok(Conversation {
            id: self.id,
            session_id: self.session_id,
            prompt: codec.decode(Some(&self.prompt))?.unwrap_or_default(),
            response: codec.decode(Some(&self.response))?.unwrap_or_default(),
            created_at: self.created_at,
        })
    }
}
