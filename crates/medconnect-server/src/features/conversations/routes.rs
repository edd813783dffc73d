//! Chat API routes
//!
//! # Route Structure
//!
//! - `POST /api/v1/chat/sessions` - Open a session
//! - `POST /api/v1/chat/sessions/:id/conversations` - Append an exchange
//! - `GET /api/v1/chat/sessions/:id/conversations` - Session history
//!
//! The `x-user-id` header is optional; sessions opened without it are
//! anonymous.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use uuid::Uuid;

use super::{
    commands::{
        AppendConversationCommand, AppendConversationError, CreateSessionCommand,
        CreateSessionError,
    },
    queries::{ListConversationsError, ListConversationsQuery},
};
use crate::api::response::{ApiResponse, ErrorResponse};
use crate::audit::{Actor, RequestOrigin};
use crate::features::FeatureState;

/// Creates the chat router
pub fn chat_routes() -> Router<FeatureState> {
    Router::new().route("/sessions", post(create_session)).route(
        "/sessions/:id/conversations",
        get(list_conversations).post(append_conversation),
    )
}

#[tracing::instrument(skip(state, command), fields(user_id = ?actor.user_id()))]
async fn create_session(
    State(state): State<FeatureState>,
    actor: Actor,
    command: Option<Json<CreateSessionCommand>>,
) -> Result<Response, ChatApiError> {
    let command = command.map(|Json(c)| c).unwrap_or_default();
    let session =
        super::commands::create_session::handle(&state, actor.user_id(), command).await?;

    Ok((StatusCode::CREATED, Json(ApiResponse::success(session))).into_response())
}

/// Append a prompt/response exchange
///
/// # Response
///
/// - `201 Created` - Stored exchange, decrypted
/// - `400 Bad Request` - Blank or oversized prompt or response
/// - `404 Not Found` - Unknown session, or one owned by another user
#[tracing::instrument(skip(state, origin, command), fields(user_id = ?actor.user_id()))]
async fn append_conversation(
    State(state): State<FeatureState>,
    actor: Actor,
    origin: RequestOrigin,
    Path(session_id): Path<Uuid>,
    Json(command): Json<AppendConversationCommand>,
) -> Result<Response, ChatApiError> {
    let conversation = super::commands::append::handle(
        &state,
        actor.user_id(),
        &origin,
        session_id,
        command,
    )
    .await?;

    Ok((StatusCode::CREATED, Json(ApiResponse::success(conversation))).into_response())
}

#[tracing::instrument(skip(state, origin), fields(user_id = ?actor.user_id()))]
async fn list_conversations(
    State(state): State<FeatureState>,
    actor: Actor,
    origin: RequestOrigin,
    Path(session_id): Path<Uuid>,
) -> Result<Response, ChatApiError> {
    let conversations = super::queries::list::handle(
        &state,
        actor.user_id(),
        &origin,
        ListConversationsQuery { session_id },
    )
    .await?;

    Ok((StatusCode::OK, Json(ApiResponse::success(conversations))).into_response())
}

// ============================================================================
// Error Handling
// ============================================================================

#[derive(Debug, thiserror::Error)]
enum ChatApiError {
    #[error(transparent)]
    CreateSession(#[from] CreateSessionError),
    #[error(transparent)]
    Append(#[from] AppendConversationError),
    #[error(transparent)]
    List(#[from] ListConversationsError),
}

impl IntoResponse for ChatApiError {
    fn into_response(self) -> Response {
        match self {
            ChatApiError::Append(AppendConversationError::Validation(_)) => {
                ErrorResponse::new("VALIDATION_ERROR", self.to_string())
                    .into_response_with(StatusCode::BAD_REQUEST)
            },
            ChatApiError::Append(AppendConversationError::SessionNotFound(_))
            | ChatApiError::List(ListConversationsError::SessionNotFound(_)) => {
                ErrorResponse::new("NOT_FOUND", self.to_string())
                    .into_response_with(StatusCode::NOT_FOUND)
            },
            ChatApiError::Append(AppendConversationError::Crypto(_))
            | ChatApiError::List(ListConversationsError::Crypto(_)) => {
                tracing::error!("Field encryption error on conversation: {}", self);
                ErrorResponse::new("INTERNAL_ERROR", "Protected data is unavailable")
                    .into_response_with(StatusCode::INTERNAL_SERVER_ERROR)
            },
            ChatApiError::CreateSession(CreateSessionError::Database(_))
            | ChatApiError::Append(AppendConversationError::Database(_))
            | ChatApiError::List(ListConversationsError::Database(_)) => {
                tracing::error!("Database error on chat: {}", self);
                ErrorResponse::new("INTERNAL_ERROR", "A database error occurred")
                    .into_response_with(StatusCode::INTERNAL_SERVER_ERROR)
            },
        }
    }
}
