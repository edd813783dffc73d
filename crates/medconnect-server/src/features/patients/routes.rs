//! Patient profile API routes
//!
//! # Route Structure
//!
//! - `PUT /api/v1/patient/profile` - Create or replace the caller's profile
//! - `GET /api/v1/patient/profile` - Read the caller's profile
//!
//! Both routes require the `x-user-id` header.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};

use super::{
    commands::{UpsertProfileCommand, UpsertProfileError},
    queries::{GetProfileError, GetProfileQuery},
};
use crate::api::response::{ApiResponse, ErrorResponse};
use crate::audit::{Actor, RequestOrigin};
use crate::features::FeatureState;

/// Creates the patient router
pub fn patient_routes() -> Router<FeatureState> {
    Router::new().route("/profile", get(get_profile).put(upsert_profile))
}

/// Create or replace the caller's profile
///
/// # Response
///
/// - `201 Created` - Profile created
/// - `200 OK` - Profile replaced
/// - `400 Bad Request` - Validation error
/// - `401 Unauthorized` - No authenticated user
#[tracing::instrument(skip(state, origin, command), fields(user_id = ?actor.user_id()))]
async fn upsert_profile(
    State(state): State<FeatureState>,
    actor: Actor,
    origin: RequestOrigin,
    Json(command): Json<UpsertProfileCommand>,
) -> Result<Response, PatientApiError> {
    let user_id = actor.user_id().ok_or(PatientApiError::Unauthorized)?;

    let response = super::commands::upsert::handle(&state, user_id, &origin, command).await?;

    let status = if response.created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };

    Ok((status, Json(ApiResponse::success(response))).into_response())
}

/// Read the caller's profile
///
/// # Response
///
/// - `200 OK` - Decrypted profile
/// - `401 Unauthorized` - No authenticated user
/// - `404 Not Found` - No profile saved yet
#[tracing::instrument(skip(state, origin), fields(user_id = ?actor.user_id()))]
async fn get_profile(
    State(state): State<FeatureState>,
    actor: Actor,
    origin: RequestOrigin,
) -> Result<Response, PatientApiError> {
    let user_id = actor.user_id().ok_or(PatientApiError::Unauthorized)?;

    let profile =
        super::queries::get::handle(&state, user_id, &origin, GetProfileQuery { user_id }).await?;

    Ok((StatusCode::OK, Json(ApiResponse::success(profile))).into_response())
}

// ============================================================================
// Error Handling
// ============================================================================

/// Unified error type for patient API endpoints
#[derive(Debug, thiserror::Error)]
enum PatientApiError {
    #[error("Authentication required")]
    Unauthorized,
    #[error(transparent)]
    Upsert(#[from] UpsertProfileError),
    #[error(transparent)]
    Get(#[from] GetProfileError),
}

impl IntoResponse for PatientApiError {
    fn into_response(self) -> Response {
        match self {
            PatientApiError::Unauthorized => {
                ErrorResponse::new("UNAUTHORIZED", self.to_string())
                    .into_response_with(StatusCode::UNAUTHORIZED)
            },
            PatientApiError::Upsert(UpsertProfileError::AgeValidation(_))
            | PatientApiError::Upsert(UpsertProfileError::ContactNumberValidation(_)) => {
                ErrorResponse::new("VALIDATION_ERROR", self.to_string())
                    .into_response_with(StatusCode::BAD_REQUEST)
            },
            PatientApiError::Get(GetProfileError::NotFound) => {
                ErrorResponse::new("NOT_FOUND", self.to_string())
                    .into_response_with(StatusCode::NOT_FOUND)
            },
            PatientApiError::Upsert(UpsertProfileError::Crypto(_))
            | PatientApiError::Get(GetProfileError::Crypto(_)) => {
                tracing::error!("Field encryption error on patient profile: {}", self);
                ErrorResponse::new("INTERNAL_ERROR", "Protected data is unavailable")
                    .into_response_with(StatusCode::INTERNAL_SERVER_ERROR)
            },
            PatientApiError::Upsert(UpsertProfileError::Database(_))
            | PatientApiError::Get(GetProfileError::Database(_)) => {
                tracing::error!("Database error on patient profile: {}", self);
                ErrorResponse::new("INTERNAL_ERROR", "A database error occurred")
                    .into_response_with(StatusCode::INTERNAL_SERVER_ERROR)
            },
        }
    }
}
