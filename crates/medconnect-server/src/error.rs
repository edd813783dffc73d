//! Server-specific error types

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::audit::AuditStoreError;
use crate::crypto::CryptoError;

/// Result type alias for server operations
pub type ServerResult<T> = std::result::Result<T, AppError>;

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Field encryption error: {0}")]
    Crypto(#[from] CryptoError),

    #[error("Audit log error: {0}")]
    Audit(#[from] AuditStoreError),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let error_message = match self {
            AppError::Database(ref e) => {
                tracing::error!("Database error: {:?}", e);
                "A database error occurred".to_string()
            },
            AppError::Crypto(ref e) => {
                tracing::error!(error = %e, "Field encryption error");
                "Protected data is unavailable".to_string()
            },
            AppError::Audit(ref e) => {
                tracing::error!(error = %e, "Audit log query failed");
                "Audit log is unavailable".to_string()
            },
            AppError::NotFound(ref message) => message.clone(),
            AppError::Validation(ref message) => message.clone(),
            AppError::Unauthorized(ref message) => message.clone(),
        };

        let body = Json(json!({
            "error": {
                "message": error_message,
                "status": status.as_u16(),
            }
        }));

        (status, body).into_response()
    }
}
