//! HTTP application assembly
//!
//! [`create_router`] mounts the feature routes under `/api/v1`, adds the
//! health check, and wraps everything in the middleware stack. From the
//! innermost layer out: PHI inspector, request tracing, CORS.

pub mod response;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde_json::json;

use crate::audit::PhiAuditLayer;
use crate::config::Config;
use crate::features::{self, FeatureState};
use crate::middleware;

/// Create the application router with all routes and middleware
pub fn create_router(state: FeatureState, config: &Config) -> Router {
    let phi_audit = PhiAuditLayer::new(state.auditor.clone());

    Router::new()
        .route("/", get(root))
        .route("/health", get(health_check))
        .with_state(state.clone())
        .nest("/api/v1", features::router(state))
        .layer(phi_audit)
        .layer(middleware::tracing_layer())
        .layer(middleware::cors_layer(&config.cors))
}

async fn root() -> impl IntoResponse {
    Json(json!({
        "name": "MedConnect Server",
        "version": env!("CARGO_PKG_VERSION"),
        "status": "running"
    }))
}

/// Health check handler
async fn health_check(State(state): State<FeatureState>) -> Result<Response, StatusCode> {
    match sqlx::query("SELECT 1").fetch_one(&state.db).await {
        Ok(_) => Ok((
            StatusCode::OK,
            Json(json!({
                "status": "healthy",
                "database": "connected"
            })),
        )
            .into_response()),
        Err(e) => {
            tracing::error!("Database health check failed: {:?}", e);
            Err(StatusCode::SERVICE_UNAVAILABLE)
        },
    }
}
