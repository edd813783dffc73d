//! Audit log API routes
//!
//! # Route Structure
//!
//! - `GET /api/v1/audit` - Filtered query (`user_id`, `action`, `resource_type`,
//!   `resource_id`, `start_time`, `end_time`, `limit`, `offset`)
//! - `GET /api/v1/audit/resources/:resource_type/:resource_id` - Trail of one resource
//! - `GET /api/v1/audit/users/:user_id` - Recent entries of one user
//!
//! All routes require the `x-user-id` header. Results are newest first.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;

use crate::api::response::ApiResponse;
use crate::audit::{Actor, AuditQuery, AuditStore, ResourceType};
use crate::error::ServerResult;
use crate::features::FeatureState;

/// Creates the audit log router
pub fn audit_routes() -> Router<FeatureState> {
    Router::new()
        .route("/", get(query_audit_log))
        .route("/resources/:resource_type/:resource_id", get(resource_trail))
        .route("/users/:user_id", get(user_logs))
}

#[derive(Debug, Default, Deserialize)]
struct LimitParams {
    limit: Option<i64>,
}

#[tracing::instrument(skip(state), fields(user_id = ?actor.user_id()))]
async fn query_audit_log(
    State(state): State<FeatureState>,
    actor: Actor,
    Query(query): Query<AuditQuery>,
) -> ServerResult<Response> {
    actor.require()?;

    let meta = json!({
        "limit": query.effective_limit(),
        "offset": query.effective_offset(),
    });
    let entries = state.auditor.query(query).await?;

    Ok((StatusCode::OK, Json(ApiResponse::success_with_meta(entries, meta))).into_response())
}

#[tracing::instrument(skip(state, params), fields(user_id = ?actor.user_id()))]
async fn resource_trail(
    State(state): State<FeatureState>,
    actor: Actor,
    Path((resource_type, resource_id)): Path<(ResourceType, String)>,
    Query(params): Query<LimitParams>,
) -> ServerResult<Response> {
    actor.require()?;

    let entries = state
        .auditor
        .store()
        .get_audit_trail(resource_type, &resource_id, params.limit)
        .await?;

    Ok((StatusCode::OK, Json(ApiResponse::success(entries))).into_response())
}

#[tracing::instrument(skip(state, params), fields(actor_id = ?actor.user_id()))]
async fn user_logs(
    State(state): State<FeatureState>,
    actor: Actor,
    Path(user_id): Path<i64>,
    Query(params): Query<LimitParams>,
) -> ServerResult<Response> {
    actor.require()?;

    let entries = state
        .auditor
        .store()
        .get_user_audit_logs(user_id, params.limit)
        .await?;

    Ok((StatusCode::OK, Json(ApiResponse::success(entries))).into_response())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::{AuditAction, InMemoryAuditStore, RequestOrigin};
    use crate::features::shared::test_helpers::test_state;
    use axum::{body::Body, http::Request};
    use http_body_util::BodyExt;
    use serde_json::Value;
    use std::sync::Arc;
    use tower::ServiceExt;

    async fn seeded() -> (Router, Arc<InMemoryAuditStore>) {
        let (state, store) = test_state();
        let origin = RequestOrigin::default();

        for (user, action, resource, id) in [
            (1, AuditAction::View, ResourceType::MedicalHistory, "1"),
            (1, AuditAction::Update, ResourceType::PatientProfile, "1"),
            (2, AuditAction::View, ResourceType::MedicalHistory, "2"),
        ] {
            state
                .auditor
                .record(Some(user), action, resource, id, Some(&origin), None)
                .await;
        }

        (audit_routes().with_state(state), store)
    }

    async fn get_json(app: Router, uri: &str) -> (StatusCode, Value) {
        let response = app
            .oneshot(
                Request::builder()
                    .uri(uri)
                    .header("x-user-id", "9")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_query_requires_user() {
        let (app, _) = seeded().await;
        let response = app
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_query_filters_and_reports_clamped_limit() {
        let (app, _) = seeded().await;
        let (status, body) =
            get_json(app, "/?action=view&resource_type=medical_history&limit=5000").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["meta"]["limit"], 1000);
        assert_eq!(body["meta"]["offset"], 0);

        let data = body["data"].as_array().unwrap();
        assert_eq!(data.len(), 2);
        assert_eq!(data[0]["user_id"], 2);
        assert_eq!(data[1]["user_id"], 1);
    }

    #[tokio::test]
    async fn test_resource_trail() {
        let (app, _) = seeded().await;
        let (status, body) = get_json(app, "/resources/patient_profile/1").await;

        assert_eq!(status, StatusCode::OK);
        let data = body["data"].as_array().unwrap();
        assert_eq!(data.len(), 1);
        assert_eq!(data[0]["action"], "update");
    }

    #[tokio::test]
    async fn test_user_logs_with_limit() {
        let (app, _) = seeded().await;
        let (status, body) = get_json(app, "/users/1?limit=1").await;

        assert_eq!(status, StatusCode::OK);
        let data = body["data"].as_array().unwrap();
        assert_eq!(data.len(), 1);
        assert_eq!(data[0]["action"], "update");
    }
}
