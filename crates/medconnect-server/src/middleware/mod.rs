//! HTTP middleware for the MedConnect server
//!
//! - CORS (Cross-Origin Resource Sharing)
//! - Request logging with tracing
//!
//! PHI access auditing lives in [`crate::audit::PhiAuditLayer`].

use axum::http::{header, HeaderName, Method};
use std::time::Duration;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

use crate::audit::USER_ID_HEADER;
use crate::config::CorsConfig;

/// Create CORS layer from configuration
pub fn cors_layer(config: &CorsConfig) -> CorsLayer {
    let mut cors = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::PATCH,
            Method::OPTIONS,
        ])
        .allow_headers([
            header::ACCEPT,
            header::ACCEPT_LANGUAGE,
            header::CONTENT_LANGUAGE,
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            HeaderName::from_static(USER_ID_HEADER),
        ])
        .max_age(Duration::from_secs(3600));

    let wildcard =
        config.allowed_origins.is_empty() || config.allowed_origins.iter().any(|o| o == "*");

    // Configure origins
    if wildcard {
        cors = cors.allow_origin(Any);
    } else {
        let origins: Vec<_> = config
            .allowed_origins
            .iter()
            .filter_map(|origin| origin.parse().ok())
            .collect();
        cors = cors.allow_origin(origins);
    }

    // Credentials cannot be combined with a wildcard origin
    if config.allow_credentials && !wildcard {
        cors = cors.allow_credentials(true);
    }

    cors
}

/// Create tracing/logging layer
pub fn tracing_layer(
) -> TraceLayer<tower_http::classify::SharedClassifier<tower_http::classify::ServerErrorsAsFailures>>
{
    TraceLayer::new_for_http()
        .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
        .on_response(
            DefaultOnResponse::new()
                .level(Level::INFO)
                .latency_unit(tower_http::LatencyUnit::Micros),
        )
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::Request, routing::get, Router};
    use tower::ServiceExt;

    fn app(config: &CorsConfig) -> Router {
        Router::new()
            .route("/api/v1/patient/profile", get(|| async { "ok" }))
            .layer(cors_layer(config))
    }

    fn preflight(origin: &str) -> Request<Body> {
        Request::builder()
            .method(Method::OPTIONS)
            .uri("/api/v1/patient/profile")
            .header(header::ORIGIN, origin)
            .header(header::ACCESS_CONTROL_REQUEST_METHOD, "PUT")
            .header(header::ACCESS_CONTROL_REQUEST_HEADERS, USER_ID_HEADER)
            .body(Body::empty())
            .unwrap()
    }

    #[tokio::test]
    async fn test_preflight_allows_listed_origin_and_user_header() {
        let config = CorsConfig {
            allowed_origins: vec!["https://portal.medconnect.example".to_string()],
            allow_credentials: true,
        };

        let response = app(&config)
            .oneshot(preflight("https://portal.medconnect.example"))
            .await
            .unwrap();

        let headers = response.headers();
        assert_eq!(
            headers[header::ACCESS_CONTROL_ALLOW_ORIGIN],
            "https://portal.medconnect.example"
        );
        assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_CREDENTIALS], "true");
        assert!(headers[header::ACCESS_CONTROL_ALLOW_HEADERS]
            .to_str()
            .unwrap()
            .contains(USER_ID_HEADER));
    }

    #[tokio::test]
    async fn test_unlisted_origin_gets_no_allow_header() {
        let config = CorsConfig {
            allowed_origins: vec!["https://portal.medconnect.example".to_string()],
            allow_credentials: false,
        };

        let response = app(&config)
            .oneshot(preflight("https://evil.example"))
            .await
            .unwrap();

        assert!(response
            .headers()
            .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .is_none());
    }

    #[tokio::test]
    async fn test_wildcard_drops_credentials() {
        let config = CorsConfig {
            allowed_origins: vec!["*".to_string()],
            allow_credentials: true,
        };

        let response = app(&config)
            .oneshot(preflight("https://anywhere.example"))
            .await
            .unwrap();

        let headers = response.headers();
        assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
        assert!(headers.get(header::ACCESS_CONTROL_ALLOW_CREDENTIALS).is_none());
    }
}
