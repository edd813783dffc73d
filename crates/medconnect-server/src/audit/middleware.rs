//! PHI request inspector
//!
//! Tower layer that records an `access` entry for every authenticated request
//! whose path falls under a PHI route, whatever the method and whatever the
//! handler returns. Anonymous requests are not recorded.

use axum::{
    extract::{ConnectInfo, Request},
    response::Response,
};
use serde_json::json;
use std::{
    future::Future,
    net::SocketAddr,
    pin::Pin,
    task::{Context, Poll},
};
use tower::{Layer, Service};
use tracing::trace;

use super::models::{AuditAction, ResourceType, MULTIPLE_RESOURCES};
use super::recorder::{Actor, Auditor, RequestOrigin};

/// Resource id an inspector entry is filed under
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhiTarget {
    /// The requesting user's own record
    Actor,
    /// A collection of records
    Multiple,
}

/// Ordered path rules; the first rule with a matching fragment wins
pub const PHI_ROUTES: &[(&[&str], ResourceType, PhiTarget)] = &[
    (
        &["/patient/dashboard/", "/patient/"],
        ResourceType::PatientProfile,
        PhiTarget::Actor,
    ),
    (
        &["/doctor/dashboard/", "/doctor/"],
        ResourceType::PatientProfile,
        PhiTarget::Actor,
    ),
    (
        &["/appointment/", "/book-appointment/"],
        ResourceType::Appointment,
        PhiTarget::Multiple,
    ),
    (&["/scans/"], ResourceType::Scan, PhiTarget::Multiple),
];

/// Classify a request path against [`PHI_ROUTES`]
pub fn classify_phi_path(path: &str) -> Option<(ResourceType, PhiTarget)> {
    PHI_ROUTES
        .iter()
        .find(|(fragments, _, _)| fragments.iter().any(|f| path.contains(f)))
        .map(|(_, resource_type, target)| (*resource_type, *target))
}

/// PHI inspector layer
#[derive(Clone)]
pub struct PhiAuditLayer {
    auditor: Auditor,
}

impl PhiAuditLayer {
    pub fn new(auditor: Auditor) -> Self {
        Self { auditor }
    }
}

impl<S> Layer<S> for PhiAuditLayer {
    type Service = PhiAuditMiddleware<S>;

    fn layer(&self, inner: S) -> Self::Service {
        PhiAuditMiddleware {
            inner,
            auditor: self.auditor.clone(),
        }
    }
}

/// PHI inspector service
#[derive(Clone)]
pub struct PhiAuditMiddleware<S> {
    inner: S,
    auditor: Auditor,
}

impl<S> Service<Request> for PhiAuditMiddleware<S>
where
    S: Service<Request, Response = Response> + Clone + Send + 'static,
    S::Future: Send + 'static,
    S::Error: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, request: Request) -> Self::Future {
        // Take the service that was driven to readiness
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);
        let auditor = self.auditor.clone();

        Box::pin(async move {
            let path = request.uri().path().to_string();
            let method = request.method().clone();
            let actor = Actor::from_headers(request.headers());
            let peer = request
                .extensions()
                .get::<ConnectInfo<SocketAddr>>()
                .map(|ci| ci.0);
            let origin = RequestOrigin::from_headers(request.headers(), peer);

            let result = inner.call(request).await;

            let Some(user_id) = actor.user_id() else {
                return result;
            };

            if let Some((resource_type, target)) = classify_phi_path(&path) {
                let resource_id = match target {
                    PhiTarget::Actor => user_id.to_string(),
                    PhiTarget::Multiple => MULTIPLE_RESOURCES.to_string(),
                };

                trace!(path = %path, resource_type = %resource_type, "PHI route accessed");

                auditor
                    .record(
                        Some(user_id),
                        AuditAction::Access,
                        resource_type,
                        resource_id,
                        Some(&origin),
                        Some(json!({ "path": path, "method": method.as_str() })),
                    )
                    .await;
            }

            result
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_patient_and_doctor_paths() {
        assert_eq!(
            classify_phi_path("/patient/dashboard/"),
            Some((ResourceType::PatientProfile, PhiTarget::Actor))
        );
        assert_eq!(
            classify_phi_path("/api/v1/patient/profile"),
            Some((ResourceType::PatientProfile, PhiTarget::Actor))
        );
        assert_eq!(
            classify_phi_path("/doctor/dashboard/"),
            Some((ResourceType::PatientProfile, PhiTarget::Actor))
        );
    }

    #[test]
    fn test_classify_collection_paths() {
        assert_eq!(
            classify_phi_path("/book-appointment/5/"),
            Some((ResourceType::Appointment, PhiTarget::Multiple))
        );
        assert_eq!(
            classify_phi_path("/appointment/12/confirm"),
            Some((ResourceType::Appointment, PhiTarget::Multiple))
        );
        assert_eq!(
            classify_phi_path("/scans/upload/"),
            Some((ResourceType::Scan, PhiTarget::Multiple))
        );
    }

    #[test]
    fn test_first_matching_rule_wins() {
        assert_eq!(
            classify_phi_path("/patient/scans/"),
            Some((ResourceType::PatientProfile, PhiTarget::Actor))
        );
    }

    #[test]
    fn test_non_phi_paths() {
        for path in ["/", "/health", "/login/", "/api/v1/audit", "/patients"] {
            assert_eq!(classify_phi_path(path), None, "{}", path);
        }
    }
}
