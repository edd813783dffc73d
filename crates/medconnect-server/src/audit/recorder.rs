//! PHI access recording
//!
//! [`Auditor::record`] is the single entry point used by handlers and the
//! request inspector. It awaits the store insert inline and never returns an
//! error: a failed insert is reported through `tracing::error!` and dropped, so
//! auditing can never fail the business operation it describes.

use axum::{
    extract::{ConnectInfo, FromRequestParts},
    http::{request::Parts, HeaderMap},
};
use serde_json::Value as JsonValue;
use std::{
    convert::Infallible,
    net::{IpAddr, SocketAddr},
    sync::Arc,
};
use tracing::{debug, error};

use super::models::{
    normalize_details, truncate_user_agent, AuditAction, AuditEntry, AuditQuery,
    CreateAuditEntry, ResourceType,
};
use super::store::{AuditStore, AuditStoreError};
use crate::error::AppError;

/// Header carrying the authenticated user id, set by the upstream auth gateway
pub const USER_ID_HEADER: &str = "x-user-id";

const FORWARDED_FOR_HEADER: &str = "x-forwarded-for";

/// Network origin of a request
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestOrigin {
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

impl RequestOrigin {
    /// Client address is the first `X-Forwarded-For` entry when it parses as an
    /// IP address, else the peer address
    pub fn from_headers(headers: &HeaderMap, peer: Option<SocketAddr>) -> Self {
        let forwarded = headers
            .get(FORWARDED_FOR_HEADER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .map(str::trim)
            .filter(|ip| !ip.is_empty())
            .and_then(|ip| match ip.parse::<IpAddr>() {
                Ok(addr) => Some(addr),
                Err(_) => {
                    debug!("Ignoring malformed {} header", FORWARDED_FOR_HEADER);
                    None
                },
            });

        let ip_address = forwarded
            .or_else(|| peer.map(|addr| addr.ip()))
            .map(|addr| addr.to_string());

        let user_agent = headers
            .get(axum::http::header::USER_AGENT)
            .map(|v| truncate_user_agent(&String::from_utf8_lossy(v.as_bytes())));

        Self {
            ip_address,
            user_agent,
        }
    }
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for RequestOrigin
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let peer = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ci| ci.0);
        Ok(Self::from_headers(&parts.headers, peer))
    }
}

/// Authenticated user, if any
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Actor(pub Option<i64>);

impl Actor {
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let raw = headers.get(USER_ID_HEADER).and_then(|v| v.to_str().ok());
        let user_id = raw.and_then(|s| s.trim().parse::<i64>().ok());

        if raw.is_some() && user_id.is_none() {
            debug!("Ignoring malformed {} header", USER_ID_HEADER);
        }

        Self(user_id)
    }

    pub fn user_id(&self) -> Option<i64> {
        self.0
    }

    /// The user id, or `401 Unauthorized` for anonymous requests
    pub fn require(&self) -> Result<i64, AppError> {
        self.0
            .ok_or_else(|| AppError::Unauthorized("Authentication required".to_string()))
    }
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for Actor
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self::from_headers(&parts.headers))
    }
}

/// Appends PHI access entries to an [`AuditStore`]
#[derive(Clone)]
pub struct Auditor {
    store: Arc<dyn AuditStore>,
}

impl std::fmt::Debug for Auditor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Auditor").finish_non_exhaustive()
    }
}

impl Auditor {
    pub fn new(store: Arc<dyn AuditStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<dyn AuditStore> {
        &self.store
    }

    /// Record one access. Never fails.
    pub async fn record(
        &self,
        actor: Option<i64>,
        action: AuditAction,
        resource_type: ResourceType,
        resource_id: impl ToString,
        origin: Option<&RequestOrigin>,
        details: Option<JsonValue>,
    ) {
        let (ip_address, user_agent) = origin
            .map(|o| (o.ip_address.clone(), o.user_agent.clone()))
            .unwrap_or_default();

        let entry = CreateAuditEntry {
            user_id: actor,
            action,
            resource_type,
            resource_id: resource_id.to_string(),
            details: normalize_details(details),
            ip_address,
            user_agent: user_agent.as_deref().map(truncate_user_agent),
        };

        self.record_entry(entry).await;
    }

    /// Record a prebuilt entry. Never fails; returns the stored entry on success.
    pub async fn record_entry(&self, entry: CreateAuditEntry) -> Option<AuditEntry> {
        let action = entry.action;
        let resource_type = entry.resource_type;

        match self.store.insert(entry).await {
            Ok(stored) => {
                debug!(
                    audit_id = stored.id,
                    action = %action,
                    resource_type = %resource_type,
                    "PHI access recorded"
                );
                Some(stored)
            },
            Err(e) => {
                error!(
                    error = %e,
                    action = %action,
                    resource_type = %resource_type,
                    "Failed to record PHI access"
                );
                None
            },
        }
    }

    /// Query recorded entries
    pub async fn query(&self, query: AuditQuery) -> Result<Vec<AuditEntry>, AuditStoreError> {
        self.store.query(query).await
    }
}
