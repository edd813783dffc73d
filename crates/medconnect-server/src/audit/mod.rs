//! PHI access auditing
//!
//! Every read or write touching protected health information leaves an
//! append-only entry in the audit log, carrying the actor, the client's
//! network origin and structured detail.
//!
//! # Architecture
//!
//! - [`AuditStore`]: append/query seam, with [`PgAuditStore`] (the
//!   `audit_log` table) and [`InMemoryAuditStore`]
//! - [`Auditor`]: the `record` entry point; never fails, logs store errors
//! - [`PhiAuditLayer`]: tower layer that records an `access` entry for
//!   authenticated requests on PHI routes
//!
//! Entries are ordered newest first, ties broken by insertion order.
//!
//! # Usage
//!
//! ```no_run
//! use std::sync::Arc;
//! use axum::Router;
//! use sqlx::PgPool;
//! use medconnect_server::audit::{Auditor, PgAuditStore, PhiAuditLayer};
//!
//! # fn example(pool: PgPool) {
//! let auditor = Auditor::new(Arc::new(PgAuditStore::new(pool)));
//! let app: Router = Router::new().layer(PhiAuditLayer::new(auditor));
//! # }
//! ```
//!
//! # Example: Manual Audit Logging
//!
//! ```no_run
//! use medconnect_server::audit::{AuditAction, Auditor, RequestOrigin, ResourceType};
//! use serde_json::json;
//!
//! # async fn example(auditor: &Auditor, origin: &RequestOrigin) {
//! auditor
//!     .record(
//!         Some(42),
//!         AuditAction::View,
//!         ResourceType::MedicalHistory,
//!         42,
//!         Some(origin),
//!         Some(json!({"fields": ["medical_history"]})),
//!     )
//!     .await;
//! # }
//! ```

mod middleware;
mod models;
mod queries;
mod recorder;
mod store;


pub use middleware::{classify_phi_path, PhiAuditLayer, PhiAuditMiddleware, PhiTarget, PHI_ROUTES};
pub use models::{
    normalize_details, truncate_user_agent, AuditAction, AuditEntry, AuditEntryBuildError,
    AuditEntryBuilder, AuditQuery, CreateAuditEntry, ResourceType, DEFAULT_AUDIT_QUERY_LIMIT,
    MAX_AUDIT_QUERY_LIMIT, MAX_USER_AGENT_CHARS, MULTIPLE_RESOURCES,
};
pub use queries::PgAuditStore;
pub use recorder::{Actor, Auditor, RequestOrigin, USER_ID_HEADER};
pub use store::{AuditStore, AuditStoreError, InMemoryAuditStore};
