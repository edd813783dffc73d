//! Feature modules implementing the MedConnect API
//!
//! Each feature is a vertical slice with its own commands, queries and routes.
//! Sensitive columns go through the [`FieldCodec`] on the way in and out of
//! storage, and every PHI read or write is recorded by the [`Auditor`].
//!
//! # Features
//!
//! - **patients**: patient profile with encrypted medical history and contact number
//! - **conversations**: chat sessions with an encrypted prompt/response log
//! - **audit_logs**: read access to the audit trail
//!
//! # Architecture
//!
//! Each feature module follows the structure:
//! - `commands/` - Write operations
//! - `queries/` - Read operations
//! - `routes.rs` - HTTP route definitions
//! - `types.rs` - Shared row and response types (if needed)

pub mod audit_logs;
pub mod conversations;
pub mod patients;
pub mod shared;

use axum::Router;

use crate::audit::Auditor;
use crate::crypto::FieldCodec;

/// Shared state for all feature routes
#[derive(Clone, Debug)]
pub struct FeatureState {
    /// PostgreSQL connection pool for database operations
    pub db: sqlx::PgPool,
    /// Transparent encryption for PHI columns
    pub codec: FieldCodec,
    /// PHI access recorder
    pub auditor: Auditor,
}

/// Creates the main API router with all feature routes mounted
///
/// - `/patient` - Patient profile
/// - `/chat` - Chat sessions and conversations
/// - `/audit` - Audit log queries
pub fn router(state: FeatureState) -> Router<()> {
    Router::new()
        .nest("/patient", patients::patient_routes().with_state(state.clone()))
        .nest("/chat", conversations::chat_routes().with_state(state.clone()))
        .nest("/audit", audit_logs::audit_routes().with_state(state))
}
