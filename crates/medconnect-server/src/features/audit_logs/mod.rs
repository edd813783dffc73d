//! Read access to the audit trail
//!
//! Entries are written by the [`Auditor`](crate::audit::Auditor) and the PHI
//! inspector; this slice only queries them.

pub mod routes;

pub use routes::audit_routes;
