//! MedConnect Server Library
//!
//! PHI core of the MedConnect telehealth platform.
//!
//! # Overview
//!
//! - **Field encryption**: [`crypto::FieldCodec`] encrypts sensitive columns on
//!   write and decrypts them on read, passing legacy plaintext through untouched
//! - **Access auditing**: [`audit::Auditor`] appends an entry for every PHI
//!   read or write; [`audit::PhiAuditLayer`] does the same for PHI routes
//! - **API**: patient profiles, chat conversations and the audit trail
//! - **Configuration**: environment-based, see [`config::Config`]
//!
//! # Architecture
//!
//! Features are vertical slices split into commands (writes) and queries
//! (reads). Both kinds are audited: a PHI read is as significant as a write.
//!
//! ## Framework Stack
//!
//! - **Axum**: HTTP routing and extractors
//! - **SQLx**: PostgreSQL access
//! - **Tower**: middleware and service abstractions
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use medconnect_server::config::EncryptionConfig;
//! use medconnect_server::crypto::{FieldCodec, KeyProvider};
//!
//! # fn main() -> Result<(), medconnect_server::crypto::CryptoError> {
//! let codec = FieldCodec::new(Arc::new(KeyProvider::new(&EncryptionConfig::from_env())));
//! let stored = codec.encode(Some("Type 2 diabetes"))?;
//! assert_eq!(codec.decode(stored.as_deref())?.as_deref(), Some("Type 2 diabetes"));
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod audit;
pub mod config;
pub mod crypto;
pub mod error;
pub mod features;
pub mod middleware;

// Re-export commonly used types
pub use error::{AppError, ServerResult};
