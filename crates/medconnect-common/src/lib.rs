//! MedConnect Common Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Shared building blocks for the MedConnect workspace.
//!
//! # Overview
//!
//! - **Error Handling**: the workspace-wide [`MedConnectError`] and [`Result`] alias
//! - **Logging**: `tracing` subscriber setup driven by [`logging::LogConfig`]
//! - **Hashing**: one-way digests of sensitive values for indexing
//!
//! # Example
//!
//! ```no_run
//! use medconnect_common::logging::{init_logging, LogConfig};
//!
//! fn main() -> medconnect_common::Result<()> {
//!     let config = LogConfig::from_env()?;
//!     let _guard = init_logging(&config)?;
//!     tracing::info!("ready");
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod hashing;
pub mod logging;

pub use error::{MedConnectError, Result};
pub use hashing::hash_sensitive_data;
