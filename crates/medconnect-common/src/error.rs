//! Error types shared across MedConnect crates

use thiserror::Error;

/// Result type alias for common operations
pub type Result<T> = std::result::Result<T, MedConnectError>;

/// Main error type for the shared crate
#[derive(Error, Debug)]
pub enum MedConnectError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Parse error: {0}")]
    Parse(String),
}

impl MedConnectError {
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    pub fn parse(message: impl Into<String>) -> Self {
        Self::Parse(message.into())
    }
}
