//! Field-level encryption for PHI columns
//!
//! Sensitive text columns (medical history, contact numbers, chat prompts and
//! responses) are stored as authenticated-encryption tokens. The codec
//! encrypts on the way into storage and decrypts on the way out, passing
//! rows written before encryption was enabled through untouched.
//!
//! # Token format
//!
//! `base64(version || nonce || ciphertext || tag)` using the standard
//! alphabet with padding:
//!
//! | field      | size     |
//! |------------|----------|
//! | version    | 1 byte (`0x01`) |
//! | nonce      | 12 bytes |
//! | ciphertext | len(plaintext) |
//! | tag        | 16 bytes |
//!
//! The cipher is AES-256-GCM and the version byte is bound as associated data.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use medconnect_server::crypto::{FieldCodec, KeyProvider};
//!
//! # fn main() -> Result<(), medconnect_server::crypto::CryptoError> {
//! let codec = FieldCodec::new(Arc::new(KeyProvider::with_passphrase("medconnect")));
//!
//! let stored = codec.encode(Some("Patient has diabetes"))?;
//! let restored = codec.decode(stored.as_deref())?;
//! assert_eq!(restored.as_deref(), Some("Patient has diabetes"));
//!
//! // Rows written before encryption existed read back unchanged
//! assert_eq!(codec.decode(Some("+1-555-2020"))?.as_deref(), Some("+1-555-2020"));
//! # Ok(())
//! # }
//! ```

mod codec;
mod key;

pub use codec::{Classified, FieldCodec, TOKEN_VERSION};
pub use key::{
    EncryptionKey, KeyProvider, KeySource, ENCODED_KEY_LEN, ENCRYPTION_KEY_ENV,
    FALLBACK_PASSPHRASE, KDF_ITERATIONS, KDF_SALT, KEY_LEN,
};

use thiserror::Error;

/// Errors raised by the encryption layer
///
/// Decryption never fails: values that do not decrypt are treated as legacy
/// plaintext. Only key configuration and the encrypt path can error.
#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("Encryption key configuration error: {0}")]
    Config(String),

    #[error("Invalid encryption key: {0}")]
    InvalidKey(String),

    #[error("Field encryption failed")]
    Encrypt,
}
