//! Transparent encrypt-on-write / decrypt-on-read codec

use aes_gcm::{
    aead::{Aead, KeyInit, Payload},
    Aes256Gcm, Key, Nonce,
};
use base64::{engine::general_purpose::STANDARD, Engine};
use rand::RngCore;
use std::sync::Arc;
use tracing::trace;

use super::key::{EncryptionKey, KeyProvider};
use super::CryptoError;

/// Leading byte of every token, bound as associated data
pub const TOKEN_VERSION: u8 = 0x01;

const NONCE_LEN: usize = 12;
const TAG_LEN: usize = 16;
const MIN_TOKEN_LEN: usize = 1 + NONCE_LEN + TAG_LEN;

/// Outcome of inspecting a stored value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classified {
    /// Nothing stored
    Empty,
    /// Not a token this codec can open: fresh input or a legacy plaintext row.
    /// Carries the value unchanged.
    Legacy(String),
    /// A valid token, carrying the recovered plaintext
    Ciphertext(String),
}

/// Encrypts PHI text before persistence and decrypts it after reads
#[derive(Debug, Clone)]
pub struct FieldCodec {
    keys: Arc<KeyProvider>,
}

impl FieldCodec {
    pub fn new(keys: Arc<KeyProvider>) -> Self {
        Self { keys }
    }

    /// Prepare a value for storage.
    ///
    /// `None`, empty and whitespace-only input map to `None`. A value that is
    /// already a token is returned unchanged, so re-saving a row never
    /// double-encrypts it.
    pub fn encode(&self, plaintext: Option<&str>) -> Result<Option<String>, CryptoError> {
        let Some(value) = plaintext.filter(|v| !v.trim().is_empty()) else {
            return Ok(None);
        };

        if let Classified::Ciphertext(inner) = self.classify(value)? {
            if inner != value {
                trace!("Value is already encrypted, storing as-is");
                return Ok(Some(value.to_string()));
            }
        }

        self.seal(value).map(Some)
    }

    /// Recover the plaintext of a stored value.
    ///
    /// Values that are not tokens, or that fail authentication, are legacy
    /// plaintext and come back unchanged. Only a missing key is an error.
    pub fn decode(&self, stored: Option<&str>) -> Result<Option<String>, CryptoError> {
        let Some(value) = stored else {
            return Ok(None);
        };

        match self.classify(value)? {
            Classified::Empty => Ok(None),
            Classified::Legacy(plaintext) | Classified::Ciphertext(plaintext) => {
                Ok(Some(plaintext))
            },
        }
    }

    /// Try-parse then try-decrypt a stored value
    pub fn classify(&self, stored: &str) -> Result<Classified, CryptoError> {
        if stored.is_empty() {
            return Ok(Classified::Empty);
        }

        let key = self.keys.key()?;

        let Some(token) = parse_token(stored) else {
            return Ok(Classified::Legacy(stored.to_string()));
        };

        match open(key, &token) {
            Some(plaintext) => Ok(Classified::Ciphertext(plaintext)),
            None => {
                trace!("Token-shaped value failed authentication, treating as legacy plaintext");
                Ok(Classified::Legacy(stored.to_string()))
            },
        }
    }

    fn seal(&self, plaintext: &str) -> Result<String, CryptoError> {
        let key = self.keys.key()?;

        let mut nonce = [0u8; NONCE_LEN];
        rand::thread_rng().fill_bytes(&mut nonce);

        let sealed = cipher(key)
            .encrypt(
                Nonce::from_slice(&nonce),
                Payload {
                    msg: plaintext.as_bytes(),
                    aad: &[TOKEN_VERSION],
                },
            )
            .map_err(|_| CryptoError::Encrypt)?;

        let mut token = Vec::with_capacity(1 + NONCE_LEN + sealed.len());
        token.push(TOKEN_VERSION);
        token.extend_from_slice(&nonce);
        token.extend_from_slice(&sealed);

        Ok(STANDARD.encode(token))
    }
}

fn cipher(key: &EncryptionKey) -> Aes256Gcm {
    Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key.as_bytes()))
}

/// Decode the text form; `None` if it cannot be one of our tokens
fn parse_token(stored: &str) -> Option<Vec<u8>> {
    let raw = STANDARD.decode(stored).ok()?;
    if raw.len() < MIN_TOKEN_LEN || raw[0] != TOKEN_VERSION {
        return None;
    }
    Some(raw)
}

fn open(key: &EncryptionKey, token: &[u8]) -> Option<String> {
    let (nonce, sealed) = token[1..].split_at(NONCE_LEN);
    let plaintext = cipher(key)
        .decrypt(
            Nonce::from_slice(nonce),
            Payload {
                msg: sealed,
                aad: &[TOKEN_VERSION],
            },
        )
        .ok()?;

    String::from_utf8(plaintext).ok()
}
