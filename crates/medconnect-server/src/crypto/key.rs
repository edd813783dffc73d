//! Encryption key resolution and caching

use base64::{
    engine::general_purpose::{STANDARD, URL_SAFE},
    Engine,
};
use pbkdf2::pbkdf2_hmac;
use sha2::Sha256;
use std::sync::OnceLock;
use tracing::{error, info, warn};

use super::CryptoError;
use crate::config::EncryptionConfig;

/// Environment variable holding a ready key or a passphrase
pub const ENCRYPTION_KEY_ENV: &str = "MEDCONNECT_ENCRYPTION_KEY";

/// Raw key length in bytes (AES-256)
pub const KEY_LEN: usize = 32;

/// Length of a base64-encoded 32-byte key. Shorter values are passphrases.
pub const ENCODED_KEY_LEN: usize = 44;

/// Application-wide PBKDF2 salt. Changing it orphans every stored token.
pub const KDF_SALT: &[u8] = b"medconnect_salt_2024";

pub const KDF_ITERATIONS: u32 = 100_000;

/// Development-only passphrase used when nothing is configured
pub const FALLBACK_PASSPHRASE: &str = "medconnect";

/// 256-bit symmetric key for field encryption
#[derive(Clone, PartialEq, Eq)]
pub struct EncryptionKey([u8; KEY_LEN]);

impl EncryptionKey {
    pub fn from_bytes(bytes: [u8; KEY_LEN]) -> Self {
        Self(bytes)
    }

    /// Derive a key from a passphrase with PBKDF2-HMAC-SHA256 and the fixed salt
    pub fn derive(passphrase: &str) -> Self {
        let mut key = [0u8; KEY_LEN];
        pbkdf2_hmac::<Sha256>(passphrase.as_bytes(), KDF_SALT, KDF_ITERATIONS, &mut key);
        Self(key)
    }

    /// Parse a base64 key (URL-safe or standard alphabet) of exactly 32 bytes
    pub fn from_encoded(encoded: &str) -> Result<Self, CryptoError> {
        let encoded = encoded.trim();
        let bytes = URL_SAFE
            .decode(encoded)
            .or_else(|_| STANDARD.decode(encoded))
            .map_err(|_| CryptoError::InvalidKey("key is not valid base64".to_string()))?;

        let bytes: [u8; KEY_LEN] = bytes.try_into().map_err(|raw: Vec<u8>| {
            CryptoError::InvalidKey(format!(
                "key must decode to {} bytes, got {}",
                KEY_LEN,
                raw.len()
            ))
        })?;

        Ok(Self(bytes))
    }

    /// Interpret configured key material.
    ///
    /// Anything shorter than an encoded key (counted in characters) is a
    /// passphrase and goes through the KDF; anything else must be an encoded key.
    pub fn from_key_material(material: &str) -> Result<Self, CryptoError> {
        if material.chars().count() < ENCODED_KEY_LEN {
            Ok(Self::derive(material))
        } else {
            Self::from_encoded(material)
        }
    }

    /// URL-safe base64 form, suitable for `MEDCONNECT_ENCRYPTION_KEY`
    pub fn to_encoded(&self) -> String {
        URL_SAFE.encode(self.0)
    }

    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.0
    }
}

impl std::fmt::Debug for EncryptionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("EncryptionKey([REDACTED])")
    }
}

/// Where the active key material came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeySource {
    Configured,
    Environment,
    Fallback,
}

impl std::fmt::Display for KeySource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Configured => f.write_str("configured"),
            Self::Environment => f.write_str("environment"),
            Self::Fallback => f.write_str("fallback"),
        }
    }
}

/// Lazily resolved, process-lifetime key holder
///
/// The key is resolved on first use and cached. Concurrent first use may run
/// the derivation more than once; every run yields the same bytes and only
/// one value is ever stored.
pub struct KeyProvider {
    configured: Option<String>,
    allow_insecure_fallback: bool,
    key: OnceLock<EncryptionKey>,
}

impl KeyProvider {
    pub fn new(config: &EncryptionConfig) -> Self {
        Self {
            configured: config.key.clone(),
            allow_insecure_fallback: config.allow_insecure_fallback,
            key: OnceLock::new(),
        }
    }

    /// Provider that resolves from the given passphrase or encoded key
    pub fn with_passphrase(material: impl Into<String>) -> Self {
        Self {
            configured: Some(material.into()),
            allow_insecure_fallback: false,
            key: OnceLock::new(),
        }
    }

    /// Provider with an already resolved key
    pub fn with_key(key: EncryptionKey) -> Self {
        Self {
            configured: None,
            allow_insecure_fallback: false,
            key: OnceLock::from(key),
        }
    }

    pub fn is_resolved(&self) -> bool {
        self.key.get().is_some()
    }

    /// The active key, resolving it on first call
    pub fn key(&self) -> Result<&EncryptionKey, CryptoError> {
        if let Some(key) = self.key.get() {
            return Ok(key);
        }

        let resolved = self.resolve()?;
        Ok(self.key.get_or_init(|| resolved))
    }

    fn resolve(&self) -> Result<EncryptionKey, CryptoError> {
        let (material, source) = self.key_material()?;

        let key = EncryptionKey::from_key_material(&material).map_err(|e| {
            error!(source = %source, error = %e, "Unusable field encryption key");
            e
        })?;

        info!(source = %source, "Field encryption key resolved");
        Ok(key)
    }

    fn key_material(&self) -> Result<(String, KeySource), CryptoError> {
        if let Some(configured) = non_blank(self.configured.as_deref()) {
            return Ok((configured.to_string(), KeySource::Configured));
        }

        if let Some(from_env) = non_blank(std::env::var(ENCRYPTION_KEY_ENV).ok().as_deref()) {
            return Ok((from_env.to_string(), KeySource::Environment));
        }

        if self.allow_insecure_fallback {
            warn!(
                env = ENCRYPTION_KEY_ENV,
                "No encryption key configured, using the built-in development passphrase. \
                 Data encrypted now is readable by anyone with the source code."
            );
            return Ok((FALLBACK_PASSPHRASE.to_string(), KeySource::Fallback));
        }

        error!(env = ENCRYPTION_KEY_ENV, "No encryption key configured");
        Err(CryptoError::Config(format!(
            "no encryption key configured; set {}",
            ENCRYPTION_KEY_ENV
        )))
    }
}

impl std::fmt::Debug for KeyProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyProvider")
            .field("configured", &self.configured.as_ref().map(|_| "[REDACTED]"))
            .field("allow_insecure_fallback", &self.allow_insecure_fallback)
            .field("resolved", &self.is_resolved())
            .finish()
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::sync::Arc;

    #[test]
    fn test_derive_is_deterministic() {
        assert_eq!(EncryptionKey::derive("medconnect"), EncryptionKey::derive("medconnect"));
        assert_ne!(EncryptionKey::derive("medconnect"), EncryptionKey::derive("medconnect2"));
    }

    #[test]
    fn test_encoded_key_roundtrip() {
        let key = EncryptionKey::from_bytes([7u8; KEY_LEN]);
        let encoded = key.to_encoded();
        assert_eq!(encoded.len(), ENCODED_KEY_LEN);

        let parsed = EncryptionKey::from_key_material(&encoded).unwrap();
        assert_eq!(parsed, key);
    }

    #[test]
    fn test_standard_alphabet_key_accepted() {
        let encoded = STANDARD.encode([0xfbu8; KEY_LEN]);
        let parsed = EncryptionKey::from_encoded(&encoded).unwrap();
        assert_eq!(parsed.as_bytes(), &[0xfbu8; KEY_LEN]);
    }

    #[test]
    fn test_short_material_is_passphrase() {
        let key = EncryptionKey::from_key_material("medconnect").unwrap();
        assert_eq!(key, EncryptionKey::derive("medconnect"));
    }

    #[test]
    fn test_short_non_ascii_passphrase_is_derived() {
        let passphrase = "пароль-медконнект-секрет";
        assert!(passphrase.len() >= ENCODED_KEY_LEN);
        assert!(passphrase.chars().count() < ENCODED_KEY_LEN);

        let provider = KeyProvider::with_passphrase(passphrase);
        assert_eq!(provider.key().unwrap(), &EncryptionKey::derive(passphrase));
    }

    #[test]
    fn test_long_non_key_material_is_rejected() {
        let material = "this passphrase is far too long to be a passphrase!!";
        assert!(material.len() >= ENCODED_KEY_LEN);
        assert!(matches!(
            EncryptionKey::from_key_material(material),
            Err(CryptoError::InvalidKey(_))
        ));
    }

    #[test]
    fn test_wrong_length_key_is_rejected() {
        let encoded = URL_SAFE.encode([1u8; 40]);
        assert!(matches!(EncryptionKey::from_encoded(&encoded), Err(CryptoError::InvalidKey(_))));
    }

    #[test]
    fn test_debug_redacts_key() {
        let key = EncryptionKey::derive("secret");
        assert_eq!(format!("{:?}", key), "EncryptionKey([REDACTED])");

        let provider = KeyProvider::with_passphrase("secret");
        assert!(!format!("{:?}", provider).contains("secret"));
    }

    #[test]
    fn test_provider_caches_key() {
        let provider = KeyProvider::with_passphrase("medconnect");
        assert!(!provider.is_resolved());

        let first = provider.key().unwrap().clone();
        assert!(provider.is_resolved());
        assert_eq!(provider.key().unwrap(), &first);
    }

    #[test]
    fn test_concurrent_first_use_yields_identical_key() {
        let provider = Arc::new(KeyProvider::with_passphrase("medconnect"));

        let handles: Vec<_> = (0..2)
            .map(|_| {
                let provider = Arc::clone(&provider);
                std::thread::spawn(move || *provider.key().unwrap().as_bytes())
            })
            .collect();

        let keys: Vec<[u8; KEY_LEN]> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        assert_eq!(keys[0], keys[1]);
        assert_eq!(&keys[0], EncryptionKey::derive("medconnect").as_bytes());
    }

    #[test]
    #[serial]
    fn test_configured_key_wins_over_environment() {
        std::env::set_var(ENCRYPTION_KEY_ENV, "from-env");
        let provider = KeyProvider::with_passphrase("from-config");
        let key = provider.key().unwrap().clone();
        std::env::remove_var(ENCRYPTION_KEY_ENV);

        assert_eq!(key, EncryptionKey::derive("from-config"));
    }

    #[test]
    #[serial]
    fn test_environment_used_when_not_configured() {
        std::env::set_var(ENCRYPTION_KEY_ENV, "from-env");
        let provider = KeyProvider::new(&EncryptionConfig {
            key: None,
            allow_insecure_fallback: false,
        });
        let key = provider.key().unwrap().clone();
        std::env::remove_var(ENCRYPTION_KEY_ENV);

        assert_eq!(key, EncryptionKey::derive("from-env"));
    }

    #[test]
    #[serial]
    fn test_fallback_only_when_allowed() {
        std::env::remove_var(ENCRYPTION_KEY_ENV);

        let strict = KeyProvider::new(&EncryptionConfig {
            key: None,
            allow_insecure_fallback: false,
        });
        assert!(matches!(strict.key(), Err(CryptoError::Config(_))));
        assert!(!strict.is_resolved());

        let lenient = KeyProvider::new(&EncryptionConfig {
            key: Some("   ".to_string()),
            allow_insecure_fallback: true,
        });
        assert_eq!(lenient.key().unwrap(), &EncryptionKey::derive(FALLBACK_PASSPHRASE));
    }
}
