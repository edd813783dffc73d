//! Test helpers and fixtures for feature tests
//!
//! [`test_state`] builds a [`FeatureState`] whose pool never connects, so
//! routes that fail validation or only touch the audit store can be exercised
//! without a database.

use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;

use crate::audit::{Auditor, InMemoryAuditStore};
use crate::crypto::{EncryptionKey, FieldCodec, KeyProvider, KEY_LEN};
use crate::features::FeatureState;

/// Codec with a fixed raw key, skipping the KDF
pub fn test_codec() -> FieldCodec {
    FieldCodec::new(Arc::new(KeyProvider::with_key(EncryptionKey::from_bytes(
        [7u8; KEY_LEN],
    ))))
}

/// Feature state over a lazy pool and an in-memory audit store
pub fn test_state() -> (FeatureState, Arc<InMemoryAuditStore>) {
    let store = Arc::new(InMemoryAuditStore::new());
    let db = PgPoolOptions::new()
        .connect_lazy("postgres://localhost/medconnect_test")
        .expect("lazy pool");

    let state = FeatureState {
        db,
        codec: test_codec(),
        auditor: Auditor::new(store.clone()),
    };

    (state, store)
}
