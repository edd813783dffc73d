//! Common test utilities for MedConnect server integration tests
//!
//! Builds application state over a pool that never connects and an in-memory
//! audit store, so routes that stop before touching Postgres can be driven
//! end to end with `oneshot`.

#![allow(dead_code)]

use axum::body::Body;
use axum::response::Response;
use http_body_util::BodyExt;
use serde_json::Value;
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;

use medconnect_server::{
    api,
    audit::{Auditor, InMemoryAuditStore},
    config::Config,
    crypto::{EncryptionKey, FieldCodec, KeyProvider, KEY_LEN},
    features::FeatureState,
};

/// Codec over a fixed raw key
pub fn codec() -> FieldCodec {
    FieldCodec::new(Arc::new(KeyProvider::with_key(EncryptionKey::from_bytes(
        [11u8; KEY_LEN],
    ))))
}

/// Feature state plus a handle on its audit store
pub fn state() -> (FeatureState, Arc<InMemoryAuditStore>) {
    let store = Arc::new(InMemoryAuditStore::new());
    let db = PgPoolOptions::new()
        .connect_lazy("postgres://localhost/medconnect_test")
        .expect("lazy pool");

    let state = FeatureState {
        db,
        codec: codec(),
        auditor: Auditor::new(store.clone()),
    };

    (state, store)
}

/// Full application router with default configuration
pub fn app() -> (axum::Router, Arc<InMemoryAuditStore>) {
    let (state, store) = state();
    (api::create_router(state, &Config::default()), store)
}

pub async fn body_json(response: Response<Body>) -> Value {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("body")
        .to_bytes();
    serde_json::from_slice(&bytes).expect("json body")
}
