//! Field codec properties
//!
//! These tests verify:
//! - Round trip for arbitrary non-empty text
//! - Re-encoding a token leaves it unchanged
//! - Legacy plaintext is returned as-is
//! - Passphrase-derived keys are stable across providers and threads

use proptest::prelude::*;
use std::sync::Arc;
use std::thread;

use medconnect_server::crypto::{Classified, FieldCodec, KeyProvider};

mod common;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn roundtrip_any_non_blank_text(s in "\\PC*[^\\s]\\PC*") {
        let codec = common::codec();
        let stored = codec.encode(Some(&s)).unwrap();
        prop_assert!(stored.is_some());
        prop_assert_eq!(codec.decode(stored.as_deref()).unwrap(), Some(s));
    }

    #[test]
    fn encode_is_idempotent(s in "[a-zA-Z0-9 ]{0,40}[a-z]") {
        let codec = common::codec();
        let once = codec.encode(Some(&s)).unwrap();
        let twice = codec.encode(once.as_deref()).unwrap();
        prop_assert_eq!(once, twice);
    }

    #[test]
    fn phone_numbers_are_legacy(n in "\\+?[0-9]{1,3}-[0-9]{3}-[0-9]{4}") {
        let codec = common::codec();
        prop_assert_eq!(codec.decode(Some(&n)).unwrap(), Some(n.clone()));
        prop_assert_eq!(codec.classify(&n).unwrap(), Classified::Legacy(n));
    }
}

#[test]
fn test_empty_values_are_absent() {
    let codec = common::codec();
    assert_eq!(codec.encode(None).unwrap(), None);
    assert_eq!(codec.encode(Some("")).unwrap(), None);
    assert_eq!(codec.decode(None).unwrap(), None);
    assert_eq!(codec.decode(Some("")).unwrap(), None);
}

#[test]
fn test_default_passphrase_roundtrip() {
    let codec = FieldCodec::new(Arc::new(KeyProvider::with_passphrase("medconnect")));

    let stored = codec.encode(Some("Patient has diabetes")).unwrap().unwrap();
    assert_ne!(stored, "Patient has diabetes");
    assert_eq!(
        codec.decode(Some(&stored)).unwrap().as_deref(),
        Some("Patient has diabetes")
    );

    // A second provider from the same passphrase opens the same token
    let other = FieldCodec::new(Arc::new(KeyProvider::with_passphrase("medconnect")));
    assert_eq!(
        other.decode(Some(&stored)).unwrap().as_deref(),
        Some("Patient has diabetes")
    );
}

#[test]
fn test_legacy_contact_number_reads_back() {
    let codec = common::codec();
    assert_eq!(
        codec.decode(Some("+1-555-2020")).unwrap().as_deref(),
        Some("+1-555-2020")
    );
}

#[test]
fn test_concurrent_first_resolution_agrees() {
    let provider = Arc::new(KeyProvider::with_passphrase("correct horse battery staple"));

    let handles: Vec<_> = (0..2)
        .map(|_| {
            let provider = Arc::clone(&provider);
            thread::spawn(move || *provider.key().unwrap().as_bytes())
        })
        .collect();

    let keys: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    assert_eq!(keys[0], keys[1]);
    assert_eq!(&keys[0], provider.key().unwrap().as_bytes());
}
