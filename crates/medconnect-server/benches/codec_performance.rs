/// Performance benchmarks for field encryption
///
/// Measures token encode/decode across field sizes, the legacy-plaintext
/// fallback, and the one-off PBKDF2 key derivation.
///
/// Run with: cargo bench --bench codec_performance
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::sync::Arc;
use std::time::Duration;

use medconnect_server::crypto::{EncryptionKey, FieldCodec, KeyProvider, KEY_LEN};

fn codec() -> FieldCodec {
    FieldCodec::new(Arc::new(KeyProvider::with_key(EncryptionKey::from_bytes(
        [42u8; KEY_LEN],
    ))))
}

fn bench_encode(c: &mut Criterion) {
    let codec = codec();
    let mut group = c.benchmark_group("encode");

    for size in [16usize, 256, 4096, 65536] {
        let plaintext = "a".repeat(size);
        group.throughput(Throughput::Bytes(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &plaintext, |b, p| {
            b.iter(|| codec.encode(black_box(Some(p.as_str()))))
        });
    }

    group.finish();
}

fn bench_decode(c: &mut Criterion) {
    let codec = codec();
    let mut group = c.benchmark_group("decode");

    for size in [16usize, 256, 4096, 65536] {
        let token = codec
            .encode(Some(&"a".repeat(size)))
            .ok()
            .flatten()
            .unwrap_or_default();
        group.throughput(Throughput::Bytes(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &token, |b, t| {
            b.iter(|| codec.decode(black_box(Some(t.as_str()))))
        });
    }

    group.bench_function("legacy_plaintext", |b| {
        b.iter(|| codec.decode(black_box(Some("+1-555-2020"))))
    });

    group.finish();
}

fn bench_key_derivation(c: &mut Criterion) {
    let mut group = c.benchmark_group("key_derivation");
    group.sample_size(10);
    group.measurement_time(Duration::from_secs(20));

    group.bench_function("pbkdf2_passphrase", |b| {
        b.iter(|| EncryptionKey::derive(black_box("medconnect")))
    });

    group.finish();
}

criterion_group!(benches, bench_encode, bench_decode, bench_key_derivation);
criterion_main!(benches);
