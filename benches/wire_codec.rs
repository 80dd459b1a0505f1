//! Benchmarks for the line codec and the protocol messages carried over it.

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use keyless_ingress::codec::{read_message, write_line, write_message};
use keyless_ingress::modules::certificate::CertificateRecord;
use keyless_ingress::modules::signing::{SigningRequest, SigningResponse};
use rcgen::{CertificateParams, KeyPair};
use std::hint::black_box;
use tokio::runtime::Runtime;
use tokio_rustls::rustls::pki_types::CertificateDer;

fn record(chain_len: usize) -> CertificateRecord {
    let key = KeyPair::generate().unwrap();
    let cert = CertificateParams::new(vec!["www.example.com".to_string()])
        .unwrap()
        .self_signed(&key)
        .unwrap();
    let der: CertificateDer<'static> = cert.der().clone();
    CertificateRecord::new(vec![der; chain_len])
}

// ---------------------------------------------------------------------------
// Distribution responses
// ---------------------------------------------------------------------------

fn bench_certificate_record(c: &mut Criterion) {
    let runtime = Runtime::new().unwrap();
    let mut group = c.benchmark_group("wire_codec/certificate_record");

    for chain_len in [1usize, 3] {
        let record = record(chain_len);
        let mut encoded = Vec::new();
        runtime
            .block_on(write_message(&mut encoded, &record))
            .unwrap();

        group.bench_with_input(BenchmarkId::new("encode", chain_len), &record, |b, record| {
            b.iter(|| {
                runtime.block_on(async {
                    let mut out = Vec::with_capacity(encoded.len());
                    write_message(&mut out, black_box(record)).await.unwrap();
                    out
                })
            });
        });

        group.bench_with_input(BenchmarkId::new("decode", chain_len), &encoded, |b, encoded| {
            b.iter(|| {
                runtime.block_on(async {
                    let mut reader = black_box(encoded.as_slice());
                    let decoded: Option<CertificateRecord> =
                        read_message(&mut reader).await.unwrap();
                    decoded
                })
            });
        });
    }

    group.finish();
}

// ---------------------------------------------------------------------------
// Signing messages
// ---------------------------------------------------------------------------

fn bench_signing_messages(c: &mut Criterion) {
    let mut group = c.benchmark_group("wire_codec/signing");

    let request = SigningRequest::Sign {
        key_id: "9f86d081884c7d659a2feaa0c55ad015a3bf4f1b2b0b822cd15d6c15b0f00a08".to_string(),
        scheme: "ECDSA_NISTP256_SHA256".to_string(),
        payload: vec![0x20; 130],
    };
    let request_json = serde_json::to_string(&request).unwrap();

    group.bench_function("encode_sign_request", |b| {
        b.iter(|| serde_json::to_string(black_box(&request)).unwrap());
    });

    group.bench_function("decode_sign_request", |b| {
        b.iter(|| serde_json::from_str::<SigningRequest>(black_box(&request_json)).unwrap());
    });

    let response = SigningResponse::Signature {
        signature: vec![0x30; 72],
    };
    let response_json = serde_json::to_string(&response).unwrap();

    group.bench_function("decode_signature", |b| {
        b.iter(|| serde_json::from_str::<SigningResponse>(black_box(&response_json)).unwrap());
    });

    group.finish();
}

// ---------------------------------------------------------------------------
// Hostname requests
// ---------------------------------------------------------------------------

fn bench_hostname_line(c: &mut Criterion) {
    let runtime = Runtime::new().unwrap();

    c.bench_function("wire_codec/write_hostname", |b| {
        b.iter(|| {
            runtime.block_on(async {
                let mut out = Vec::with_capacity(32);
                write_line(&mut out, black_box("www.example.com")).await.unwrap();
                out
            })
        });
    });
}

criterion_group!(
    benches,
    bench_certificate_record,
    bench_signing_messages,
    bench_hostname_line
);
criterion_main!(benches);
