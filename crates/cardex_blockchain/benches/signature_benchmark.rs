//! # Signature Benchmark
//!
//! Pack openings are bounded by signer recovery, so measure it.
//!
//! Run with: `cargo bench --package cardex_blockchain --bench signature_benchmark`

// Benchmarks don't need strict docs
#![allow(missing_docs)]

use alloy_primitives::{Address, B256};
use cardex_blockchain::{
    dispatch, pack_signing_digest, recover_pack_signer, MockPackBackend, PackDataRequest,
    PackSigner,
};
use cardex_blockchain::contracts::IPackLedger;
use cardex_economy::{CardEconomy, CatalogueConfig, EconomyConfig, Ledger, PackOpening, TokenLedger};
use alloy_sol_types::SolCall;
use criterion::{black_box, criterion_group, criterion_main, Criterion};

fn signer() -> PackSigner {
    PackSigner::from_bytes(&B256::repeat_byte(0x42)).unwrap()
}

fn bench_digest_and_recover(c: &mut Criterion) {
    let signer = signer();
    let pack_data: Vec<u32> = (0..12).collect();
    let opening = PackOpening {
        buyer: Address::repeat_byte(1),
        pack_number: 77,
        pack_data: &pack_data,
        validator: Address::repeat_byte(0xEE),
    };
    let signature = signer.sign_opening(&opening).unwrap();

    c.bench_function("pack_signing_digest_12_cards", |b| {
        b.iter(|| black_box(pack_signing_digest(black_box(&opening))));
    });

    c.bench_function("sign_pack_opening", |b| {
        b.iter(|| black_box(signer.sign_opening(black_box(&opening)).unwrap()));
    });

    c.bench_function("recover_pack_signer", |b| {
        b.iter(|| black_box(recover_pack_signer(black_box(&opening), &signature).unwrap()));
    });
}

fn bench_backend(c: &mut Criterion) {
    let backend = MockPackBackend::new(signer(), Address::repeat_byte(0xEE), CatalogueConfig::default());
    let mut packet_number = 0;

    c.bench_function("backend_deal_and_sign", |b| {
        b.iter(|| {
            packet_number += 1;
            black_box(
                backend
                    .handle(&PackDataRequest {
                        address: Address::repeat_byte(1),
                        packet_number,
                    })
                    .unwrap(),
            )
        });
    });
}

fn bench_dispatch_view(c: &mut Criterion) {
    let mut economy = CardEconomy::new(
        Address::repeat_byte(0xAA),
        Address::repeat_byte(0xEE),
        &EconomyConfig::default(),
        TokenLedger::new(),
    )
    .unwrap();
    let calldata = IPackLedger::packPriceCall {}.abi_encode();

    c.bench_function("dispatch_view_call", |b| {
        b.iter(|| {
            black_box(
                dispatch(&mut economy, Ledger::Packs, Address::repeat_byte(1), &calldata).unwrap(),
            )
        });
    });
}

criterion_group!(benches, bench_digest_and_recover, bench_backend, bench_dispatch_view);
criterion_main!(benches);
