//! Benchmark for the offer book and exchange settlement.
//!
//! Run with: cargo bench --package cardex_economy --bench offer_benchmark

use std::collections::BTreeSet;

use cardex_economy::{CardEconomy, EconomyConfig, Offer, OfferBook, TokenLedger};
use cardex_shared::Address;
use criterion::{black_box, criterion_group, criterion_main, Criterion};

fn user(index: u64) -> Address {
    let mut bytes = [0u8; 20];
    bytes[12..].copy_from_slice(&(index + 1).to_be_bytes());
    Address::from(bytes)
}

fn populated_book(offers: u64) -> OfferBook {
    let mut book = OfferBook::new();
    for id in 1..=offers {
        book.insert(Offer {
            offer_id: id,
            owner: user(id % 500),
            card_number: (id % 120) as u32,
            wanted_card_numbers: BTreeSet::from([((id + 1) % 120) as u32]),
        })
        .ok();
    }
    book
}

fn benchmark_insert_remove(c: &mut Criterion) {
    let mut book = populated_book(10_000);
    let owner = user(9_999);

    c.bench_function("offer_insert_remove_10k_book", |b| {
        b.iter(|| {
            book.insert(Offer {
                offer_id: 1_000_000,
                owner,
                card_number: 7,
                wanted_card_numbers: BTreeSet::new(),
            })
            .unwrap();
            black_box(book.remove(1_000_000))
        });
    });
}

fn benchmark_queries(c: &mut Criterion) {
    let book = populated_book(10_000);
    let owner = user(42);

    c.bench_function("offers_by_user_10k_book", |b| {
        b.iter(|| black_box(book.offers_by_user(black_box(&owner)).len()));
    });

    c.bench_function("offers_by_card_number_10k_book", |b| {
        b.iter(|| black_box(book.offers_by_card_number(black_box(17)).len()));
    });

    c.bench_function("verify_consistency_10k_book", |b| {
        b.iter(|| black_box(book.verify_consistency()));
    });
}

fn benchmark_exchange(c: &mut Criterion) {
    let admin = Address::repeat_byte(0xAA);
    let alice = Address::repeat_byte(1);
    let bob = Address::repeat_byte(2);
    let mut economy = CardEconomy::new(
        admin,
        Address::repeat_byte(0xEE),
        &EconomyConfig::default(),
        TokenLedger::new(),
    )
    .unwrap();
    economy.test_add_cards(admin, alice).unwrap();
    economy.test_add_cards(admin, bob).unwrap();

    c.bench_function("create_and_confirm_exchange", |b| {
        b.iter(|| {
            economy.create_offer(alice, 1, 3, &[90]).unwrap();
            economy.confirm_offer_exchange(bob, bob, 90, alice, 3).unwrap();
            // Swap back so the next iteration starts from the same holdings
            economy.create_offer(bob, 2, 3, &[90]).unwrap();
            black_box(economy.confirm_offer_exchange(alice, alice, 90, bob, 3).unwrap())
        });
    });
}

criterion_group!(
    benches,
    benchmark_insert_remove,
    benchmark_queries,
    benchmark_exchange
);
criterion_main!(benches);
