//! Criterion benchmarks for the reservation (idempotency) hot path.

use std::sync::Arc;

use criterion::{criterion_group, criterion_main, BatchSize, Criterion};

use gangway_core::EmailAddress;
use gangway_infra::{IdempotencyGuard, InMemoryReservationStore, SignupKey};

fn bench_reserve_fresh_keys(c: &mut Criterion) {
    let guard = IdempotencyGuard::new(Arc::new(InMemoryReservationStore::new()));
    let mut n = 0u64;

    c.bench_function("reserve_fresh_key", |b| {
        b.iter_batched(
            || {
                n += 1;
                SignupKey::Email(EmailAddress::parse(&format!("owner{n}@acme.test")).unwrap())
            },
            |key| guard.reserve(&key).unwrap(),
            BatchSize::SmallInput,
        )
    });
}

fn bench_reserve_contended_key(c: &mut Criterion) {
    let guard = IdempotencyGuard::new(Arc::new(InMemoryReservationStore::new()));
    let key = SignupKey::Email(EmailAddress::parse("owner@acme.test").unwrap());
    guard.reserve(&key).unwrap();

    // Steady-state duplicate submission: the slot is already taken.
    c.bench_function("reserve_taken_key", |b| b.iter(|| guard.reserve(&key).unwrap()));
}

criterion_group!(benches, bench_reserve_fresh_keys, bench_reserve_contended_key);
criterion_main!(benches);
