//! Infrastructure layer: record stores, the idempotency guard, and the
//! external-collaborator traits with their in-memory implementations.

pub mod providers;
pub mod records;
pub mod reservations;

#[cfg(feature = "postgres")]
pub mod postgres;

pub use records::{KeyedStore, Records, StoreError};
pub use reservations::{IdempotencyGuard, InMemoryReservationStore, ReservationStore, SignupKey};
