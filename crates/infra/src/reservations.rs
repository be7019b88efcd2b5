//! The idempotency guard: one reservation slot per signup key.
//!
//! The synchronous saga and the funds-cleared webhook race into the same
//! tenant-creation logic; correctness rests on `reserve` being an atomic
//! check-and-set, never read-then-write. The in-memory store
//! takes one write lock per operation; the Postgres store (feature
//! `postgres`) relies on a unique constraint with `ON CONFLICT DO NOTHING`.

use std::collections::HashMap;
use std::sync::RwLock;

use serde::{Deserialize, Serialize};

use gangway_core::{CustomerRef, EmailAddress, TenantId};

use crate::records::StoreError;

/// A key into the reservation space: the submitted email (synchronous path)
/// or the processor customer reference (webhook path).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum SignupKey {
    Email(EmailAddress),
    Customer(CustomerRef),
}

impl core::fmt::Display for SignupKey {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Email(e) => write!(f, "email:{e}"),
            Self::Customer(c) => write!(f, "customer:{c}"),
        }
    }
}

/// State of one reservation slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Reservation {
    /// Taken by an in-flight saga; released if that saga aborts.
    Held,
    /// Permanently bound to an existing tenant.
    Bound(TenantId),
}

/// Atomic check-and-set over the reservation key space.
pub trait ReservationStore: Send + Sync {
    /// Try to take the slot. `Ok(true)` means this caller holds it; exactly
    /// one concurrent caller per key observes `true`.
    fn try_reserve(&self, key: &SignupKey) -> Result<bool, StoreError>;

    /// Look up the slot state.
    fn status(&self, key: &SignupKey) -> Result<Option<Reservation>, StoreError>;

    /// Make a held slot permanent once its tenant exists.
    fn bind(&self, key: &SignupKey, tenant_id: TenantId) -> Result<(), StoreError>;

    /// Free a held slot whose saga aborted. Bound slots are never released.
    fn release(&self, key: &SignupKey) -> Result<(), StoreError>;
}

/// In-memory reservation store (tests/dev).
#[derive(Debug, Default)]
pub struct InMemoryReservationStore {
    slots: RwLock<HashMap<SignupKey, Reservation>>,
}

impl InMemoryReservationStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ReservationStore for InMemoryReservationStore {
    fn try_reserve(&self, key: &SignupKey) -> Result<bool, StoreError> {
        let mut slots = self
            .slots
            .write()
            .map_err(|_| StoreError::backend("lock poisoned"))?;
        if slots.contains_key(key) {
            return Ok(false);
        }
        slots.insert(key.clone(), Reservation::Held);
        Ok(true)
    }

    fn status(&self, key: &SignupKey) -> Result<Option<Reservation>, StoreError> {
        let slots = self
            .slots
            .read()
            .map_err(|_| StoreError::backend("lock poisoned"))?;
        Ok(slots.get(key).copied())
    }

    fn bind(&self, key: &SignupKey, tenant_id: TenantId) -> Result<(), StoreError> {
        let mut slots = self
            .slots
            .write()
            .map_err(|_| StoreError::backend("lock poisoned"))?;
        slots.insert(key.clone(), Reservation::Bound(tenant_id));
        Ok(())
    }

    fn release(&self, key: &SignupKey) -> Result<(), StoreError> {
        let mut slots = self
            .slots
            .write()
            .map_err(|_| StoreError::backend("lock poisoned"))?;
        if let Some(Reservation::Held) = slots.get(key) {
            slots.remove(key);
        }
        Ok(())
    }
}

/// The guard both entry paths call before touching the tenant provisioner.
#[derive(Clone)]
pub struct IdempotencyGuard {
    store: std::sync::Arc<dyn ReservationStore>,
}

impl IdempotencyGuard {
    pub fn new(store: std::sync::Arc<dyn ReservationStore>) -> Self {
        Self { store }
    }

    /// Atomic check-and-set; the single winner proceeds to tenant creation.
    pub fn reserve(&self, key: &SignupKey) -> Result<bool, StoreError> {
        self.store.try_reserve(key)
    }

    /// Whether the key is already reserved or bound to a tenant.
    pub fn has_tenant_for(&self, key: &SignupKey) -> Result<bool, StoreError> {
        Ok(self.store.status(key)?.is_some())
    }

    /// Current slot state: `Held` by an in-flight saga, `Bound` to a tenant,
    /// or free.
    pub fn reservation(&self, key: &SignupKey) -> Result<Option<Reservation>, StoreError> {
        self.store.status(key)
    }

    /// Make the reservation permanent once the tenant row exists.
    pub fn bind_tenant(&self, key: &SignupKey, tenant_id: TenantId) -> Result<(), StoreError> {
        self.store.bind(key, tenant_id)
    }

    /// Free a reservation whose saga aborted, so a retry can succeed.
    pub fn release(&self, key: &SignupKey) -> Result<(), StoreError> {
        self.store.release(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn email_key(addr: &str) -> SignupKey {
        SignupKey::Email(EmailAddress::parse(addr).unwrap())
    }

    #[test]
    fn reserve_admits_exactly_one_winner_sequentially() {
        let guard = IdempotencyGuard::new(Arc::new(InMemoryReservationStore::new()));
        let key = email_key("owner@acme.test");

        assert!(guard.reserve(&key).unwrap());
        assert!(!guard.reserve(&key).unwrap());
        assert!(guard.has_tenant_for(&key).unwrap());
    }

    #[test]
    fn reserve_admits_exactly_one_winner_concurrently() {
        let guard = IdempotencyGuard::new(Arc::new(InMemoryReservationStore::new()));
        let key = email_key("owner@acme.test");

        let winners: usize = std::thread::scope(|s| {
            (0..16)
                .map(|_| {
                    let guard = guard.clone();
                    let key = key.clone();
                    s.spawn(move || guard.reserve(&key).unwrap())
                })
                .collect::<Vec<_>>()
                .into_iter()
                .map(|h| usize::from(h.join().unwrap()))
                .sum()
        });

        assert_eq!(winners, 1);
    }

    #[test]
    fn release_frees_held_but_not_bound_slots() {
        let guard = IdempotencyGuard::new(Arc::new(InMemoryReservationStore::new()));
        let key = email_key("owner@acme.test");

        assert!(guard.reserve(&key).unwrap());
        guard.release(&key).unwrap();
        assert!(guard.reserve(&key).unwrap());

        let tenant_id = TenantId::new();
        guard.bind_tenant(&key, tenant_id).unwrap();
        guard.release(&key).unwrap();
        assert!(!guard.reserve(&key).unwrap());
        assert!(guard.has_tenant_for(&key).unwrap());
    }

    #[test]
    fn reservation_reports_held_then_bound() {
        let guard = IdempotencyGuard::new(Arc::new(InMemoryReservationStore::new()));
        let key = email_key("owner@acme.test");

        assert_eq!(guard.reservation(&key).unwrap(), None);
        assert!(guard.reserve(&key).unwrap());
        assert_eq!(guard.reservation(&key).unwrap(), Some(Reservation::Held));

        let tenant_id = TenantId::new();
        guard.bind_tenant(&key, tenant_id).unwrap();
        assert_eq!(guard.reservation(&key).unwrap(), Some(Reservation::Bound(tenant_id)));
    }

    #[test]
    fn email_and_customer_keys_are_distinct_slots() {
        let guard = IdempotencyGuard::new(Arc::new(InMemoryReservationStore::new()));
        let email = email_key("owner@acme.test");
        let customer = SignupKey::Customer(CustomerRef::new("cus_1").unwrap());

        assert!(guard.reserve(&email).unwrap());
        assert!(guard.reserve(&customer).unwrap());
    }
}
