//! Keyed record stores for the onboarding entities.
//!
//! The engine only needs simple CRUD plus one conditional insert; anything
//! richer (queries, transactions) belongs to a real database behind the same
//! trait. The in-memory implementation backs tests and dev wiring.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Arc, RwLock};

use thiserror::Error;

use gangway_billing::{PaymentAccount, WebhookEvent};
use gangway_core::{CustomerRef, EventId, MembershipId, TenantId};
use gangway_tenancy::{Membership, Tenant};

/// Store-level failure (I/O, constraint machinery). Uniqueness conflicts are
/// reported through `insert_if_absent`'s return value, not through this.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    #[error("store backend failure: {0}")]
    Backend(String),
}

impl StoreError {
    pub fn backend(msg: impl Into<String>) -> Self {
        Self::Backend(msg.into())
    }
}

/// Minimal keyed store over one entity collection.
pub trait KeyedStore<K, V>: Send + Sync {
    fn get(&self, key: &K) -> Result<Option<V>, StoreError>;

    /// Atomic conditional insert: `Ok(true)` when the key was free and the
    /// value is now stored, `Ok(false)` when the key was already taken.
    fn insert_if_absent(&self, key: K, value: V) -> Result<bool, StoreError>;

    fn upsert(&self, key: K, value: V) -> Result<(), StoreError>;

    fn remove(&self, key: &K) -> Result<(), StoreError>;

    fn list(&self) -> Result<Vec<V>, StoreError>;
}

impl<K, V, S> KeyedStore<K, V> for Arc<S>
where
    S: KeyedStore<K, V> + ?Sized,
{
    fn get(&self, key: &K) -> Result<Option<V>, StoreError> {
        (**self).get(key)
    }

    fn insert_if_absent(&self, key: K, value: V) -> Result<bool, StoreError> {
        (**self).insert_if_absent(key, value)
    }

    fn upsert(&self, key: K, value: V) -> Result<(), StoreError> {
        (**self).upsert(key, value)
    }

    fn remove(&self, key: &K) -> Result<(), StoreError> {
        (**self).remove(key)
    }

    fn list(&self) -> Result<Vec<V>, StoreError> {
        (**self).list()
    }
}

/// In-memory keyed store for tests/dev.
#[derive(Debug)]
pub struct InMemoryKeyedStore<K, V> {
    inner: RwLock<HashMap<K, V>>,
}

impl<K, V> InMemoryKeyedStore<K, V> {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(HashMap::new()),
        }
    }
}

impl<K, V> Default for InMemoryKeyedStore<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> KeyedStore<K, V> for InMemoryKeyedStore<K, V>
where
    K: Clone + Eq + Hash + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    fn get(&self, key: &K) -> Result<Option<V>, StoreError> {
        let map = self
            .inner
            .read()
            .map_err(|_| StoreError::backend("lock poisoned"))?;
        Ok(map.get(key).cloned())
    }

    fn insert_if_absent(&self, key: K, value: V) -> Result<bool, StoreError> {
        let mut map = self
            .inner
            .write()
            .map_err(|_| StoreError::backend("lock poisoned"))?;
        if map.contains_key(&key) {
            return Ok(false);
        }
        map.insert(key, value);
        Ok(true)
    }

    fn upsert(&self, key: K, value: V) -> Result<(), StoreError> {
        let mut map = self
            .inner
            .write()
            .map_err(|_| StoreError::backend("lock poisoned"))?;
        map.insert(key, value);
        Ok(())
    }

    fn remove(&self, key: &K) -> Result<(), StoreError> {
        let mut map = self
            .inner
            .write()
            .map_err(|_| StoreError::backend("lock poisoned"))?;
        map.remove(key);
        Ok(())
    }

    fn list(&self) -> Result<Vec<V>, StoreError> {
        let map = self
            .inner
            .read()
            .map_err(|_| StoreError::backend("lock poisoned"))?;
        Ok(map.values().cloned().collect())
    }
}

/// The record-store bundle the engine is wired with.
#[derive(Clone)]
pub struct Records {
    pub payment_accounts: Arc<dyn KeyedStore<CustomerRef, PaymentAccount>>,
    pub tenants: Arc<dyn KeyedStore<TenantId, Tenant>>,
    pub memberships: Arc<dyn KeyedStore<MembershipId, Membership>>,
    pub webhook_events: Arc<dyn KeyedStore<EventId, WebhookEvent>>,
}

impl Records {
    /// Fresh in-memory collections (tests and dev wiring).
    pub fn in_memory() -> Self {
        Self {
            payment_accounts: Arc::new(InMemoryKeyedStore::new()),
            tenants: Arc::new(InMemoryKeyedStore::new()),
            memberships: Arc::new(InMemoryKeyedStore::new()),
            webhook_events: Arc::new(InMemoryKeyedStore::new()),
        }
    }

    /// Resolve a tenant by its processor customer reference.
    pub fn tenant_by_customer(&self, customer_ref: &CustomerRef) -> Result<Option<Tenant>, StoreError> {
        Ok(self
            .tenants
            .list()?
            .into_iter()
            .find(|t| &t.customer_ref == customer_ref))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_if_absent_is_first_writer_wins() {
        let store: InMemoryKeyedStore<String, u32> = InMemoryKeyedStore::new();
        assert!(store.insert_if_absent("k".to_string(), 1).unwrap());
        assert!(!store.insert_if_absent("k".to_string(), 2).unwrap());
        assert_eq!(store.get(&"k".to_string()).unwrap(), Some(1));
    }

    #[test]
    fn upsert_overwrites_and_remove_clears() {
        let store: InMemoryKeyedStore<String, u32> = InMemoryKeyedStore::new();
        store.upsert("k".to_string(), 1).unwrap();
        store.upsert("k".to_string(), 2).unwrap();
        assert_eq!(store.get(&"k".to_string()).unwrap(), Some(2));

        store.remove(&"k".to_string()).unwrap();
        assert_eq!(store.get(&"k".to_string()).unwrap(), None);
        assert!(store.list().unwrap().is_empty());
    }
}
