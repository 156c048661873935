//! Registry storage for the container
//!
//! Uses DashMap for concurrent access without a container-wide lock.

use crate::factory::AnyFactory;
use crate::{DiError, Lifetime, Result, TypeKey};
use ahash::RandomState;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

/// Thread-safe map from type key to factory.
///
/// Entries are only ever added (by `build()`) or removed again when the same
/// `build()` rolls back; there is no override.
pub(crate) struct ServiceStorage {
    factories: DashMap<TypeKey, AnyFactory, RandomState>,
}

impl ServiceStorage {
    /// Create new empty storage.
    ///
    /// 8 shards: registries are small and mostly read after build.
    #[inline]
    pub fn new() -> Self {
        Self {
            factories: DashMap::with_capacity_and_hasher_and_shard_amount(
                0,
                RandomState::new(),
                8,
            ),
        }
    }

    /// Create with pre-allocated capacity; shard count grows with it.
    #[inline]
    pub fn with_capacity(capacity: usize) -> Self {
        let shard_amount = if capacity <= 16 {
            8
        } else if capacity <= 64 {
            16
        } else {
            32
        };
        Self {
            factories: DashMap::with_capacity_and_hasher_and_shard_amount(
                capacity,
                RandomState::new(),
                shard_amount,
            ),
        }
    }

    /// Insert a factory, failing if the key is taken
    #[inline]
    pub fn try_insert(&self, key: TypeKey, factory: AnyFactory) -> Result<()> {
        match self.factories.entry(key) {
            Entry::Occupied(_) => Err(DiError::already_registered(key)),
            Entry::Vacant(slot) => {
                slot.insert(factory);
                Ok(())
            }
        }
    }

    /// Clone the factory for `key` out of the map.
    ///
    /// The shard guard is released before this returns.
    #[inline]
    pub fn get(&self, key: &TypeKey) -> Option<AnyFactory> {
        self.factories.get(key).map(|entry| entry.value().clone())
    }

    /// Check if key exists
    #[inline]
    pub fn contains(&self, key: &TypeKey) -> bool {
        self.factories.contains_key(key)
    }

    /// Remove an entry
    #[inline]
    pub fn remove(&self, key: &TypeKey) -> bool {
        self.factories.remove(key).is_some()
    }

    /// Get number of registered services
    #[inline]
    pub fn len(&self) -> usize {
        self.factories.len()
    }

    /// Check if empty
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }

    /// Get all registered keys
    pub fn keys(&self) -> Vec<TypeKey> {
        self.factories.iter().map(|r| *r.key()).collect()
    }

    /// Lifetime of the entry for `key`, if any
    #[inline]
    pub fn lifetime(&self, key: &TypeKey) -> Option<Lifetime> {
        self.factories.get(key).map(|f| {
            if f.is_transient() {
                Lifetime::Transient
            } else {
                Lifetime::Singleton
            }
        })
    }
}

impl Default for ServiceStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ServiceStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceStorage")
            .field("count", &self.len())
            .finish()
    }
}
