//! HashStore - the key-value hash interface the cache persists into.
//!
//! One store hash per cache aggregate; each hash field is a composite key and
//! each value an encoded record. Connection management, timeouts and
//! durability belong to the backend.

mod in_memory;

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::error::StoreError;

/// Hash field key to encoded value.
pub type HashEntries = BTreeMap<String, Vec<u8>>;

/// Batched hash operations consumed by [`HashCache`](crate::HashCache).
///
/// The cache issues these calls sequentially, never concurrently, from
/// whichever thread owns it.
pub trait HashStore: Send + Sync {
    /// Set several fields of `hash_name` in one call (HSET with many pairs).
    fn hash_set_multiple(&self, hash_name: &str, entries: &HashEntries) -> Result<(), StoreError>;

    /// Delete fields of `hash_name`. Missing fields are ignored.
    /// Returns how many fields existed.
    fn hash_delete(&self, hash_name: &str, keys: &[String]) -> Result<usize, StoreError>;

    /// Every field of `hash_name`; empty when the hash does not exist.
    fn hash_get_all(&self, hash_name: &str) -> Result<HashEntries, StoreError>;
}

impl<S: HashStore + ?Sized> HashStore for &S {
    fn hash_set_multiple(&self, hash_name: &str, entries: &HashEntries) -> Result<(), StoreError> {
        (**self).hash_set_multiple(hash_name, entries)
    }

    fn hash_delete(&self, hash_name: &str, keys: &[String]) -> Result<usize, StoreError> {
        (**self).hash_delete(hash_name, keys)
    }

    fn hash_get_all(&self, hash_name: &str) -> Result<HashEntries, StoreError> {
        (**self).hash_get_all(hash_name)
    }
}

impl<S: HashStore + ?Sized> HashStore for Arc<S> {
    fn hash_set_multiple(&self, hash_name: &str, entries: &HashEntries) -> Result<(), StoreError> {
        (**self).hash_set_multiple(hash_name, entries)
    }

    fn hash_delete(&self, hash_name: &str, keys: &[String]) -> Result<usize, StoreError> {
        (**self).hash_delete(hash_name, keys)
    }

    fn hash_get_all(&self, hash_name: &str) -> Result<HashEntries, StoreError> {
        (**self).hash_get_all(hash_name)
    }
}

pub use in_memory::InMemoryHashStore;
