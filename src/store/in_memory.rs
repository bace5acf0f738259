use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};

use super::{HashEntries, HashStore};
use crate::error::StoreError;

/// In-memory hash store backed by `Arc<RwLock<HashMap>>`.
///
/// Clone-friendly (cloning shares the same underlying storage). Intended for
/// tests, fixtures and embedding.
#[derive(Clone, Default)]
pub struct InMemoryHashStore {
    storage: Arc<RwLock<HashMap<String, HashEntries>>>,
}

/// Serialized form of one hash, values base64-encoded.
#[derive(Serialize, Deserialize)]
struct ExportedHash {
    hash: String,
    entries: BTreeMap<String, EncodedValue>,
}

#[derive(Serialize, Deserialize)]
struct EncodedValue(#[serde(with = "value_serde")] Vec<u8>);

mod value_serde {
    use base64::{engine::general_purpose::STANDARD, Engine};
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S>(value: &Vec<u8>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        STANDARD.encode(value).serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<u8>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s: String = String::deserialize(deserializer)?;
        STANDARD.decode(&s).map_err(serde::de::Error::custom)
    }
}

impl InMemoryHashStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read a single field.
    pub fn get(&self, hash_name: &str, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        let storage = self
            .storage
            .read()
            .map_err(|_| StoreError::LockPoisoned("hash read"))?;
        Ok(storage.get(hash_name).and_then(|hash| hash.get(key)).cloned())
    }

    /// Number of fields in a hash.
    pub fn hash_len(&self, hash_name: &str) -> Result<usize, StoreError> {
        let storage = self
            .storage
            .read()
            .map_err(|_| StoreError::LockPoisoned("hash read"))?;
        Ok(storage.get(hash_name).map_or(0, BTreeMap::len))
    }

    /// Names of all non-empty hashes, sorted.
    pub fn hash_names(&self) -> Result<Vec<String>, StoreError> {
        let storage = self
            .storage
            .read()
            .map_err(|_| StoreError::LockPoisoned("hash read"))?;
        let mut names: Vec<String> = storage.keys().cloned().collect();
        names.sort();
        Ok(names)
    }

    /// Dump one hash as JSON with base64 values.
    pub fn export_json(&self, hash_name: &str) -> Result<String, StoreError> {
        let entries = self.hash_get_all(hash_name)?;
        let exported = ExportedHash {
            hash: hash_name.to_string(),
            entries: entries
                .into_iter()
                .map(|(key, value)| (key, EncodedValue(value)))
                .collect(),
        };
        serde_json::to_string_pretty(&exported).map_err(|e| StoreError::Serialization(e.to_string()))
    }

    /// Load a hash produced by [`export_json`](Self::export_json), replacing any
    /// hash of the same name. Returns the hash name.
    pub fn import_json(&self, json: &str) -> Result<String, StoreError> {
        let exported: ExportedHash =
            serde_json::from_str(json).map_err(|e| StoreError::Serialization(e.to_string()))?;
        let entries: HashEntries = exported
            .entries
            .into_iter()
            .map(|(key, EncodedValue(value))| (key, value))
            .collect();

        let mut storage = self
            .storage
            .write()
            .map_err(|_| StoreError::LockPoisoned("hash write"))?;
        if entries.is_empty() {
            storage.remove(&exported.hash);
        } else {
            storage.insert(exported.hash.clone(), entries);
        }
        Ok(exported.hash)
    }
}

impl HashStore for InMemoryHashStore {
    fn hash_set_multiple(&self, hash_name: &str, entries: &HashEntries) -> Result<(), StoreError> {
        let mut storage = self
            .storage
            .write()
            .map_err(|_| StoreError::LockPoisoned("hash write"))?;
        let hash = storage.entry(hash_name.to_string()).or_default();
        for (key, value) in entries {
            hash.insert(key.clone(), value.clone());
        }
        Ok(())
    }

    fn hash_delete(&self, hash_name: &str, keys: &[String]) -> Result<usize, StoreError> {
        let mut storage = self
            .storage
            .write()
            .map_err(|_| StoreError::LockPoisoned("hash write"))?;
        let Some(hash) = storage.get_mut(hash_name) else {
            return Ok(0);
        };
        let removed = keys.iter().filter(|key| hash.remove(*key).is_some()).count();
        // An emptied hash ceases to exist, as in Redis.
        if hash.is_empty() {
            storage.remove(hash_name);
        }
        Ok(removed)
    }

    fn hash_get_all(&self, hash_name: &str) -> Result<HashEntries, StoreError> {
        let storage = self
            .storage
            .read()
            .map_err(|_| StoreError::LockPoisoned("hash read"))?;
        Ok(storage.get(hash_name).cloned().unwrap_or_default())
    }
}

impl std::fmt::Debug for InMemoryHashStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let hashes = self.storage.read().map(|s| s.len()).unwrap_or(0);
        f.debug_struct("InMemoryHashStore")
            .field("hash_count", &hashes)
            .finish()
    }
}
