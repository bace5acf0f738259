//! A store wrapper that records every call and can be told to fail.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use rorm::{HashEntries, HashStore, InMemoryHashStore, StoreError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Set { hash: String, keys: Vec<String> },
    Delete { hash: String, keys: Vec<String> },
    GetAll { hash: String },
}

/// Wraps an [`InMemoryHashStore`]; clones share the log and the failure switches.
#[derive(Clone, Default)]
pub struct RecordingStore {
    inner: InMemoryHashStore,
    calls: Arc<Mutex<Vec<Call>>>,
    fail_set: Arc<AtomicBool>,
    fail_delete: Arc<AtomicBool>,
}

impl RecordingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn inner(&self) -> &InMemoryHashStore {
        &self.inner
    }

    /// Drain the call log.
    pub fn take_calls(&self) -> Vec<Call> {
        std::mem::take(&mut *self.calls.lock().unwrap())
    }

    pub fn fail_set(&self, fail: bool) {
        self.fail_set.store(fail, Ordering::SeqCst);
    }

    pub fn fail_delete(&self, fail: bool) {
        self.fail_delete.store(fail, Ordering::SeqCst);
    }

    /// Write a raw entry behind the cache's back.
    pub fn put_raw(&self, hash: &str, key: &str, value: &[u8]) {
        let entries: HashEntries = [(key.to_string(), value.to_vec())].into_iter().collect();
        self.inner.hash_set_multiple(hash, &entries).unwrap();
    }

    fn log(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }
}

impl HashStore for RecordingStore {
    fn hash_set_multiple(&self, hash_name: &str, entries: &HashEntries) -> Result<(), StoreError> {
        self.log(Call::Set {
            hash: hash_name.to_string(),
            keys: entries.keys().cloned().collect(),
        });
        if self.fail_set.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("connection refused".into()));
        }
        self.inner.hash_set_multiple(hash_name, entries)
    }

    fn hash_delete(&self, hash_name: &str, keys: &[String]) -> Result<usize, StoreError> {
        let mut sorted = keys.to_vec();
        sorted.sort();
        self.log(Call::Delete {
            hash: hash_name.to_string(),
            keys: sorted,
        });
        if self.fail_delete.load(Ordering::SeqCst) {
            return Err(StoreError::Timeout("HDEL".into()));
        }
        self.inner.hash_delete(hash_name, keys)
    }

    fn hash_get_all(&self, hash_name: &str) -> Result<HashEntries, StoreError> {
        self.log(Call::GetAll {
            hash: hash_name.to_string(),
        });
        self.inner.hash_get_all(hash_name)
    }
}
