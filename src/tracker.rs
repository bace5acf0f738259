//! ContainerTracker - per-field memory of which composite keys were persisted.

use std::collections::BTreeSet;

/// Keys added and removed between a tracker's snapshot and a new key set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyDiff {
    pub added: Vec<String>,
    pub removed: Vec<String>,
}

impl KeyDiff {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}

/// Remembers the composite keys a field held at the end of the last save
/// (or that were loaded into it), so the next save can delete what is gone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerTracker {
    field: String,
    keys: BTreeSet<String>,
}

impl ContainerTracker {
    pub fn new(field: impl Into<String>) -> Self {
        ContainerTracker {
            field: field.into(),
            keys: BTreeSet::new(),
        }
    }

    pub fn field(&self) -> &str {
        &self.field
    }

    pub fn keys(&self) -> &BTreeSet<String> {
        &self.keys
    }

    pub fn contains(&self, key: &str) -> bool {
        self.keys.contains(key)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Record a key observed at load time. Returns false if it was already known.
    pub fn insert(&mut self, key: impl Into<String>) -> bool {
        self.keys.insert(key.into())
    }

    /// Compare the snapshot with the field's current keys. Both sides come
    /// back sorted.
    pub fn diff(&self, current: &BTreeSet<String>) -> KeyDiff {
        KeyDiff {
            added: current.difference(&self.keys).cloned().collect(),
            removed: self.keys.difference(current).cloned().collect(),
        }
    }

    /// Adopt `current` as the new snapshot.
    pub fn replace(&mut self, current: BTreeSet<String>) {
        self.keys = current;
    }

    pub fn clear(&mut self) {
        self.keys.clear();
    }
}
