use std::collections::{BTreeSet, HashMap};
use std::ops::{Deref, DerefMut};
use std::sync::Arc;

use tracing::{debug, trace, warn};

use super::{CacheAggregate, CacheConfig};
use crate::error::CacheError;
use crate::field::FieldMut;
use crate::key::CompositeKey;
use crate::model::Record;
use crate::registry::TypeRegistry;
use crate::store::{HashEntries, HashStore};
use crate::tracker::ContainerTracker;

/// What one `save` sent to the store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SaveReport {
    pub written: usize,
    pub deleted: usize,
}

impl SaveReport {
    /// True when the save issued no store call at all.
    pub fn is_empty(&self) -> bool {
        self.written == 0 && self.deleted == 0
    }
}

/// Outcome counts of one `load`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadReport {
    pub loaded: usize,
    /// Entries ignored for forward compatibility: malformed key, unknown
    /// field, unregistered type tag.
    pub skipped: usize,
    /// Entries that raised an error the callback chose to continue past.
    pub failed: usize,
    /// Loaded entries whose stored key differs from the key `save` derives
    /// for them (included in `loaded`). They come back dirty, so the next
    /// save writes them under the derived key and deletes the stored one.
    pub rekeyed: usize,
}

enum Applied {
    Loaded,
    Rekeyed,
    Skipped(&'static str),
}

/// An aggregate bound to its store hash.
///
/// `save` pushes dirty records and deletes vanished ones; `load` rebuilds
/// fields from the stored hash. Both take `&mut self`, so one cache instance
/// is driven by one owner at a time. Two processes saving the same hash
/// concurrently race per composite key (last write wins).
pub struct HashCache<S, A> {
    store: S,
    registry: Arc<TypeRegistry>,
    aggregate: A,
    trackers: HashMap<String, ContainerTracker>,
    config: CacheConfig,
}

impl<S: HashStore, A: CacheAggregate> HashCache<S, A> {
    pub fn new(store: S, registry: Arc<TypeRegistry>, aggregate: A) -> Self {
        HashCache {
            store,
            registry,
            aggregate,
            trackers: HashMap::new(),
            config: CacheConfig::default(),
        }
    }

    pub fn with_config(mut self, config: CacheConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn registry(&self) -> &TypeRegistry {
        &self.registry
    }

    pub fn aggregate(&self) -> &A {
        &self.aggregate
    }

    pub fn aggregate_mut(&mut self) -> &mut A {
        &mut self.aggregate
    }

    pub fn into_aggregate(self) -> A {
        self.aggregate
    }

    /// Store hash this cache reads and writes.
    pub fn hash_name(&self) -> String {
        self.aggregate.unique_id()
    }

    /// Keys remembered for `field` since the last save or load.
    pub fn tracker(&self, field: &str) -> Option<&ContainerTracker> {
        self.trackers.get(field)
    }

    /// Persist what changed since the last save or load.
    ///
    /// Dirty records are written in one batched hash set; keys that vanished
    /// from a field are removed in one batched hash delete. Dirty flags and
    /// trackers are only updated once both calls succeed, so a failed save
    /// can simply be retried.
    pub fn save(&mut self) -> Result<SaveReport, CacheError> {
        let hash_name = self.aggregate.unique_id();
        let mut writes = HashEntries::new();
        let mut deletes = BTreeSet::new();
        let mut snapshots: Vec<(&'static str, BTreeSet<String>)> = Vec::new();

        for (name, field) in self.aggregate.fields_mut() {
            let current = match field {
                FieldMut::Scalar(slot) => {
                    let record = slot.record();
                    let key = CompositeKey::scalar(name, record.type_tag());
                    BTreeSet::from([stage(&key, record, &mut writes)?])
                }
                FieldMut::List(list) => stage_items(name, list.records(), &mut writes)?,
                FieldMut::Map(map) => {
                    let entries = map.entries();
                    if self.config.enforce_map_keys {
                        check_map_keys(name, &entries)?;
                    }
                    stage_items(name, entries.into_iter().map(|(_, r)| r), &mut writes)?
                }
                FieldMut::Unsupported(type_name) => {
                    return Err(CacheError::UnsupportedFieldType {
                        field: name.to_string(),
                        type_name,
                    });
                }
            };

            if let Some(tracker) = self.trackers.get(name) {
                let diff = tracker.diff(&current);
                if !diff.is_empty() {
                    trace!(
                        field = name,
                        added = ?diff.added,
                        removed = ?diff.removed,
                        "field keys changed"
                    );
                }
                deletes.extend(diff.removed);
            }
            snapshots.push((name, current));
        }

        let report = SaveReport {
            written: writes.len(),
            deleted: deletes.len(),
        };

        if !writes.is_empty() {
            for key in writes.keys() {
                trace!(hash = %hash_name, key = %key, "write");
            }
            self.store.hash_set_multiple(&hash_name, &writes)?;
        }
        if !deletes.is_empty() {
            let keys: Vec<String> = deletes.into_iter().collect();
            for key in &keys {
                trace!(hash = %hash_name, key = %key, "delete");
            }
            self.store.hash_delete(&hash_name, &keys)?;
        }

        for (_, field) in self.aggregate.fields_mut() {
            match field {
                FieldMut::Scalar(slot) => slot.record_mut().clear_dirty(),
                FieldMut::List(list) => list.records_mut().into_iter().for_each(|r| r.clear_dirty()),
                FieldMut::Map(map) => map.records_mut().into_iter().for_each(|r| r.clear_dirty()),
                FieldMut::Unsupported(_) => {}
            }
        }
        for (name, keys) in snapshots {
            self.trackers
                .entry(name.to_string())
                .or_insert_with(|| ContainerTracker::new(name))
                .replace(keys);
        }

        debug!(
            hash = %hash_name,
            written = report.written,
            deleted = report.deleted,
            "cache saved"
        );
        Ok(report)
    }

    /// Load the stored hash, continuing past every per-entry error.
    pub fn load(&mut self) -> Result<LoadReport, CacheError> {
        self.load_with(|_, _| true)
    }

    /// Load the stored hash, consulting `on_error` for each entry that fails.
    ///
    /// Returning `false` from the callback stops the load with
    /// [`CacheError::LoadAborted`]; entries applied before that point stay
    /// applied. Skipped keys only reach the callback when
    /// `report_skipped_keys` is configured.
    pub fn load_with<F>(&mut self, mut on_error: F) -> Result<LoadReport, CacheError>
    where
        F: FnMut(&str, &CacheError) -> bool,
    {
        let hash_name = self.aggregate.unique_id();
        let entries = self.store.hash_get_all(&hash_name)?;

        if self.config.reset_on_load {
            self.reset();
        }

        let mut report = LoadReport::default();
        for (key, bytes) in &entries {
            let error = match self.apply_entry(key, bytes) {
                Ok(Applied::Loaded) => {
                    report.loaded += 1;
                    continue;
                }
                Ok(Applied::Rekeyed) => {
                    report.loaded += 1;
                    report.rekeyed += 1;
                    continue;
                }
                Ok(Applied::Skipped(reason)) => {
                    report.skipped += 1;
                    trace!(hash = %hash_name, key = %key, reason, "stored key skipped");
                    if !self.config.report_skipped_keys {
                        continue;
                    }
                    CacheError::SkippedKey {
                        key: key.clone(),
                        reason: reason.to_string(),
                    }
                }
                Err(err) => {
                    report.failed += 1;
                    warn!(hash = %hash_name, key = %key, error = %err, "failed to load stored entry");
                    err
                }
            };

            if !on_error(key.as_str(), &error) {
                return Err(CacheError::LoadAborted {
                    key: key.clone(),
                    source: Box::new(error),
                });
            }
        }

        debug!(
            hash = %hash_name,
            loaded = report.loaded,
            skipped = report.skipped,
            failed = report.failed,
            rekeyed = report.rekeyed,
            "cache loaded"
        );
        Ok(report)
    }

    fn apply_entry(&mut self, raw: &str, bytes: &[u8]) -> Result<Applied, CacheError> {
        let Some(key) = CompositeKey::parse(raw) else {
            return Ok(Applied::Skipped("malformed composite key"));
        };
        let Some(field) = self.aggregate.field_mut(key.field()) else {
            return Ok(Applied::Skipped("unknown field"));
        };
        let Some(decode) = self.registry.resolve(key.type_tag()) else {
            return Ok(Applied::Skipped("unregistered type tag"));
        };

        if let FieldMut::Unsupported(type_name) = field {
            return Err(CacheError::UnsupportedFieldType {
                field: key.field().to_string(),
                type_name,
            });
        }

        let mut record = decode(bytes)?;
        let expected = match field {
            FieldMut::Scalar(_) => CompositeKey::scalar(key.field(), record.type_tag()),
            _ => CompositeKey::item(key.field(), record.type_tag(), record.unique_id()),
        };
        let rekeyed = expected.to_string() != raw;
        if rekeyed {
            trace!(stored = raw, expected = %expected, "stored key will be rewritten");
            record.mark_dirty();
        }

        match field {
            FieldMut::Scalar(slot) => slot.assign(key.field(), record)?,
            FieldMut::List(list) => list.push_record(key.field(), record)?,
            FieldMut::Map(map) => {
                let item_id = match key.item_id() {
                    Some(item_id) => item_id.to_string(),
                    None => record.unique_id(),
                };
                map.insert_record(key.field(), item_id, record)?;
            }
            FieldMut::Unsupported(_) => {}
        }

        // The stored key is tracked even when rekeyed, so the next save deletes it.
        self.trackers
            .entry(key.field().to_string())
            .or_insert_with(|| ContainerTracker::new(key.field()))
            .insert(raw);
        Ok(if rekeyed {
            Applied::Rekeyed
        } else {
            Applied::Loaded
        })
    }

    fn reset(&mut self) {
        for (_, field) in self.aggregate.fields_mut() {
            match field {
                FieldMut::List(list) => list.clear_records(),
                FieldMut::Map(map) => map.clear_records(),
                FieldMut::Scalar(_) | FieldMut::Unsupported(_) => {}
            }
        }
        self.trackers.clear();
    }
}

/// Validate a key and, when the record is dirty, queue its encoded payload.
fn stage(
    key: &CompositeKey,
    record: &dyn Record,
    writes: &mut HashEntries,
) -> Result<String, CacheError> {
    key.validate()?;
    let raw = key.to_string();
    if record.is_dirty() {
        writes.insert(raw.clone(), record.encode()?);
    }
    Ok(raw)
}

fn stage_items<'r>(
    field: &str,
    records: impl IntoIterator<Item = &'r dyn Record>,
    writes: &mut HashEntries,
) -> Result<BTreeSet<String>, CacheError> {
    records
        .into_iter()
        .map(|record| {
            let key = CompositeKey::item(field, record.type_tag(), record.unique_id());
            stage(&key, record, writes)
        })
        .collect()
}

fn check_map_keys(field: &str, entries: &[(&str, &dyn Record)]) -> Result<(), CacheError> {
    for (map_key, record) in entries {
        let unique_id = record.unique_id();
        if *map_key != unique_id {
            return Err(CacheError::MapKeyMismatch {
                field: field.to_string(),
                map_key: map_key.to_string(),
                unique_id,
            });
        }
    }
    Ok(())
}

impl<S, A> Deref for HashCache<S, A> {
    type Target = A;

    fn deref(&self) -> &Self::Target {
        &self.aggregate
    }
}

impl<S, A> DerefMut for HashCache<S, A> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.aggregate
    }
}
