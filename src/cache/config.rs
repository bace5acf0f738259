use serde::{Deserialize, Serialize};

/// Configuration for a [`HashCache`](super::HashCache).
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Route keys skipped during load (malformed key, unknown field,
    /// unregistered type tag) through the load error callback as
    /// `CacheError::SkippedKey`. When false they are dropped silently.
    pub report_skipped_keys: bool,
    /// Fail `save` when a map entry's key differs from its record's `unique_id`.
    pub enforce_map_keys: bool,
    /// Empty every list and map field, and forget all tracked keys, before
    /// applying stored entries on load.
    pub reset_on_load: bool,
}

impl CacheConfig {
    /// Report every skipped key and keep map keys aligned with record identity.
    pub fn strict() -> Self {
        Self {
            report_skipped_keys: true,
            enforce_map_keys: true,
            ..Default::default()
        }
    }
}
