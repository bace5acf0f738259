/// Errors raised by a [`HashStore`](crate::HashStore) backend.
///
/// The cache never retries; these propagate unchanged out of `save`/`load`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("store lock poisoned during {0}")]
    LockPoisoned(&'static str),

    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("store call timed out: {0}")]
    Timeout(String),

    #[error("store backend error: {0}")]
    Backend(String),

    #[error("store serialization error: {0}")]
    Serialization(String),
}

/// Errors raised by records, the type registry and the cache engine.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// A type tag was registered twice.
    #[error("type tag {type_tag} has already been registered")]
    DuplicateRegistration { type_tag: String },

    /// An attempt to add or remove a structural field of a record.
    #[error("{type_tag} is immutable: cannot add or remove field {field}")]
    ImmutableStructure { type_tag: String, field: String },

    #[error("failed to decode {type_tag}: {message}")]
    Decode { type_tag: String, message: String },

    #[error("failed to encode {type_tag}: {message}")]
    Encode { type_tag: String, message: String },

    /// A declared cache field is neither a record, a list of records nor a map of records.
    #[error("field {field} has unsupported type {type_name}")]
    UnsupportedFieldType {
        field: String,
        type_name: &'static str,
    },

    /// A decoded record does not fit the concrete type of its container.
    #[error("field {field} expects {expected}, stored entry is {found}")]
    TypeMismatch {
        field: String,
        expected: &'static str,
        found: String,
    },

    /// A key segment is empty or contains the separator.
    #[error("invalid segment {segment:?} in composite key {key}")]
    InvalidKeySegment { key: String, segment: String },

    #[error("map field {field} stores unique_id {unique_id} under key {map_key}")]
    MapKeyMismatch {
        field: String,
        map_key: String,
        unique_id: String,
    },

    /// A stored entry was skipped at load time. Only reported when
    /// `CacheConfig::report_skipped_keys` is set.
    #[error("skipped stored key {key}: {reason}")]
    SkippedKey { key: String, reason: String },

    /// The load error callback asked to stop.
    #[error("load aborted at key {key}: {source}")]
    LoadAborted {
        key: String,
        #[source]
        source: Box<CacheError>,
    },

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl CacheError {
    /// Store-layer failures are the only errors a caller may sensibly retry.
    pub fn is_store(&self) -> bool {
        matches!(self, CacheError::Store(_))
    }
}
