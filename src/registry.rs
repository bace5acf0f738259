//! TypeRegistry - maps type tags to decoders for polymorphic loads.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::error::CacheError;
use crate::model::{DynamicRecord, Model, Record, Tracked};

/// Decodes stored bytes into a boxed record.
pub type DecodeFn = Arc<dyn Fn(&[u8]) -> Result<Box<dyn Record>, CacheError> + Send + Sync>;

/// Table of type tag to decoder.
///
/// Build it once at startup, then share it behind an `Arc` with every
/// [`HashCache`](crate::HashCache). Every type that may appear in a store hash
/// must be registered before the first `load` touching it; unregistered tags
/// are skipped at load time.
#[derive(Clone, Default)]
pub struct TypeRegistry {
    decoders: HashMap<String, DecodeFn>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a typed model under its `TYPE_TAG`.
    ///
    /// Returns the registry so registrations chain:
    /// `registry.register::<Role>()?.register::<Item>()?;`
    pub fn register<M: Model>(&mut self) -> Result<&mut Self, CacheError> {
        self.register_decoder(M::TYPE_TAG, |bytes| {
            Ok(Box::new(Tracked::<M>::decode(bytes)?) as Box<dyn Record>)
        })
    }

    /// Register a schema-less type decoded as [`DynamicRecord`].
    pub fn register_dynamic(
        &mut self,
        type_tag: &str,
        id_field: Option<&str>,
    ) -> Result<&mut Self, CacheError> {
        let tag = type_tag.to_string();
        let id_field = id_field.map(str::to_string);
        self.register_decoder(type_tag, move |bytes| {
            Ok(Box::new(DynamicRecord::decode(tag.clone(), id_field.as_deref(), bytes)?)
                as Box<dyn Record>)
        })
    }

    /// Register an arbitrary decoder. Fails if the tag is already taken.
    pub fn register_decoder<F>(&mut self, type_tag: &str, decode: F) -> Result<&mut Self, CacheError>
    where
        F: Fn(&[u8]) -> Result<Box<dyn Record>, CacheError> + Send + Sync + 'static,
    {
        if self.decoders.contains_key(type_tag) {
            return Err(CacheError::DuplicateRegistration {
                type_tag: type_tag.to_string(),
            });
        }
        self.decoders.insert(type_tag.to_string(), Arc::new(decode));
        Ok(self)
    }

    /// Look up a decoder. Absence is not an error here; callers decide.
    pub fn resolve(&self, type_tag: &str) -> Option<&DecodeFn> {
        self.decoders.get(type_tag)
    }

    /// Resolve and decode in one step. `None` when the tag is unregistered.
    pub fn decode(&self, type_tag: &str, bytes: &[u8]) -> Option<Result<Box<dyn Record>, CacheError>> {
        self.resolve(type_tag).map(|decode| decode(bytes))
    }

    pub fn contains(&self, type_tag: &str) -> bool {
        self.decoders.contains_key(type_tag)
    }

    pub fn len(&self) -> usize {
        self.decoders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.decoders.is_empty()
    }

    /// Registered tags, sorted.
    pub fn tags(&self) -> Vec<&str> {
        let mut tags: Vec<&str> = self.decoders.keys().map(String::as_str).collect();
        tags.sort_unstable();
        tags
    }
}

impl fmt::Debug for TypeRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeRegistry")
            .field("tags", &self.tags())
            .finish()
    }
}
