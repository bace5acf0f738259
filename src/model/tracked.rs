use std::any::Any;
use std::fmt;
use std::ops::{Deref, DerefMut};

use serde::{Serialize, Serializer};

use super::{Model, Record};
use crate::error::CacheError;

/// A typed record whose dirty state is derived from a deep snapshot.
///
/// `clear_dirty` clones the payload into a baseline; `is_dirty` compares the
/// live payload against it. Mutation through `DerefMut`, nested collections
/// included, is therefore always detected without a set-hook. A fresh
/// `Tracked` has no baseline and reports dirty until the first clear.
pub struct Tracked<T: Model> {
    value: T,
    baseline: Option<T>,
    forced: bool,
}

impl<T: Model> Tracked<T> {
    pub fn new(value: T) -> Self {
        Tracked {
            value,
            baseline: None,
            forced: false,
        }
    }

    /// Wrap a payload that already matches what the store holds.
    pub fn persisted(value: T) -> Self {
        let mut tracked = Tracked::new(value);
        tracked.clear_dirty();
        tracked
    }

    /// Decode a stored payload. The result is not dirty.
    pub fn decode(bytes: &[u8]) -> Result<Self, CacheError> {
        Ok(Tracked::persisted(T::decode(bytes)?))
    }

    pub fn get(&self) -> &T {
        &self.value
    }

    /// Replace the whole payload.
    pub fn set(&mut self, value: T) {
        self.value = value;
    }

    /// Mutate the payload in place and return the closure's result.
    pub fn update<R>(&mut self, f: impl FnOnce(&mut T) -> R) -> R {
        f(&mut self.value)
    }

    pub fn into_inner(self) -> T {
        self.value
    }
}

impl<T: Model> Record for Tracked<T> {
    fn type_tag(&self) -> &str {
        T::TYPE_TAG
    }

    fn unique_id(&self) -> String {
        self.value.unique_id()
    }

    fn is_dirty(&self) -> bool {
        self.forced || self.baseline.as_ref() != Some(&self.value)
    }

    fn clear_dirty(&mut self) {
        if !self.is_dirty() {
            return;
        }
        self.baseline = Some(self.value.clone());
        self.forced = false;
    }

    fn encode(&self) -> Result<Vec<u8>, CacheError> {
        self.value.encode()
    }

    fn mark_dirty(&mut self) {
        self.forced = true;
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any> {
        self
    }
}

impl<T: Model> Deref for Tracked<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.value
    }
}

impl<T: Model> DerefMut for Tracked<T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.value
    }
}

impl<T: Model> From<T> for Tracked<T> {
    fn from(value: T) -> Self {
        Tracked::new(value)
    }
}

impl<T: Model + Default> Default for Tracked<T> {
    fn default() -> Self {
        Tracked::new(T::default())
    }
}

impl<T: Model> Clone for Tracked<T> {
    fn clone(&self) -> Self {
        Tracked {
            value: self.value.clone(),
            baseline: self.baseline.clone(),
            forced: self.forced,
        }
    }
}

/// Equality is payload equality; dirty state is ignored.
impl<T: Model> PartialEq for Tracked<T> {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
    }
}

impl<T: Model> fmt::Debug for Tracked<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tracked")
            .field("value", &self.value)
            .field("dirty", &self.is_dirty())
            .finish()
    }
}

impl<T: Model> Serialize for Tracked<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.value.serialize(serializer)
    }
}
