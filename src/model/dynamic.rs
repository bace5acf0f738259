use std::any::Any;

use serde_json::{Map, Value};
use tracing::trace;

use super::Record;
use crate::error::CacheError;

/// A schema-less record with a fixed set of fields.
///
/// The field set is frozen at construction: [`set`](DynamicRecord::set) on an
/// unknown name and every [`remove`](DynamicRecord::remove) fail with
/// `ImmutableStructure`. Dirty state is an explicit flag raised by `set`,
/// since there is no other way to reach the values mutably.
#[derive(Clone, Debug)]
pub struct DynamicRecord {
    type_tag: String,
    id_field: Option<String>,
    fields: Map<String, Value>,
    dirty: bool,
}

impl DynamicRecord {
    pub fn new(type_tag: impl Into<String>, fields: Map<String, Value>) -> Self {
        DynamicRecord {
            type_tag: type_tag.into(),
            id_field: None,
            fields,
            dirty: true,
        }
    }

    /// Use the value of `field` as this record's `unique_id`.
    pub fn with_id_field(mut self, field: impl Into<String>) -> Self {
        self.id_field = Some(field.into());
        self
    }

    /// Decode a stored JSON object. The result is not dirty.
    pub fn decode(
        type_tag: impl Into<String>,
        id_field: Option<&str>,
        bytes: &[u8],
    ) -> Result<Self, CacheError> {
        let type_tag = type_tag.into();
        let value: Value = serde_json::from_slice(bytes).map_err(|e| CacheError::Decode {
            type_tag: type_tag.clone(),
            message: e.to_string(),
        })?;
        let Value::Object(fields) = value else {
            return Err(CacheError::Decode {
                type_tag,
                message: "expected a JSON object".into(),
            });
        };
        Ok(DynamicRecord {
            type_tag,
            id_field: id_field.map(str::to_string),
            fields,
            dirty: false,
        })
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    /// Reassign an existing field and return its previous value.
    pub fn set(&mut self, field: &str, value: impl Into<Value>) -> Result<Value, CacheError> {
        let value = value.into();
        let Some(slot) = self.fields.get_mut(field) else {
            return Err(self.immutable(field));
        };
        trace!(
            type_tag = %self.type_tag,
            field,
            from = %slot,
            to = %value,
            "record field updated"
        );
        let old = std::mem::replace(slot, value);
        self.dirty = true;
        Ok(old)
    }

    /// Fields cannot be removed from a record.
    pub fn remove(&mut self, field: &str) -> Result<Value, CacheError> {
        Err(self.immutable(field))
    }

    fn immutable(&self, field: &str) -> CacheError {
        CacheError::ImmutableStructure {
            type_tag: self.type_tag.clone(),
            field: field.to_string(),
        }
    }
}

impl PartialEq for DynamicRecord {
    fn eq(&self, other: &Self) -> bool {
        self.type_tag == other.type_tag && self.fields == other.fields
    }
}

impl Record for DynamicRecord {
    fn type_tag(&self) -> &str {
        &self.type_tag
    }

    fn unique_id(&self) -> String {
        match self.id_field.as_deref().and_then(|f| self.fields.get(f)) {
            Some(Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
            None => self.type_tag.clone(),
        }
    }

    fn is_dirty(&self) -> bool {
        self.dirty
    }

    fn clear_dirty(&mut self) {
        self.dirty = false;
    }

    fn encode(&self) -> Result<Vec<u8>, CacheError> {
        serde_json::to_vec(&self.fields).map_err(|e| CacheError::Encode {
            type_tag: self.type_tag.clone(),
            message: e.to_string(),
        })
    }

    fn mark_dirty(&mut self) {
        self.dirty = true;
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
