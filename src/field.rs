//! Field classification - how a cache aggregate exposes its record-bearing fields.
//!
//! Every persisted field is one of three shapes: a single record, an ordered
//! list of records, or a string-keyed map of records. The container traits
//! below erase the concrete element type so the engine can walk any of them.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::hash::BuildHasher;

use crate::error::CacheError;
use crate::model::{DynamicRecord, Model, Record, Tracked};

/// Shape of a declared field. Fixed at definition time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Scalar,
    List,
    Map,
    Unsupported,
}

/// Mutable handle to one declared field of a cache aggregate.
pub enum FieldMut<'a> {
    Scalar(&'a mut dyn ScalarField),
    List(&'a mut dyn ListField),
    Map(&'a mut dyn MapField),
    /// A declared field the engine cannot persist; carries the Rust type name.
    Unsupported(&'static str),
}

impl FieldMut<'_> {
    pub fn kind(&self) -> FieldKind {
        match self {
            FieldMut::Scalar(_) => FieldKind::Scalar,
            FieldMut::List(_) => FieldKind::List,
            FieldMut::Map(_) => FieldKind::Map,
            FieldMut::Unsupported(_) => FieldKind::Unsupported,
        }
    }
}

/// A value that holds exactly one record and can be rebuilt from a decoded one.
pub trait AsRecord: Send + Sync {
    fn as_record(&self) -> &dyn Record;

    fn as_record_mut(&mut self) -> &mut dyn Record;

    /// Convert a decoded record into this element type; `field` is for error context.
    fn from_record(record: Box<dyn Record>, field: &str) -> Result<Self, CacheError>
    where
        Self: Sized;
}

fn mismatch(field: &str, expected: &'static str, found: &dyn Record) -> CacheError {
    CacheError::TypeMismatch {
        field: field.to_string(),
        expected,
        found: found.type_tag().to_string(),
    }
}

impl<T: Model> AsRecord for Tracked<T> {
    fn as_record(&self) -> &dyn Record {
        self
    }

    fn as_record_mut(&mut self) -> &mut dyn Record {
        self
    }

    fn from_record(record: Box<dyn Record>, field: &str) -> Result<Self, CacheError> {
        record
            .downcast::<Tracked<T>>()
            .map(|tracked| *tracked)
            .map_err(|other| mismatch(field, T::TYPE_TAG, &*other))
    }
}

impl AsRecord for DynamicRecord {
    fn as_record(&self) -> &dyn Record {
        self
    }

    fn as_record_mut(&mut self) -> &mut dyn Record {
        self
    }

    fn from_record(record: Box<dyn Record>, field: &str) -> Result<Self, CacheError> {
        record
            .downcast::<DynamicRecord>()
            .map(|dynamic| *dynamic)
            .map_err(|other| mismatch(field, "DynamicRecord", &*other))
    }
}

impl AsRecord for Box<dyn Record> {
    fn as_record(&self) -> &dyn Record {
        &**self
    }

    fn as_record_mut(&mut self) -> &mut dyn Record {
        &mut **self
    }

    fn from_record(record: Box<dyn Record>, _field: &str) -> Result<Self, CacheError> {
        Ok(record)
    }
}

/// A field holding a single record.
pub trait ScalarField: Send + Sync {
    fn record(&self) -> &dyn Record;

    fn record_mut(&mut self) -> &mut dyn Record;

    /// Overwrite the field with a decoded record.
    fn assign(&mut self, field: &str, record: Box<dyn Record>) -> Result<(), CacheError>;
}

impl<E: AsRecord> ScalarField for E {
    fn record(&self) -> &dyn Record {
        self.as_record()
    }

    fn record_mut(&mut self) -> &mut dyn Record {
        self.as_record_mut()
    }

    fn assign(&mut self, field: &str, record: Box<dyn Record>) -> Result<(), CacheError> {
        *self = E::from_record(record, field)?;
        Ok(())
    }
}

/// An ordered sequence of records.
pub trait ListField: Send + Sync {
    fn records(&self) -> Vec<&dyn Record>;

    fn records_mut(&mut self) -> Vec<&mut dyn Record>;

    /// Append a decoded record.
    fn push_record(&mut self, field: &str, record: Box<dyn Record>) -> Result<(), CacheError>;

    fn clear_records(&mut self);
}

impl<E: AsRecord> ListField for Vec<E> {
    fn records(&self) -> Vec<&dyn Record> {
        self.iter().map(AsRecord::as_record).collect()
    }

    fn records_mut(&mut self) -> Vec<&mut dyn Record> {
        self.iter_mut().map(AsRecord::as_record_mut).collect()
    }

    fn push_record(&mut self, field: &str, record: Box<dyn Record>) -> Result<(), CacheError> {
        self.push(E::from_record(record, field)?);
        Ok(())
    }

    fn clear_records(&mut self) {
        self.clear();
    }
}

impl<E: AsRecord> ListField for VecDeque<E> {
    fn records(&self) -> Vec<&dyn Record> {
        self.iter().map(AsRecord::as_record).collect()
    }

    fn records_mut(&mut self) -> Vec<&mut dyn Record> {
        self.iter_mut().map(AsRecord::as_record_mut).collect()
    }

    fn push_record(&mut self, field: &str, record: Box<dyn Record>) -> Result<(), CacheError> {
        self.push_back(E::from_record(record, field)?);
        Ok(())
    }

    fn clear_records(&mut self) {
        self.clear();
    }
}

/// A string-keyed map of records.
///
/// The map key and the record's `unique_id` are independent; stored keys use
/// the `unique_id`, and loading re-keys entries by it.
pub trait MapField: Send + Sync {
    fn entries(&self) -> Vec<(&str, &dyn Record)>;

    fn records_mut(&mut self) -> Vec<&mut dyn Record>;

    fn insert_record(
        &mut self,
        field: &str,
        key: String,
        record: Box<dyn Record>,
    ) -> Result<(), CacheError>;

    fn clear_records(&mut self);
}

impl<E: AsRecord, H: BuildHasher + Send + Sync> MapField for HashMap<String, E, H> {
    fn entries(&self) -> Vec<(&str, &dyn Record)> {
        self.iter()
            .map(|(key, value)| (key.as_str(), value.as_record()))
            .collect()
    }

    fn records_mut(&mut self) -> Vec<&mut dyn Record> {
        self.values_mut().map(AsRecord::as_record_mut).collect()
    }

    fn insert_record(
        &mut self,
        field: &str,
        key: String,
        record: Box<dyn Record>,
    ) -> Result<(), CacheError> {
        self.insert(key, E::from_record(record, field)?);
        Ok(())
    }

    fn clear_records(&mut self) {
        self.clear();
    }
}

impl<E: AsRecord> MapField for BTreeMap<String, E> {
    fn entries(&self) -> Vec<(&str, &dyn Record)> {
        self.iter()
            .map(|(key, value)| (key.as_str(), value.as_record()))
            .collect()
    }

    fn records_mut(&mut self) -> Vec<&mut dyn Record> {
        self.values_mut().map(AsRecord::as_record_mut).collect()
    }

    fn insert_record(
        &mut self,
        field: &str,
        key: String,
        record: Box<dyn Record>,
    ) -> Result<(), CacheError> {
        self.insert(key, E::from_record(record, field)?);
        Ok(())
    }

    fn clear_records(&mut self) {
        self.clear();
    }
}
