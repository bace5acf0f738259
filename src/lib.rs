//! Change-tracking object cache over a key-value hash store.
//!
//! Application aggregates are mapped onto one store hash each. Every record
//! inside the aggregate lives under a composite key `field:type_tag[:item_id]`;
//! a save writes only records that changed and deletes entries whose records
//! were removed, a load rebuilds the aggregate from whatever the hash holds.

// Lets the derive macros refer to `::rorm` from inside this crate too.
extern crate self as rorm;

mod cache;
mod error;
mod field;
mod key;
mod model;
mod registry;
mod store;
mod tracker;

pub use cache::{CacheAggregate, CacheConfig, HashCache, LoadReport, SaveReport};
pub use error::{CacheError, StoreError};
pub use field::{AsRecord, FieldKind, FieldMut, ListField, MapField, ScalarField};
pub use key::{CompositeKey, SEPARATOR};
pub use model::{Codec, DynamicRecord, Model, Record, Tracked};
pub use registry::{DecodeFn, TypeRegistry};
pub use store::{HashEntries, HashStore, InMemoryHashStore};
pub use tracker::{ContainerTracker, KeyDiff};

#[cfg(feature = "macros")]
pub use rorm_macros::{Cache, Model};
