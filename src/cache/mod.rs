//! Cache aggregates - application structs synchronized with one store hash.
//!
//! An aggregate declares which of its fields hold records; [`HashCache`]
//! owns the aggregate together with the store handle, the type registry and
//! one [`ContainerTracker`](crate::ContainerTracker) per persisted field.
//!
//! ## Example
//!
//! ```ignore
//! use rorm::{Cache, HashCache, InMemoryHashStore, Tracked, TypeRegistry};
//!
//! #[derive(Default, Cache)]
//! #[cache(hash = "Player")]
//! struct Player {
//!     #[cache(id)]
//!     user_id: u64,
//!     #[cache]
//!     role: Tracked<RoleInfo>,
//!     #[cache]
//!     items: HashMap<String, Tracked<ItemInfo>>,
//!     #[cache]
//!     mails: Vec<Tracked<MailInfo>>,
//!     tmp: Vec<String>,
//! }
//!
//! let mut player = HashCache::new(store.clone(), registry.clone(), Player::new(10001));
//! player.items.insert("1".into(), Tracked::new(item));
//! player.save()?;
//! ```

mod config;
mod hash_cache;

use crate::field::FieldMut;

/// An application-defined composite of record-bearing fields.
///
/// Usually derived with `#[derive(Cache)]`. Field classification must not
/// change at runtime: `fields_mut` returns the same names with the same
/// kinds on every call.
pub trait CacheAggregate: Send {
    /// Name of the store hash backing this aggregate.
    fn unique_id(&self) -> String;

    /// Every declared field, in declaration order.
    fn fields_mut(&mut self) -> Vec<(&'static str, FieldMut<'_>)>;

    /// A single declared field by name.
    fn field_mut(&mut self, name: &str) -> Option<FieldMut<'_>> {
        self.fields_mut()
            .into_iter()
            .find(|(field, _)| *field == name)
            .map(|(_, field)| field)
    }
}

pub use config::CacheConfig;
pub use hash_cache::{HashCache, LoadReport, SaveReport};
