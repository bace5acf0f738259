//! Records - dirty-tracked, identity-bearing values persisted by a cache.
//!
//! Typed payloads implement [`Model`] and are wrapped in [`Tracked`] to get
//! change detection. Payloads without a Rust type use [`DynamicRecord`].
//!
//! ## Example
//!
//! ```ignore
//! use rorm::{Model, Tracked, Record};
//!
//! #[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Model)]
//! #[model(tag = "RoleInfo")]
//! struct RoleInfo {
//!     #[model(id)]
//!     pub role_id: u64,
//!     pub role_level: u32,
//! }
//!
//! let mut role = Tracked::new(RoleInfo { role_id: 10001, role_level: 1 });
//! role.clear_dirty();
//! role.role_level = 2;
//! assert!(role.is_dirty());
//! ```

mod codec;
mod dynamic;
mod record;
mod tracked;

use serde::{de::DeserializeOwned, Serialize};
use std::fmt;

use crate::error::CacheError;

/// Trait for payload types that can be stored as records.
pub trait Model:
    Serialize + DeserializeOwned + Clone + PartialEq + fmt::Debug + Send + Sync + 'static
{
    /// Type tag written into composite keys and resolved by the
    /// [`TypeRegistry`](crate::TypeRegistry) on load. Must be unique per process.
    const TYPE_TAG: &'static str;

    /// Payload encoding for this type.
    const CODEC: Codec = Codec::Json;

    /// Identity of this record within a list or map field.
    ///
    /// Defaults to the type tag, which suits a type only ever held by a
    /// scalar field.
    fn unique_id(&self) -> String {
        Self::TYPE_TAG.to_string()
    }

    fn encode(&self) -> Result<Vec<u8>, CacheError> {
        Self::CODEC.encode(Self::TYPE_TAG, self)
    }

    fn decode(bytes: &[u8]) -> Result<Self, CacheError> {
        Self::CODEC.decode(Self::TYPE_TAG, bytes)
    }
}

pub use codec::Codec;
pub use dynamic::DynamicRecord;
pub use record::Record;
pub use tracked::Tracked;
