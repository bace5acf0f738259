mod cache;
mod model;

use proc_macro::TokenStream;

/// Derive macro implementing `rorm::Model` for a serde payload struct.
///
/// # Example
///
/// ```ignore
/// #[derive(Clone, Debug, PartialEq, Serialize, Deserialize, Model)]
/// #[model(tag = "ItemInfo")]
/// pub struct ItemInfo {
///     #[model(id)]
///     pub item_id: u32,
///     pub item_count: u32,
/// }
/// ```
///
/// - `#[model(tag = "...")]` sets the type tag. Defaults to the struct name.
/// - `#[model(codec = "json" | "bitcode")]` picks the payload encoding.
///   Defaults to JSON.
/// - `#[model(id)]` marks the field rendered as `unique_id`. If omitted, a
///   field named `id` is used; without one the type tag is the identity.
#[proc_macro_derive(Model, attributes(model))]
pub fn derive_model(input: TokenStream) -> TokenStream {
    model::derive_model(input)
}

/// Derive macro implementing `rorm::CacheAggregate` for an application struct.
///
/// # Example
///
/// ```ignore
/// #[derive(Default, Cache)]
/// #[cache(hash = "Player")]
/// pub struct Player {
///     #[cache(id)]
///     pub user_id: u64,
///     #[cache]
///     pub role: Tracked<RoleInfo>,
///     #[cache(map)]
///     pub items: HashMap<String, Tracked<ItemInfo>>,
///     #[cache(list, name = "mail")]
///     pub mails: Vec<Tracked<MailInfo>>,
///     pub scratch: Vec<String>,
/// }
/// ```
///
/// - `#[cache(hash = "...")]` sets the hash name prefix. Defaults to the struct name.
/// - `#[cache(id)]` appends that field to the prefix: `Player:10001`.
/// - `#[cache]` persists a field, inferring its kind from the outer type:
///   `Vec`/`VecDeque` are lists, `HashMap`/`BTreeMap` are maps,
///   `Tracked`/`DynamicRecord`/`Box` are single records.
/// - `#[cache(scalar | list | map)]` states the kind explicitly.
/// - `#[cache(name = "...")]` overrides the field name used in stored keys.
///
/// Fields without `#[cache]` are not persisted. A `#[cache]` field whose
/// type cannot be classified makes `save` fail with `UnsupportedFieldType`.
#[proc_macro_derive(Cache, attributes(cache))]
pub fn derive_cache(input: TokenStream) -> TokenStream {
    cache::derive_cache(input)
}
