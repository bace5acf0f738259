//! Record flavours inside caches: polymorphic slots, schema-less records,
//! alternate codecs, plus store failures and key validation.

#[path = "../support/mod.rs"]
mod support;

use std::collections::{BTreeMap, VecDeque};
use std::sync::Arc;

use rorm::{
    Cache, CacheError, Codec, DynamicRecord, HashCache, HashStore, Model, Record, Tracked,
    TypeRegistry,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use support::game::{registry, ItemInfo, Player};
use support::recording_store::{Call, RecordingStore};

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, Model)]
struct Idle {
    since: u64,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, Model)]
struct Chase {
    target: u32,
}

#[derive(Debug, Cache)]
#[cache(hash = "Npc")]
struct Npc {
    #[cache(id)]
    id: u32,
    #[cache]
    brain: Box<dyn Record>,
}

impl Npc {
    fn new(id: u32) -> Self {
        Npc {
            id,
            brain: Box::new(Tracked::new(Idle::default())),
        }
    }
}

fn npc_registry() -> Arc<TypeRegistry> {
    let mut registry = TypeRegistry::new();
    registry
        .register::<Idle>()
        .and_then(|r| r.register::<Chase>())
        .unwrap();
    Arc::new(registry)
}

#[test]
fn polymorphic_slot_switches_type_and_drops_stale_key() {
    let store = RecordingStore::new();
    let mut npc = HashCache::new(store.clone(), npc_registry(), Npc::new(3));
    npc.save().unwrap();
    store.take_calls();

    npc.brain = Box::new(Tracked::new(Chase { target: 42 }));
    npc.save().unwrap();

    assert_eq!(
        store.take_calls(),
        vec![
            Call::Set {
                hash: "Npc:3".into(),
                keys: vec!["brain:Chase".into()],
            },
            Call::Delete {
                hash: "Npc:3".into(),
                keys: vec!["brain:Idle".into()],
            },
        ]
    );

    let mut fresh = HashCache::new(store.clone(), npc_registry(), Npc::new(3));
    fresh.load().unwrap();
    assert_eq!(fresh.brain.type_tag(), "Chase");
    let chase = fresh.brain.downcast_ref::<Tracked<Chase>>().unwrap();
    assert_eq!(chase.target, 42);
    assert!(!fresh.brain.is_dirty());
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, Model)]
#[model(tag = "Rank", codec = "bitcode")]
struct Rank {
    id: String,
    weight: u16,
    perks: Vec<String>,
}

#[derive(Debug, Cache)]
#[cache(hash = "Guild")]
struct Guild {
    #[cache(id)]
    name: String,
    #[cache(scalar)]
    banner: DynamicRecord,
    #[cache(list, name = "member")]
    members: VecDeque<DynamicRecord>,
    #[cache(map)]
    ranks: BTreeMap<String, Tracked<Rank>>,
}

impl Guild {
    fn new(name: &str) -> Self {
        Guild {
            name: name.into(),
            banner: DynamicRecord::new("Banner", object(json!({ "color": "blue" }))),
            members: VecDeque::new(),
            ranks: BTreeMap::new(),
        }
    }
}

fn object(value: serde_json::Value) -> serde_json::Map<String, serde_json::Value> {
    match value {
        serde_json::Value::Object(map) => map,
        other => panic!("not an object: {other}"),
    }
}

fn member(name: &str, level: u32) -> DynamicRecord {
    DynamicRecord::new("Member", object(json!({ "name": name, "level": level })))
        .with_id_field("name")
}

fn guild_registry() -> Arc<TypeRegistry> {
    let mut registry = TypeRegistry::new();
    registry
        .register_dynamic("Banner", None)
        .and_then(|r| r.register_dynamic("Member", Some("name")))
        .and_then(|r| r.register::<Rank>())
        .unwrap();
    Arc::new(registry)
}

#[test]
fn dynamic_records_and_renamed_fields_round_trip() {
    let store = RecordingStore::new();
    let mut guild = HashCache::new(store.clone(), guild_registry(), Guild::new("owls"));
    guild.members.push_back(member("alice", 3));
    guild.members.push_back(member("bob", 1));
    guild.save().unwrap();

    let stored = store.inner().hash_get_all("Guild:owls").unwrap();
    let keys: Vec<&str> = stored.keys().map(String::as_str).collect();
    assert_eq!(
        keys,
        vec!["banner:Banner", "member:Member:alice", "member:Member:bob"]
    );

    let mut fresh = HashCache::new(store.clone(), guild_registry(), Guild::new("owls"));
    fresh.load().unwrap();
    assert_eq!(fresh.members.len(), 2);
    assert_eq!(fresh.members[0].get("level"), Some(&json!(3)));
    assert_eq!(fresh.members[1].unique_id(), "bob");
    assert!(!fresh.banner.is_dirty());
}

#[test]
fn dynamic_record_structure_is_frozen() {
    let store = RecordingStore::new();
    let mut guild = HashCache::new(store.clone(), guild_registry(), Guild::new("owls"));
    guild.save().unwrap();
    store.take_calls();

    let err = guild.banner.set("motto", "hoot").unwrap_err();
    assert!(matches!(err, CacheError::ImmutableStructure { .. }));
    assert!(guild.banner.remove("color").is_err());
    assert!(!guild.banner.is_dirty());

    assert_eq!(guild.banner.set("color", "red").unwrap(), json!("blue"));
    guild.save().unwrap();
    assert_eq!(
        store.take_calls(),
        vec![Call::Set {
            hash: "Guild:owls".into(),
            keys: vec!["banner:Banner".into()],
        }]
    );
}

#[test]
fn bitcode_model_round_trips_through_the_cache() {
    assert_eq!(Rank::CODEC, Codec::Bitcode);

    let store = RecordingStore::new();
    let mut guild = HashCache::new(store.clone(), guild_registry(), Guild::new("owls"));
    let rank = Rank {
        id: "elder".into(),
        weight: 10,
        perks: vec!["vault".into(), "invite".into()],
    };
    guild.ranks.insert("elder".into(), Tracked::new(rank.clone()));
    guild.save().unwrap();

    let bytes = store
        .inner()
        .get("Guild:owls", "ranks:Rank:elder")
        .unwrap()
        .unwrap();
    assert_eq!(Rank::decode(&bytes).unwrap(), rank);

    let mut fresh = HashCache::new(store.clone(), guild_registry(), Guild::new("owls"));
    fresh.load().unwrap();
    assert_eq!(fresh.ranks["elder"].get(), &rank);
}

#[derive(Debug, Default, Cache)]
struct Inventory {
    #[cache]
    equipped: BTreeMap<String, Tracked<ItemInfo>>,
    #[cache]
    stash: Vec<Tracked<ItemInfo>>,
}

#[test]
fn same_identity_in_two_fields_does_not_collide() {
    let store = RecordingStore::new();
    let mut inventory = HashCache::new(store.clone(), registry(), Inventory::default());
    let sword = ItemInfo {
        item_id: 1,
        item_count: 1,
    };
    inventory
        .equipped
        .insert("1".into(), Tracked::new(sword.clone()));
    inventory.stash.push(Tracked::new(sword));
    inventory.save().unwrap();

    assert_eq!(inventory.hash_name(), "Inventory");
    let stored = store.inner().hash_get_all("Inventory").unwrap();
    assert!(stored.contains_key("equipped:ItemInfo:1"));
    assert!(stored.contains_key("stash:ItemInfo:1"));
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, Model)]
#[model(tag = "Note")]
struct Note {
    id: String,
    text: String,
}

#[derive(Debug, Default, Cache)]
#[cache(hash = "Notebook")]
struct Notebook {
    #[cache]
    notes: Vec<Tracked<Note>>,
}

#[test]
fn identity_containing_the_separator_fails_before_any_store_call() {
    let store = RecordingStore::new();
    let mut registry = TypeRegistry::new();
    registry.register::<Note>().unwrap();
    let mut notebook = HashCache::new(store.clone(), Arc::new(registry), Notebook::default());
    notebook.notes.push(Tracked::new(Note {
        id: "2024:01".into(),
        text: "new year".into(),
    }));

    let err = notebook.save().unwrap_err();
    assert!(matches!(
        err,
        CacheError::InvalidKeySegment { ref segment, .. } if segment == "2024:01"
    ));
    assert!(store.take_calls().is_empty());
    assert!(notebook.notes[0].is_dirty());
}

#[derive(Debug, Default, Cache)]
#[cache(hash = "Broken")]
struct Broken {
    #[cache]
    level: u32,
}

#[test]
fn unsupported_field_type_fails_save_and_load() {
    let store = RecordingStore::new();
    let mut broken = HashCache::new(store.clone(), registry(), Broken::default());

    let err = broken.save().unwrap_err();
    assert!(matches!(
        err,
        CacheError::UnsupportedFieldType { ref field, type_name } if field == "level" && type_name == "u32"
    ));
    assert!(store.take_calls().is_empty());

    store.put_raw(
        "Broken",
        "level:ItemInfo",
        &serde_json::to_vec(&ItemInfo::default()).unwrap(),
    );
    let report = broken.load().unwrap();
    assert_eq!(report.failed, 1);
    assert_eq!(broken.level, 0);
}

#[test]
fn failed_write_leaves_state_for_a_retry() {
    let store = RecordingStore::new();
    let mut player = HashCache::new(store.clone(), registry(), Player::new(10001));
    player.add_item(1, 1);

    store.fail_set(true);
    let err = player.save().unwrap_err();
    assert!(err.is_store());
    assert!(player.items["1"].is_dirty());
    assert!(player.tracker("items").is_none());
    assert!(store.inner().hash_names().unwrap().is_empty());

    store.fail_set(false);
    store.take_calls();
    let report = player.save().unwrap();
    assert_eq!(report.written, 2);
    assert!(!player.items["1"].is_dirty());
}

#[test]
fn failed_delete_resends_the_same_batches() {
    let store = RecordingStore::new();
    let mut player = HashCache::new(store.clone(), registry(), Player::new(10001));
    player.add_item(1, 1);
    player.add_item(2, 1);
    player.save().unwrap();

    player.items.remove("1");
    player.items.get_mut("2").unwrap().item_count = 5;
    store.fail_delete(true);
    store.take_calls();
    assert!(matches!(
        player.save().unwrap_err(),
        CacheError::Store(rorm::StoreError::Timeout(_))
    ));
    let failed_attempt = store.take_calls();

    store.fail_delete(false);
    player.save().unwrap();
    assert_eq!(store.take_calls(), failed_attempt);
    assert_eq!(failed_attempt.len(), 2);

    assert!(player.save().unwrap().is_empty());
}

#[test]
fn export_and_import_move_a_hash_between_stores() {
    let store = RecordingStore::new();
    let mut player = HashCache::new(store.clone(), registry(), Player::new(10001));
    player.add_item(4, 2);
    player.save().unwrap();

    let json = store.inner().export_json("Player:10001").unwrap();
    let other = RecordingStore::new();
    other.inner().import_json(&json).unwrap();

    let mut fresh = HashCache::new(other, registry(), Player::new(10001));
    fresh.load().unwrap();
    assert_eq!(fresh.item_ids(), vec![4]);
}
