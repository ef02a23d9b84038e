use std::collections::BTreeMap;

use super::*;
use crate::registry::model::{AssetHost, AssetMeta, Coverage};
use crate::storage::MemoryStore;

fn registry_with_head() -> Registry {
    let mut assets = BTreeMap::new();
    assets.insert(
        "head_default".to_string(),
        AssetMeta {
            id: "head_default".to_string(),
            slot: Slot::Head,
            nsfw: false,
            url: "head/head_default.json".to_string(),
            host: AssetHost::Local,
            hash: String::new(),
            coverage: Coverage::Standard,
        },
    );
    let mut fallbacks = BTreeMap::new();
    fallbacks.insert(Slot::Head, "head_default".to_string());
    Registry::from_parts(1, assets, fallbacks).0
}

#[test]
fn creator_payload_accepts_top_level_and_nested() {
    let top = profile_from_creator_payload(br#"{"id":"c1","head":"head_a"}"#).unwrap();
    assert_eq!(top.id, "c1");
    assert_eq!(top.head, "head_a");

    let nested =
        profile_from_creator_payload(br#"{"user":"u","avatar":{"id":"c2","torso":"t"}}"#).unwrap();
    assert_eq!(nested.id, "c2");
    assert_eq!(nested.torso, "t");
}

#[test]
fn creator_payload_rejects_garbage() {
    assert!(matches!(
        profile_from_creator_payload(b"{nope"),
        Err(ForgeError::Validation(_))
    ));
    assert!(profile_from_creator_payload(b"\"string\"").is_err());
}

#[test]
fn guest_default_is_deterministic_and_uses_fallbacks() {
    let reg = registry_with_head();
    let a = guest_default(42, &reg);
    let b = guest_default(42, &reg);
    assert_eq!(a, b);
    assert_eq!(a.head, "head_default");
    assert_eq!(a.torso, PROCEDURAL);
    assert_eq!(a.id, "guest-000000000000002a");

    let others: Vec<ColorPalette> = (0..16)
        .map(|s| guest_default(s, &reg).color_palette)
        .collect();
    assert!(others.iter().any(|p| *p != others[0]));
}

#[test]
fn guest_profile_is_generated_once_and_persisted() {
    let store = MemoryStore::new();
    let reg = Registry::builtin();
    let first = load_guest_profile(&store, 7, &reg);
    assert!(store.get(GUEST_PROFILE_KEY).unwrap().is_some());

    let second = load_guest_profile(&store, 999, &reg);
    assert_eq!(first, second);
}

#[test]
fn corrupt_guest_entry_is_replaced() {
    let store = MemoryStore::new();
    store.put(GUEST_PROFILE_KEY, b"\xff\x00garbage").unwrap();
    let reg = Registry::builtin();
    let p = load_guest_profile(&store, 3, &reg);
    assert_eq!(p, guest_default(3, &reg));

    let stored = store.get(GUEST_PROFILE_KEY).unwrap().unwrap();
    let reparsed: AvatarProfile = serde_json::from_slice(&stored).unwrap();
    assert_eq!(reparsed, p);
}
