use serde_json::json;

use super::*;
use crate::registry::model::Slot;

#[test]
fn empty_and_non_object_values_normalise_to_defaults() {
    assert_eq!(AvatarProfile::from_value(&json!({})), AvatarProfile::default());
    assert_eq!(AvatarProfile::from_value(&json!(null)), AvatarProfile::default());
    assert_eq!(AvatarProfile::from_value(&json!([1, 2])), AvatarProfile::default());
}

#[test]
fn missing_parts_become_procedural() {
    let p = AvatarProfile::from_value(&json!({"id": "u1", "head": "head_cat", "torso": ""}));
    assert_eq!(p.id, "u1");
    assert_eq!(p.part(Slot::Head), "head_cat");
    assert_eq!(p.part(Slot::Torso), PROCEDURAL);
    assert_eq!(p.part(Slot::Legs), PROCEDURAL);
    assert_eq!(p.part(Slot::Accessory), PROCEDURAL);
}

#[test]
fn bad_colors_fall_back_per_entry() {
    let p = AvatarProfile::from_value(&json!({
        "colorPalette": {"skin": "#ffdbac", "hair": "not-a-color", "eyes": 12, "outfit": "#abc"}
    }));
    let d = ColorPalette::default();
    assert_eq!(p.color_palette.skin, Color::rgb(0xff, 0xdb, 0xac));
    assert_eq!(p.color_palette.hair, d.hair);
    assert_eq!(p.color_palette.eyes, d.eyes);
    assert_eq!(p.color_palette.outfit, Color::rgb(0xaa, 0xbb, 0xcc));
    assert_eq!(p.color_palette.accent, d.accent);
}

#[test]
fn morph_weights_are_clamped_and_non_numbers_dropped() {
    let p = AvatarProfile::from_value(&json!({
        "morphTargets": {"height": 3.5, "build": -0.25, "headSize": "big"}
    }));
    assert_eq!(p.morph("height"), 1.0);
    assert_eq!(p.morph("build"), -0.25);
    assert!(!p.morph_targets.contains_key("headSize"));
    assert_eq!(p.morph("unknown"), 0.0);
}

#[test]
fn nsfw_layers_are_deduplicated() {
    let p = AvatarProfile::from_value(&json!({"nsfwLayers": ["a", "b", "a", "", 4]}));
    assert_eq!(p.nsfw_layers, vec!["a".to_string(), "b".to_string()]);
}

#[test]
fn deserialize_goes_through_normalisation() {
    let p: AvatarProfile =
        serde_json::from_str(r#"{"id":"x","colorPalette":{"skin":"oops"},"legs":7}"#).unwrap();
    assert_eq!(p.color_palette.skin, ColorPalette::default().skin);
    assert_eq!(p.legs, PROCEDURAL);
}

#[test]
fn serialization_is_camel_case_and_stable() {
    let p = AvatarProfile::default()
        .with_id("abc")
        .with_morph("height", 0.5)
        .with_nsfw_layers(["layer_a"]);
    let v = serde_json::to_value(&p).unwrap();
    assert_eq!(v["colorPalette"]["skin"], "#ffdbac");
    assert_eq!(v["morphTargets"]["height"], 0.5);
    assert_eq!(v["nsfwLayers"][0], "layer_a");

    let back: AvatarProfile = serde_json::from_value(v).unwrap();
    assert_eq!(back, p);
}

#[test]
fn builders_copy_instead_of_mutating() {
    let base = AvatarProfile::default();
    let changed = base.with_part(Slot::Head, "head_x").with_morph("build", f32::NAN);
    assert_eq!(base.head, PROCEDURAL);
    assert_eq!(changed.head, "head_x");
    assert!(changed.morph_targets.is_empty());
}
