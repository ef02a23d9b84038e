use super::*;

fn key_of(parts: &[&str]) -> ContentKey {
    let mut h = StableHasher::new();
    for p in parts {
        h.write_str(p);
    }
    h.finish()
}

#[test]
fn same_input_same_key() {
    assert_eq!(key_of(&["profile", "idle"]), key_of(&["profile", "idle"]));
}

#[test]
fn length_prefix_separates_boundaries() {
    assert_ne!(key_of(&["ab", "c"]), key_of(&["a", "bc"]));
}

#[test]
fn hex_is_32_lowercase_digits() {
    let hex = key_of(&["x"]).to_hex();
    assert_eq!(hex.len(), 32);
    assert!(hex.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
}

#[test]
fn hex_parses_back() {
    let k = key_of(&["atlas"]);
    assert_eq!(ContentKey::from_hex(&k.to_hex()), Some(k));
    assert_eq!(ContentKey::from_hex("abc"), None);
    assert_eq!(ContentKey::from_hex(&"g".repeat(32)), None);
}
