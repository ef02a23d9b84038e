use std::sync::atomic::{AtomicUsize, Ordering};

use super::*;
use crate::registry::model::Slot;

struct CountingSource {
    result: Result<Vec<u8>, String>,
    calls: AtomicUsize,
}

impl CountingSource {
    fn ok(bytes: &str) -> Self {
        Self {
            result: Ok(bytes.as_bytes().to_vec()),
            calls: AtomicUsize::new(0),
        }
    }

    fn err(msg: &str) -> Self {
        Self {
            result: Err(msg.to_string()),
            calls: AtomicUsize::new(0),
        }
    }
}

impl RegistrySource for CountingSource {
    fn describe(&self) -> String {
        "counting".to_string()
    }

    fn fetch(&self) -> ForgeResult<Vec<u8>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.result.clone().map_err(ForgeError::registry)
    }
}

const VALID: &str = r#"{
  "version": 4,
  "assets": {
    "head_default": {"id": "head_default", "slot": "Head", "nsfw": false, "url": "parts/head.json",
                     "host": "local", "hash": "ab", "coverage": "standard"}
  },
  "fallbacks": {"Head": "head_default", "Torso": "procedural_torso",
                "Legs": "procedural_legs", "Accessory": "procedural_accessory"}
}"#;

#[test]
fn valid_document_parses_without_repairs() {
    let (reg, repairs) = parse_registry(VALID.as_bytes()).unwrap();
    assert_eq!(reg.version(), 4);
    assert_eq!(reg.get_fallback(Slot::Head), Some("head_default"));
    assert!(repairs.is_empty());
}

#[test]
fn structural_failures_are_errors() {
    assert!(parse_registry(b"not json").is_err());
    assert!(parse_registry(b"[]").is_err());
    assert!(parse_registry(br#"{"version": 1, "assets": {}}"#).is_err());
    assert!(parse_registry(br#"{"assets": {}, "fallbacks": {}}"#).is_err());
    assert!(parse_registry(br#"{"version": "x", "assets": {}, "fallbacks": {}}"#).is_err());
}

#[test]
fn load_never_fails_and_degrades_to_builtin() {
    for src in [
        CountingSource::err("404 Not Found"),
        CountingSource::err("connection reset"),
        CountingSource::ok("{\"version\": 1"),
        CountingSource::ok("{\"version\": 1, \"assets\": {}}"),
    ] {
        let loader = RegistryLoader::new(Arc::new(src));
        let reg = loader.load();
        assert_eq!(*reg, Registry::builtin());
        assert!(reg.fallbacks_valid());
    }
}

#[test]
fn load_is_memoized_until_cleared() {
    let src = Arc::new(CountingSource::ok(VALID));
    let loader = RegistryLoader::new(src.clone());
    let a = loader.load();
    let b = loader.load();
    assert!(Arc::ptr_eq(&a, &b));
    assert_eq!(src.calls.load(Ordering::SeqCst), 1);

    loader.clear();
    assert!(!loader.is_cached());
    let c = loader.load();
    assert_eq!(src.calls.load(Ordering::SeqCst), 2);
    assert_eq!(*a, *c);
}

#[test]
fn concurrent_first_loads_share_one_fetch() {
    let src = Arc::new(CountingSource::ok(VALID));
    let loader = Arc::new(RegistryLoader::new(src.clone()));
    let handles: Vec<_> = (0..8)
        .map(|_| {
            let l = Arc::clone(&loader);
            std::thread::spawn(move || l.load())
        })
        .collect();
    let regs: Vec<Arc<Registry>> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    assert_eq!(src.calls.load(Ordering::SeqCst), 1);
    assert!(regs.windows(2).all(|w| Arc::ptr_eq(&w[0], &w[1])));
}

#[test]
fn file_source_missing_file_degrades() {
    let loader = RegistryLoader::new(Arc::new(FileRegistrySource::new(
        "/definitely/not/here/registry.json",
    )));
    assert_eq!(*loader.load(), Registry::builtin());
}

#[test]
fn builtin_loader_yields_builtin() {
    assert_eq!(*RegistryLoader::builtin().registry(), Registry::builtin());
}
