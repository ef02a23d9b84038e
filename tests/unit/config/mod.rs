use super::*;
use crate::representation::RepresentationMode;

fn temp_dir(name: &str) -> std::path::PathBuf {
    std::env::temp_dir().join(format!(
        "avatar_forge_{name}_{}_{}",
        std::process::id(),
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_nanos()
    ))
}

#[test]
fn registry_location_parsing() {
    assert_eq!(RegistryLocation::parse(" builtin "), RegistryLocation::Builtin);
    assert_eq!(RegistryLocation::parse(""), RegistryLocation::Builtin);
    assert_eq!(
        RegistryLocation::parse("https://cdn.example/registry.json"),
        RegistryLocation::Http {
            url: "https://cdn.example/registry.json".to_string()
        }
    );
    assert_eq!(
        RegistryLocation::parse("data/registry.json"),
        RegistryLocation::File {
            path: PathBuf::from("data/registry.json")
        }
    );
}

#[test]
fn json_config_with_games_and_defaults() {
    let cfg = ForgeConfig::from_json(
        br#"{
            "registry": {"kind": "file", "path": "/srv/registry.json"},
            "flags": {"nsfwAvatarsEnabled": true},
            "sprites": {"runner": "sync"},
            "games": {
                "dungeon": {"rendered": "chibi"},
                "platformer": {"sprites": {"frameCount": 4, "directions": ["right"]}}
            }
        }"#,
    )
    .unwrap();
    assert_eq!(cfg.assets_root, PathBuf::from("assets"));
    assert!(cfg.flags.avatars_enabled);
    assert!(cfg.feature_flags().nsfw_enabled());
    assert_eq!(cfg.sprites.runner, TaskRunnerKind::Sync);
    assert_eq!(cfg.sprites.defaults, FlattenOptions::default());

    let catalog = cfg.game_catalog();
    assert_eq!(
        catalog.surface_for("dungeon"),
        SurfaceKind::Rendered(RepresentationMode::Chibi)
    );
    match catalog.surface_for("platformer") {
        SurfaceKind::Sprites(o) => {
            assert_eq!(o.frame_count, 4);
            assert_eq!(o.resolution, 128);
        }
        other => panic!("unexpected surface {other:?}"),
    }
    assert!(cfg.registry_source().describe().starts_with("file:"));
}

#[test]
fn invalid_json_is_a_validation_error() {
    assert!(matches!(
        ForgeConfig::from_json(b"{\"registry\": 3}"),
        Err(ForgeError::Validation(_))
    ));
}

#[test]
fn overrides_replace_locations_and_flags() {
    let cfg = ForgeConfig::default().with_overrides(|name| match name {
        REGISTRY_ENV => Some("https://cdn.example/r.json".to_string()),
        ASSETS_ROOT_ENV => Some("/opt/parts".to_string()),
        CACHE_DIR_ENV => Some("  ".to_string()),
        flags::AVATARS_ENABLED_ENV => Some("false".to_string()),
        _ => None,
    });
    assert!(matches!(cfg.registry, RegistryLocation::Http { .. }));
    assert_eq!(cfg.assets_root, PathBuf::from("/opt/parts"));
    assert_eq!(cfg.cache_dir, None);
    assert!(!cfg.flags.avatars_enabled);
}

#[test]
fn builtin_location_loads_builtin_registry() {
    let loader = crate::registry::loader::RegistryLoader::new(ForgeConfig::default().registry_source());
    let reg = loader.load();
    assert_eq!(reg.len(), 0);
    assert!(reg.fallbacks_valid());
}

#[test]
fn load_resolves_relative_paths_against_the_file() {
    let dir = temp_dir("config_load");
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join("forge.json");
    std::fs::write(
        &path,
        br#"{"registry": {"kind": "file", "path": "registry.json"}, "assetsRoot": "parts", "cacheDir": "cache"}"#,
    )
    .unwrap();

    let cfg = ForgeConfig::load(&path).unwrap();
    assert_eq!(
        cfg.registry,
        RegistryLocation::File {
            path: dir.join("registry.json")
        }
    );
    assert_eq!(cfg.assets_root, dir.join("parts"));
    assert_eq!(cfg.cache_dir, Some(dir.join("cache")));

    assert!(ForgeConfig::load(&dir.join("missing.json")).is_err());
    let _ = std::fs::remove_dir_all(&dir);
}
