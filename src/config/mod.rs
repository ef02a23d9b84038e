//! Runtime configuration: a JSON file plus `AVATAR_FORGE_*` environment overrides.

pub mod flags;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::consumer::{GameCatalog, SurfaceKind};
use crate::foundation::error::{ForgeError, ForgeResult};
use crate::registry::loader::{FileRegistrySource, RegistrySource, UnavailableRegistrySource};
use crate::sprite::flatten::FlattenOptions;
use crate::sprite::runner::TaskRunnerKind;
use crate::storage::{DirStore, KeyValueStore, MemoryStore};

pub use flags::{FeatureFlags, FlagConfig};

/// Path of the config file read by [`ForgeConfig::from_env`].
pub const CONFIG_PATH_ENV: &str = "AVATAR_FORGE_CONFIG";
/// Registry location override: `builtin`, a file path, or an `http(s)` URL.
pub const REGISTRY_ENV: &str = "AVATAR_FORGE_REGISTRY";
pub const ASSETS_ROOT_ENV: &str = "AVATAR_FORGE_ASSETS_ROOT";
pub const CACHE_DIR_ENV: &str = "AVATAR_FORGE_CACHE_DIR";

/// Where the asset registry document lives.
#[derive(Clone, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum RegistryLocation {
    /// No document; the built-in all-procedural registry.
    #[default]
    Builtin,
    File {
        path: PathBuf,
    },
    Http {
        url: String,
    },
}

impl RegistryLocation {
    /// Interpret a bare string the way the environment override does.
    pub fn parse(raw: &str) -> RegistryLocation {
        let raw = raw.trim();
        if raw.is_empty() || raw.eq_ignore_ascii_case("builtin") {
            RegistryLocation::Builtin
        } else if raw.starts_with("http://") || raw.starts_with("https://") {
            RegistryLocation::Http {
                url: raw.to_string(),
            }
        } else {
            RegistryLocation::File {
                path: PathBuf::from(raw),
            }
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SpriteConfig {
    pub runner: TaskRunnerKind,
    /// Options used when a request does not carry its own.
    pub defaults: FlattenOptions,
}

#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ForgeConfig {
    pub registry: RegistryLocation,
    /// Root that relative asset URLs resolve against.
    pub assets_root: PathBuf,
    /// Directory for the sprite atlas cache; in-memory when unset.
    pub cache_dir: Option<PathBuf>,
    pub flags: FlagConfig,
    pub sprites: SpriteConfig,
    pub games: BTreeMap<String, SurfaceKind>,
}

impl Default for ForgeConfig {
    fn default() -> Self {
        Self {
            registry: RegistryLocation::Builtin,
            assets_root: PathBuf::from("assets"),
            cache_dir: None,
            flags: FlagConfig::default(),
            sprites: SpriteConfig::default(),
            games: BTreeMap::new(),
        }
    }
}

impl ForgeConfig {
    pub fn from_json(bytes: &[u8]) -> ForgeResult<Self> {
        serde_json::from_slice(bytes)
            .map_err(|e| ForgeError::validation(format!("invalid config: {e}")))
    }

    /// Read a config file. Relative paths inside it resolve against the file's directory.
    pub fn load(path: &Path) -> ForgeResult<Self> {
        let bytes = std::fs::read(path).map_err(|e| {
            ForgeError::validation(format!("failed to read config '{}': {e}", path.display()))
        })?;
        let mut cfg = Self::from_json(&bytes)?;
        if let Some(base) = path.parent() {
            cfg.resolve_relative_to(base);
        }
        Ok(cfg)
    }

    /// Config file named by `AVATAR_FORGE_CONFIG` (or defaults), then environment overrides.
    pub fn from_env() -> ForgeResult<Self> {
        let cfg = match std::env::var_os(CONFIG_PATH_ENV) {
            Some(path) => Self::load(Path::new(&path))?,
            None => Self::default(),
        };
        Ok(cfg.with_env_overrides())
    }

    pub fn with_env_overrides(self) -> Self {
        self.with_overrides(|name| std::env::var(name).ok())
    }

    pub fn with_overrides<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(raw) = lookup(REGISTRY_ENV) {
            self.registry = RegistryLocation::parse(&raw);
        }
        if let Some(raw) = lookup(ASSETS_ROOT_ENV).filter(|s| !s.trim().is_empty()) {
            self.assets_root = PathBuf::from(raw.trim());
        }
        if let Some(raw) = lookup(CACHE_DIR_ENV) {
            let raw = raw.trim();
            self.cache_dir = (!raw.is_empty()).then(|| PathBuf::from(raw));
        }
        self.flags = self.flags.with_overrides(&lookup);
        self
    }

    fn resolve_relative_to(&mut self, base: &Path) {
        if let RegistryLocation::File { path } = &mut self.registry
            && path.is_relative()
        {
            *path = base.join(&*path);
        }
        if self.assets_root.is_relative() {
            self.assets_root = base.join(&self.assets_root);
        }
        if let Some(dir) = &mut self.cache_dir
            && dir.is_relative()
        {
            *dir = base.join(&*dir);
        }
    }

    /// Registry source for the configured location. Never fails: an unusable location yields a
    /// source whose load falls back to the built-in registry.
    pub fn registry_source(&self) -> Arc<dyn RegistrySource> {
        match &self.registry {
            RegistryLocation::Builtin => {
                Arc::new(UnavailableRegistrySource::new("no registry configured"))
            }
            RegistryLocation::File { path } => Arc::new(FileRegistrySource::new(path.clone())),
            RegistryLocation::Http { url } => http_source(url),
        }
    }

    pub fn feature_flags(&self) -> FeatureFlags {
        FeatureFlags::from_config(&self.flags)
    }

    /// Backing store for the sprite atlas cache.
    pub fn atlas_store(&self) -> Arc<dyn KeyValueStore> {
        match &self.cache_dir {
            Some(dir) => Arc::new(DirStore::new(dir.clone())),
            None => Arc::new(MemoryStore::new()),
        }
    }

    pub fn game_catalog(&self) -> GameCatalog {
        GameCatalog::from_entries(self.games.clone())
    }
}

#[cfg(feature = "http")]
fn http_source(url: &str) -> Arc<dyn RegistrySource> {
    match crate::registry::loader::HttpRegistrySource::new(url) {
        Ok(src) => Arc::new(src),
        Err(e) => Arc::new(UnavailableRegistrySource::new(e.to_string())),
    }
}

#[cfg(not(feature = "http"))]
fn http_source(url: &str) -> Arc<dyn RegistrySource> {
    tracing::warn!(url, "http registry configured but the `http` feature is disabled");
    Arc::new(UnavailableRegistrySource::new(format!(
        "{url}: built without the `http` feature"
    )))
}

#[cfg(test)]
#[path = "../../tests/unit/config/mod.rs"]
mod tests;
