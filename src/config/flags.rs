use std::sync::atomic::{AtomicBool, Ordering};

/// Environment variable overriding the avatars flag.
pub const AVATARS_ENABLED_ENV: &str = "AVATAR_FORGE_AVATARS_ENABLED";
/// Environment variable overriding the NSFW avatars flag.
pub const NSFW_ENABLED_ENV: &str = "AVATAR_FORGE_NSFW_ENABLED";

/// Serializable flag defaults as they appear in [`crate::ForgeConfig`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FlagConfig {
    pub avatars_enabled: bool,
    pub nsfw_avatars_enabled: bool,
}

impl Default for FlagConfig {
    fn default() -> Self {
        Self {
            avatars_enabled: true,
            nsfw_avatars_enabled: false,
        }
    }
}

impl FlagConfig {
    /// Apply `AVATAR_FORGE_*` environment overrides. Unparsable values are ignored.
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides(|name| std::env::var(name).ok())
    }

    /// Apply overrides from an arbitrary variable lookup.
    pub fn with_overrides<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup_bool(&lookup, AVATARS_ENABLED_ENV) {
            self.avatars_enabled = v;
        }
        if let Some(v) = lookup_bool(&lookup, NSFW_ENABLED_ENV) {
            self.nsfw_avatars_enabled = v;
        }
        self
    }
}

/// Resolved feature flags shared by the pipeline.
///
/// Resolved once and injected into consumers. Reads are cheap so gated code re-checks the flag at
/// the point of access instead of trusting an earlier gate; runtime configuration may flip a flag
/// through the setters.
#[derive(Debug)]
pub struct FeatureFlags {
    avatars: AtomicBool,
    nsfw: AtomicBool,
}

impl Default for FeatureFlags {
    fn default() -> Self {
        Self::from_config(&FlagConfig::default())
    }
}

impl FeatureFlags {
    pub fn new(avatars_enabled: bool, nsfw_enabled: bool) -> Self {
        Self {
            avatars: AtomicBool::new(avatars_enabled),
            nsfw: AtomicBool::new(nsfw_enabled),
        }
    }

    pub fn from_config(cfg: &FlagConfig) -> Self {
        Self::new(cfg.avatars_enabled, cfg.nsfw_avatars_enabled)
    }

    /// Defaults plus environment overrides.
    pub fn from_env() -> Self {
        Self::from_config(&FlagConfig::default().with_env_overrides())
    }

    pub fn avatars_enabled(&self) -> bool {
        self.avatars.load(Ordering::Acquire)
    }

    pub fn nsfw_enabled(&self) -> bool {
        self.nsfw.load(Ordering::Acquire)
    }

    pub fn set_avatars_enabled(&self, enabled: bool) {
        self.avatars.store(enabled, Ordering::Release);
    }

    pub fn set_nsfw_enabled(&self, enabled: bool) {
        self.nsfw.store(enabled, Ordering::Release);
    }
}

pub(crate) fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn lookup_bool<F>(lookup: &F, name: &str) -> Option<bool>
where
    F: Fn(&str) -> Option<String>,
{
    let raw = lookup(name)?;
    let parsed = parse_bool(&raw);
    if parsed.is_none() {
        tracing::warn!(var = name, value = %raw, "ignoring unparsable boolean flag");
    }
    parsed
}

#[cfg(test)]
#[path = "../../tests/unit/config/flags.rs"]
mod tests;
