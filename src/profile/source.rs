//! Profile sources: the account-bound creator payload and the guest profile in client storage.

use crate::foundation::core::Color;
use crate::foundation::error::{ForgeError, ForgeResult};
use crate::foundation::math::Rng64;
use crate::profile::model::{AvatarProfile, ColorPalette, PROCEDURAL};
use crate::registry::model::{Registry, Slot, is_sentinel};
use crate::storage::KeyValueStore;

/// Storage key of the persisted guest profile.
pub const GUEST_PROFILE_KEY: &str = "avatar.guest_profile";

const SKIN_PRESETS: [Color; 6] = [
    Color::rgb(0xff, 0xdb, 0xac),
    Color::rgb(0xf1, 0xc2, 0x7d),
    Color::rgb(0xe0, 0xac, 0x69),
    Color::rgb(0xc6, 0x86, 0x42),
    Color::rgb(0x8d, 0x55, 0x24),
    Color::rgb(0xff, 0xe0, 0xc4),
];

const HAIR_PRESETS: [Color; 8] = [
    Color::rgb(0x3b, 0x2a, 0x20),
    Color::rgb(0x0f, 0x0f, 0x14),
    Color::rgb(0xf5, 0xd0, 0x6f),
    Color::rgb(0xd9, 0x4f, 0x70),
    Color::rgb(0x5b, 0x8d, 0xef),
    Color::rgb(0xc0, 0xc0, 0xd0),
    Color::rgb(0xb3, 0x3b, 0x24),
    Color::rgb(0x7e, 0x57, 0xc2),
];

const EYE_PRESETS: [Color; 5] = [
    Color::rgb(0x4a, 0x6f, 0xa5),
    Color::rgb(0x3e, 0x8e, 0x41),
    Color::rgb(0x8b, 0x45, 0x13),
    Color::rgb(0xc2, 0x18, 0x5b),
    Color::rgb(0xff, 0xb3, 0x00),
];

const OUTFIT_PRESETS: [Color; 6] = [
    Color::rgb(0xe7, 0x54, 0x80),
    Color::rgb(0x2e, 0x4a, 0x8c),
    Color::rgb(0xf4, 0xf4, 0xf8),
    Color::rgb(0x26, 0x26, 0x2e),
    Color::rgb(0x4c, 0xaf, 0x50),
    Color::rgb(0xff, 0x98, 0x00),
];

const ACCENT_PRESETS: [Color; 4] = [
    Color::rgb(0xff, 0xd7, 0x00),
    Color::rgb(0xff, 0xff, 0xff),
    Color::rgb(0xe5, 0x39, 0x35),
    Color::rgb(0x00, 0xbc, 0xd4),
];

/// Normalise a creator endpoint payload.
///
/// The profile is accepted either at the top level or nested under `"avatar"`. Only malformed
/// JSON or a non-object payload is rejected; everything else normalises.
pub fn profile_from_creator_payload(bytes: &[u8]) -> ForgeResult<AvatarProfile> {
    let value: serde_json::Value = serde_json::from_slice(bytes)
        .map_err(|e| ForgeError::validation(format!("creator payload is not valid JSON: {e}")))?;
    let obj = value
        .as_object()
        .ok_or_else(|| ForgeError::validation("creator payload must be a JSON object"))?;
    match obj.get("avatar") {
        Some(nested) if nested.is_object() => Ok(AvatarProfile::from_value(nested)),
        _ => Ok(AvatarProfile::from_value(&value)),
    }
}

/// Deterministic guest profile for `seed`.
///
/// Palette entries come from fixed presets; parts follow the registry's fallbacks, with sentinel
/// fallbacks mapped to [`PROCEDURAL`].
pub fn guest_default(seed: u64, registry: &Registry) -> AvatarProfile {
    let mut rng = Rng64::new(seed);
    let palette = ColorPalette {
        skin: SKIN_PRESETS[rng.pick(SKIN_PRESETS.len())],
        hair: HAIR_PRESETS[rng.pick(HAIR_PRESETS.len())],
        eyes: EYE_PRESETS[rng.pick(EYE_PRESETS.len())],
        outfit: OUTFIT_PRESETS[rng.pick(OUTFIT_PRESETS.len())],
        accent: ACCENT_PRESETS[rng.pick(ACCENT_PRESETS.len())],
    };

    let mut profile = AvatarProfile::default()
        .with_id(format!("guest-{seed:016x}"))
        .with_palette(palette);
    for slot in Slot::ALL {
        let part = match registry.get_fallback(slot) {
            Some(id) if !is_sentinel(id) => id,
            _ => PROCEDURAL,
        };
        profile = profile.with_part(slot, part);
    }
    profile
}

/// Load the guest profile from `store`, generating and persisting a default when absent.
///
/// Storage failures and corrupt entries are logged and answered with a fresh default; this never
/// fails because a guest must always get an avatar.
#[tracing::instrument(skip(store, registry))]
pub fn load_guest_profile(
    store: &dyn KeyValueStore,
    session_seed: u64,
    registry: &Registry,
) -> AvatarProfile {
    match store.get(GUEST_PROFILE_KEY) {
        Ok(Some(bytes)) => match serde_json::from_slice::<serde_json::Value>(&bytes) {
            Ok(value) if value.is_object() => return AvatarProfile::from_value(&value),
            Ok(_) | Err(_) => {
                tracing::warn!("stored guest profile is corrupt; regenerating");
            }
        },
        Ok(None) => {}
        Err(e) => {
            tracing::warn!(error = %e, "guest profile read failed; regenerating");
        }
    }

    let profile = guest_default(session_seed, registry);
    if let Err(e) = save_guest_profile(store, &profile) {
        tracing::warn!(error = %e, "failed to persist guest profile");
    }
    profile
}

/// Persist `profile` under [`GUEST_PROFILE_KEY`].
pub fn save_guest_profile(store: &dyn KeyValueStore, profile: &AvatarProfile) -> ForgeResult<()> {
    let bytes = serde_json::to_vec(profile)?;
    store.put(GUEST_PROFILE_KEY, &bytes)
}

#[cfg(test)]
#[path = "../../tests/unit/profile/source.rs"]
mod tests;
