use std::collections::BTreeMap;

use serde_json::Value;

use crate::foundation::core::Color;

/// Part reference meaning "generate this slot procedurally".
pub const PROCEDURAL: &str = "procedural";

/// Morph weights are clamped into this range during normalisation.
pub const MORPH_RANGE: (f32, f32) = (-1.0, 1.0);

/// Per-surface colours of an avatar.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColorPalette {
    pub skin: Color,
    pub hair: Color,
    pub eyes: Color,
    pub outfit: Color,
    pub accent: Color,
}

impl Default for ColorPalette {
    fn default() -> Self {
        Self {
            skin: Color::rgb(0xff, 0xdb, 0xac),
            hair: Color::rgb(0x3b, 0x2a, 0x20),
            eyes: Color::rgb(0x4a, 0x6f, 0xa5),
            outfit: Color::rgb(0xe7, 0x54, 0x80),
            accent: Color::rgb(0xff, 0xd7, 0x00),
        }
    }
}

/// Canonical, serializable description of one avatar.
///
/// Always renderable: any JSON value converts into a profile (see [`AvatarProfile::from_value`]),
/// with every missing or invalid field replaced by its default. Profiles are treated as immutable
/// values; the `with_*` builders return modified copies.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase", from = "Value")]
pub struct AvatarProfile {
    pub id: String,
    pub head: String,
    pub torso: String,
    pub legs: String,
    pub accessory: String,
    pub color_palette: ColorPalette,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub morph_targets: BTreeMap<String, f32>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub nsfw_layers: Vec<String>,
}

impl Default for AvatarProfile {
    fn default() -> Self {
        Self {
            id: "anonymous".to_string(),
            head: PROCEDURAL.to_string(),
            torso: PROCEDURAL.to_string(),
            legs: PROCEDURAL.to_string(),
            accessory: PROCEDURAL.to_string(),
            color_palette: ColorPalette::default(),
            morph_targets: BTreeMap::new(),
            nsfw_layers: Vec::new(),
        }
    }
}

impl AvatarProfile {
    /// Normalise an arbitrary JSON value. Never fails.
    pub fn from_value(value: &Value) -> Self {
        let mut out = Self::default();
        let Some(obj) = value.as_object() else {
            return out;
        };

        let text = |key: &str| -> Option<String> {
            obj.get(key)
                .and_then(Value::as_str)
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };
        if let Some(id) = text("id") {
            out.id = id;
        }
        for (key, field) in [
            ("head", &mut out.head),
            ("torso", &mut out.torso),
            ("legs", &mut out.legs),
            ("accessory", &mut out.accessory),
        ] {
            if let Some(v) = text(key) {
                *field = v;
            }
        }

        if let Some(palette) = obj.get("colorPalette").and_then(Value::as_object) {
            let p = &mut out.color_palette;
            for (key, slot) in [
                ("skin", &mut p.skin),
                ("hair", &mut p.hair),
                ("eyes", &mut p.eyes),
                ("outfit", &mut p.outfit),
                ("accent", &mut p.accent),
            ] {
                if let Some(c) = palette
                    .get(key)
                    .and_then(Value::as_str)
                    .and_then(|s| Color::parse_hex(s).ok())
                {
                    *slot = c;
                }
            }
        }

        if let Some(morphs) = obj.get("morphTargets").and_then(Value::as_object) {
            for (name, w) in morphs {
                if let Some(w) = w.as_f64().map(|w| w as f32).filter(|w| w.is_finite()) {
                    out.morph_targets
                        .insert(name.clone(), w.clamp(MORPH_RANGE.0, MORPH_RANGE.1));
                }
            }
        }

        if let Some(layers) = obj.get("nsfwLayers").and_then(Value::as_array) {
            for layer in layers.iter().filter_map(Value::as_str) {
                let layer = layer.trim();
                if !layer.is_empty() && !out.nsfw_layers.iter().any(|l| l == layer) {
                    out.nsfw_layers.push(layer.to_string());
                }
            }
        }
        out
    }

    /// Part reference for `slot`.
    pub fn part(&self, slot: crate::registry::model::Slot) -> &str {
        use crate::registry::model::Slot;
        match slot {
            Slot::Head => &self.head,
            Slot::Torso => &self.torso,
            Slot::Legs => &self.legs,
            Slot::Accessory => &self.accessory,
        }
    }

    /// Morph weight, `0.0` when unset.
    pub fn morph(&self, name: &str) -> f32 {
        self.morph_targets.get(name).copied().unwrap_or(0.0)
    }

    pub fn with_id(&self, id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..self.clone()
        }
    }

    pub fn with_part(&self, slot: crate::registry::model::Slot, id: impl Into<String>) -> Self {
        use crate::registry::model::Slot;
        let mut out = self.clone();
        let id = id.into();
        match slot {
            Slot::Head => out.head = id,
            Slot::Torso => out.torso = id,
            Slot::Legs => out.legs = id,
            Slot::Accessory => out.accessory = id,
        }
        out
    }

    pub fn with_palette(&self, palette: ColorPalette) -> Self {
        Self {
            color_palette: palette,
            ..self.clone()
        }
    }

    /// Set a morph weight; non-finite weights remove the entry, others are clamped.
    pub fn with_morph(&self, name: impl Into<String>, weight: f32) -> Self {
        let mut out = self.clone();
        let name = name.into();
        if weight.is_finite() {
            out.morph_targets
                .insert(name, weight.clamp(MORPH_RANGE.0, MORPH_RANGE.1));
        } else {
            out.morph_targets.remove(&name);
        }
        out
    }

    pub fn with_nsfw_layers<I, S>(&self, layers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut out = self.clone();
        out.nsfw_layers.clear();
        for layer in layers {
            let layer = layer.into();
            if !out.nsfw_layers.contains(&layer) {
                out.nsfw_layers.push(layer);
            }
        }
        out
    }
}

impl From<Value> for AvatarProfile {
    fn from(value: Value) -> Self {
        Self::from_value(&value)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/profile/model.rs"]
mod tests;
