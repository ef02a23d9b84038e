use std::collections::BTreeMap;
use std::fmt;

use crate::foundation::error::{ForgeError, ForgeResult};

/// Body region an asset (or the procedural generator) fills.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize,
)]
pub enum Slot {
    Head,
    Torso,
    Legs,
    Accessory,
}

impl Slot {
    pub const ALL: [Slot; 4] = [Slot::Head, Slot::Torso, Slot::Legs, Slot::Accessory];

    /// Slots that must resolve for an asset-built body.
    pub const REQUIRED: [Slot; 3] = [Slot::Head, Slot::Torso, Slot::Legs];

    pub fn as_str(self) -> &'static str {
        match self {
            Slot::Head => "Head",
            Slot::Torso => "Torso",
            Slot::Legs => "Legs",
            Slot::Accessory => "Accessory",
        }
    }

    /// Reserved fallback id meaning "use the procedural generator for this slot".
    pub fn sentinel_id(self) -> &'static str {
        match self {
            Slot::Head => "procedural_head",
            Slot::Torso => "procedural_torso",
            Slot::Legs => "procedural_legs",
            Slot::Accessory => "procedural_accessory",
        }
    }

    pub fn parse(s: &str) -> Option<Slot> {
        Slot::ALL.into_iter().find(|slot| slot.as_str() == s)
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where an asset is served from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetHost {
    Local,
    Cdn,
}

/// How much of the body an asset covers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Coverage {
    Standard,
    Minimal,
    Full,
}

/// One catalogue entry.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct AssetMeta {
    pub id: String,
    pub slot: Slot,
    pub nsfw: bool,
    /// Location relative to the assets root, or an absolute `http(s)` URL.
    pub url: String,
    pub host: AssetHost,
    /// Lowercase hex SHA-256 of the asset file.
    pub hash: String,
    pub coverage: Coverage,
}

/// On-disk shape of the registry file.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct RegistryDocument {
    pub version: u32,
    pub assets: BTreeMap<String, AssetMeta>,
    pub fallbacks: BTreeMap<String, String>,
}

/// Versioned catalogue of avatar part assets.
///
/// Invariant: [`Registry::get_fallback`] yields, for every slot, either the id of a non-NSFW asset
/// of that slot or the slot's [`Slot::sentinel_id`]. Constructors enforce this.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Registry {
    version: u32,
    assets: BTreeMap<String, AssetMeta>,
    fallbacks: BTreeMap<Slot, String>,
}

impl Registry {
    /// Minimal registry used whenever a real one is unavailable: no assets, all sentinels.
    pub fn builtin() -> Self {
        Self {
            version: 0,
            assets: BTreeMap::new(),
            fallbacks: Slot::ALL
                .into_iter()
                .map(|s| (s, s.sentinel_id().to_string()))
                .collect(),
        }
    }

    /// Build a registry from parts, repairing any fallback that breaks the slot invariant.
    ///
    /// Returns the registry and one message per repair.
    pub fn from_parts(
        version: u32,
        assets: BTreeMap<String, AssetMeta>,
        fallbacks: BTreeMap<Slot, String>,
    ) -> (Self, Vec<String>) {
        let mut repairs = Vec::new();
        let mut assets = assets;
        for (key, meta) in assets.iter_mut() {
            if meta.id != *key {
                repairs.push(format!(
                    "asset entry '{key}' declared id '{}'; using the map key",
                    meta.id
                ));
                meta.id = key.clone();
            }
        }

        let mut fixed = BTreeMap::new();
        for slot in Slot::ALL {
            let chosen = match fallbacks.get(&slot) {
                Some(id) if id == slot.sentinel_id() => id.clone(),
                Some(id) => match assets.get(id) {
                    Some(meta) if meta.slot == slot && !meta.nsfw => id.clone(),
                    Some(meta) if meta.nsfw => {
                        repairs.push(format!("fallback for {slot} ('{id}') is NSFW-flagged"));
                        slot.sentinel_id().to_string()
                    }
                    Some(_) => {
                        repairs.push(format!("fallback for {slot} ('{id}') belongs to another slot"));
                        slot.sentinel_id().to_string()
                    }
                    None => {
                        repairs.push(format!("fallback for {slot} ('{id}') is not in the registry"));
                        slot.sentinel_id().to_string()
                    }
                },
                None => {
                    repairs.push(format!("no fallback declared for {slot}"));
                    slot.sentinel_id().to_string()
                }
            };
            fixed.insert(slot, chosen);
        }

        (
            Self {
                version,
                assets,
                fallbacks: fixed,
            },
            repairs,
        )
    }

    /// Convert a parsed document, rejecting unknown slot names in `fallbacks`.
    pub fn from_document(doc: RegistryDocument) -> ForgeResult<(Self, Vec<String>)> {
        let mut fallbacks = BTreeMap::new();
        for (name, id) in doc.fallbacks {
            let slot = Slot::parse(&name).ok_or_else(|| {
                ForgeError::registry(format!("unknown slot '{name}' in fallbacks"))
            })?;
            fallbacks.insert(slot, id);
        }
        Ok(Self::from_parts(doc.version, doc.assets, fallbacks))
    }

    pub fn to_document(&self) -> RegistryDocument {
        RegistryDocument {
            version: self.version,
            assets: self.assets.clone(),
            fallbacks: self
                .fallbacks
                .iter()
                .map(|(s, id)| (s.as_str().to_string(), id.clone()))
                .collect(),
        }
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    pub fn assets(&self) -> impl Iterator<Item = &AssetMeta> {
        self.assets.values()
    }

    pub fn len(&self) -> usize {
        self.assets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }

    /// Pure lookup; unknown ids yield `None`.
    pub fn get_asset(&self, id: &str) -> Option<&AssetMeta> {
        self.assets.get(id)
    }

    /// Fallback id for `slot`. Always `Some` for registries built by this crate.
    pub fn get_fallback(&self, slot: Slot) -> Option<&str> {
        self.fallbacks.get(&slot).map(String::as_str)
    }

    /// `true` when every slot satisfies the fallback invariant.
    pub fn fallbacks_valid(&self) -> bool {
        Slot::ALL.into_iter().all(|slot| match self.get_fallback(slot) {
            Some(id) if id == slot.sentinel_id() => true,
            Some(id) => self
                .get_asset(id)
                .is_some_and(|m| m.slot == slot && !m.nsfw),
            None => false,
        })
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::builtin()
    }
}

/// `true` for the four reserved procedural fallback ids.
pub fn is_sentinel(id: &str) -> bool {
    Slot::ALL.into_iter().any(|s| s.sentinel_id() == id)
}

#[cfg(test)]
#[path = "../../tests/unit/registry/model.rs"]
mod tests;
