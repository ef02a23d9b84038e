//! Offline registry construction from a content tree.

use std::collections::BTreeMap;
use std::path::Path;

use sha2::Digest as _;

use crate::foundation::error::{ForgeError, ForgeResult};
use crate::registry::model::{AssetHost, AssetMeta, Coverage, Registry, Slot};

/// One part file found while scanning a content tree.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScannedAsset {
    /// Asset id (file stem).
    pub id: String,
    /// Path relative to the scanned root, `/`-separated.
    pub rel_path: String,
    /// Location recorded in the registry.
    pub url: String,
    /// Lowercase hex SHA-256 of the file bytes.
    pub hash: String,
    /// Slot detected from path conventions, if any.
    pub slot: Option<Slot>,
    pub coverage: Coverage,
}

/// Registry plus non-fatal warnings produced while building it.
#[derive(Clone, Debug)]
pub struct BuiltRegistry {
    pub registry: Registry,
    pub warnings: Vec<String>,
}

pub(crate) fn content_hash(bytes: &[u8]) -> String {
    let digest = sha2::Sha256::digest(bytes);
    let mut out = String::with_capacity(64);
    for b in digest {
        out.push_str(&format!("{b:02x}"));
    }
    out
}

/// Detect the slot from path conventions.
///
/// The nearest directory naming a slot wins; file-name tokens are consulted only when no
/// directory does, so `accessories/hair_clip.json` is an accessory.
pub fn detect_slot(rel_path: &str) -> Option<Slot> {
    let lowered = rel_path.to_ascii_lowercase();
    let mut segments: Vec<&str> = lowered.split(['/', '\\']).collect();
    let file = segments.pop().unwrap_or_default();
    let stem = file.rsplit_once('.').map_or(file, |(stem, _)| stem);
    segments
        .iter()
        .rev()
        .find_map(|dir| slot_in_segment(dir))
        .or_else(|| slot_in_segment(stem))
}

fn slot_in_segment(segment: &str) -> Option<Slot> {
    segment.split(['_', '-', '.']).find_map(slot_for_token)
}

fn slot_for_token(token: &str) -> Option<Slot> {
    match token {
        "head" | "heads" | "hair" | "face" => Some(Slot::Head),
        "torso" | "body" | "top" | "tops" | "outfit" => Some(Slot::Torso),
        "legs" | "leg" | "bottom" | "bottoms" | "pants" | "shoes" => Some(Slot::Legs),
        "accessory" | "accessories" | "acc" => Some(Slot::Accessory),
        _ => None,
    }
}

/// Coverage class from the file stem suffix.
pub fn detect_coverage(file_stem: &str) -> Coverage {
    let stem = file_stem.to_ascii_lowercase();
    if stem.ends_with("_minimal") {
        Coverage::Minimal
    } else if stem.ends_with("_full") {
        Coverage::Full
    } else {
        Coverage::Standard
    }
}

/// Content under an NSFW-designated directory (`nsfw` or `adult` path segment).
pub fn is_nsfw_path(rel_path: &str) -> bool {
    rel_path
        .to_ascii_lowercase()
        .split(['/', '\\'])
        .any(|seg| seg == "nsfw" || seg == "adult")
}

pub fn host_for_url(url: &str) -> AssetHost {
    if url.starts_with("http://") || url.starts_with("https://") {
        AssetHost::Cdn
    } else {
        AssetHost::Local
    }
}

/// Walk `root` for part files (`*.json`), hashing each one.
///
/// Results are sorted by relative path so builds are reproducible. When `base_url` is given the
/// recorded URL is `base_url/rel_path`, otherwise the relative path itself.
#[tracing::instrument(skip(base_url), fields(root = %root.display()))]
pub fn scan_content_tree(root: &Path, base_url: Option<&str>) -> ForgeResult<Vec<ScannedAsset>> {
    let mut files = Vec::new();
    collect_files(root, root, &mut files)?;
    files.sort();

    let mut out = Vec::with_capacity(files.len());
    for rel in files {
        let full = root.join(&rel);
        let bytes = std::fs::read(&full).map_err(|e| {
            ForgeError::registry(format!("failed to read '{}': {e}", full.display()))
        })?;
        let stem = Path::new(&rel)
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let url = match base_url {
            Some(base) => format!("{}/{rel}", base.trim_end_matches('/')),
            None => rel.clone(),
        };
        out.push(ScannedAsset {
            id: stem.clone(),
            slot: detect_slot(&rel),
            coverage: detect_coverage(&stem),
            hash: content_hash(&bytes),
            rel_path: rel,
            url,
        });
    }
    tracing::debug!(files = out.len(), "content tree scanned");
    Ok(out)
}

fn collect_files(root: &Path, dir: &Path, out: &mut Vec<String>) -> ForgeResult<()> {
    let entries = std::fs::read_dir(dir)
        .map_err(|e| ForgeError::registry(format!("failed to list '{}': {e}", dir.display())))?;
    for entry in entries {
        let entry = entry.map_err(|e| ForgeError::registry(e.to_string()))?;
        let path = entry.path();
        if path.is_dir() {
            collect_files(root, &path, out)?;
        } else if path.extension().is_some_and(|ext| ext == "json") {
            let rel = path
                .strip_prefix(root)
                .map_err(|e| ForgeError::registry(e.to_string()))?;
            let parts: Vec<String> = rel
                .components()
                .map(|c| c.as_os_str().to_string_lossy().into_owned())
                .collect();
            out.push(parts.join("/"));
        }
    }
    Ok(())
}

/// Build a registry from scan results.
///
/// Assets without a detected slot are skipped. Duplicate ids keep the first occurrence. Each
/// slot's fallback is the first non-NSFW asset of that slot, else the slot's sentinel.
pub fn build_registry(version: u32, scanned: &[ScannedAsset]) -> BuiltRegistry {
    let mut warnings = Vec::new();
    let mut assets = BTreeMap::new();
    let mut order: Vec<String> = Vec::new();

    for s in scanned {
        let Some(slot) = s.slot else {
            warnings.push(format!("skipping '{}': no slot detected", s.rel_path));
            continue;
        };
        if assets.contains_key(&s.id) {
            warnings.push(format!(
                "duplicate asset id '{}' at '{}'; keeping the first",
                s.id, s.rel_path
            ));
            continue;
        }
        assets.insert(
            s.id.clone(),
            AssetMeta {
                id: s.id.clone(),
                slot,
                nsfw: is_nsfw_path(&s.rel_path),
                url: s.url.clone(),
                host: host_for_url(&s.url),
                hash: s.hash.clone(),
                coverage: s.coverage,
            },
        );
        order.push(s.id.clone());
    }

    let mut fallbacks = BTreeMap::new();
    for slot in Slot::ALL {
        let pick = order
            .iter()
            .filter_map(|id| assets.get(id))
            .find(|m: &&AssetMeta| m.slot == slot && !m.nsfw)
            .map(|m| m.id.clone())
            .unwrap_or_else(|| slot.sentinel_id().to_string());
        if assets.get(&pick).is_some_and(|m| m.nsfw) {
            warnings.push(format!(
                "fallback '{pick}' for {slot} is NSFW-flagged; upstream data error"
            ));
        }
        fallbacks.insert(slot, pick);
    }

    let (registry, repairs) = Registry::from_parts(version, assets, fallbacks);
    warnings.extend(repairs);
    for w in &warnings {
        tracing::warn!(warning = %w, "registry build");
    }
    BuiltRegistry { registry, warnings }
}

#[cfg(test)]
#[path = "../../tests/unit/registry/builder.rs"]
mod tests;
