use std::collections::BTreeMap;
use std::sync::Arc;

use crate::assemble::parts::{PartAsset, PartLoader};
use crate::assemble::procedural;
use crate::config::flags::FeatureFlags;
use crate::foundation::core::Mat4;
use crate::material::Material;
use crate::material::outline::{OUTLINE_SUFFIX, OutlineOptions, with_outline};
use crate::material::presets::material_for_surface;
use crate::profile::model::{AvatarProfile, PROCEDURAL};
use crate::registry::model::{AssetMeta, Registry, Slot};
use crate::scene::graph::{MeshNode, SceneNode, Surface};

/// Root node name of every assembled avatar.
pub const AVATAR_ROOT: &str = "avatar";
/// Child of the root holding the body.
pub const BODY_NODE: &str = "body";
/// Child of the root holding NSFW overlay layers, when present.
pub const NSFW_OVERLAY_NODE: &str = "nsfw_overlay";
/// Render order of overlay meshes; the body draws at order 0.
pub const OVERLAY_RENDER_ORDER: i32 = 10;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AssembleOptions {
    /// When false no part assets are loaded and the body is procedural.
    pub load_assets: bool,
}

impl Default for AssembleOptions {
    fn default() -> Self {
        Self { load_assets: true }
    }
}

/// What filled a slot.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PartSource {
    Asset(String),
    Procedural,
    /// Optional slot left empty.
    Omitted,
}

/// Transient result of one assembly; owned by the caller, never cached.
#[derive(Clone, Debug)]
pub struct AssembledAvatar {
    pub root: SceneNode,
    /// Mesh name to applied material. Outline hulls are not listed.
    pub materials: BTreeMap<String, Arc<Material>>,
    /// True when asset meshes were recoloured from the palette.
    pub recolored: bool,
    pub parts: BTreeMap<Slot, PartSource>,
    /// Overlay layer ids that were attached.
    pub overlay_layers: Vec<String>,
}

impl AssembledAvatar {
    pub fn body(&self) -> Option<&SceneNode> {
        self.root.children.iter().find(|c| c.name == BODY_NODE)
    }

    pub fn nsfw_overlay(&self) -> Option<&SceneNode> {
        self.root.children.iter().find(|c| c.name == NSFW_OVERLAY_NODE)
    }

    pub fn is_procedural(&self) -> bool {
        self.parts.values().any(|p| *p == PartSource::Procedural)
    }

    /// Material of the named mesh.
    pub fn material(&self, mesh_name: &str) -> Option<&Arc<Material>> {
        self.materials.get(mesh_name)
    }
}

/// Resolves profiles into scene graphs. Stateless per call.
pub struct Assembler {
    loader: Arc<dyn PartLoader>,
    flags: Arc<FeatureFlags>,
    outline: OutlineOptions,
}

impl Assembler {
    pub fn new(loader: Arc<dyn PartLoader>, flags: Arc<FeatureFlags>) -> Self {
        Self {
            loader,
            flags,
            outline: OutlineOptions::default(),
        }
    }

    pub fn flags(&self) -> &Arc<FeatureFlags> {
        &self.flags
    }

    /// Build the avatar. Never fails: any unresolved required slot makes the whole body
    /// procedural.
    #[tracing::instrument(skip_all, fields(profile = %profile.id, registry = registry.version()))]
    pub fn assemble(
        &self,
        profile: &AvatarProfile,
        registry: &Registry,
        options: AssembleOptions,
    ) -> AssembledAvatar {
        let mut parts = BTreeMap::new();
        let mut recolored = false;

        let resolved = if options.load_assets {
            self.resolve_body(profile, registry)
        } else {
            None
        };

        let body = match resolved {
            Some(loaded) => {
                let mut body = SceneNode::group(BODY_NODE);
                for (slot, meta, part) in loaded {
                    let (node, recolor) = attach_part(slot, &meta, &part, profile, 0);
                    recolored |= recolor;
                    body = body.with_child(with_outline(&node, self.outline));
                    parts.insert(slot, PartSource::Asset(meta.id.clone()));
                }
                for slot in Slot::ALL {
                    parts.entry(slot).or_insert(PartSource::Omitted);
                }
                body
            }
            None => {
                for slot in Slot::REQUIRED {
                    parts.insert(slot, PartSource::Procedural);
                }
                parts.insert(Slot::Accessory, PartSource::Omitted);
                SceneNode::group(BODY_NODE).with_child(procedural::generate(profile))
            }
        };

        let mut root = SceneNode::group(AVATAR_ROOT).with_child(body);
        let mut overlay_layers = Vec::new();
        if let Some((overlay, layers)) = self.compose_overlay(profile, registry, options) {
            root = root.with_child(overlay);
            overlay_layers = layers;
        }

        AssembledAvatar {
            materials: collect_materials(&root),
            root,
            recolored,
            parts,
            overlay_layers,
        }
    }

    /// Resolve and load every required slot plus the accessory. `None` if any required slot
    /// misses.
    fn resolve_body(
        &self,
        profile: &AvatarProfile,
        registry: &Registry,
    ) -> Option<Vec<(Slot, AssetMeta, PartAsset)>> {
        let mut out = Vec::new();
        for slot in Slot::ALL {
            match self.resolve_slot(profile, registry, slot) {
                Ok((meta, part)) => out.push((slot, meta, part)),
                Err(reason) if slot == Slot::Accessory => {
                    if profile.part(slot) != PROCEDURAL {
                        debug_miss(slot, profile.part(slot), &reason);
                    }
                }
                Err(reason) => {
                    debug_miss(slot, profile.part(slot), &reason);
                    return None;
                }
            }
        }
        Some(out)
    }

    fn resolve_slot(
        &self,
        profile: &AvatarProfile,
        registry: &Registry,
        slot: Slot,
    ) -> Result<(AssetMeta, PartAsset), String> {
        let id = profile.part(slot);
        if id == PROCEDURAL {
            return Err("procedural requested".to_string());
        }
        let meta = registry
            .get_asset(id)
            .ok_or_else(|| "not in registry".to_string())?;
        if meta.slot != slot {
            return Err(format!("asset belongs to slot {}", meta.slot));
        }
        if meta.nsfw {
            return Err("asset is NSFW-flagged".to_string());
        }
        let part = self.loader.load(meta).map_err(|e| e.to_string())?;
        Ok((meta.clone(), part))
    }

    /// Compose the overlay group. The flag is read before any registry or loader access.
    fn compose_overlay(
        &self,
        profile: &AvatarProfile,
        registry: &Registry,
        options: AssembleOptions,
    ) -> Option<(SceneNode, Vec<String>)> {
        if !self.flags.nsfw_enabled() {
            return None;
        }
        if profile.nsfw_layers.is_empty() || !options.load_assets {
            return None;
        }

        let mut group = SceneNode::group(NSFW_OVERLAY_NODE);
        let mut attached = Vec::new();
        for layer in &profile.nsfw_layers {
            // Flags may flip at runtime; re-check at each layer's asset access.
            if !self.flags.nsfw_enabled() {
                return None;
            }
            let Some(meta) = registry.get_asset(layer).filter(|m| m.nsfw) else {
                if cfg!(debug_assertions) {
                    tracing::debug!(layer = %layer, "overlay layer not resolvable");
                }
                continue;
            };
            match self.loader.load(meta) {
                Ok(part) => {
                    let (node, _) =
                        attach_part(meta.slot, meta, &part, profile, OVERLAY_RENDER_ORDER);
                    group = group.with_child(with_outline(&node, self.outline));
                    attached.push(layer.clone());
                }
                Err(e) => {
                    if cfg!(debug_assertions) {
                        tracing::debug!(layer = %layer, error = %e, "overlay layer failed to load");
                    }
                }
            }
        }
        if attached.is_empty() {
            None
        } else {
            Some((group, attached))
        }
    }
}

fn debug_miss(slot: Slot, id: &str, reason: &str) {
    if cfg!(debug_assertions) {
        tracing::debug!(%slot, id, reason, "slot unresolved");
    }
}

/// Attach a loaded part with palette materials. Returns the node and whether any mesh was
/// recoloured.
fn attach_part(
    slot: Slot,
    meta: &AssetMeta,
    part: &PartAsset,
    profile: &AvatarProfile,
    render_order: i32,
) -> (SceneNode, bool) {
    let mut recolored = false;
    let mut node = SceneNode::group(format!("{}:{}", slot.as_str().to_ascii_lowercase(), meta.id));
    for mesh in &part.meshes {
        recolored |= mesh.surface != Surface::Fixed;
        let material = material_for_surface(mesh.surface, &profile.color_palette, mesh.color);
        let payload = MeshNode::new(mesh.geometry.clone(), Arc::new(material), mesh.surface)
            .with_render_order(render_order);
        node = node.with_child(
            SceneNode::mesh(format!("{}/{}", meta.id, mesh.name), payload)
                .with_transform(mesh.transform),
        );
    }
    (node, recolored)
}

fn collect_materials(root: &SceneNode) -> BTreeMap<String, Arc<Material>> {
    let mut out = BTreeMap::new();
    root.visit_meshes(Mat4::IDENTITY, &mut |node, mesh, _| {
        if !mesh.material.is_outline() && !node.name.ends_with(OUTLINE_SUFFIX) {
            out.insert(node.name.clone(), Arc::clone(&mesh.material));
        }
    });
    out
}

#[cfg(test)]
#[path = "../../tests/unit/assemble/pipeline.rs"]
mod tests;
