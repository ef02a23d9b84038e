//! Representation modes and the constant transform table every surface consults.

pub mod mode;

use std::sync::Arc;

use crate::foundation::core::Transform3;
use crate::material::Material;
use crate::material::cel::CelParams;
use crate::material::outline::OutlineMaterial;
use crate::scene::graph::SceneNode;

pub use mode::{
    CropBounds, RepresentationMode, RepresentationTransform, ShadingTweaks, transform_for,
};

/// Name of the group [`apply_transform`] wraps the figure in.
pub const REPRESENTATION_NODE: &str = "representation";

/// Tuning after applying mode tweaks to a preset.
pub fn tweak_params(params: &CelParams, tweaks: &ShadingTweaks) -> CelParams {
    CelParams {
        rim_color: tweaks.rim_color.unwrap_or(params.rim_color),
        rim_power: params.rim_power * tweaks.rim_power,
        toon_steps: tweaks.toon_steps.unwrap_or(params.toon_steps),
        smoothness: tweaks.smoothness.unwrap_or(params.smoothness),
        bloom_intensity: tweaks.bloom_intensity,
        ..*params
    }
}

/// Scale the figure and retune its materials and outline hulls for a mode. Pure.
pub fn apply_transform(root: &SceneNode, transform: &RepresentationTransform) -> SceneNode {
    let shading = &transform.shading;
    let retuned = root.map_meshes(&mut |_, mesh| {
        let material = match mesh.material.as_ref() {
            Material::Cel(cel) => Material::Cel(cel.with_params(tweak_params(cel.params(), shading))),
            Material::Outline(_) => Material::Outline(OutlineMaterial::new(
                shading.outline_color,
                shading.outline_width,
            )),
        };
        let mut mesh = mesh.clone();
        if material.is_outline() {
            mesh.inflate = shading.outline_width;
        }
        mesh.material = Arc::new(material);
        mesh
    });
    SceneNode::group(REPRESENTATION_NODE)
        .with_transform(Transform3::from_scale(transform.scale))
        .with_child(retuned)
}

#[cfg(test)]
#[path = "../../tests/unit/representation/mod.rs"]
mod tests;
