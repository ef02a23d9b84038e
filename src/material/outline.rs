use std::sync::Arc;

use crate::foundation::core::{Color, Transform3};
use crate::material::Material;
use crate::material::shader::{ShaderProgram, outline_program};
use crate::scene::graph::{CullMode, MeshNode, NodeKind, SceneNode};

/// Suffix of generated outline hull nodes.
pub const OUTLINE_SUFFIX: &str = ".outline";

/// Flat, unlit colour used for outline hulls.
#[derive(Clone, Debug, PartialEq)]
pub struct OutlineMaterial {
    color: Color,
    width: f32,
    program: ShaderProgram,
}

impl OutlineMaterial {
    pub fn new(color: Color, width: f32) -> Self {
        Self {
            color,
            width,
            program: outline_program(color, width),
        }
    }

    pub fn color(&self) -> Color {
        self.color
    }

    pub fn width(&self) -> f32 {
        self.width
    }

    pub fn program(&self) -> &ShaderProgram {
        &self.program
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct OutlineOptions {
    /// Hull expansion along vertex normals, in local units.
    pub width: f32,
    pub color: Color,
}

impl Default for OutlineOptions {
    fn default() -> Self {
        Self {
            width: 0.015,
            color: Color::rgb(0x1a, 0x1a, 0x2e),
        }
    }
}

pub fn outline_material(color: Color, width: f32) -> Material {
    Material::Outline(OutlineMaterial::new(color, width))
}

/// Wrap every mesh under `node` with an outline hull.
///
/// Each mesh becomes a group carrying the mesh's transform, holding an inflated, front-culled
/// duplicate in the outline colour followed by the original. Groups are rebuilt with their
/// children wrapped; existing hulls are left alone. Pure.
pub fn with_outline(node: &SceneNode, options: OutlineOptions) -> SceneNode {
    let children: Vec<SceneNode> = node
        .children
        .iter()
        .map(|c| with_outline(c, options))
        .collect();

    let mesh = match &node.kind {
        NodeKind::Mesh(mesh) if !mesh.material.is_outline() => mesh,
        _ => {
            return SceneNode {
                name: node.name.clone(),
                transform: node.transform,
                kind: node.kind.clone(),
                children,
            };
        }
    };

    let material = Arc::new(outline_material(options.color, options.width));
    let hull = SceneNode::mesh(
        format!("{}{OUTLINE_SUFFIX}", node.name),
        MeshNode {
            geometry: mesh.geometry.clone(),
            material,
            surface: mesh.surface,
            render_order: mesh.render_order,
            cull: CullMode::Front,
            inflate: options.width,
        },
    );
    let original = SceneNode {
        name: node.name.clone(),
        transform: Transform3::IDENTITY,
        kind: node.kind.clone(),
        children,
    };
    SceneNode::group(format!("{}.outlined", node.name))
        .with_transform(node.transform)
        .with_child(hull)
        .with_child(original)
}

#[cfg(test)]
#[path = "../../tests/unit/material/outline.rs"]
mod tests;
