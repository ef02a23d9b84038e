use std::sync::Arc;

use crate::foundation::core::{Mat4, Transform3};
use crate::material::Material;
use crate::scene::geometry::Geometry;

/// Semantic surface tag; decides which palette entry recolours a mesh.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Surface {
    Skin,
    Hair,
    Eyes,
    Outfit,
    Accent,
    /// Authored colour, never recoloured.
    Fixed,
}

/// Which triangle facing is discarded at raster time.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum CullMode {
    #[default]
    Back,
    /// Outline hulls keep only their back faces.
    Front,
    None,
}

/// Drawable leaf payload.
#[derive(Clone, Debug)]
pub struct MeshNode {
    pub geometry: Geometry,
    pub material: Arc<Material>,
    pub surface: Surface,
    /// Larger values draw later; depth sorting only applies within one order.
    pub render_order: i32,
    pub cull: CullMode,
    /// Offset of every vertex along its normal, in local units.
    pub inflate: f32,
}

impl MeshNode {
    pub fn new(geometry: Geometry, material: Arc<Material>, surface: Surface) -> Self {
        Self {
            geometry,
            material,
            surface,
            render_order: 0,
            cull: CullMode::Back,
            inflate: 0.0,
        }
    }

    pub fn with_render_order(mut self, order: i32) -> Self {
        self.render_order = order;
        self
    }
}

#[derive(Clone, Debug)]
pub enum NodeKind {
    Group,
    Mesh(MeshNode),
}

/// Scene-graph node. Children inherit the node's transform.
#[derive(Clone, Debug)]
pub struct SceneNode {
    pub name: String,
    pub transform: Transform3,
    pub kind: NodeKind,
    pub children: Vec<SceneNode>,
}

impl SceneNode {
    pub fn group(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            transform: Transform3::IDENTITY,
            kind: NodeKind::Group,
            children: Vec::new(),
        }
    }

    pub fn mesh(name: impl Into<String>, mesh: MeshNode) -> Self {
        Self {
            name: name.into(),
            transform: Transform3::IDENTITY,
            kind: NodeKind::Mesh(mesh),
            children: Vec::new(),
        }
    }

    pub fn with_transform(mut self, transform: Transform3) -> Self {
        self.transform = transform;
        self
    }

    pub fn with_child(mut self, child: SceneNode) -> Self {
        self.children.push(child);
        self
    }

    pub fn as_mesh(&self) -> Option<&MeshNode> {
        match &self.kind {
            NodeKind::Mesh(m) => Some(m),
            NodeKind::Group => None,
        }
    }

    /// Depth-first search by name, including `self`.
    pub fn find(&self, name: &str) -> Option<&SceneNode> {
        if self.name == name {
            return Some(self);
        }
        self.children.iter().find_map(|c| c.find(name))
    }

    pub fn node_count(&self) -> usize {
        1 + self.children.iter().map(SceneNode::node_count).sum::<usize>()
    }

    pub fn mesh_count(&self) -> usize {
        let own = usize::from(self.as_mesh().is_some());
        own + self.children.iter().map(SceneNode::mesh_count).sum::<usize>()
    }

    /// Visit every mesh with its world matrix.
    pub fn visit_meshes<F>(&self, parent: Mat4, f: &mut F)
    where
        F: FnMut(&SceneNode, &MeshNode, Mat4),
    {
        let world = parent * self.transform.to_mat4();
        if let NodeKind::Mesh(mesh) = &self.kind {
            f(self, mesh, world);
        }
        for child in &self.children {
            child.visit_meshes(world, f);
        }
    }

    /// Rebuild the tree bottom-up, letting `f` rewrite each mesh payload.
    pub fn map_meshes<F>(&self, f: &mut F) -> SceneNode
    where
        F: FnMut(&SceneNode, &MeshNode) -> MeshNode,
    {
        let kind = match &self.kind {
            NodeKind::Mesh(mesh) => NodeKind::Mesh(f(self, mesh)),
            NodeKind::Group => NodeKind::Group,
        };
        SceneNode {
            name: self.name.clone(),
            transform: self.transform,
            kind,
            children: self.children.iter().map(|c| c.map_meshes(f)).collect(),
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/scene/graph.rs"]
mod tests;
