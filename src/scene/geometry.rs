use std::f32::consts::{PI, TAU};
use std::sync::Arc;

use crate::foundation::core::Vec3;

/// Indexed triangle list with per-vertex normals.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TriangleMesh {
    pub positions: Vec<Vec3>,
    pub normals: Vec<Vec3>,
    pub indices: Vec<[u32; 3]>,
}

impl TriangleMesh {
    /// Build a mesh from positions and faces, deriving smooth normals from face normals.
    pub fn from_faces(positions: Vec<Vec3>, indices: Vec<[u32; 3]>) -> Self {
        let mut normals = vec![Vec3::ZERO; positions.len()];
        for tri in &indices {
            let [a, b, c] = tri.map(|i| positions[i as usize]);
            let n = (b - a).cross(c - a);
            for &i in tri {
                normals[i as usize] += n;
            }
        }
        for n in &mut normals {
            *n = n.normalize_or_zero();
        }
        Self {
            positions,
            normals,
            indices,
        }
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len()
    }

    fn push(&mut self, p: Vec3, n: Vec3) -> u32 {
        self.positions.push(p);
        self.normals.push(n);
        (self.positions.len() - 1) as u32
    }
}

/// Geometry attached to a mesh node, in the node's local space.
#[derive(Clone, Debug, PartialEq)]
pub enum Geometry {
    /// UV sphere centred on the origin.
    Sphere { radius: f32, segments: u32, rings: u32 },
    /// Capped cylinder along +Y, centred on the origin.
    Cylinder {
        radius_top: f32,
        radius_bottom: f32,
        height: f32,
        segments: u32,
    },
    /// Axis-aligned box centred on the origin.
    Box { size: Vec3 },
    Triangles(Arc<TriangleMesh>),
}

impl Geometry {
    pub fn sphere(radius: f32) -> Self {
        Self::Sphere {
            radius,
            segments: 24,
            rings: 12,
        }
    }

    pub fn cylinder(radius: f32, height: f32) -> Self {
        Self::tapered_cylinder(radius, radius, height)
    }

    pub fn tapered_cylinder(radius_top: f32, radius_bottom: f32, height: f32) -> Self {
        Self::Cylinder {
            radius_top,
            radius_bottom,
            height,
            segments: 20,
        }
    }

    pub fn cuboid(size: Vec3) -> Self {
        Self::Box { size }
    }

    /// Triangulate into a mesh with outward-facing normals.
    pub fn tessellate(&self) -> TriangleMesh {
        match self {
            Geometry::Sphere {
                radius,
                segments,
                rings,
            } => sphere_mesh(*radius, (*segments).max(3), (*rings).max(2)),
            Geometry::Cylinder {
                radius_top,
                radius_bottom,
                height,
                segments,
            } => cylinder_mesh(*radius_top, *radius_bottom, *height, (*segments).max(3)),
            Geometry::Box { size } => box_mesh(*size),
            Geometry::Triangles(mesh) => mesh.as_ref().clone(),
        }
    }
}

fn sphere_mesh(radius: f32, segments: u32, rings: u32) -> TriangleMesh {
    let mut mesh = TriangleMesh::default();
    for r in 0..=rings {
        let phi = PI * r as f32 / rings as f32;
        for s in 0..=segments {
            let theta = TAU * s as f32 / segments as f32;
            let n = Vec3::new(phi.sin() * theta.sin(), phi.cos(), phi.sin() * theta.cos());
            mesh.push(n * radius, n);
        }
    }
    let stride = segments + 1;
    for r in 0..rings {
        for s in 0..segments {
            let a = r * stride + s;
            let b = a + stride;
            if r != 0 {
                mesh.indices.push([a, b, a + 1]);
            }
            if r != rings - 1 {
                mesh.indices.push([a + 1, b, b + 1]);
            }
        }
    }
    mesh
}

fn cylinder_mesh(radius_top: f32, radius_bottom: f32, height: f32, segments: u32) -> TriangleMesh {
    let mut mesh = TriangleMesh::default();
    let half = height * 0.5;
    let slope = (radius_bottom - radius_top) / height.max(f32::EPSILON);

    let mut ring = Vec::with_capacity(segments as usize);
    for s in 0..segments {
        let theta = TAU * s as f32 / segments as f32;
        let (sin, cos) = theta.sin_cos();
        let n = Vec3::new(sin, slope, cos).normalize();
        let top = mesh.push(Vec3::new(sin * radius_top, half, cos * radius_top), n);
        let bottom = mesh.push(Vec3::new(sin * radius_bottom, -half, cos * radius_bottom), n);
        ring.push((top, bottom));
    }
    for s in 0..segments as usize {
        let (t0, b0) = ring[s];
        let (t1, b1) = ring[(s + 1) % ring.len()];
        mesh.indices.push([t0, b0, b1]);
        mesh.indices.push([t0, b1, t1]);
    }

    for (y, radius, normal) in [(half, radius_top, Vec3::Y), (-half, radius_bottom, Vec3::NEG_Y)] {
        if radius <= 0.0 {
            continue;
        }
        let center = mesh.push(Vec3::new(0.0, y, 0.0), normal);
        let first = mesh.positions.len() as u32;
        for s in 0..segments {
            let theta = TAU * s as f32 / segments as f32;
            mesh.push(
                Vec3::new(theta.sin() * radius, y, theta.cos() * radius),
                normal,
            );
        }
        for s in 0..segments {
            let a = first + s;
            let b = first + (s + 1) % segments;
            if normal.y > 0.0 {
                mesh.indices.push([center, a, b]);
            } else {
                mesh.indices.push([center, b, a]);
            }
        }
    }
    mesh
}

fn box_mesh(size: Vec3) -> TriangleMesh {
    let h = size * 0.5;
    let mut mesh = TriangleMesh::default();
    let faces = [
        (Vec3::X, Vec3::Y, Vec3::Z),
        (Vec3::NEG_X, Vec3::Y, Vec3::NEG_Z),
        (Vec3::Y, Vec3::Z, Vec3::X),
        (Vec3::NEG_Y, Vec3::NEG_Z, Vec3::X),
        (Vec3::Z, Vec3::Y, Vec3::NEG_X),
        (Vec3::NEG_Z, Vec3::Y, Vec3::X),
    ];
    for (n, u, v) in faces {
        let c = n * h;
        let (du, dv) = (u * h, v * h);
        let i0 = mesh.push(c - du - dv, n);
        let i1 = mesh.push(c + du - dv, n);
        let i2 = mesh.push(c + du + dv, n);
        let i3 = mesh.push(c - du + dv, n);
        mesh.indices.push([i0, i1, i2]);
        mesh.indices.push([i0, i2, i3]);
    }
    mesh
}

#[cfg(test)]
#[path = "../../tests/unit/scene/geometry.rs"]
mod tests;
