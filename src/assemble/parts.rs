//! Part asset files and the loaders that fetch them.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::foundation::core::{Color, EulerRot, Quat, Transform3, Vec3};
use crate::foundation::error::{ForgeError, ForgeResult};
use crate::registry::builder::content_hash;
use crate::registry::model::{AssetHost, AssetMeta};
use crate::scene::geometry::{Geometry, TriangleMesh};
use crate::scene::graph::Surface;

/// One mesh of a loaded part.
#[derive(Clone, Debug, PartialEq)]
pub struct PartMesh {
    pub name: String,
    pub surface: Surface,
    /// Authored colour; only used for [`Surface::Fixed`].
    pub color: Option<Color>,
    pub geometry: Geometry,
    pub transform: Transform3,
}

/// Decoded part asset, in figure space.
#[derive(Clone, Debug, PartialEq)]
pub struct PartAsset {
    pub meshes: Vec<PartMesh>,
}

/// Loads the part a registry entry points at.
pub trait PartLoader: Send + Sync {
    fn load(&self, meta: &AssetMeta) -> ForgeResult<PartAsset>;
}

#[derive(serde::Deserialize)]
#[serde(deny_unknown_fields)]
struct PartFile {
    meshes: Vec<MeshSpec>,
}

#[derive(serde::Deserialize)]
struct MeshSpec {
    name: String,
    surface: Surface,
    #[serde(default)]
    color: Option<Color>,
    geometry: GeometrySpec,
    #[serde(default)]
    transform: TransformSpec,
}

fn default_segments() -> u32 {
    20
}

fn default_rings() -> u32 {
    12
}

#[derive(serde::Deserialize)]
#[serde(rename_all = "lowercase")]
enum GeometrySpec {
    Sphere {
        radius: f32,
        #[serde(default = "default_segments")]
        segments: u32,
        #[serde(default = "default_rings")]
        rings: u32,
    },
    #[serde(rename_all = "camelCase")]
    Cylinder {
        #[serde(default)]
        radius: Option<f32>,
        #[serde(default)]
        radius_top: Option<f32>,
        #[serde(default)]
        radius_bottom: Option<f32>,
        height: f32,
        #[serde(default = "default_segments")]
        segments: u32,
    },
    Box {
        size: [f32; 3],
    },
    Triangles {
        positions: Vec<[f32; 3]>,
        indices: Vec<[u32; 3]>,
    },
}

#[derive(serde::Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct TransformSpec {
    translation: [f32; 3],
    /// XYZ Euler angles in degrees.
    rotation_euler: [f32; 3],
    scale: [f32; 3],
}

impl Default for TransformSpec {
    fn default() -> Self {
        Self {
            translation: [0.0; 3],
            rotation_euler: [0.0; 3],
            scale: [1.0; 3],
        }
    }
}

fn positive(name: &str, v: f32) -> ForgeResult<f32> {
    if v.is_finite() && v > 0.0 {
        Ok(v)
    } else {
        Err(ForgeError::asset(format!("{name} must be finite and positive, got {v}")))
    }
}

impl GeometrySpec {
    fn into_geometry(self) -> ForgeResult<Geometry> {
        match self {
            GeometrySpec::Sphere {
                radius,
                segments,
                rings,
            } => Ok(Geometry::Sphere {
                radius: positive("sphere radius", radius)?,
                segments: segments.clamp(3, 128),
                rings: rings.clamp(2, 64),
            }),
            GeometrySpec::Cylinder {
                radius,
                radius_top,
                radius_bottom,
                height,
                segments,
            } => {
                let top = radius_top
                    .or(radius)
                    .ok_or_else(|| ForgeError::asset("cylinder needs radius or radiusTop"))?;
                let bottom = radius_bottom.or(radius).unwrap_or(top);
                if !(top.is_finite() && bottom.is_finite()) || top < 0.0 || bottom < 0.0 {
                    return Err(ForgeError::asset("cylinder radii must be finite and >= 0"));
                }
                Ok(Geometry::Cylinder {
                    radius_top: top,
                    radius_bottom: bottom,
                    height: positive("cylinder height", height)?,
                    segments: segments.clamp(3, 128),
                })
            }
            GeometrySpec::Box { size } => {
                for (axis, v) in ["x", "y", "z"].into_iter().zip(size) {
                    positive(&format!("box size.{axis}"), v)?;
                }
                Ok(Geometry::Box {
                    size: Vec3::from_array(size),
                })
            }
            GeometrySpec::Triangles { positions, indices } => {
                let n = positions.len() as u32;
                if let Some(bad) = indices.iter().flatten().find(|&&i| i >= n) {
                    return Err(ForgeError::asset(format!(
                        "triangle index {bad} out of range for {n} positions"
                    )));
                }
                if positions.iter().flatten().any(|v| !v.is_finite()) {
                    return Err(ForgeError::asset("triangle positions must be finite"));
                }
                let positions = positions.into_iter().map(Vec3::from_array).collect();
                Ok(Geometry::Triangles(Arc::new(TriangleMesh::from_faces(
                    positions, indices,
                ))))
            }
        }
    }
}

impl TransformSpec {
    fn into_transform(self) -> ForgeResult<Transform3> {
        let finite = self
            .translation
            .iter()
            .chain(&self.rotation_euler)
            .chain(&self.scale)
            .all(|v| v.is_finite());
        if !finite {
            return Err(ForgeError::asset("mesh transform must be finite"));
        }
        let [rx, ry, rz] = self.rotation_euler.map(f32::to_radians);
        Ok(Transform3 {
            translation: Vec3::from_array(self.translation),
            rotation: Quat::from_euler(EulerRot::XYZ, rx, ry, rz),
            scale: Vec3::from_array(self.scale),
        })
    }
}

/// Decode and validate a part file.
pub fn parse_part(bytes: &[u8]) -> ForgeResult<PartAsset> {
    let file: PartFile = serde_json::from_slice(bytes)
        .map_err(|e| ForgeError::asset(format!("invalid part file: {e}")))?;
    if file.meshes.is_empty() {
        return Err(ForgeError::asset("part file has no meshes"));
    }
    let mut meshes = Vec::with_capacity(file.meshes.len());
    for spec in file.meshes {
        meshes.push(PartMesh {
            geometry: spec.geometry.into_geometry().map_err(|e| {
                ForgeError::asset(format!("mesh '{}': {e}", spec.name))
            })?,
            transform: spec.transform.into_transform()?,
            name: spec.name,
            surface: spec.surface,
            color: spec.color,
        });
    }
    Ok(PartAsset { meshes })
}

fn verify_hash(meta: &AssetMeta, bytes: &[u8]) -> ForgeResult<()> {
    if meta.hash.is_empty() {
        return Ok(());
    }
    let actual = content_hash(bytes);
    if actual.eq_ignore_ascii_case(&meta.hash) {
        Ok(())
    } else {
        Err(ForgeError::asset(format!(
            "hash mismatch for '{}': expected {}, got {actual}",
            meta.id, meta.hash
        )))
    }
}

/// Loads parts from an assets root, verifying registry hashes.
///
/// Local assets resolve relative to the root. CDN assets need the `http` feature.
#[derive(Clone, Debug)]
pub struct FsPartLoader {
    root: PathBuf,
    #[cfg(feature = "http")]
    client: Option<reqwest::blocking::Client>,
}

impl FsPartLoader {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            #[cfg(feature = "http")]
            client: reqwest::blocking::Client::builder()
                .timeout(std::time::Duration::from_secs(10))
                .build()
                .ok(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn local_path(&self, url: &str) -> ForgeResult<PathBuf> {
        let rel = Path::new(url);
        if rel.is_absolute()
            || rel
                .components()
                .any(|c| matches!(c, std::path::Component::ParentDir))
        {
            return Err(ForgeError::asset(format!(
                "asset url '{url}' escapes the assets root"
            )));
        }
        Ok(self.root.join(rel))
    }

    fn fetch(&self, meta: &AssetMeta) -> ForgeResult<Vec<u8>> {
        match meta.host {
            AssetHost::Local => {
                let path = self.local_path(&meta.url)?;
                std::fs::read(&path).map_err(|e| {
                    ForgeError::asset(format!("failed to read '{}': {e}", path.display()))
                })
            }
            AssetHost::Cdn => self.fetch_remote(&meta.url),
        }
    }

    #[cfg(feature = "http")]
    fn fetch_remote(&self, url: &str) -> ForgeResult<Vec<u8>> {
        let client = self
            .client
            .as_ref()
            .ok_or_else(|| ForgeError::asset("http client unavailable"))?;
        let resp = client
            .get(url)
            .send()
            .map_err(|e| ForgeError::asset(format!("GET {url} failed: {e}")))?;
        if !resp.status().is_success() {
            return Err(ForgeError::asset(format!(
                "GET {url} returned {}",
                resp.status()
            )));
        }
        resp.bytes()
            .map(|b| b.to_vec())
            .map_err(|e| ForgeError::asset(format!("reading {url} failed: {e}")))
    }

    #[cfg(not(feature = "http"))]
    fn fetch_remote(&self, url: &str) -> ForgeResult<Vec<u8>> {
        Err(ForgeError::asset(format!(
            "cannot fetch '{url}': built without the `http` feature"
        )))
    }
}

impl PartLoader for FsPartLoader {
    fn load(&self, meta: &AssetMeta) -> ForgeResult<PartAsset> {
        let bytes = self.fetch(meta)?;
        verify_hash(meta, &bytes)?;
        parse_part(&bytes)
    }
}

/// In-memory parts keyed by asset id.
#[derive(Clone, Debug, Default)]
pub struct StaticPartLoader {
    parts: HashMap<String, PartAsset>,
}

impl StaticPartLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_part(mut self, id: impl Into<String>, part: PartAsset) -> Self {
        self.parts.insert(id.into(), part);
        self
    }
}

impl PartLoader for StaticPartLoader {
    fn load(&self, meta: &AssetMeta) -> ForgeResult<PartAsset> {
        self.parts
            .get(&meta.id)
            .cloned()
            .ok_or_else(|| ForgeError::asset(format!("no part loaded for '{}'", meta.id)))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/assemble/parts.rs"]
mod tests;
