//! Cel-shading materials.
//!
//! Every surface funnels through one stepped-lighting model ([`cel::CelMaterial`]); the presets
//! only differ in tuning. Outline hulls use a flat unlit colour.

pub mod cel;
pub mod outline;
pub mod presets;
pub mod ramp;
pub mod shader;

use crate::foundation::core::{Color, Vec3};

#[derive(Clone, Debug, PartialEq)]
pub enum Material {
    Cel(cel::CelMaterial),
    Outline(outline::OutlineMaterial),
}

impl Material {
    pub fn is_outline(&self) -> bool {
        matches!(self, Material::Outline(_))
    }

    /// Base colour for cel materials, the flat colour for outlines.
    pub fn base_color(&self) -> Color {
        match self {
            Material::Cel(m) => m.base_color(),
            Material::Outline(m) => m.color(),
        }
    }

    pub fn program(&self) -> &shader::ShaderProgram {
        match self {
            Material::Cel(m) => m.program(),
            Material::Outline(m) => m.program(),
        }
    }

    pub fn as_cel(&self) -> Option<&cel::CelMaterial> {
        match self {
            Material::Cel(m) => Some(m),
            Material::Outline(_) => None,
        }
    }

    /// Shaded colour for a surface with `normal`; outlines ignore lighting.
    pub fn shade(&self, normal: Vec3, light: Vec3, view: Vec3) -> Color {
        match self {
            Material::Cel(m) => m.shade(normal, light, view),
            Material::Outline(m) => m.color(),
        }
    }
}
