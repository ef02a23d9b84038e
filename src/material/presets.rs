//! Surface presets over the shared cel model.

use crate::foundation::core::Color;
use crate::material::Material;
use crate::material::cel::{CelMaterial, CelParams};
use crate::profile::model::ColorPalette;
use crate::scene::graph::Surface;

/// Soft two-band gradient with a narrow rim.
pub fn skin_material(base: Color) -> CelMaterial {
    CelMaterial::new(
        "skin",
        base,
        CelParams {
            rim_color: Color::rgb(0xff, 0xe8, 0xe0),
            rim_power: 5.0,
            rim_strength: 0.15,
            toon_steps: 2,
            smoothness: 0.25,
            ..CelParams::default()
        },
    )
}

/// Stronger rim standing in for a specular highlight.
pub fn hair_material(base: Color) -> CelMaterial {
    CelMaterial::new(
        "hair",
        base,
        CelParams {
            rim_power: 2.5,
            rim_strength: 0.35,
            toon_steps: 3,
            smoothness: 0.1,
            ..CelParams::default()
        },
    )
}

/// Strongest rim and the most bands.
pub fn outfit_material(base: Color) -> CelMaterial {
    CelMaterial::new(
        "outfit",
        base,
        CelParams {
            rim_power: 1.8,
            rim_strength: 0.45,
            toon_steps: 4,
            smoothness: 0.05,
            ..CelParams::default()
        },
    )
}

pub fn accent_material(base: Color) -> CelMaterial {
    CelMaterial::new(
        "accent",
        base,
        CelParams {
            rim_power: 3.0,
            rim_strength: 0.25,
            toon_steps: 3,
            smoothness: 0.0,
            ..CelParams::default()
        },
    )
}

/// Material for a tagged surface. `Fixed` surfaces keep `authored` (white when absent).
pub fn material_for_surface(
    surface: Surface,
    palette: &ColorPalette,
    authored: Option<Color>,
) -> Material {
    let cel = match surface {
        Surface::Skin => skin_material(palette.skin),
        Surface::Hair => hair_material(palette.hair),
        Surface::Eyes => accent_material(palette.eyes),
        Surface::Outfit => outfit_material(palette.outfit),
        Surface::Accent => accent_material(palette.accent),
        Surface::Fixed => accent_material(authored.unwrap_or(Color::WHITE)),
    };
    Material::Cel(cel)
}

#[cfg(test)]
#[path = "../../tests/unit/material/presets.rs"]
mod tests;
