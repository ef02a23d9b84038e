//! Primitive figure built from the palette alone.

use std::sync::Arc;

use crate::foundation::core::{Color, Transform3, Vec3};
use crate::material::Material;
use crate::material::outline::{OutlineOptions, with_outline};
use crate::material::presets::{accent_material, hair_material, outfit_material, skin_material};
use crate::profile::model::AvatarProfile;
use crate::scene::geometry::Geometry;
use crate::scene::graph::{MeshNode, SceneNode, Surface};

/// Root node name of a procedural figure.
pub const PROCEDURAL_ROOT: &str = "procedural_body";

pub const LEG_HEIGHT: f32 = 0.8;
pub const TORSO_HEIGHT: f32 = 0.6;
pub const HEAD_RADIUS: f32 = 0.2;
pub const HEAD_CENTER_Y: f32 = 1.6;

/// Morph targets the generator understands.
pub const KNOWN_MORPHS: [&str; 3] = ["height", "headSize", "build"];

fn cel_mesh(geometry: Geometry, material: Material, surface: Surface) -> MeshNode {
    MeshNode::new(geometry, Arc::new(material), surface)
}

/// Build a standing figure: head sphere, torso cylinder, two leg cylinders, a hair cap and eyes.
///
/// Colours come only from the profile palette. Morph weights (already clamped to `[-1, 1]`)
/// stretch the primitives within fixed bounds. Never fails.
pub fn generate(profile: &AvatarProfile) -> SceneNode {
    let palette = &profile.color_palette;
    let height = 1.0 + 0.1 * profile.morph("height");
    let head_scale = 1.0 + 0.2 * profile.morph("headSize");
    let build = 1.0 + 0.25 * profile.morph("build");

    let head_r = HEAD_RADIUS * head_scale;
    let leg_r = 0.07 * build;
    let torso_top = 0.17 * build;
    let torso_bottom = 0.14 * build;
    let leg_x = 0.08 * build.max(1.0);

    let head = SceneNode::mesh(
        "head",
        cel_mesh(
            Geometry::sphere(head_r),
            Material::Cel(skin_material(palette.skin)),
            Surface::Skin,
        ),
    )
    .with_transform(Transform3::from_translation(Vec3::new(0.0, HEAD_CENTER_Y, 0.0)));

    let hair = SceneNode::mesh(
        "hair",
        cel_mesh(
            Geometry::sphere(head_r * 1.07),
            Material::Cel(hair_material(palette.hair)),
            Surface::Hair,
        ),
    )
    .with_transform(Transform3 {
        translation: Vec3::new(0.0, HEAD_CENTER_Y + 0.06 * head_scale, -0.02 * head_scale),
        scale: Vec3::new(1.0, 0.75, 1.0),
        ..Transform3::IDENTITY
    });

    let torso = SceneNode::mesh(
        "torso",
        cel_mesh(
            Geometry::tapered_cylinder(torso_top, torso_bottom, TORSO_HEIGHT),
            Material::Cel(outfit_material(palette.outfit)),
            Surface::Outfit,
        ),
    )
    .with_transform(Transform3::from_translation(Vec3::new(
        0.0,
        LEG_HEIGHT + TORSO_HEIGHT * 0.5,
        0.0,
    )));

    let leg = |name: &str, x: f32| {
        SceneNode::mesh(
            name,
            cel_mesh(
                Geometry::cylinder(leg_r, LEG_HEIGHT),
                Material::Cel(outfit_material(palette.outfit)),
                Surface::Outfit,
            ),
        )
        .with_transform(Transform3::from_translation(Vec3::new(x, LEG_HEIGHT * 0.5, 0.0)))
    };

    let body = SceneNode::group("body_parts")
        .with_child(leg("leg_left", -leg_x))
        .with_child(leg("leg_right", leg_x))
        .with_child(torso)
        .with_child(head)
        .with_child(hair);
    let body = with_outline(&body, OutlineOptions::default());

    let eye = |name: &str, x: f32| {
        SceneNode::mesh(
            name,
            cel_mesh(
                Geometry::sphere(0.035 * head_scale),
                Material::Cel(accent_material(palette.eyes)),
                Surface::Eyes,
            ),
        )
        .with_transform(Transform3::from_translation(Vec3::new(
            x * head_scale,
            HEAD_CENTER_Y + 0.02 * head_scale,
            head_r * 0.93,
        )))
    };

    SceneNode::group(PROCEDURAL_ROOT)
        .with_transform(Transform3::from_scale(Vec3::new(1.0, height, 1.0)))
        .with_child(body)
        .with_child(eye("eye_left", -0.07))
        .with_child(eye("eye_right", 0.07))
}

/// Neutral stand-in shown when avatars are disabled. Touches no registry or asset.
pub fn placeholder() -> SceneNode {
    let grey = Color::rgb(0x9e, 0x9e, 0xa8);
    let body = SceneNode::mesh(
        "placeholder_body",
        cel_mesh(
            Geometry::tapered_cylinder(0.16, 0.24, 1.2),
            Material::Cel(accent_material(grey)),
            Surface::Fixed,
        ),
    )
    .with_transform(Transform3::from_translation(Vec3::new(0.0, 0.6, 0.0)));
    let head = SceneNode::mesh(
        "placeholder_head",
        cel_mesh(
            Geometry::sphere(0.22),
            Material::Cel(accent_material(grey)),
            Surface::Fixed,
        ),
    )
    .with_transform(Transform3::from_translation(Vec3::new(0.0, 1.5, 0.0)));
    with_outline(
        &SceneNode::group("placeholder").with_child(body).with_child(head),
        OutlineOptions::default(),
    )
}

#[cfg(test)]
#[path = "../../tests/unit/assemble/procedural.rs"]
mod tests;
