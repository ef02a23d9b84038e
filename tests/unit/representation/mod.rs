use super::*;
use crate::foundation::core::{Color, Mat4, Vec3};
use crate::material::outline::{OutlineOptions, with_outline};
use crate::material::presets::outfit_material;
use crate::scene::geometry::Geometry;
use crate::scene::graph::{MeshNode, Surface};

fn torso() -> SceneNode {
    let mesh = MeshNode::new(
        Geometry::cylinder(0.15, 0.6),
        Arc::new(Material::Cel(outfit_material(Color::rgb(10, 20, 30)))),
        Surface::Outfit,
    );
    with_outline(&SceneNode::mesh("torso", mesh), OutlineOptions::default())
}

#[test]
fn chibi_scales_root_and_thickens_outline() {
    let t = transform_for(RepresentationMode::Chibi);
    let out = apply_transform(&torso(), &t);
    assert_eq!(out.name, REPRESENTATION_NODE);
    assert_eq!(out.transform.scale, Vec3::splat(1.5));

    let mut saw_hull = false;
    out.visit_meshes(Mat4::IDENTITY, &mut |_, mesh, _| match mesh.material.as_ref() {
        Material::Outline(o) => {
            saw_hull = true;
            assert_eq!(o.width(), 0.04);
            assert_eq!(mesh.inflate, 0.04);
        }
        Material::Cel(c) => {
            assert_eq!(c.params().toon_steps, 2);
            assert_eq!(c.base_color(), Color::rgb(10, 20, 30));
        }
    });
    assert!(saw_hull);
}

#[test]
fn tweaks_scale_rim_and_keep_unset_fields() {
    let base = CelParams::default();
    let tweaks = transform_for(RepresentationMode::FullBody).shading;
    let p = tweak_params(&base, &tweaks);
    assert_eq!(p.toon_steps, base.toon_steps);
    assert_eq!(p.rim_power, base.rim_power);
    assert_eq!(p.ambient, base.ambient);
    assert_eq!(p.bloom_intensity, tweaks.bloom_intensity);
}
