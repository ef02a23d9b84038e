use super::*;
use crate::material::shader::UniformValue;

#[test]
fn lit_side_is_brighter_than_shadow_side() {
    let params = CelParams {
        rim_strength: 0.0,
        ..CelParams::default()
    };
    let m = CelMaterial::new("test", Color::rgb(200, 100, 50), params);
    let light = Vec3::new(0.0, 0.0, 1.0);
    let lit = m.shade(Vec3::Z, light, Vec3::Z);
    let dark = m.shade(Vec3::NEG_Z, light, Vec3::Z);
    assert!(lit.luminance() > dark.luminance());
}

#[test]
fn shadow_never_drops_below_ambient() {
    let params = CelParams {
        rim_strength: 0.0,
        ..CelParams::default()
    };
    let m = CelMaterial::new("test", Color::WHITE, params);
    let c = m.shade(Vec3::NEG_Z, Vec3::Z, Vec3::Z);
    let expected = (params.ambient * 255.0).round() as u8;
    assert!(c.r.abs_diff(expected) <= 1);
}

#[test]
fn rim_brightens_grazing_angles() {
    let params = CelParams {
        rim_strength: 0.8,
        rim_power: 1.0,
        ..CelParams::default()
    };
    let m = CelMaterial::new("test", Color::rgb(80, 80, 80), params);
    let light = Vec3::Y;
    let facing = m.shade(Vec3::new(0.0, 0.0, 1.0), light, Vec3::Z);
    let grazing = m.shade(Vec3::new(1.0, 0.0, 0.0), light, Vec3::Z);
    assert!(grazing.luminance() > facing.luminance());
}

#[test]
fn program_exposes_uniforms() {
    let m = CelMaterial::new("skin", Color::rgb(1, 2, 3), CelParams::default());
    let program = m.program();
    assert_eq!(program.label, "cel:skin");
    assert_eq!(program.uniform("toon_steps"), Some(&UniformValue::U32(3)));
    assert_eq!(
        program.uniform("base_color"),
        Some(&UniformValue::Color(Color::rgb(1, 2, 3)))
    );
    assert!(program.fragment.contains("toon_ramp"));
    assert!(program.vertex.contains("@vertex"));
}

#[test]
fn recolor_keeps_tuning() {
    let m = CelMaterial::new("hair", Color::BLACK, CelParams::default());
    let r = m.recolored(Color::WHITE);
    assert_eq!(r.base_color(), Color::WHITE);
    assert_eq!(r.params(), m.params());
    assert_eq!(r.label(), "hair");
}

#[test]
fn alpha_is_preserved() {
    let m = CelMaterial::new("glass", Color::rgba(10, 20, 30, 128), CelParams::default());
    assert_eq!(m.shade(Vec3::Z, Vec3::Z, Vec3::Z).a, 128);
}
