//! WGSL program descriptions for the cel and outline materials.
//!
//! Hosts with a GPU upload these programs; the CPU rasterizer evaluates the equivalent model in
//! [`crate::material::cel::CelMaterial::shade`].

use crate::foundation::core::Color;

#[derive(Clone, Debug, PartialEq)]
pub enum UniformValue {
    F32(f32),
    U32(u32),
    Color(Color),
    /// Texture binding with its dimensions.
    Texture { width: u32, height: u32 },
}

#[derive(Clone, Debug, PartialEq)]
pub struct Uniform {
    pub name: &'static str,
    pub value: UniformValue,
}

/// Vertex + fragment source with the uniform values it expects.
#[derive(Clone, Debug, PartialEq)]
pub struct ShaderProgram {
    pub label: String,
    pub vertex: String,
    pub fragment: String,
    pub uniforms: Vec<Uniform>,
}

impl ShaderProgram {
    pub fn uniform(&self, name: &str) -> Option<&UniformValue> {
        self.uniforms.iter().find(|u| u.name == name).map(|u| &u.value)
    }
}

const CEL_VERTEX: &str = r#"struct Camera { view_proj: mat4x4<f32>, model: mat4x4<f32>, normal: mat3x3<f32> };
@group(0) @binding(0) var<uniform> camera: Camera;

struct VsOut {
    @builtin(position) clip: vec4<f32>,
    @location(0) normal: vec3<f32>,
    @location(1) view_dir: vec3<f32>,
};

@vertex
fn vs_main(@location(0) position: vec3<f32>, @location(1) normal: vec3<f32>) -> VsOut {
    var out: VsOut;
    let world = camera.model * vec4<f32>(position, 1.0);
    out.clip = camera.view_proj * world;
    out.normal = normalize(camera.normal * normal);
    out.view_dir = vec3<f32>(0.0, 0.0, 1.0);
    return out;
}
"#;

const CEL_FRAGMENT: &str = r#"struct Cel {
    base_color: vec4<f32>,
    rim_color: vec4<f32>,
    light_dir: vec3<f32>,
    rim_power: f32,
    rim_strength: f32,
    ambient: f32,
    bloom_intensity: f32,
    toon_steps: u32,
};
@group(1) @binding(0) var<uniform> cel: Cel;
@group(1) @binding(1) var toon_ramp: texture_2d<f32>;
@group(1) @binding(2) var ramp_sampler: sampler;

@fragment
fn fs_main(@location(0) normal: vec3<f32>, @location(1) view_dir: vec3<f32>) -> @location(0) vec4<f32> {
    let n = normalize(normal);
    let half_lambert = dot(n, normalize(cel.light_dir)) * 0.5 + 0.5;
    let band = textureSample(toon_ramp, ramp_sampler, vec2<f32>(half_lambert, 0.5)).r;
    let light = cel.ambient + (1.0 - cel.ambient) * band;
    let rim = pow(1.0 - max(dot(n, view_dir), 0.0), cel.rim_power) * cel.rim_strength;
    var rgb = cel.base_color.rgb * light + cel.rim_color.rgb * rim;
    rgb = rgb * (1.0 + cel.bloom_intensity * 0.15);
    return vec4<f32>(clamp(rgb, vec3<f32>(0.0), vec3<f32>(1.0)), cel.base_color.a);
}
"#;

const OUTLINE_VERTEX: &str = r#"struct Camera { view_proj: mat4x4<f32>, model: mat4x4<f32>, normal: mat3x3<f32> };
@group(0) @binding(0) var<uniform> camera: Camera;
struct Outline { color: vec4<f32>, width: f32 };
@group(1) @binding(0) var<uniform> outline: Outline;

@vertex
fn vs_main(@location(0) position: vec3<f32>, @location(1) normal: vec3<f32>) -> @builtin(position) vec4<f32> {
    let expanded = position + normalize(normal) * outline.width;
    return camera.view_proj * camera.model * vec4<f32>(expanded, 1.0);
}
"#;

const OUTLINE_FRAGMENT: &str = r#"struct Outline { color: vec4<f32>, width: f32 };
@group(1) @binding(0) var<uniform> outline: Outline;

@fragment
fn fs_main() -> @location(0) vec4<f32> {
    return outline.color;
}
"#;

pub(crate) struct CelUniforms {
    pub base: Color,
    pub rim_color: Color,
    pub rim_power: f32,
    pub rim_strength: f32,
    pub ambient: f32,
    pub bloom_intensity: f32,
    pub toon_steps: u32,
}

pub(crate) fn cel_program(label: &str, u: &CelUniforms) -> ShaderProgram {
    ShaderProgram {
        label: format!("cel:{label}"),
        vertex: CEL_VERTEX.to_string(),
        fragment: CEL_FRAGMENT.to_string(),
        uniforms: vec![
            Uniform {
                name: "base_color",
                value: UniformValue::Color(u.base),
            },
            Uniform {
                name: "rim_color",
                value: UniformValue::Color(u.rim_color),
            },
            Uniform {
                name: "rim_power",
                value: UniformValue::F32(u.rim_power),
            },
            Uniform {
                name: "rim_strength",
                value: UniformValue::F32(u.rim_strength),
            },
            Uniform {
                name: "ambient",
                value: UniformValue::F32(u.ambient),
            },
            Uniform {
                name: "bloom_intensity",
                value: UniformValue::F32(u.bloom_intensity),
            },
            Uniform {
                name: "toon_steps",
                value: UniformValue::U32(u.toon_steps),
            },
            Uniform {
                name: "toon_ramp",
                value: UniformValue::Texture {
                    width: crate::material::ramp::ToonRamp::WIDTH,
                    height: 1,
                },
            },
        ],
    }
}

pub(crate) fn outline_program(color: Color, width: f32) -> ShaderProgram {
    ShaderProgram {
        label: "outline".to_string(),
        vertex: OUTLINE_VERTEX.to_string(),
        fragment: OUTLINE_FRAGMENT.to_string(),
        uniforms: vec![
            Uniform {
                name: "color",
                value: UniformValue::Color(color),
            },
            Uniform {
                name: "width",
                value: UniformValue::F32(width),
            },
        ],
    }
}
