use std::sync::Arc;

use crate::foundation::core::{Color, Vec3};
use crate::material::ramp::ToonRamp;
use crate::material::shader::{CelUniforms, ShaderProgram, cel_program};

/// Tuning of the shared stepped-lighting model.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CelParams {
    pub rim_color: Color,
    /// Rim falloff exponent; higher is narrower.
    pub rim_power: f32,
    pub rim_strength: f32,
    /// Number of lighting bands in the ramp.
    pub toon_steps: u32,
    /// Fraction of each band blended into the next.
    pub smoothness: f32,
    /// Light floor applied to the darkest band.
    pub ambient: f32,
    pub bloom_intensity: f32,
}

impl Default for CelParams {
    fn default() -> Self {
        Self {
            rim_color: Color::WHITE,
            rim_power: 3.0,
            rim_strength: 0.3,
            toon_steps: 3,
            smoothness: 0.05,
            ambient: 0.45,
            bloom_intensity: 0.0,
        }
    }
}

/// Cel material: base colour, tuning, its toon ramp and the matching WGSL program.
#[derive(Clone, Debug, PartialEq)]
pub struct CelMaterial {
    label: String,
    base: Color,
    params: CelParams,
    ramp: Arc<ToonRamp>,
    program: ShaderProgram,
}

impl CelMaterial {
    pub fn new(label: impl Into<String>, base: Color, params: CelParams) -> Self {
        let label = label.into();
        let ramp = Arc::new(ToonRamp::generate(params.toon_steps, params.smoothness));
        let program = cel_program(
            &label,
            &CelUniforms {
                base,
                rim_color: params.rim_color,
                rim_power: params.rim_power,
                rim_strength: params.rim_strength,
                ambient: params.ambient,
                bloom_intensity: params.bloom_intensity,
                toon_steps: ramp.steps(),
            },
        );
        Self {
            label,
            base,
            params,
            ramp,
            program,
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn base_color(&self) -> Color {
        self.base
    }

    pub fn params(&self) -> &CelParams {
        &self.params
    }

    pub fn ramp(&self) -> &ToonRamp {
        &self.ramp
    }

    pub fn program(&self) -> &ShaderProgram {
        &self.program
    }

    /// Same preset with a different base colour.
    pub fn recolored(&self, base: Color) -> Self {
        Self::new(self.label.clone(), base, self.params)
    }

    /// Same base colour with different tuning.
    pub fn with_params(&self, params: CelParams) -> Self {
        Self::new(self.label.clone(), self.base, params)
    }

    /// Evaluate the shading model. Vectors need not be normalised.
    pub fn shade(&self, normal: Vec3, light: Vec3, view: Vec3) -> Color {
        let n = normal.normalize_or_zero();
        let l = light.normalize_or_zero();
        let v = view.normalize_or_zero();
        let p = &self.params;

        let half_lambert = n.dot(l) * 0.5 + 0.5;
        let band = self.ramp.sample(half_lambert);
        let light_amount = p.ambient + (1.0 - p.ambient) * band;
        let rim = (1.0 - n.dot(v).max(0.0)).powf(p.rim_power.max(0.01)) * p.rim_strength;

        let rgb = (self.base.to_vec3() * light_amount + p.rim_color.to_vec3() * rim)
            * (1.0 + p.bloom_intensity * 0.15);
        Color::from_vec3(rgb, self.base.a)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/material/cel.rs"]
mod tests;
