use image::{GrayImage, Luma};

use crate::foundation::math::smoothstep;

/// 1-D lighting gradient encoding quantised bands, stored as a 256x1 luminance texture.
#[derive(Clone, Debug, PartialEq)]
pub struct ToonRamp {
    steps: u32,
    smoothness: f32,
    image: GrayImage,
}

impl ToonRamp {
    pub const WIDTH: u32 = 256;

    /// `steps` is clamped to at least one band; `smoothness` (clamped to `[0, 1]`) is the fraction
    /// of each band spent blending into the next one.
    pub fn generate(steps: u32, smoothness: f32) -> Self {
        let steps = steps.max(1);
        let smoothness = if smoothness.is_finite() {
            smoothness.clamp(0.0, 1.0)
        } else {
            0.0
        };
        let mut image = GrayImage::new(Self::WIDTH, 1);
        for x in 0..Self::WIDTH {
            let t = x as f32 / (Self::WIDTH - 1) as f32;
            let v = band_value(t, steps, smoothness);
            image.put_pixel(x, 0, Luma([(v * 255.0).round() as u8]));
        }
        Self {
            steps,
            smoothness,
            image,
        }
    }

    pub fn steps(&self) -> u32 {
        self.steps
    }

    pub fn smoothness(&self) -> f32 {
        self.smoothness
    }

    pub fn image(&self) -> &GrayImage {
        &self.image
    }

    /// Ramp value at `t` in `[0, 1]` (clamped), nearest texel.
    pub fn sample(&self, t: f32) -> f32 {
        let t = if t.is_finite() { t.clamp(0.0, 1.0) } else { 0.0 };
        let x = (t * (Self::WIDTH - 1) as f32).round() as u32;
        f32::from(self.image.get_pixel(x, 0).0[0]) / 255.0
    }

    /// Number of distinct texel values.
    pub fn distinct_levels(&self) -> usize {
        let mut seen = [false; 256];
        for p in self.image.pixels() {
            seen[p.0[0] as usize] = true;
        }
        seen.iter().filter(|s| **s).count()
    }
}

fn band_value(t: f32, steps: u32, smoothness: f32) -> f32 {
    if steps == 1 {
        return 1.0;
    }
    let last = (steps - 1) as f32;
    let scaled = t * steps as f32;
    let band = scaled.floor().min(last);
    let level = band / last;
    if band >= last || smoothness <= 0.0 {
        return level;
    }
    let frac = scaled - band;
    let blend = smoothstep(1.0 - smoothness, 1.0, frac);
    level + blend / last
}

#[cfg(test)]
#[path = "../../tests/unit/material/ramp.rs"]
mod tests;
