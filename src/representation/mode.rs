use std::fmt;
use std::str::FromStr;

use crate::foundation::core::{Color, Vec3};
use crate::foundation::error::{ForgeError, ForgeResult};

/// Named visual framing for a game surface.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "camelCase")]
pub enum RepresentationMode {
    FullBody,
    Bust,
    Portrait,
    Chibi,
    SideScroller,
}

impl RepresentationMode {
    pub const ALL: [RepresentationMode; 5] = [
        RepresentationMode::FullBody,
        RepresentationMode::Bust,
        RepresentationMode::Portrait,
        RepresentationMode::Chibi,
        RepresentationMode::SideScroller,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            RepresentationMode::FullBody => "fullBody",
            RepresentationMode::Bust => "bust",
            RepresentationMode::Portrait => "portrait",
            RepresentationMode::Chibi => "chibi",
            RepresentationMode::SideScroller => "sideScroller",
        }
    }
}

impl fmt::Display for RepresentationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RepresentationMode {
    type Err = ForgeError;

    /// Exact names only; there is no default mode for unknown strings.
    fn from_str(s: &str) -> ForgeResult<Self> {
        RepresentationMode::ALL
            .into_iter()
            .find(|m| m.as_str() == s)
            .ok_or_else(|| ForgeError::validation(format!("unknown representation mode '{s}'")))
    }
}

/// Axis-aligned box in world space (after the mode scale) restricting what is drawn.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize)]
pub struct CropBounds {
    pub min: Vec3,
    pub max: Vec3,
}

impl CropBounds {
    pub fn contains(&self, p: Vec3) -> bool {
        p.cmpge(self.min).all() && p.cmple(self.max).all()
    }

    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    pub fn size(&self) -> Vec3 {
        self.max - self.min
    }
}

/// Per-mode adjustments to the cel materials and outlines.
///
/// `rim_power` multiplies each preset's rim exponent; `toon_steps`, `smoothness` and `rim_color`
/// override the preset when set. Bloom and outline values are absolute.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShadingTweaks {
    pub rim_power: f32,
    pub rim_color: Option<Color>,
    pub toon_steps: Option<u32>,
    pub smoothness: Option<f32>,
    pub bloom_intensity: f32,
    pub outline_width: f32,
    pub outline_color: Color,
}

const OUTLINE_COLOR: Color = Color::rgb(0x1a, 0x1a, 0x2e);

/// Constant bundle for one mode.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RepresentationTransform {
    pub scale: Vec3,
    /// Camera position; the camera looks down -Z at this height.
    pub camera_offset: Vec3,
    pub shading: ShadingTweaks,
    pub crop: Option<CropBounds>,
    /// Orthographic framing height when there is no crop.
    pub view_height: f32,
}

/// The single source of framing constants for every game surface.
pub fn transform_for(mode: RepresentationMode) -> RepresentationTransform {
    match mode {
        RepresentationMode::FullBody => RepresentationTransform {
            scale: Vec3::ONE,
            camera_offset: Vec3::new(0.0, 0.9, 3.2),
            shading: ShadingTweaks {
                rim_power: 1.0,
                rim_color: None,
                toon_steps: None,
                smoothness: None,
                bloom_intensity: 0.1,
                outline_width: 0.015,
                outline_color: OUTLINE_COLOR,
            },
            crop: None,
            view_height: 2.1,
        },
        RepresentationMode::Bust => RepresentationTransform {
            scale: Vec3::ONE,
            camera_offset: Vec3::new(0.0, 1.45, 1.6),
            shading: ShadingTweaks {
                rim_power: 0.9,
                rim_color: None,
                toon_steps: None,
                smoothness: None,
                bloom_intensity: 0.15,
                outline_width: 0.012,
                outline_color: OUTLINE_COLOR,
            },
            crop: Some(CropBounds {
                min: Vec3::new(-0.6, 1.0, -0.6),
                max: Vec3::new(0.6, 1.9, 0.6),
            }),
            view_height: 1.0,
        },
        RepresentationMode::Portrait => RepresentationTransform {
            scale: Vec3::ONE,
            camera_offset: Vec3::new(0.0, 1.6, 1.0),
            shading: ShadingTweaks {
                rim_power: 0.8,
                rim_color: Some(Color::rgb(0xff, 0xf0, 0xf5)),
                toon_steps: None,
                smoothness: Some(0.15),
                bloom_intensity: 0.25,
                outline_width: 0.008,
                outline_color: OUTLINE_COLOR,
            },
            crop: Some(CropBounds {
                min: Vec3::new(-0.35, 1.35, -0.4),
                max: Vec3::new(0.35, 1.9, 0.4),
            }),
            view_height: 0.6,
        },
        RepresentationMode::Chibi => RepresentationTransform {
            scale: Vec3::splat(1.5),
            camera_offset: Vec3::new(0.0, 1.35, 4.0),
            shading: ShadingTweaks {
                rim_power: 1.2,
                rim_color: None,
                toon_steps: Some(2),
                smoothness: Some(0.0),
                bloom_intensity: 0.2,
                outline_width: 0.04,
                outline_color: OUTLINE_COLOR,
            },
            crop: None,
            view_height: 3.0,
        },
        RepresentationMode::SideScroller => RepresentationTransform {
            scale: Vec3::ONE,
            camera_offset: Vec3::new(0.0, 1.1, 4.0),
            shading: ShadingTweaks {
                rim_power: 1.0,
                rim_color: None,
                toon_steps: Some(3),
                smoothness: Some(0.0),
                bloom_intensity: 0.0,
                outline_width: 0.02,
                outline_color: Color::BLACK,
            },
            crop: None,
            view_height: 2.6,
        },
    }
}

#[cfg(test)]
#[path = "../../tests/unit/representation/mode.rs"]
mod tests;
