use std::f32::consts::{FRAC_PI_2, PI, TAU};
use std::fmt;
use std::str::FromStr;

use crate::foundation::core::{EulerRot, Quat, Transform3, Vec3};
use crate::foundation::error::ForgeError;

/// Animation state a sprite frame belongs to.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum AnimationState {
    Idle,
    Walk,
    Run,
    Jump,
    Attack,
    Hurt,
    Victory,
}

impl AnimationState {
    pub const ALL: [AnimationState; 7] = [
        AnimationState::Idle,
        AnimationState::Walk,
        AnimationState::Run,
        AnimationState::Jump,
        AnimationState::Attack,
        AnimationState::Hurt,
        AnimationState::Victory,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            AnimationState::Idle => "idle",
            AnimationState::Walk => "walk",
            AnimationState::Run => "run",
            AnimationState::Jump => "jump",
            AnimationState::Attack => "attack",
            AnimationState::Hurt => "hurt",
            AnimationState::Victory => "victory",
        }
    }
}

impl fmt::Display for AnimationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AnimationState {
    type Err = ForgeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|st| st.as_str() == s)
            .ok_or_else(|| ForgeError::validation(format!("unknown animation state '{s}'")))
    }
}

/// Facing direction of a sprite frame.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Front,
    Back,
    Left,
    Right,
}

impl Direction {
    pub const ALL: [Direction; 4] = [
        Direction::Front,
        Direction::Back,
        Direction::Left,
        Direction::Right,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Direction::Front => "front",
            Direction::Back => "back",
            Direction::Left => "left",
            Direction::Right => "right",
        }
    }

    /// Rotation about +Y (radians) that turns a camera-facing figure towards this direction.
    pub fn yaw(self) -> f32 {
        match self {
            Direction::Front => 0.0,
            Direction::Right => FRAC_PI_2,
            Direction::Left => -FRAC_PI_2,
            Direction::Back => PI,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Direction {
    type Err = ForgeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|d| d.as_str() == s)
            .ok_or_else(|| ForgeError::validation(format!("unknown direction '{s}'")))
    }
}

/// Source of per-frame body poses.
///
/// `t` is normalized animation time in `[0, 1)`. Implementations must be deterministic: the atlas
/// cache assumes identical inputs produce identical frames.
pub trait PoseStrategy: Send + Sync {
    fn pose_at(&self, state: AnimationState, t: f32) -> Transform3;
}

/// Closed-form pose perturbations standing in for skeletal animation.
#[derive(Clone, Copy, Debug, Default)]
pub struct FormulaPoses;

impl FormulaPoses {
    fn gait(phase: f32, speed: f32) -> Transform3 {
        let bounce = 0.04 * speed * phase.sin().abs();
        let roll = 0.05 * speed * phase.sin();
        Transform3 {
            translation: Vec3::new(0.0, bounce, 0.0),
            rotation: Quat::from_rotation_z(roll),
            scale: Vec3::ONE,
        }
    }
}

impl PoseStrategy for FormulaPoses {
    fn pose_at(&self, state: AnimationState, t: f32) -> Transform3 {
        let t = if t.is_finite() { t.rem_euclid(1.0) } else { 0.0 };
        let phase = t * TAU;
        match state {
            AnimationState::Idle => {
                Transform3::from_translation(Vec3::new(0.0, 0.015 * phase.sin(), 0.0))
            }
            AnimationState::Walk => Self::gait(phase, 1.0),
            AnimationState::Run => Self::gait(phase, 2.0),
            AnimationState::Jump => {
                Transform3::from_translation(Vec3::new(0.0, 0.6 * 4.0 * t * (1.0 - t), 0.0))
            }
            AnimationState::Attack => {
                let lunge = (t * PI).sin();
                Transform3 {
                    translation: Vec3::new(0.0, 0.0, 0.25 * lunge),
                    rotation: Quat::from_rotation_x(0.15 * lunge),
                    scale: Vec3::ONE,
                }
            }
            AnimationState::Hurt => Transform3 {
                translation: Vec3::ZERO,
                rotation: Quat::from_euler(EulerRot::XYZ, -0.05, 0.0, 0.2 * (2.0 * phase).sin()),
                scale: Vec3::ONE,
            },
            AnimationState::Victory => Transform3::from_translation(Vec3::new(
                0.0,
                0.05 * (0.5 - 0.5 * phase.cos()),
                0.0,
            )),
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/sprite/pose.rs"]
mod tests;
