use crate::foundation::core::{Mat3, Mat4, Vec3};
use crate::representation::RepresentationTransform;

/// Orthographic camera looking down its local -Z axis.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct OrthoCamera {
    view: Mat4,
    rotation: Mat3,
    half_width: f32,
    half_height: f32,
    width_px: u32,
    height_px: u32,
}

impl OrthoCamera {
    /// `view_height` is the world-space height of the visible area; width follows the aspect.
    pub fn look_at(eye: Vec3, target: Vec3, view_height: f32, width_px: u32, height_px: u32) -> Self {
        let view = Mat4::look_at_rh(eye, target, Vec3::Y);
        let aspect = width_px.max(1) as f32 / height_px.max(1) as f32;
        let half_height = (view_height * 0.5).max(f32::EPSILON);
        Self {
            view,
            rotation: Mat3::from_mat4(view),
            half_width: half_height * aspect,
            half_height,
            width_px,
            height_px,
        }
    }

    /// Camera framing for a representation mode.
    ///
    /// With crop bounds the camera centres on the crop box and frames its height with a small
    /// margin; otherwise it looks horizontally from the mode's camera offset.
    pub fn for_transform(t: &RepresentationTransform, width_px: u32, height_px: u32) -> Self {
        let (eye, view_height) = match &t.crop {
            Some(crop) => {
                let c = crop.center();
                (Vec3::new(c.x, c.y, t.camera_offset.z), crop.size().y * 1.1)
            }
            None => (t.camera_offset, t.view_height),
        };
        let target = Vec3::new(eye.x, eye.y, 0.0);
        Self::look_at(eye, target, view_height, width_px, height_px)
    }

    pub fn view(&self) -> Mat4 {
        self.view
    }

    pub fn to_view(&self, world: Vec3) -> Vec3 {
        self.view.transform_point3(world)
    }

    /// Rotate a world-space direction into view space.
    pub fn dir_to_view(&self, dir: Vec3) -> Vec3 {
        self.rotation * dir
    }

    /// View-space point to pixel coordinates (origin top-left).
    pub fn to_screen(&self, v: Vec3) -> (f64, f64) {
        let nx = v.x / self.half_width;
        let ny = v.y / self.half_height;
        let x = (nx * 0.5 + 0.5) * self.width_px as f32;
        let y = (0.5 - ny * 0.5) * self.height_px as f32;
        (f64::from(x), f64::from(y))
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width_px, self.height_px)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/camera.rs"]
mod tests;
