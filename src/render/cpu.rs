//! Triangle rasterizer over `vello_cpu`.
//!
//! Meshes are tessellated, transformed and flat-shaded per face, then painted back to front
//! within each render order (painter's algorithm).

use crate::foundation::core::{Color, Mat3, Mat4, Vec3};
use crate::foundation::error::{ForgeError, ForgeResult};
use crate::render::camera::OrthoCamera;
use crate::render::frame::FrameRGBA;
use crate::representation::CropBounds;
use crate::scene::graph::{CullMode, SceneNode};

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RasterSettings {
    pub background: Color,
    /// Light direction in view space, pointing towards the light.
    pub light_dir: Vec3,
}

impl Default for RasterSettings {
    fn default() -> Self {
        Self {
            background: Color::rgba(0, 0, 0, 0),
            light_dir: Vec3::new(0.4, 0.7, 0.6),
        }
    }
}

struct ShadedTriangle {
    order: i32,
    depth: f32,
    points: [(f64, f64); 3],
    color: Color,
}

/// Render `root` through `camera`. Triangles whose world centroid lies outside `crop` are skipped.
#[tracing::instrument(skip_all, fields(w = camera.size().0, h = camera.size().1))]
pub fn render_scene(
    root: &SceneNode,
    camera: &OrthoCamera,
    crop: Option<&CropBounds>,
    settings: &RasterSettings,
) -> ForgeResult<FrameRGBA> {
    let (width, height) = camera.size();
    let w: u16 = width
        .try_into()
        .map_err(|_| ForgeError::render("frame width exceeds u16"))?;
    let h: u16 = height
        .try_into()
        .map_err(|_| ForgeError::render("frame height exceeds u16"))?;
    if w == 0 || h == 0 {
        return Err(ForgeError::render("frame dimensions must be non-zero"));
    }

    let mut tris = collect_triangles(root, camera, crop, settings);
    tris.sort_by(|a, b| a.order.cmp(&b.order).then(a.depth.total_cmp(&b.depth)));

    let mut ctx = vello_cpu::RenderContext::new(w, h);
    let mut pixmap = vello_cpu::Pixmap::new(w, h);
    let bg = settings.background;
    if bg.a != 0 {
        ctx.set_paint(vello_cpu::peniko::Color::from_rgba8(bg.r, bg.g, bg.b, bg.a));
        ctx.fill_rect(&vello_cpu::kurbo::Rect::new(
            0.0,
            0.0,
            f64::from(w),
            f64::from(h),
        ));
    }
    for tri in &tris {
        let path = triangle_path(&tri.points);
        ctx.set_paint(vello_cpu::peniko::Color::from_rgba8(
            tri.color.r,
            tri.color.g,
            tri.color.b,
            tri.color.a,
        ));
        ctx.fill_path(&path);
    }
    ctx.flush();
    ctx.render_to_pixmap(&mut pixmap);

    tracing::trace!(triangles = tris.len(), "scene rasterized");
    Ok(FrameRGBA {
        width,
        height,
        data: pixmap.data_as_u8_slice().to_vec(),
        premultiplied: true,
    })
}

fn collect_triangles(
    root: &SceneNode,
    camera: &OrthoCamera,
    crop: Option<&CropBounds>,
    settings: &RasterSettings,
) -> Vec<ShadedTriangle> {
    let light = settings.light_dir.normalize_or_zero();
    let mut out = Vec::new();
    root.visit_meshes(Mat4::IDENTITY, &mut |_, mesh, world| {
        let normal_matrix = Mat3::from_mat4(world).inverse().transpose();
        if !normal_matrix.is_finite() {
            return;
        }
        let tess = mesh.geometry.tessellate();
        for tri in &tess.indices {
            let idx = tri.map(|i| i as usize);
            if idx.iter().any(|&i| i >= tess.positions.len() || i >= tess.normals.len()) {
                continue;
            }
            let local_n = idx.map(|i| tess.normals[i]);
            let world_p =
                idx.map(|i| world.transform_point3(tess.positions[i] + tess.normals[i] * mesh.inflate));

            let face_n = (local_n[0] + local_n[1] + local_n[2]).normalize_or_zero();
            let view_n = camera
                .dir_to_view(normal_matrix * face_n)
                .normalize_or_zero();
            let facing = view_n.z;
            let keep = match mesh.cull {
                CullMode::Back => facing > 0.0,
                CullMode::Front => facing <= 0.0,
                CullMode::None => true,
            };
            if !keep {
                continue;
            }

            let centroid = (world_p[0] + world_p[1] + world_p[2]) / 3.0;
            if crop.is_some_and(|c| !c.contains(centroid)) {
                continue;
            }

            let view_p = world_p.map(|p| camera.to_view(p));
            let shade_n = if mesh.cull == CullMode::Front {
                -view_n
            } else {
                view_n
            };
            out.push(ShadedTriangle {
                order: mesh.render_order,
                depth: (view_p[0].z + view_p[1].z + view_p[2].z) / 3.0,
                points: view_p.map(|v| camera.to_screen(v)),
                color: mesh.material.shade(shade_n, light, Vec3::Z),
            });
        }
    });
    out
}

fn triangle_path(points: &[(f64, f64); 3]) -> vello_cpu::kurbo::BezPath {
    use vello_cpu::kurbo::{BezPath, Point};

    let mut path = BezPath::new();
    path.move_to(Point::new(points[0].0, points[0].1));
    path.line_to(Point::new(points[1].0, points[1].1));
    path.line_to(Point::new(points[2].0, points[2].1));
    path.close_path();
    path
}

#[cfg(test)]
#[path = "../../tests/unit/render/cpu.rs"]
mod tests;
