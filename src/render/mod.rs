//! CPU rendering: orthographic camera, rasterizer and the mounted renderer component.

pub mod camera;
pub mod cpu;
pub mod frame;
pub mod renderer;
