//! Avatar assembly: registry resolution, procedural fallback, materials, gated overlay.

pub mod parts;
pub mod pipeline;
pub mod procedural;
