//! Scene graph: nodes, transforms and tessellated geometry.

pub mod geometry;
pub mod graph;
