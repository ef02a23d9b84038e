//! Sprite flattening: posed offscreen captures packed into cached sprite-sheet atlases.

pub mod atlas;
pub mod cache;
pub mod flatten;
pub mod pose;
pub mod runner;
