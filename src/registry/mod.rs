//! Asset registry: catalogue model, never-failing loader, offline builder.

pub mod builder;
pub mod loader;
pub mod model;
