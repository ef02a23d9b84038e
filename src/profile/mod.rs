//! Avatar profiles and the sources they are read from.

pub mod model;
pub mod source;
