//! Annotation model for OpenType MATH data attached to font sources

pub mod anchors;
pub mod constants;
pub mod error;
pub mod guess;
pub mod interpolate;
pub mod model;
pub mod serde;
pub mod source;
pub mod types;
pub mod util;
