//! Fundamental types shared across the pipeline:
//! - [`Error`] / [`Result`] - Error handling
//! - [`BBox3f`] - Bounding boxes
//! - Math type re-exports from glam

mod error;
mod math;

pub use error::*;
pub use math::*;
