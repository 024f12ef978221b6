//! # cfdmesh
//!
//! Converter from legacy (4.x) VTK datasets to the C4A mesh container.
//!
//! A batch of per-time-step `.vtk` snapshots is parsed, triangulated
//! into a compact render-ready mesh, combined along the time axis,
//! optionally sliced under a vertex budget, and serialized into a
//! seekable little-endian container.
//!
//! ## Modules
//!
//! - [`util`] - errors, math types, bounding boxes
//! - [`vtk`] - legacy VTK tokenizer, data model and parser
//! - [`mesh`] - triangulated mesh model, transcoder, combiner, slicer
//! - [`container`] - C4A reader and writer (versions 1 and 2)
//! - [`pipeline`] - the end-to-end conversion driver
//!
//! ## Example
//!
//! ```ignore
//! use cfdmesh::prelude::*;
//!
//! let opts = ConvertOptions { slice_budget: Some(60_000), ..Default::default() };
//! let mesh = convert(&inputs, Path::new("cavity.c4a"), &opts)?;
//! println!("{} submeshes, {} time steps", mesh.submeshes.len(), mesh.time_step_count);
//! ```

pub mod container;
pub mod mesh;
pub mod pipeline;
pub mod util;
pub mod vtk;

// Re-export commonly used types
pub use util::{Error, Result};
pub use vtk::Dataset;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::container::{read_mesh, write_mesh};
    pub use crate::mesh::{combine, slice_mesh, transcode, Mesh, Submesh};
    pub use crate::pipeline::{convert, ConvertOptions, DEFAULT_SLICE_BUDGET};
    pub use crate::util::{BBox3f, Error, Result};
    pub use crate::vtk::Dataset;
}
