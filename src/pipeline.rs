//! End-to-end conversion: VTK snapshots in, one container out.

use std::path::{Path, PathBuf};
use std::time::Instant;

use rayon::prelude::*;
use tracing::info;

use crate::container::{format, write_mesh};
use crate::mesh::{combine, slice_mesh, transcode, Mesh};
use crate::util::{Error, Result};
use crate::vtk::Dataset;

/// Vertex budget used when slicing is requested without an explicit
/// limit. Matches the historical default of the original converter.
pub const DEFAULT_SLICE_BUDGET: usize = 60_000;

#[derive(Clone, Debug)]
pub struct ConvertOptions {
    /// Slice submeshes above this many vertices. `None` disables slicing.
    pub slice_budget: Option<usize>,
    /// Container version to write.
    pub version: u32,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        Self {
            slice_budget: None,
            version: format::VERSION_2,
        }
    }
}

/// Convert a batch of VTK snapshot files into a single container at
/// `output`. Inputs are given in time order; each file is loaded and
/// transcoded in parallel, then the snapshots are combined, optionally
/// sliced, and written out. Returns the mesh that was written.
pub fn convert(inputs: &[PathBuf], output: &Path, opts: &ConvertOptions) -> Result<Mesh> {
    if inputs.is_empty() {
        return Err(Error::format("no input files given"));
    }

    let start = Instant::now();
    let meshes = inputs
        .par_iter()
        .map(|path| {
            let dataset = Dataset::open(path)?;
            transcode(&dataset)
        })
        .collect::<Result<Vec<Mesh>>>()?;
    info!(
        "transcoded {} snapshot(s) in {:.2?}",
        inputs.len(),
        start.elapsed()
    );

    let stage = Instant::now();
    let mut mesh = combine(meshes)?;
    info!(
        "combined into {} submesh(es), {} time step(s) in {:.2?}",
        mesh.submeshes.len(),
        mesh.time_step_count,
        stage.elapsed()
    );

    if let Some(budget) = opts.slice_budget {
        let stage = Instant::now();
        let before = mesh.submeshes.len();
        slice_mesh(&mut mesh, budget);
        info!(
            "sliced {} submesh(es) into {} under budget {} in {:.2?}",
            before,
            mesh.submeshes.len(),
            budget,
            stage.elapsed()
        );
    }

    let stage = Instant::now();
    write_mesh(output, &mesh, opts.version)?;
    info!(
        "wrote v{} container {:?} in {:.2?} (total {:.2?})",
        opts.version,
        output,
        stage.elapsed(),
        start.elapsed()
    );
    Ok(mesh)
}
