//! Partition oversized submeshes under a vertex budget.

use std::collections::HashMap;

use tracing::debug;

use super::{Mesh, Submesh};
use crate::util::BBox3f;

/// Split every submesh above `budget` vertices into under-budget slices,
/// one whole triangle at a time. Submeshes already within budget pass
/// through untouched.
pub fn slice_mesh(mesh: &mut Mesh, budget: usize) {
    let old = std::mem::take(&mut mesh.submeshes);
    let mut out = Vec::with_capacity(old.len());
    for sub in old {
        if sub.vertex_count() <= budget {
            out.push(sub);
            continue;
        }
        slice_submesh(sub, budget, &mut out);
    }
    mesh.submeshes = out;
}

fn slice_submesh(sub: Submesh, budget: usize, out: &mut Vec<Submesh>) {
    let slice_count = sub.vertex_count().div_ceil(budget);
    // even per-slice fill so the last slice is not a sliver
    let target = sub.vertex_count() / slice_count;
    debug!(
        "slicing {:?}: {} vertices into ~{} slices (target {})",
        sub.name,
        sub.vertex_count(),
        slice_count,
        target
    );

    let mut remap: HashMap<u32, u32> = HashMap::new();
    // old indices in first-reference order; position = new index
    let mut order: Vec<u32> = Vec::new();
    let mut indices: Vec<u32> = Vec::new();
    let mut ordinal = 0usize;

    for tri in sub.indices.chunks(3) {
        for &idx in tri {
            let next = order.len() as u32;
            let new = *remap.entry(idx).or_insert_with(|| {
                order.push(idx);
                next
            });
            indices.push(new);
        }
        // close only on complete triangles: either this slice reached its
        // planned share, or one more triangle could blow the hard budget
        let planned_more = ordinal + 1 < slice_count;
        if (remap.len() >= target && planned_more) || remap.len() + 3 > budget {
            out.push(materialize_slice(&sub, &order, &indices, ordinal));
            ordinal += 1;
            remap.clear();
            order.clear();
            indices.clear();
        }
    }
    if !order.is_empty() {
        out.push(materialize_slice(&sub, &order, &indices, ordinal));
    }
}

/// Build one slice: vertices gathered by the old indices in `order`,
/// channels and attribute series re-indexed the same way.
fn materialize_slice(
    sub: &Submesh,
    order: &[u32],
    indices: &[u32],
    ordinal: usize,
) -> Submesh {
    let mut slice = Submesh::new(format!("{}_{}", sub.name, ordinal));
    slice.time_step = sub.time_step;
    slice.index_kind = sub.index_kind;
    slice.indices = indices.to_vec();

    slice.vertices = order.iter().map(|&o| sub.vertices[o as usize]).collect();
    slice.bbox = BBox3f::from_points(&slice.vertices);
    if !sub.normals.is_empty() {
        slice.normals = order.iter().map(|&o| sub.normals[o as usize]).collect();
    }
    if !sub.texcoords.is_empty() {
        slice.texcoords = order.iter().map(|&o| sub.texcoords[o as usize]).collect();
    }
    if !sub.colors.is_empty() {
        slice.colors = order.iter().map(|&o| sub.colors[o as usize]).collect();
    }

    for (key, series) in &sub.scalar_attribs {
        let remapped = series
            .iter()
            .map(|step| order.iter().map(|&o| step[o as usize].clone()).collect())
            .collect();
        slice.scalar_attribs.insert(key.clone(), remapped);
    }
    for (key, series) in &sub.vector_attribs {
        let remapped = series
            .iter()
            .map(|step| order.iter().map(|&o| step[o as usize].clone()).collect())
            .collect();
        slice.vector_attribs.insert(key.clone(), remapped);
    }

    slice
}
