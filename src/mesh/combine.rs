//! Merge per-file snapshot meshes into one time-indexed mesh.

use tracing::debug;

use super::Mesh;
use crate::util::{Error, Result};

/// Merge an ordered list of snapshot meshes.
///
/// Geometry equality is decided by comparing every later snapshot against
/// the first (the original tool probed a single random snapshot, which
/// could misclassify a series whose geometry varies elsewhere).
///
/// Matching geometry: the snapshots share one geometry and every later
/// mesh only contributes its attribute series, appended in input order.
/// Differing geometry: later meshes keep their own submeshes, tagged with
/// their snapshot index, and no attribute merge is attempted.
pub fn combine(mut meshes: Vec<Mesh>) -> Result<Mesh> {
    match meshes.len() {
        0 => return Err(Error::SnapshotMismatch("empty snapshot list".into())),
        1 => return Ok(meshes.remove(0)),
        _ => {}
    }

    let same_geometry = meshes[1..]
        .iter()
        .all(|m| geometry_matches(&meshes[0], m));
    debug!(
        "combining {} snapshots, shared geometry: {}",
        meshes.len(),
        same_geometry
    );

    let mut first = meshes.remove(0);
    let rest = meshes;
    first.time_step_count = 1 + rest.len();

    if same_geometry {
        for later in rest {
            if later.submeshes.len() != first.submeshes.len() {
                return Err(Error::SnapshotMismatch(format!(
                    "snapshot {:?} has {} submeshes, expected {}",
                    later.name,
                    later.submeshes.len(),
                    first.submeshes.len()
                )));
            }
            for (sub, later_sub) in first.submeshes.iter_mut().zip(later.submeshes) {
                if later_sub.scalar_attribs.len() != sub.scalar_attribs.len()
                    || later_sub.vector_attribs.len() != sub.vector_attribs.len()
                {
                    return Err(Error::SnapshotMismatch(format!(
                        "submesh {:?}: attribute sets differ across snapshots",
                        sub.name
                    )));
                }
                for (key, series) in later_sub.scalar_attribs {
                    sub.scalar_attribs
                        .get_mut(&key)
                        .ok_or_else(|| {
                            Error::SnapshotMismatch(format!(
                                "missing scalar attribute {key:?}"
                            ))
                        })?
                        .extend(series);
                }
                for (key, series) in later_sub.vector_attribs {
                    sub.vector_attribs
                        .get_mut(&key)
                        .ok_or_else(|| {
                            Error::SnapshotMismatch(format!(
                                "missing vector attribute {key:?}"
                            ))
                        })?
                        .extend(series);
                }
            }
        }
    } else {
        for (i, later) in rest.into_iter().enumerate() {
            first.bbox.expand_by_box(&later.bbox);
            for mut sub in later.submeshes {
                sub.time_step = i + 1;
                first.submeshes.push(sub);
            }
        }
    }

    Ok(first)
}

/// Geometry comparison: submesh count plus a deep check of the first
/// submesh (name, vertex count, index kind, element-wise vertices and
/// indices).
fn geometry_matches(a: &Mesh, b: &Mesh) -> bool {
    if a.submeshes.len() != b.submeshes.len() {
        return false;
    }
    let (Some(sa), Some(sb)) = (a.submeshes.first(), b.submeshes.first()) else {
        return a.submeshes.is_empty() && b.submeshes.is_empty();
    };
    sa.name == sb.name
        && sa.index_kind == sb.index_kind
        && sa.vertices == sb.vertices
        && sa.indices == sb.indices
}
