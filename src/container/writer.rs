//! Container writer.
//!
//! All writes happen against a `.tmp` sibling which is renamed over the
//! target only after a clean flush, so a failed run never leaves a
//! truncated container behind.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use super::format::*;
use super::stream::OStream;
use crate::mesh::{AttributeSeries, Mesh, Submesh};
use crate::util::{BBox3f, Error, Result};

/// Serialize `mesh` to `path` in the requested container version.
pub fn write_mesh(path: impl AsRef<Path>, mesh: &Mesh, version: u32) -> Result<()> {
    let path = path.as_ref();
    let tmp = tmp_path(path);
    let mut out = OStream::create(&tmp)?;

    let res = match version {
        VERSION_1 => write_v1(&mut out, mesh),
        VERSION_2 => write_v2(&mut out, mesh),
        other => Err(Error::UnsupportedVersion(other)),
    }
    .and_then(|_| out.flush());
    drop(out);

    if let Err(e) = res {
        let _ = fs::remove_file(&tmp);
        return Err(e);
    }
    fs::rename(&tmp, path)?;
    debug!("wrote v{} container to {:?}", version, path);
    Ok(())
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut os = path.as_os_str().to_owned();
    os.push(".tmp");
    PathBuf::from(os)
}

fn write_v1(out: &mut OStream, mesh: &Mesh) -> Result<()> {
    out.write_u32(VERSION_1)?;
    out.write_string(&mesh.name)?;
    write_bbox(out, &mesh.bbox)?;
    out.write_u32(mesh.submeshes.len() as u32)?;
    for sub in &mesh.submeshes {
        write_geometry(out, sub, false)?;
        write_attrib_dict(out, &sub.scalar_attribs)?;
        write_attrib_dict(out, &sub.vector_attribs)?;
    }
    Ok(())
}

fn write_v2(out: &mut OStream, mesh: &Mesh) -> Result<()> {
    let first = mesh
        .submeshes
        .first()
        .ok_or_else(|| Error::format("cannot write an empty mesh"))?;

    out.write_u32(VERSION_2)?;
    out.write_string(&mesh.name)?;
    write_bbox(out, &mesh.bbox)?;
    out.write_u32(mesh.time_step_count as u32)?;
    out.write_u32(mesh.submeshes.len() as u32)?;
    let geometry_slot = out.reserve_u32()?;

    // the directory is keyed by the first submesh; every other submesh
    // must carry the same attributes
    let mut entries = Vec::new();
    for key in first.scalar_attribs.keys() {
        entries.push((key.clone(), DATA_KIND_SCALAR));
    }
    for key in first.vector_attribs.keys() {
        entries.push((key.clone(), DATA_KIND_VECTOR));
    }

    out.write_u32(entries.len() as u32)?;
    let mut slots = Vec::with_capacity(entries.len());
    for (name, kind) in &entries {
        out.write_string(name)?;
        out.write_u32(*kind)?;
        slots.push(out.reserve_u32()?);
    }

    out.patch_u32(geometry_slot, offset_u32(out.pos())?)?;
    for sub in &mesh.submeshes {
        write_geometry(out, sub, true)?;
    }

    for ((name, kind), slot) in entries.iter().zip(slots) {
        out.patch_u32(slot, offset_u32(out.pos())?)?;
        // one component count per directory entry, across all submeshes
        let mut entry_components: Option<usize> = None;
        for (key, sub) in mesh.submeshes.iter().enumerate() {
            let series = match *kind {
                DATA_KIND_SCALAR => sub.scalar_attribs.get(name),
                _ => sub.vector_attribs.get(name),
            }
            .ok_or_else(|| {
                Error::AttributeMismatch(format!(
                    "submesh {:?} is missing attribute {:?}",
                    sub.name, name
                ))
            })?;
            let components = write_series(out, name, key as u32, series)?;
            match entry_components {
                None => entry_components = Some(components),
                Some(c) if c == components => {}
                Some(c) => {
                    return Err(Error::AttributeMismatch(format!(
                        "attribute {:?} has {} components on submesh {:?}, expected {}",
                        name, components, sub.name, c
                    )));
                }
            }
        }
    }
    Ok(())
}

/// Patched offsets are stored as u32; the format caps out at 4 GiB.
fn offset_u32(pos: u64) -> Result<u32> {
    u32::try_from(pos)
        .map_err(|_| Error::format(format!("container offset {pos} exceeds the u32 range")))
}

/// One attribute series for one submesh, time-step-major. Each submesh
/// records its own step count: shared geometry carries the full series
/// while per-snapshot submeshes carry a single step. Returns the
/// component count written.
fn write_series(out: &mut OStream, name: &str, key: u32, series: &AttributeSeries) -> Result<usize> {
    let item_count = series.first().map_or(0, |step| step.len());
    let components = uniform_components(name, series)?;
    for step in series {
        if step.len() != item_count {
            return Err(Error::AttributeMismatch(format!(
                "attribute {:?} has ragged item counts across time steps",
                name
            )));
        }
    }

    out.write_u32(key)?;
    out.write_u32(series.len() as u32)?;
    out.write_u32(item_count as u32)?;
    out.write_u32(components as u32)?;
    out.write_u32(ELEM_TYPE_F32)?;
    for step in series {
        for item in step {
            for &v in item {
                out.write_f32(v)?;
            }
        }
    }
    Ok(components)
}

/// Component count shared by every item of every time step.
fn uniform_components(name: &str, series: &[Vec<Vec<f32>>]) -> Result<usize> {
    let mut components = None;
    for step in series {
        for item in step {
            match components {
                None => components = Some(item.len()),
                Some(c) if c == item.len() => {}
                Some(c) => {
                    return Err(Error::AttributeMismatch(format!(
                        "attribute {:?} mixes {} and {} components",
                        name,
                        c,
                        item.len()
                    )));
                }
            }
        }
    }
    Ok(components.unwrap_or(0))
}

fn write_attrib_dict(
    out: &mut OStream,
    attribs: &std::collections::BTreeMap<String, AttributeSeries>,
) -> Result<()> {
    out.write_u32(attribs.len() as u32)?;
    for (name, series) in attribs {
        out.write_string(name)?;
        out.write_u32(series.len() as u32)?;
        for step in series {
            let components = uniform_components(name, std::slice::from_ref(step))?;
            out.write_u32(step.len() as u32)?;
            out.write_u32(components as u32)?;
            for item in step {
                for &v in item {
                    out.write_f32(v)?;
                }
            }
        }
    }
    Ok(())
}

pub(super) fn write_geometry(out: &mut OStream, sub: &Submesh, with_time_step: bool) -> Result<()> {
    out.write_string(&sub.name)?;
    if with_time_step {
        out.write_u32(sub.time_step as u32)?;
    }
    write_bbox(out, &sub.bbox)?;

    out.write_u32(sub.vertices.len() as u32)?;
    for &v in &sub.vertices {
        out.write_vec3(v)?;
    }
    out.write_u32(sub.normals.len() as u32)?;
    for &n in &sub.normals {
        out.write_vec3(n)?;
    }
    out.write_u32(sub.texcoords.len() as u32)?;
    for &t in &sub.texcoords {
        out.write_vec4(t)?;
    }
    out.write_u32(sub.colors.len() as u32)?;
    for &c in &sub.colors {
        out.write_vec4(c)?;
    }

    out.write_u32(sub.index_kind as u32)?;
    out.write_u32(sub.indices.len() as u32)?;
    for &i in &sub.indices {
        out.write_u32(i)?;
    }
    Ok(())
}

pub(super) fn write_bbox(out: &mut OStream, bbox: &BBox3f) -> Result<()> {
    out.write_vec3(bbox.min)?;
    out.write_vec3(bbox.max)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::IndexKind;
    use crate::util::Vec3;
    use tempfile::tempdir;

    fn flat_submesh(name: &str, components: usize) -> Submesh {
        let mut sub = Submesh::new(name);
        sub.index_kind = IndexKind::Triangles;
        sub.vertices = vec![Vec3::ZERO; 3];
        sub.indices = vec![0, 1, 2];
        sub.scalar_attribs
            .insert("pressure".into(), vec![vec![vec![1.0; components]; 3]]);
        sub
    }

    #[test]
    fn test_v2_cross_submesh_component_mismatch_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("mesh.c4a");
        let mut mesh = Mesh::new("m");
        mesh.submeshes.push(flat_submesh("a", 1));
        mesh.submeshes.push(flat_submesh("b", 2));
        let err = write_mesh(&path, &mesh, VERSION_2).unwrap_err();
        assert!(matches!(err, Error::AttributeMismatch(_)));
        assert!(!path.exists());
    }

    #[test]
    fn test_offset_cast_guard() {
        assert_eq!(offset_u32(12).unwrap(), 12);
        assert_eq!(offset_u32(u32::MAX as u64).unwrap(), u32::MAX);
        assert!(matches!(
            offset_u32(5 * 1024 * 1024 * 1024),
            Err(Error::Format(_))
        ));
    }
}
