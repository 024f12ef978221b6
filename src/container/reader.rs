//! Container reader for both on-disk versions.

use std::path::Path;

use tracing::debug;

use super::format::*;
use super::stream::IStream;
use crate::mesh::{AttributeSeries, IndexKind, Mesh, Submesh};
use crate::util::{BBox3f, Error, Result};

/// Load a mesh from a container file, dispatching on the version tag.
pub fn read_mesh(path: impl AsRef<Path>) -> Result<Mesh> {
    let path = path.as_ref();
    let mut inp = IStream::open(path)?;
    let version = inp.read_u32()?;
    debug!("reading v{} container from {:?}", version, path);
    match version {
        VERSION_1 => read_v1(&mut inp),
        VERSION_2 => read_v2(&mut inp),
        other => Err(Error::UnsupportedVersion(other)),
    }
}

fn read_v1(inp: &mut IStream) -> Result<Mesh> {
    let mut mesh = Mesh::new(inp.read_string()?);
    mesh.bbox = read_bbox(inp)?;
    let submesh_count = inp.read_u32()?;

    let mut time_steps = 1usize;
    for _ in 0..submesh_count {
        let mut sub = read_geometry(inp, false)?;
        sub.scalar_attribs = read_attrib_dict(inp, &mut time_steps)?;
        sub.vector_attribs = read_attrib_dict(inp, &mut time_steps)?;
        mesh.submeshes.push(sub);
    }
    mesh.time_step_count = time_steps;
    Ok(mesh)
}

fn read_v2(inp: &mut IStream) -> Result<Mesh> {
    let mut mesh = Mesh::new(inp.read_string()?);
    mesh.bbox = read_bbox(inp)?;
    mesh.time_step_count = inp.read_u32()? as usize;
    let submesh_count = inp.read_u32()? as usize;
    let geometry_offset = inp.read_u32()?;

    let dir_count = inp.read_u32()?;
    let mut entries = Vec::with_capacity(dir_count as usize);
    for _ in 0..dir_count {
        let name = inp.read_string()?;
        let kind = inp.read_u32()?;
        let offset = inp.read_u32()?;
        if kind != DATA_KIND_SCALAR && kind != DATA_KIND_VECTOR {
            return Err(Error::format(format!(
                "unknown data kind tag {} for attribute {:?}",
                kind, name
            )));
        }
        entries.push((name, kind, offset));
    }

    inp.seek(geometry_offset as u64)?;
    for _ in 0..submesh_count {
        mesh.submeshes.push(read_geometry(inp, true)?);
    }

    for (name, kind, offset) in entries {
        inp.seek(offset as u64)?;
        for _ in 0..submesh_count {
            let key = inp.read_u32()? as usize;
            if key >= submesh_count {
                return Err(Error::IndexOutOfRange {
                    index: key,
                    count: submesh_count,
                });
            }
            let series = read_series(inp)?;
            let sub = &mut mesh.submeshes[key];
            if kind == DATA_KIND_SCALAR {
                sub.scalar_attribs.insert(name.clone(), series);
            } else {
                sub.vector_attribs.insert(name.clone(), series);
            }
        }
    }
    Ok(mesh)
}

fn read_series(inp: &mut IStream) -> Result<AttributeSeries> {
    let step_count = inp.read_u32()? as usize;
    let item_count = inp.read_u32()? as usize;
    let components = inp.read_u32()? as usize;
    let elem_type = inp.read_u32()?;
    if elem_type != ELEM_TYPE_F32 {
        return Err(Error::unsupported(format!(
            "attribute element type tag {}",
            elem_type
        )));
    }
    let mut series = Vec::with_capacity(step_count);
    for _ in 0..step_count {
        let mut step = Vec::with_capacity(item_count);
        for _ in 0..item_count {
            let mut item = Vec::with_capacity(components);
            for _ in 0..components {
                item.push(inp.read_f32()?);
            }
            step.push(item);
        }
        series.push(step);
    }
    Ok(series)
}

fn read_attrib_dict(
    inp: &mut IStream,
    time_steps: &mut usize,
) -> Result<std::collections::BTreeMap<String, AttributeSeries>> {
    let count = inp.read_u32()?;
    let mut attribs = std::collections::BTreeMap::new();
    for _ in 0..count {
        let name = inp.read_string()?;
        let step_count = inp.read_u32()? as usize;
        *time_steps = (*time_steps).max(step_count);
        let mut series = Vec::with_capacity(step_count);
        for _ in 0..step_count {
            let item_count = inp.read_u32()? as usize;
            let components = inp.read_u32()? as usize;
            let mut step = Vec::with_capacity(item_count);
            for _ in 0..item_count {
                let mut item = Vec::with_capacity(components);
                for _ in 0..components {
                    item.push(inp.read_f32()?);
                }
                step.push(item);
            }
            series.push(step);
        }
        attribs.insert(name, series);
    }
    Ok(attribs)
}

fn read_geometry(inp: &mut IStream, with_time_step: bool) -> Result<Submesh> {
    let mut sub = Submesh::new(inp.read_string()?);
    if with_time_step {
        sub.time_step = inp.read_u32()? as usize;
    }
    sub.bbox = read_bbox(inp)?;

    let vertex_count = inp.read_u32()? as usize;
    sub.vertices.reserve(vertex_count);
    for _ in 0..vertex_count {
        sub.vertices.push(inp.read_vec3()?);
    }
    let normal_count = inp.read_u32()? as usize;
    sub.normals.reserve(normal_count);
    for _ in 0..normal_count {
        sub.normals.push(inp.read_vec3()?);
    }
    let texcoord_count = inp.read_u32()? as usize;
    sub.texcoords.reserve(texcoord_count);
    for _ in 0..texcoord_count {
        sub.texcoords.push(inp.read_vec4()?);
    }
    let color_count = inp.read_u32()? as usize;
    sub.colors.reserve(color_count);
    for _ in 0..color_count {
        sub.colors.push(inp.read_vec4()?);
    }

    let kind_tag = inp.read_u32()?;
    sub.index_kind = IndexKind::from_tag(kind_tag)
        .ok_or_else(|| Error::format(format!("unknown index kind tag {}", kind_tag)))?;
    let index_count = inp.read_u32()? as usize;
    sub.indices.reserve(index_count);
    for _ in 0..index_count {
        sub.indices.push(inp.read_u32()?);
    }
    Ok(sub)
}

fn read_bbox(inp: &mut IStream) -> Result<BBox3f> {
    Ok(BBox3f {
        min: inp.read_vec3()?,
        max: inp.read_vec3()?,
    })
}
