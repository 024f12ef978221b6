//! Canonical triangulated mesh model.
//!
//! A [`Mesh`] is built once from per-file datasets, mutated in place by
//! the combiner and slicer, then serialized and never touched again.
//!
//! - [`transcode`] - flatten one dataset into a one-submesh mesh
//! - [`combine`] - merge snapshot meshes into one time-indexed mesh
//! - [`slice_mesh`] - partition oversized submeshes under a vertex budget

mod combine;
mod slice;
mod transcode;

pub use combine::combine;
pub use slice::slice_mesh;
pub use transcode::transcode;

use std::collections::BTreeMap;

use crate::util::{BBox3f, Vec3, Vec4};

/// Per-vertex attribute values over time: time step -> item -> components.
pub type AttributeSeries = Vec<Vec<Vec<f32>>>;

/// What the index list of a submesh describes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[repr(u32)]
pub enum IndexKind {
    #[default]
    Points = 0,
    Triangles = 1,
}

impl IndexKind {
    pub fn from_tag(tag: u32) -> Option<Self> {
        match tag {
            0 => Some(Self::Points),
            1 => Some(Self::Triangles),
            _ => None,
        }
    }
}

/// One triangulated geometry block with its own vertices, indices and
/// attribute series.
#[derive(Debug, Clone, Default)]
pub struct Submesh {
    pub name: String,
    /// Snapshot index this submesh came from; 0 for shared geometry.
    pub time_step: usize,
    pub bbox: BBox3f,
    pub vertices: Vec<Vec3>,
    pub normals: Vec<Vec3>,
    pub texcoords: Vec<Vec4>,
    pub colors: Vec<Vec4>,
    pub index_kind: IndexKind,
    pub indices: Vec<u32>,
    /// Scalar-valued vertex attributes, keyed by name.
    pub scalar_attribs: BTreeMap<String, AttributeSeries>,
    /// Vector-valued vertex attributes, keyed by name.
    pub vector_attribs: BTreeMap<String, AttributeSeries>,
}

impl Submesh {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    #[inline]
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    #[inline]
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }
}

/// Ordered collection of submeshes plus the global bounds and the
/// time-step count every attribute series must match.
#[derive(Debug, Clone)]
pub struct Mesh {
    pub name: String,
    pub bbox: BBox3f,
    pub time_step_count: usize,
    pub submeshes: Vec<Submesh>,
}

impl Mesh {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            bbox: BBox3f::EMPTY,
            time_step_count: 1,
            submeshes: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_kind_tags() {
        assert_eq!(IndexKind::from_tag(0), Some(IndexKind::Points));
        assert_eq!(IndexKind::from_tag(1), Some(IndexKind::Triangles));
        assert_eq!(IndexKind::from_tag(2), None);
    }
}
