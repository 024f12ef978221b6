//! Intermediate model for one parsed VTK file.
//!
//! Datasets are transient: the transcoder flattens them into a canonical
//! mesh and they are discarded afterwards.

use std::collections::BTreeMap;

use smallvec::SmallVec;

use crate::util::{Vec3, Vec4};

/// One parsed source file.
#[derive(Debug, Clone)]
pub struct Dataset {
    pub major_version: u32,
    pub minor_version: u32,
    /// Free-text description from the second preamble line.
    pub description: String,
    pub geometry: Geometry,
    pub point_data: BTreeMap<String, Attribute>,
    pub cell_data: BTreeMap<String, Attribute>,
}

/// Topology of a dataset: an indexed cell list, or named polydata items.
#[derive(Debug, Clone)]
pub enum Geometry {
    UnstructuredGrid {
        points: Vec<Vec3>,
        cells: Vec<Cell>,
    },
    PolyData {
        points: Vec<Vec3>,
        /// Item sections (POLYGONS, TRIANGLE_STRIPS, ...) in file order.
        items: Vec<PolyItem>,
    },
}

impl Geometry {
    /// Point list shared by both topology shapes.
    pub fn points(&self) -> &[Vec3] {
        match self {
            Self::UnstructuredGrid { points, .. } => points,
            Self::PolyData { points, .. } => points,
        }
    }
}

/// One polydata item section: its keyword and the per-cell index lists.
#[derive(Debug, Clone)]
pub struct PolyItem {
    pub name: String,
    pub indices: Vec<SmallVec<[u32; 8]>>,
}

/// One unstructured-grid cell.
#[derive(Debug, Clone)]
pub struct Cell {
    pub kind: CellKind,
    pub indices: SmallVec<[u32; 8]>,
}

/// VTK cell type ids.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum CellKind {
    /// Placeholder until CELL_TYPES assigns the real kind.
    #[default]
    EmptyCell = 0,
    Vertex = 1,
    PolyVertex = 2,
    Line = 3,
    PolyLine = 4,
    Triangle = 5,
    TriangleStrip = 6,
    Polygon = 7,
    Pixel = 8,
    Quad = 9,
    Tetra = 10,
    Voxel = 11,
    Hexahedron = 12,
    Wedge = 13,
    Pyramid = 14,
    QuadraticEdge = 21,
    QuadraticTriangle = 22,
    QuadraticQuad = 23,
    QuadraticTetra = 24,
    QuadraticHexahedron = 25,
}

impl CellKind {
    /// Map a CELL_TYPES id to a known kind.
    pub fn from_id(id: u32) -> Option<Self> {
        Some(match id {
            0 => Self::EmptyCell,
            1 => Self::Vertex,
            2 => Self::PolyVertex,
            3 => Self::Line,
            4 => Self::PolyLine,
            5 => Self::Triangle,
            6 => Self::TriangleStrip,
            7 => Self::Polygon,
            8 => Self::Pixel,
            9 => Self::Quad,
            10 => Self::Tetra,
            11 => Self::Voxel,
            12 => Self::Hexahedron,
            13 => Self::Wedge,
            14 => Self::Pyramid,
            21 => Self::QuadraticEdge,
            22 => Self::QuadraticTriangle,
            23 => Self::QuadraticQuad,
            24 => Self::QuadraticTetra,
            25 => Self::QuadraticHexahedron,
            _ => return None,
        })
    }
}

/// One FIELD sub-array: its component count and tuple values.
#[derive(Debug, Clone)]
pub struct FieldArray {
    pub components: usize,
    pub tuples: Vec<Vec<f32>>,
}

/// Point- or cell-indexed attribute record.
///
/// A closed set: the parser produces exactly these shapes and downstream
/// code dispatches on the tag. Tensors are recognized by the grammar but
/// rejected before construction.
#[derive(Debug, Clone)]
pub enum Attribute {
    Scalars {
        components: usize,
        /// Name of the referenced lookup table; never resolved here.
        lookup_table: String,
        values: Vec<Vec<f32>>,
    },
    /// Always 4 components per item.
    ColorScalars { values: Vec<Vec<f32>> },
    Vectors(Vec<Vec3>),
    Normals(Vec<Vec3>),
    TextureCoordinates { dim: usize, values: Vec<Vec<f32>> },
    Tensors(Vec<[Vec3; 3]>),
    FieldData(BTreeMap<String, FieldArray>),
    /// RGBA palette; informational only.
    LookupTable(Vec<Vec4>),
}
