//! Flatten one parsed dataset into a canonical one-submesh mesh.

use std::collections::HashMap;

use tracing::debug;

use super::{AttributeSeries, IndexKind, Mesh, Submesh};
use crate::util::{BBox3f, Error, Result, Vec4};
use crate::vtk::{Attribute, Cell, CellKind, Dataset, Geometry, PolyItem};

/// Hexahedron corners to triangles: 6 quad faces, 2 triangles each.
const HEXAHEDRON_TRIS: [usize; 36] = [
    0, 1, 2, 2, 3, 0, //
    4, 5, 6, 6, 7, 4, //
    0, 1, 5, 5, 4, 0, //
    1, 2, 6, 6, 5, 1, //
    2, 3, 7, 7, 6, 2, //
    3, 0, 4, 4, 7, 3,
];

/// Voxel corner ordering differs from hexahedron; same 6-face expansion.
const VOXEL_TRIS: [usize; 36] = [
    0, 1, 3, 3, 2, 0, //
    4, 5, 7, 7, 6, 4, //
    0, 1, 5, 5, 4, 0, //
    1, 3, 7, 7, 5, 1, //
    3, 2, 6, 6, 7, 3, //
    2, 0, 4, 4, 6, 2,
];

/// Flatten a dataset into a mesh with exactly one submesh.
///
/// Cell-indexed attributes are resolved to vertices through the most
/// recently seen owning cell of each referenced vertex (later cells
/// overwrite earlier ones).
pub fn transcode(dataset: &Dataset) -> Result<Mesh> {
    let points = dataset.geometry.points();
    let mut sub = Submesh::new(dataset.description.clone());
    sub.vertices = points.to_vec();
    sub.bbox = BBox3f::from_points(points);

    let mut mesh = Mesh::new(dataset.description.clone());
    mesh.bbox = sub.bbox;

    for (key, attr) in &dataset.point_data {
        apply_point_attribute(&mut sub, key, attr)?;
    }

    // vertex index -> owning cell index, last writer wins
    let mut owner: HashMap<u32, usize> = HashMap::new();
    match &dataset.geometry {
        Geometry::PolyData { items, .. } => {
            triangulate_poly_items(&mut sub, items, &mut owner)?
        }
        Geometry::UnstructuredGrid { cells, .. } => {
            triangulate_cells(&mut sub, cells, &mut owner)?
        }
    }
    debug!(
        "transcoded {:?}: {} vertices, {} triangles",
        sub.name,
        sub.vertex_count(),
        sub.triangle_count()
    );

    for (key, attr) in &dataset.cell_data {
        apply_cell_attribute(&mut sub, key, attr, &owner)?;
    }

    mesh.submeshes.push(sub);
    Ok(mesh)
}

fn push_series(
    attribs: &mut std::collections::BTreeMap<String, AttributeSeries>,
    key: &str,
    step: Vec<Vec<f32>>,
) {
    attribs.entry(key.to_string()).or_default().push(step);
}

fn apply_point_attribute(sub: &mut Submesh, key: &str, attr: &Attribute) -> Result<()> {
    match attr {
        Attribute::Scalars { values, .. } => {
            push_series(&mut sub.scalar_attribs, key, values.clone());
        }
        Attribute::ColorScalars { values } => {
            push_series(&mut sub.scalar_attribs, key, values.clone());
        }
        Attribute::Vectors(values) | Attribute::Normals(values) => {
            let rows = values.iter().map(|v| vec![v.x, v.y, v.z]).collect();
            push_series(&mut sub.vector_attribs, key, rows);
        }
        Attribute::TextureCoordinates { values, .. } => {
            sub.texcoords = values
                .iter()
                .map(|row| {
                    let mut c = [0.0f32; 4];
                    for (dst, src) in c.iter_mut().zip(row) {
                        *dst = *src;
                    }
                    Vec4::from_array(c)
                })
                .collect();
        }
        Attribute::FieldData(arrays) => {
            for (arr_name, arr) in arrays {
                if arr.tuples.is_empty() {
                    continue;
                }
                let key = format!("{key}_{arr_name}");
                if arr.components == 3 {
                    push_series(&mut sub.vector_attribs, &key, arr.tuples.clone());
                } else {
                    push_series(&mut sub.scalar_attribs, &key, arr.tuples.clone());
                }
            }
        }
        // The palette is informational; nothing to materialize per vertex.
        Attribute::LookupTable(_) => {}
        Attribute::Tensors(_) => {
            return Err(Error::unsupported(format!("point attribute {key}: TENSORS")))
        }
    }
    Ok(())
}

/// Check a referenced index against the vertex count.
fn check_index(idx: u32, count: usize) -> Result<u32> {
    if (idx as usize) < count {
        Ok(idx)
    } else {
        Err(Error::IndexOutOfRange {
            index: idx as usize,
            count,
        })
    }
}

fn triangulate_poly_items(
    sub: &mut Submesh,
    items: &[PolyItem],
    owner: &mut HashMap<u32, usize>,
) -> Result<()> {
    let vcount = sub.vertex_count();
    // one cell counter across all item sections, in file order
    let mut cell_idx = 0usize;
    for item in items {
        match item.name.as_str() {
            "POLYGONS" => {
                sub.index_kind = IndexKind::Triangles;
                for idxs in &item.indices {
                    for &idx in idxs {
                        check_index(idx, vcount)?;
                        owner.insert(idx, cell_idx);
                    }
                    // fan from vertex 0
                    for i in 1..idxs.len().saturating_sub(1) {
                        sub.indices.push(idxs[0]);
                        sub.indices.push(idxs[i]);
                        sub.indices.push(idxs[i + 1]);
                    }
                    cell_idx += 1;
                }
            }
            "TRIANGLE_STRIPS" => {
                sub.index_kind = IndexKind::Triangles;
                for idxs in &item.indices {
                    if idxs.len() < 3 {
                        cell_idx += 1;
                        continue;
                    }
                    for &idx in idxs {
                        check_index(idx, vcount)?;
                        owner.insert(idx, cell_idx);
                    }
                    // alternate winding so every triangle faces the same way
                    for i in 1..idxs.len() - 1 {
                        if (i - 1) % 2 == 0 {
                            sub.indices.push(idxs[i - 1]);
                            sub.indices.push(idxs[i]);
                            sub.indices.push(idxs[i + 1]);
                        } else {
                            sub.indices.push(idxs[i - 1]);
                            sub.indices.push(idxs[i + 1]);
                            sub.indices.push(idxs[i]);
                        }
                    }
                    cell_idx += 1;
                }
            }
            other => {
                return Err(Error::unsupported(format!("polydata item {other}")));
            }
        }
    }
    Ok(())
}

fn triangulate_cells(
    sub: &mut Submesh,
    cells: &[Cell],
    owner: &mut HashMap<u32, usize>,
) -> Result<()> {
    if cells.is_empty() {
        return Ok(());
    }
    sub.index_kind = IndexKind::Triangles;
    let vcount = sub.vertex_count();
    for (ci, cell) in cells.iter().enumerate() {
        for &idx in &cell.indices {
            check_index(idx, vcount)?;
            owner.insert(idx, ci);
        }
        let table: &[usize; 36] = match cell.kind {
            CellKind::Hexahedron => &HEXAHEDRON_TRIS,
            CellKind::Voxel => &VOXEL_TRIS,
            other => {
                return Err(Error::unsupported(format!("cell kind {other:?}")));
            }
        };
        if cell.indices.len() != 8 {
            return Err(Error::format(format!(
                "{:?} cell with {} indices",
                cell.kind,
                cell.indices.len()
            )));
        }
        for &corner in table {
            sub.indices.push(cell.indices[corner]);
        }
    }
    Ok(())
}

/// Materialize one value per vertex from a cell-indexed attribute.
fn resolve_per_vertex<T: Clone>(
    vcount: usize,
    owner: &HashMap<u32, usize>,
    cell_values: &[T],
) -> Result<Vec<T>> {
    let mut out = Vec::with_capacity(vcount);
    for i in 0..vcount {
        let &ci = owner
            .get(&(i as u32))
            .ok_or(Error::IndexOutOfRange {
                index: i,
                count: vcount,
            })?;
        let value = cell_values.get(ci).ok_or(Error::IndexOutOfRange {
            index: ci,
            count: cell_values.len(),
        })?;
        out.push(value.clone());
    }
    Ok(out)
}

fn apply_cell_attribute(
    sub: &mut Submesh,
    key: &str,
    attr: &Attribute,
    owner: &HashMap<u32, usize>,
) -> Result<()> {
    let vcount = sub.vertex_count();
    match attr {
        Attribute::Scalars { values, .. } | Attribute::ColorScalars { values } => {
            let step = resolve_per_vertex(vcount, owner, values)?;
            push_series(&mut sub.scalar_attribs, key, step);
        }
        Attribute::Vectors(values) | Attribute::Normals(values) => {
            let step = resolve_per_vertex(vcount, owner, values)?
                .into_iter()
                .map(|v| vec![v.x, v.y, v.z])
                .collect();
            push_series(&mut sub.vector_attribs, key, step);
        }
        Attribute::FieldData(arrays) => {
            for (arr_name, arr) in arrays {
                if arr.tuples.is_empty() {
                    continue;
                }
                let step = resolve_per_vertex(vcount, owner, &arr.tuples)?;
                let key = format!("{key}_{arr_name}");
                if arr.components == 3 {
                    push_series(&mut sub.vector_attribs, &key, step);
                } else {
                    push_series(&mut sub.scalar_attribs, &key, step);
                }
            }
        }
        Attribute::LookupTable(_) => {}
        Attribute::TextureCoordinates { .. } => {
            return Err(Error::unsupported(format!(
                "cell attribute {key}: TEXTURE_COORDINATES"
            )))
        }
        Attribute::Tensors(_) => {
            return Err(Error::unsupported(format!("cell attribute {key}: TENSORS")))
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::Vec3;
    use crate::vtk::FieldArray;
    use smallvec::smallvec;
    use std::collections::BTreeMap;

    fn quad_points() -> Vec<Vec3> {
        vec![
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(1.0, 1.0, 0.0),
            Vec3::new(0.0, 1.0, 0.0),
        ]
    }

    fn polydata_dataset(items: Vec<PolyItem>, points: Vec<Vec3>) -> Dataset {
        Dataset {
            major_version: 3,
            minor_version: 0,
            description: "test".into(),
            geometry: Geometry::PolyData { points, items },
            point_data: BTreeMap::new(),
            cell_data: BTreeMap::new(),
        }
    }

    #[test]
    fn test_polygon_fan() {
        let ds = polydata_dataset(
            vec![PolyItem {
                name: "POLYGONS".into(),
                indices: vec![smallvec![0, 1, 2, 3]],
            }],
            quad_points(),
        );
        let mesh = transcode(&ds).unwrap();
        let sub = &mesh.submeshes[0];
        assert_eq!(sub.index_kind, IndexKind::Triangles);
        assert_eq!(sub.indices, vec![0, 1, 2, 0, 2, 3]);
        assert_eq!(sub.bbox.min, Vec3::ZERO);
        assert_eq!(sub.bbox.max, Vec3::new(1.0, 1.0, 0.0));
    }

    #[test]
    fn test_strip_winding() {
        let ds = polydata_dataset(
            vec![PolyItem {
                name: "TRIANGLE_STRIPS".into(),
                indices: vec![smallvec![0, 1, 2, 3]],
            }],
            quad_points(),
        );
        let mesh = transcode(&ds).unwrap();
        // second triangle flips winding
        assert_eq!(mesh.submeshes[0].indices, vec![0, 1, 2, 1, 3, 2]);
    }

    #[test]
    fn test_short_strip_skipped() {
        let ds = polydata_dataset(
            vec![PolyItem {
                name: "TRIANGLE_STRIPS".into(),
                indices: vec![smallvec![0, 1], smallvec![0, 1, 2]],
            }],
            quad_points(),
        );
        let mesh = transcode(&ds).unwrap();
        assert_eq!(mesh.submeshes[0].indices, vec![0, 1, 2]);
    }

    #[test]
    fn test_hexahedron_and_voxel_expansion() {
        let points: Vec<Vec3> = (0..8)
            .map(|i| Vec3::new(i as f32, 0.0, 0.0))
            .collect();
        for (kind, table) in [
            (CellKind::Hexahedron, &HEXAHEDRON_TRIS),
            (CellKind::Voxel, &VOXEL_TRIS),
        ] {
            let ds = Dataset {
                major_version: 3,
                minor_version: 0,
                description: "cells".into(),
                geometry: Geometry::UnstructuredGrid {
                    points: points.clone(),
                    cells: vec![Cell {
                        kind,
                        indices: smallvec![0, 1, 2, 3, 4, 5, 6, 7],
                    }],
                },
                point_data: BTreeMap::new(),
                cell_data: BTreeMap::new(),
            };
            let mesh = transcode(&ds).unwrap();
            let expected: Vec<u32> = table.iter().map(|&c| c as u32).collect();
            assert_eq!(mesh.submeshes[0].indices, expected);
        }
    }

    #[test]
    fn test_unsupported_cell_kind() {
        let ds = Dataset {
            major_version: 3,
            minor_version: 0,
            description: "tetra".into(),
            geometry: Geometry::UnstructuredGrid {
                points: quad_points(),
                cells: vec![Cell {
                    kind: CellKind::Tetra,
                    indices: smallvec![0, 1, 2, 3],
                }],
            },
            point_data: BTreeMap::new(),
            cell_data: BTreeMap::new(),
        };
        assert!(matches!(transcode(&ds), Err(Error::Unsupported(_))));
    }

    #[test]
    fn test_out_of_range_index() {
        let ds = polydata_dataset(
            vec![PolyItem {
                name: "POLYGONS".into(),
                indices: vec![smallvec![0, 1, 9]],
            }],
            quad_points(),
        );
        assert!(matches!(
            transcode(&ds),
            Err(Error::IndexOutOfRange { index: 9, count: 4 })
        ));
    }

    #[test]
    fn test_cell_attribute_last_owner_wins() {
        // two triangles sharing vertices 1 and 2; the later one owns them
        let mut ds = polydata_dataset(
            vec![PolyItem {
                name: "POLYGONS".into(),
                indices: vec![smallvec![0, 1, 2], smallvec![1, 2, 3]],
            }],
            quad_points(),
        );
        ds.cell_data.insert(
            "pressure".into(),
            Attribute::Scalars {
                components: 1,
                lookup_table: "default".into(),
                values: vec![vec![10.0], vec![20.0]],
            },
        );
        let mesh = transcode(&ds).unwrap();
        let series = &mesh.submeshes[0].scalar_attribs["pressure"];
        assert_eq!(
            series[0],
            vec![vec![10.0], vec![20.0], vec![20.0], vec![20.0]],
            "shared vertices resolve to the highest-file-order owning cell"
        );
    }

    #[test]
    fn test_unreferenced_vertex_with_cell_data() {
        let mut ds = polydata_dataset(
            vec![PolyItem {
                name: "POLYGONS".into(),
                indices: vec![smallvec![0, 1, 2]],
            }],
            quad_points(),
        );
        ds.cell_data.insert(
            "pressure".into(),
            Attribute::Scalars {
                components: 1,
                lookup_table: "default".into(),
                values: vec![vec![1.0]],
            },
        );
        // vertex 3 has no owning cell
        assert!(matches!(
            transcode(&ds),
            Err(Error::IndexOutOfRange { index: 3, .. })
        ));
    }

    #[test]
    fn test_field_data_names_and_shapes() {
        let mut ds = polydata_dataset(
            vec![PolyItem {
                name: "POLYGONS".into(),
                indices: vec![smallvec![0, 1, 2, 3]],
            }],
            quad_points(),
        );
        let mut arrays = BTreeMap::new();
        arrays.insert(
            "energy".into(),
            FieldArray {
                components: 1,
                tuples: vec![vec![1.0]; 4],
            },
        );
        arrays.insert(
            "flux".into(),
            FieldArray {
                components: 3,
                tuples: vec![vec![0.0, 1.0, 2.0]; 4],
            },
        );
        ds.point_data
            .insert("stats".into(), Attribute::FieldData(arrays));
        let mesh = transcode(&ds).unwrap();
        let sub = &mesh.submeshes[0];
        assert!(sub.scalar_attribs.contains_key("stats_energy"));
        assert!(sub.vector_attribs.contains_key("stats_flux"));
    }
}
