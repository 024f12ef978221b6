//! End-to-end pipeline tests against real files on disk.

use std::fs;
use std::path::Path;

use cfdmesh::container::{format, read_mesh};
use cfdmesh::mesh::{slice_mesh, IndexKind, Mesh, Submesh};
use cfdmesh::pipeline::{convert, ConvertOptions};
use cfdmesh::util::{BBox3f, Vec3};
use tempfile::tempdir;

fn write_snapshot(dir: &Path, name: &str, pressure: &[f32]) -> std::path::PathBuf {
    let mut text = String::from(
        "# vtk DataFile Version 4.2\n\
         cavity\n\
         ASCII\n\
         DATASET POLYDATA\n\
         POINTS 8 float\n\
         0 0 0\n1 0 0\n1 1 0\n0 1 0\n\
         2 0 0\n3 0 0\n3 1 0\n2 1 0\n\
         POLYGONS 2 10\n\
         4 0 1 2 3\n\
         4 4 5 6 7\n\
         POINT_DATA 8\n\
         SCALARS pressure float\n\
         LOOKUP_TABLE default\n",
    );
    for p in pressure {
        text.push_str(&format!("{}\n", p));
    }
    let path = dir.join(name);
    fs::write(&path, text).unwrap();
    path
}

#[test]
fn test_two_quads_become_four_triangles() {
    let dir = tempdir().unwrap();
    let input = write_snapshot(dir.path(), "a.vtk", &[0.0; 8]);
    let output = dir.path().join("a.c4a");

    convert(&[input], &output, &ConvertOptions::default()).unwrap();
    let mesh = read_mesh(&output).unwrap();

    assert_eq!(mesh.submeshes.len(), 1);
    let sub = &mesh.submeshes[0];
    assert_eq!(sub.name, "cavity");
    assert_eq!(sub.vertex_count(), 8);
    assert_eq!(sub.index_kind, IndexKind::Triangles);
    assert_eq!(
        sub.indices,
        vec![0, 1, 2, 0, 2, 3, 4, 5, 6, 4, 6, 7],
        "quads fan from their first vertex"
    );
}

#[test]
fn test_binary_color_scalars_normalized() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("colors.vtk");

    let mut bytes = Vec::new();
    bytes.extend_from_slice(
        b"# vtk DataFile Version 4.2\nbinary colors\nBINARY\nDATASET POLYDATA\nPOINTS 3 float\n",
    );
    let coords: [f32; 9] = [0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0];
    for c in coords {
        bytes.extend_from_slice(&c.to_be_bytes());
    }
    bytes.extend_from_slice(b"\nPOLYGONS 1 4\n");
    for i in [3i32, 0, 1, 2] {
        bytes.extend_from_slice(&i.to_be_bytes());
    }
    bytes.extend_from_slice(b"\nPOINT_DATA 3\nCOLOR_SCALARS rgba 4\n");
    bytes.extend_from_slice(&[255, 128, 0, 255, 0, 255, 0, 255, 0, 0, 255, 255]);
    bytes.push(b'\n');
    fs::write(&path, bytes).unwrap();

    let output = dir.path().join("colors.c4a");
    convert(&[path], &output, &ConvertOptions::default()).unwrap();
    let mesh = read_mesh(&output).unwrap();
    let sub = &mesh.submeshes[0];

    let rgba = &sub.scalar_attribs["rgba"][0];
    assert_eq!(rgba[0], vec![1.0, 128.0 / 255.0, 0.0, 1.0]);
    assert_eq!(rgba[1], vec![0.0, 1.0, 0.0, 1.0]);
    assert_eq!(rgba[2], vec![0.0, 0.0, 1.0, 1.0]);
    assert_eq!(sub.indices, vec![0, 1, 2]);
}

#[test]
fn test_snapshot_series_combined_in_order() {
    let dir = tempdir().unwrap();
    let inputs = vec![
        write_snapshot(dir.path(), "t0.vtk", &[1.0; 8]),
        write_snapshot(dir.path(), "t1.vtk", &[2.0; 8]),
        write_snapshot(dir.path(), "t2.vtk", &[3.0; 8]),
    ];
    let output = dir.path().join("series.c4a");

    convert(&inputs, &output, &ConvertOptions::default()).unwrap();
    let mesh = read_mesh(&output).unwrap();

    assert_eq!(mesh.time_step_count, 3);
    assert_eq!(mesh.submeshes.len(), 1, "identical geometry is shared");
    let series = &mesh.submeshes[0].scalar_attribs["pressure"];
    assert_eq!(series.len(), 3);
    for (step, expected) in series.iter().zip([1.0, 2.0, 3.0]) {
        assert_eq!(step.len(), 8);
        assert!(step.iter().all(|row| row == &vec![expected]));
    }
}

#[test]
fn test_differing_geometry_kept_as_separate_submeshes() {
    let dir = tempdir().unwrap();
    let a = write_snapshot(dir.path(), "t0.vtk", &[1.0; 8]);
    // same attributes, shifted vertices
    let moved = fs::read_to_string(&a).unwrap().replace("2 0 0", "9 0 0");
    let b = dir.path().join("t1.vtk");
    fs::write(&b, moved).unwrap();

    let output = dir.path().join("pair.c4a");
    convert(&[a, b], &output, &ConvertOptions::default()).unwrap();
    let mesh = read_mesh(&output).unwrap();

    assert_eq!(mesh.time_step_count, 2);
    assert_eq!(mesh.submeshes.len(), 2);
    assert_eq!(mesh.submeshes[0].time_step, 0);
    assert_eq!(mesh.submeshes[1].time_step, 1);
}

#[test]
fn test_slicing_a_large_mesh_under_budget() {
    // 50k disjoint triangles over 150k vertices
    let tri_count = 50_000;
    let mut sub = Submesh::new("large");
    sub.index_kind = IndexKind::Triangles;
    for i in 0..tri_count * 3 {
        sub.vertices.push(Vec3::new(i as f32, 0.0, 0.0));
        sub.indices.push(i as u32);
    }
    sub.bbox = BBox3f::from_points(&sub.vertices);
    sub.scalar_attribs
        .insert("id".into(), vec![(0..tri_count * 3).map(|i| vec![i as f32]).collect()]);

    let mut mesh = Mesh::new("large");
    mesh.bbox = sub.bbox;
    mesh.submeshes.push(sub);

    let budget = 60_000;
    slice_mesh(&mut mesh, budget);

    assert_eq!(mesh.submeshes.len(), 3);
    let counts: Vec<usize> = mesh.submeshes.iter().map(|s| s.vertex_count()).collect();
    assert!(counts.iter().all(|&c| c <= budget), "counts {:?}", counts);
    assert_eq!(counts.iter().sum::<usize>(), tri_count * 3);
    let total_tris: usize = mesh.submeshes.iter().map(|s| s.triangle_count()).sum();
    assert_eq!(total_tris, tri_count);

    // sliced output still round-trips through the v2 container
    let dir = tempdir().unwrap();
    let path = dir.path().join("large.c4a");
    cfdmesh::container::write_mesh(&path, &mesh, format::VERSION_2).unwrap();
    let loaded = read_mesh(&path).unwrap();
    assert_eq!(loaded.submeshes.len(), 3);
    for (a, b) in mesh.submeshes.iter().zip(&loaded.submeshes) {
        assert_eq!(a.vertices, b.vertices);
        assert_eq!(a.indices, b.indices);
        assert_eq!(a.scalar_attribs, b.scalar_attribs);
    }
}

#[test]
fn test_convert_with_slicing_flag() {
    let dir = tempdir().unwrap();
    let input = write_snapshot(dir.path(), "a.vtk", &[0.5; 8]);
    let output = dir.path().join("a.c4a");

    // budget below the vertex count forces a split without breaking quads
    let opts = ConvertOptions {
        slice_budget: Some(6),
        ..Default::default()
    };
    convert(&[input], &output, &opts).unwrap();
    let mesh = read_mesh(&output).unwrap();

    assert_eq!(mesh.submeshes.len(), 2);
    assert_eq!(mesh.submeshes[0].name, "cavity_0");
    assert_eq!(mesh.submeshes[1].name, "cavity_1");
    let total: usize = mesh.submeshes.iter().map(|s| s.triangle_count()).sum();
    assert_eq!(total, 4);
    for sub in &mesh.submeshes {
        assert!(sub.vertex_count() <= 6);
        assert_eq!(sub.scalar_attribs["pressure"][0].len(), sub.vertex_count());
    }
}

#[test]
fn test_v1_container_from_pipeline() {
    let dir = tempdir().unwrap();
    let input = write_snapshot(dir.path(), "a.vtk", &[7.0; 8]);
    let output = dir.path().join("a.c4a");

    let opts = ConvertOptions {
        version: format::VERSION_1,
        ..Default::default()
    };
    let written = convert(&[input], &output, &opts).unwrap();
    let loaded = read_mesh(&output).unwrap();

    assert_eq!(loaded.submeshes.len(), written.submeshes.len());
    assert_eq!(loaded.submeshes[0].vertices, written.submeshes[0].vertices);
    assert_eq!(
        loaded.submeshes[0].scalar_attribs,
        written.submeshes[0].scalar_attribs
    );
}

#[test]
fn test_missing_input_fails() {
    let dir = tempdir().unwrap();
    let output = dir.path().join("out.c4a");
    let missing = dir.path().join("nope.vtk");
    let err = convert(&[missing], &output, &ConvertOptions::default()).unwrap_err();
    assert!(matches!(err, cfdmesh::Error::FileNotFound(_)));
    assert!(!output.exists());
}
