//! Integration tests for pixel meshes and OBJ round trips.

use skymesh::healpix::{Healpix, Ordering};
use skymesh::mesh::obj::{load_obj, save_obj};
use skymesh::mesh::{pixel_mesh, weld, PixelMeshOptions};
use skymesh::util::{yup_to_zup, zup_to_yup, DVec3};

use proptest::prelude::*;
use tempfile::NamedTempFile;

#[test]
fn test_obj_roundtrip_nside2() {
    let temp = NamedTempFile::new().expect("Failed to create temp file");
    let hp = Healpix::new(2).unwrap();
    let mesh = pixel_mesh(&hp, &PixelMeshOptions::default()).unwrap();

    save_obj(temp.path(), &mesh).expect("Failed to write OBJ");
    let back = load_obj(temp.path()).expect("Failed to read OBJ");

    assert_eq!(back.num_vertices(), 4 * 48);
    assert_eq!(back.num_faces(), 48);
    assert_eq!(back.arity(), 4);
    assert_eq!(back.indices(), mesh.indices());
    for (a, b) in mesh.positions().iter().zip(back.positions()) {
        assert_eq!(zup_to_yup(*a), *b, "positions are stored Y-up, bit exact");
    }
}

#[test]
fn test_obj_text_layout() {
    let temp = NamedTempFile::new().expect("Failed to create temp file");
    let hp = Healpix::new(1).unwrap();
    let mesh = pixel_mesh(&hp, &PixelMeshOptions::default()).unwrap();
    save_obj(temp.path(), &mesh).unwrap();

    let text = std::fs::read_to_string(temp.path()).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 48 + 12);
    assert!(lines[..48].iter().all(|l| l.starts_with("v ") && l.split(' ').count() == 4));
    assert_eq!(lines[48], "f 1 2 3 4");
    assert_eq!(lines[59], "f 45 46 47 48");

    // The north corner of pixel 0 is the pole: (0, 0, 1) Z-up is (0, 1, 0) Y-up.
    let first: Vec<f64> = lines[0][2..].split(' ').map(|t| t.parse().unwrap()).collect();
    assert!(first[0].abs() < 1e-12);
    assert!((first[1] - 1.0).abs() < 1e-12);
    assert!(first[2].abs() < 1e-12);
}

#[test]
fn test_axis_permutation() {
    let v = DVec3::new(1.0, 2.0, 3.0);
    assert_eq!(zup_to_yup(v), DVec3::new(1.0, 3.0, -2.0));
    assert_ne!(zup_to_yup(zup_to_yup(v)), zup_to_yup(v));
    assert_eq!(yup_to_zup(zup_to_yup(v)), v);
}

#[test]
fn test_welded_obj_is_closed_sphere() {
    let temp = NamedTempFile::new().expect("Failed to create temp file");
    let hp = Healpix::new(4).unwrap();
    let opts = PixelMeshOptions { ordering: Ordering::Nested, step: 1 };
    let mesh = weld(&pixel_mesh(&hp, &opts).unwrap(), 1e-9).unwrap();
    save_obj(temp.path(), &mesh).unwrap();

    let back = load_obj(temp.path()).unwrap();
    assert_eq!(back.num_vertices(), 12 * 16 + 2);
    assert_eq!(back.num_faces(), 12 * 16);

    // Every edge of a closed quad mesh is shared by exactly two faces.
    let mut edges = std::collections::HashMap::new();
    for face in back.faces() {
        for k in 0..4 {
            let (a, b) = (face[k], face[(k + 1) % 4]);
            *edges.entry((a.min(b), a.max(b))).or_insert(0) += 1;
        }
    }
    assert!(edges.values().all(|&n| n == 2));
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn prop_mesh_shape(nside in 1u32..=8, step in 1usize..=3, nested in any::<bool>()) {
        let ordering = if nested && nside.is_power_of_two() { Ordering::Nested } else { Ordering::Ring };
        let hp = Healpix::new(nside).unwrap();
        let mesh = pixel_mesh(&hp, &PixelMeshOptions { ordering, step }).unwrap();
        let p = hp.npix() as usize;
        let k = 4 * step;

        prop_assert_eq!(mesh.num_vertices(), k * p);
        prop_assert_eq!(mesh.num_faces(), p);
        prop_assert_eq!(mesh.arity(), k);
        prop_assert!(mesh.indices().iter().all(|&i| i >= 1 && i as usize <= k * p));
        for p in mesh.positions() {
            prop_assert!((p.length() - 1.0).abs() < 1e-12);
        }
    }
}
