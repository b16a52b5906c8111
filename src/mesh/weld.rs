//! Merging of coincident vertices.

use std::collections::HashMap;

use tracing::debug;

use crate::util::{DVec3, Error, Result};
use super::Mesh;

type Cell = (i64, i64, i64);

/// Grid cell of a point; coordinates saturate at the `i64` range.
#[inline]
fn cell_of(p: DVec3, inv: f64) -> Cell {
    (
        (p.x * inv).floor() as i64,
        (p.y * inv).floor() as i64,
        (p.z * inv).floor() as i64,
    )
}

/// Merge vertices closer than `tolerance`, keeping first occurrences in order.
///
/// Faces are remapped to the surviving vertices; face count and arity are
/// unchanged.
pub fn weld(mesh: &Mesh, tolerance: f64) -> Result<Mesh> {
    if !(tolerance > 0.0 && tolerance.is_finite()) {
        return Err(Error::other(format!("weld tolerance must be positive, got {tolerance}")));
    }
    let inv = 1.0 / tolerance;
    let tol2 = tolerance * tolerance;

    let mut grid: HashMap<Cell, Vec<u32>> = HashMap::new();
    let mut positions: Vec<DVec3> = Vec::new();
    let mut remap = Vec::with_capacity(mesh.num_vertices());

    for &p in mesh.positions() {
        let (cx, cy, cz) = cell_of(p, inv);
        let mut found = None;
        'search: for dx in -1..=1 {
            for dy in -1..=1 {
                for dz in -1..=1 {
                    let (Some(x), Some(y), Some(z)) =
                        (cx.checked_add(dx), cy.checked_add(dy), cz.checked_add(dz))
                    else {
                        continue;
                    };
                    if let Some(bucket) = grid.get(&(x, y, z)) {
                        if let Some(&i) = bucket
                            .iter()
                            .find(|&&i| positions[i as usize].distance_squared(p) <= tol2)
                        {
                            found = Some(i);
                            break 'search;
                        }
                    }
                }
            }
        }
        let index = match found {
            Some(i) => i,
            None => {
                let i = positions.len() as u32;
                positions.push(p);
                grid.entry((cx, cy, cz)).or_default().push(i);
                i
            }
        };
        remap.push(index + 1);
    }

    let indices = mesh
        .indices()
        .iter()
        .map(|&i| remap[i as usize - 1])
        .collect();
    debug!(before = mesh.num_vertices(), after = positions.len(), "welded vertices");

    Mesh::new(positions, indices, mesh.arity())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::healpix::Healpix;
    use crate::mesh::{pixel_mesh, PixelMeshOptions};

    #[test]
    fn test_weld_healpix_sphere() {
        // A closed quad mesh has V = F + 2.
        for nside in [1, 2, 3, 4] {
            let hp = Healpix::new(nside).unwrap();
            let mesh = pixel_mesh(&hp, &PixelMeshOptions::default()).unwrap();
            let welded = weld(&mesh, 1e-9).unwrap();
            assert_eq!(welded.num_faces(), mesh.num_faces());
            assert_eq!(welded.num_vertices(), 12 * (nside * nside) as usize + 2);
        }
    }

    #[test]
    fn test_weld_keeps_first_occurrence() {
        let positions = vec![
            DVec3::ZERO,
            DVec3::X,
            DVec3::new(1e-12, 0.0, 0.0),
            DVec3::new(1.0, 0.0, 1e-12),
        ];
        let mesh = Mesh::new(positions, vec![1, 2, 3, 4], 2).unwrap();
        let welded = weld(&mesh, 1e-9).unwrap();
        assert_eq!(welded.positions(), &[DVec3::ZERO, DVec3::X]);
        assert_eq!(welded.indices(), &[1, 2, 1, 2]);
    }

    #[test]
    fn test_weld_tiny_tolerance_and_huge_coordinates() {
        let hp = Healpix::new(1).unwrap();
        let mesh = pixel_mesh(&hp, &PixelMeshOptions::default()).unwrap();
        let welded = weld(&mesh, 1e-300).unwrap();
        assert_eq!(welded.num_faces(), 12);
        assert!(welded.num_vertices() >= 14 && welded.num_vertices() <= 48);

        let far = DVec3::new(1e300, -1e300, 0.0);
        let mesh = Mesh::new(vec![far, far, DVec3::ZERO], vec![1, 2, 3], 3).unwrap();
        let welded = weld(&mesh, 1e-10).unwrap();
        assert_eq!(welded.positions(), &[far, DVec3::ZERO]);
        assert_eq!(welded.indices(), &[1, 1, 2]);
    }

    #[test]
    fn test_weld_rejects_bad_tolerance() {
        let mesh = Mesh::default();
        assert!(weld(&mesh, 0.0).is_err());
        assert!(weld(&mesh, f64::NAN).is_err());
    }
}
