//! Pixel-boundary mesh construction.

use tracing::debug;

use crate::healpix::{Healpix, Ordering};
use crate::util::{Error, Result};
use super::Mesh;

/// Options for [`pixel_mesh`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PixelMeshOptions {
    /// Pixel order of the faces. RING matches RING-ordered sample files
    /// line for line.
    pub ordering: Ordering,
    /// Boundary points per pixel edge; faces have `4 * step` vertices.
    pub step: usize,
}

impl Default for PixelMeshOptions {
    fn default() -> Self {
        Self { ordering: Ordering::Ring, step: 1 }
    }
}

/// One face per pixel, built from pixel boundaries.
///
/// Boundary points of pixel `p` are stored contiguously, so face `p` is
/// `(k p + 1, ..., k p + k)` with `k = 4 * step`. Shared corners are
/// duplicated; see [`super::weld`].
#[tracing::instrument(skip_all, fields(nside = hp.nside(), step = opts.step))]
pub fn pixel_mesh(hp: &Healpix, opts: &PixelMeshOptions) -> Result<Mesh> {
    if opts.step == 0 {
        return Err(Error::other("boundary step must be at least 1"));
    }
    let arity = 4 * opts.step;
    let npix = hp.npix() as usize;
    let total = npix
        .checked_mul(arity)
        .filter(|&n| n <= u32::MAX as usize)
        .ok_or_else(|| {
            Error::InvalidMesh(format!("{npix} pixels x {arity} vertices exceeds u32 indices"))
        })?;

    let mut positions = Vec::with_capacity(total);
    for pix in 0..hp.npix() {
        hp.boundaries_into(pix, opts.step, opts.ordering, &mut positions)?;
    }
    let indices: Vec<u32> = (1..=total as u32).collect();
    debug!(vertices = positions.len(), faces = npix, "built pixel mesh");

    Mesh::new(positions, indices, arity)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nside1_shapes() {
        let hp = Healpix::new(1).unwrap();
        let mesh = pixel_mesh(&hp, &PixelMeshOptions::default()).unwrap();
        assert_eq!(mesh.num_vertices(), 48);
        assert_eq!(mesh.num_faces(), 12);
        assert_eq!(mesh.arity(), 4);

        let mut seen = [false; 48];
        for face in mesh.faces() {
            for &i in face {
                assert!((1..=48).contains(&i));
                assert!(!seen[i as usize - 1], "index {i} repeated");
                seen[i as usize - 1] = true;
            }
        }
        assert!(seen.iter().all(|&s| s));
        assert_eq!(mesh.faces().nth(2), Some(&[9, 10, 11, 12][..]));
    }

    #[test]
    fn test_face_matches_pixel_boundaries() {
        let hp = Healpix::new(2).unwrap();
        let opts = PixelMeshOptions { ordering: Ordering::Nested, step: 2 };
        let mesh = pixel_mesh(&hp, &opts).unwrap();
        assert_eq!(mesh.arity(), 8);
        assert_eq!(mesh.num_vertices(), 48 * 8);

        let expected = hp.boundaries(17, 2, Ordering::Nested).unwrap();
        let actual: Vec<_> = mesh.face_positions(17).collect();
        assert_eq!(actual, expected);
    }

    #[test]
    fn test_zero_step_rejected() {
        let hp = Healpix::new(1).unwrap();
        let opts = PixelMeshOptions { step: 0, ..Default::default() };
        assert!(pixel_mesh(&hp, &opts).is_err());
    }
}
