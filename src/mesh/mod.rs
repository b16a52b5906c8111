//! Polygon meshes built from HEALPix pixel boundaries.
//!
//! - [`Mesh`] - positions plus fixed-arity faces of 1-based indices
//! - [`pixel_mesh`] - one face per pixel
//! - [`weld`] - optional merge of coincident vertices
//! - [`obj`] - plain-text OBJ serialization

mod build;
pub mod obj;
mod weld;

pub use build::*;
pub use weld::*;

use std::slice::ChunksExact;

use crate::util::{DVec3, Error, Result};

/// Vertex positions and faces with a fixed number of vertices each.
///
/// Face indices are 1-based and stored flat: face `i` occupies
/// `indices[i * arity..(i + 1) * arity]`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Mesh {
    positions: Vec<DVec3>,
    indices: Vec<u32>,
    arity: usize,
}

impl Mesh {
    /// Create a mesh, checking arity and index bounds.
    pub fn new(positions: Vec<DVec3>, indices: Vec<u32>, arity: usize) -> Result<Self> {
        let mesh = Self { positions, indices, arity };
        mesh.validate()?;
        Ok(mesh)
    }

    /// Check that faces tile the index array and reference existing vertices.
    pub fn validate(&self) -> Result<()> {
        if self.arity == 0 {
            if self.indices.is_empty() {
                return Ok(());
            }
            return Err(Error::InvalidMesh("faces with arity 0".into()));
        }
        if self.indices.len() % self.arity != 0 {
            return Err(Error::InvalidMesh(format!(
                "{} indices do not form faces of {}",
                self.indices.len(),
                self.arity
            )));
        }
        let n = self.positions.len();
        if let Some(bad) = self.indices.iter().find(|&&i| i == 0 || i as usize > n) {
            return Err(Error::InvalidMesh(format!(
                "index {bad} outside 1..={n}"
            )));
        }
        Ok(())
    }

    #[inline]
    pub fn positions(&self) -> &[DVec3] {
        &self.positions
    }

    /// Flat 1-based face indices.
    #[inline]
    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    /// Vertices per face.
    #[inline]
    pub fn arity(&self) -> usize {
        self.arity
    }

    #[inline]
    pub fn num_vertices(&self) -> usize {
        self.positions.len()
    }

    #[inline]
    pub fn num_faces(&self) -> usize {
        if self.arity == 0 {
            0
        } else {
            self.indices.len() / self.arity
        }
    }

    /// Iterate faces as index slices.
    pub fn faces(&self) -> ChunksExact<'_, u32> {
        self.indices.chunks_exact(self.arity.max(1))
    }

    /// Positions of one face.
    pub fn face_positions(&self, face: usize) -> impl Iterator<Item = DVec3> + '_ {
        let arity = self.arity;
        self.indices[face * arity..(face + 1) * arity]
            .iter()
            .map(|&i| self.positions[i as usize - 1])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quad() -> Vec<DVec3> {
        vec![DVec3::ZERO, DVec3::X, DVec3::new(1.0, 1.0, 0.0), DVec3::Y]
    }

    #[test]
    fn test_new_validates() {
        let m = Mesh::new(quad(), vec![1, 2, 3, 4], 4).unwrap();
        assert_eq!(m.num_faces(), 1);
        assert_eq!(m.faces().next(), Some(&[1, 2, 3, 4][..]));

        assert!(Mesh::new(quad(), vec![0, 1, 2, 3], 4).is_err());
        assert!(Mesh::new(quad(), vec![1, 2, 3, 5], 4).is_err());
        assert!(Mesh::new(quad(), vec![1, 2, 3], 4).is_err());
        assert!(Mesh::new(quad(), vec![1], 0).is_err());
        assert!(Mesh::new(quad(), vec![], 0).is_ok());
    }

    #[test]
    fn test_face_positions() {
        let m = Mesh::new(quad(), vec![4, 3, 2, 1], 4).unwrap();
        let pts: Vec<DVec3> = m.face_positions(0).collect();
        assert_eq!(pts[0], DVec3::Y);
        assert_eq!(pts[3], DVec3::ZERO);
    }
}
