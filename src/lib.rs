//! # skymesh
//!
//! HEALPix pixel meshes and map resampling.
//!
//! Builds a polygon mesh with one face per HEALPix pixel and writes it as
//! plain-text OBJ, and resamples FITS sky maps to a target resolution,
//! writing one value per pixel to text files whose lines match the mesh
//! faces.
//!
//! ## Modules
//!
//! - [`util`] - Errors, math types, axis convention
//! - [`healpix`] - Pixel geometry, sky maps, `ud_grade`
//! - [`fits`] - FITS headers, binary tables, map read/write
//! - [`mesh`] - Pixel-boundary meshes, welding, OBJ
//! - [`export`] - JSON jobs and sample files
//!
//! ## Example
//!
//! ```ignore
//! use skymesh::prelude::*;
//!
//! let hp = Healpix::new(64)?;
//! let mesh = pixel_mesh(&hp, &PixelMeshOptions::default())?;
//! skymesh::mesh::obj::save_obj("healpix.obj", &mesh)?;
//! ```

pub mod util;
pub mod healpix;
pub mod fits;
pub mod mesh;
pub mod export;

pub use util::{Error, Result};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::util::{Error, Result, DVec3};
    pub use crate::healpix::{Healpix, Ordering, SkyMap, ResampleOptions, ud_grade, UNSEEN};
    pub use crate::fits::{FitsFile, ColumnRef};
    pub use crate::mesh::{Mesh, PixelMeshOptions, pixel_mesh, weld};
    pub use crate::export::{ExportConfig, ExportReport, run_export};
}
