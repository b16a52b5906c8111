//! Utility types and functions for skymesh.
//!
//! - [`Error`] / [`Result`] - Error handling
//! - Math type re-exports from glam, axis convention, bounding boxes

mod error;
mod math;

pub use error::*;
pub use math::*;
