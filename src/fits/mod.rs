//! FITS container support for HEALPix maps.
//!
//! Only what sky maps need is implemented: header cards, HDU layout,
//! binary table columns of real types, and a single-table map writer.
//!
//! ```ignore
//! use skymesh::fits::{FitsFile, ColumnRef};
//!
//! let fits = FitsFile::open("COM_CMB_IQU-smica_2048_R3.00_full.fits")?;
//! let (name, map) = fits.read_map(&ColumnRef::from("I_STOKES"))?;
//! println!("{name}: nside {} {}", map.nside(), map.ordering());
//! ```

pub mod format;
mod header;
mod map;
mod reader;
mod table;

pub use header::{Card, Header, Value};
pub use map::*;
pub use reader::{FitsFile, Hdu, HduKind};
pub use table::{BinTable, Column, ColumnRef};
