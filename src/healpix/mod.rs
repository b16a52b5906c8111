//! HEALPix pixelization: geometry, sky maps and resampling.
//!
//! - [`Healpix`] - index conversions, pixel centers and boundaries
//! - [`SkyMap`] - one value per pixel at a given nside and ordering
//! - [`ud_grade`] - change resolution of a map

mod base;
mod map;
mod resample;

pub use base::*;
pub use map::*;
pub use resample::*;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::util::Error;

/// Pixel ordering convention.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Ordering {
    /// Iso-latitude rings, north to south.
    #[default]
    #[serde(rename = "RING")]
    Ring,
    /// Hierarchical quad-tree within each base face.
    #[serde(rename = "NESTED", alias = "NEST")]
    Nested,
}

impl Ordering {
    /// Value of the FITS `ORDERING` keyword.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ring => "RING",
            Self::Nested => "NESTED",
        }
    }
}

impl fmt::Display for Ordering {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Ordering {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "RING" => Ok(Self::Ring),
            "NESTED" | "NEST" => Ok(Self::Nested),
            other => Err(Error::other(format!("unknown pixel ordering: {other}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ordering_parse() {
        assert_eq!("ring".parse::<Ordering>().unwrap(), Ordering::Ring);
        assert_eq!("NEST".parse::<Ordering>().unwrap(), Ordering::Nested);
        assert_eq!(" nested ".parse::<Ordering>().unwrap(), Ordering::Nested);
        assert!("spiral".parse::<Ordering>().is_err());
        assert_eq!(Ordering::Nested.to_string(), "NESTED");
    }

    #[test]
    fn test_ordering_serde() {
        let o: Ordering = serde_json::from_str("\"NEST\"").unwrap();
        assert_eq!(o, Ordering::Nested);
        assert_eq!(serde_json::to_string(&Ordering::Ring).unwrap(), "\"RING\"");
    }
}
