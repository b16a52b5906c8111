//! Full-sky HEALPix maps.

use crate::util::{Error, Result};
use super::{Healpix, Ordering};

/// HEALPix sentinel for missing pixels.
pub const UNSEEN: f64 = -1.6375e30;

/// Check if a value is the [`UNSEEN`] sentinel (within single precision).
#[inline]
pub fn is_unseen(v: f64) -> bool {
    (v - UNSEEN).abs() <= 1e-5 * UNSEEN.abs()
}

/// One scalar per pixel at a fixed resolution and ordering.
#[derive(Clone, Debug, PartialEq)]
pub struct SkyMap {
    nside: u32,
    ordering: Ordering,
    values: Vec<f64>,
}

impl SkyMap {
    /// Wrap a value array, checking its length against `12 * nside^2`.
    pub fn new(nside: u32, ordering: Ordering, values: Vec<f64>) -> Result<Self> {
        let hp = Healpix::new(nside)?;
        if values.len() as u64 != hp.npix() {
            return Err(Error::LengthMismatch {
                expected: hp.npix() as usize,
                actual: values.len(),
            });
        }
        if ordering == Ordering::Nested && !hp.supports_nested() {
            return Err(Error::NotPowerOfTwo(nside as u64));
        }
        Ok(Self { nside, ordering, values })
    }

    /// Map with every pixel set to `value`.
    pub fn filled(nside: u32, ordering: Ordering, value: f64) -> Result<Self> {
        let npix = Healpix::new(nside)?.npix() as usize;
        Self::new(nside, ordering, vec![value; npix])
    }

    #[inline]
    pub fn nside(&self) -> u32 {
        self.nside
    }

    #[inline]
    pub fn ordering(&self) -> Ordering {
        self.ordering
    }

    #[inline]
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    #[inline]
    pub fn into_values(self) -> Vec<f64> {
        self.values
    }

    /// Number of pixels.
    #[inline]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Number of pixels that are not [`UNSEEN`].
    pub fn num_seen(&self) -> usize {
        self.values.iter().filter(|v| !is_unseen(**v)).count()
    }

    /// Same values under another pixel ordering.
    pub fn reorder(&self, to: Ordering) -> Result<Self> {
        if to == self.ordering {
            return Ok(self.clone());
        }
        let hp = Healpix::new(self.nside)?;
        let mut out = vec![0.0; self.values.len()];
        for (pix, &v) in self.values.iter().enumerate() {
            let dst = match to {
                Ordering::Nested => hp.ring2nest(pix as u64)?,
                Ordering::Ring => hp.nest2ring(pix as u64)?,
            };
            out[dst as usize] = v;
        }
        Ok(Self { nside: self.nside, ordering: to, values: out })
    }

    /// Multiply every seen pixel by `factor`.
    pub fn scale(&mut self, factor: f64) {
        for v in self.values.iter_mut().filter(|v| !is_unseen(**v)) {
            *v *= factor;
        }
    }

    /// Minimum and maximum over seen pixels.
    pub fn range(&self) -> Option<(f64, f64)> {
        self.values
            .iter()
            .copied()
            .filter(|v| !is_unseen(*v))
            .fold(None, |acc, v| match acc {
                None => Some((v, v)),
                Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_checks_length() {
        assert!(SkyMap::new(1, Ordering::Ring, vec![0.0; 12]).is_ok());
        assert!(matches!(
            SkyMap::new(1, Ordering::Ring, vec![0.0; 11]),
            Err(Error::LengthMismatch { expected: 12, actual: 11 })
        ));
        assert!(matches!(
            SkyMap::new(3, Ordering::Nested, vec![0.0; 108]),
            Err(Error::NotPowerOfTwo(3))
        ));
    }

    #[test]
    fn test_reorder_roundtrip() {
        let values: Vec<f64> = (0..48).map(f64::from).collect();
        let ring = SkyMap::new(2, Ordering::Ring, values).unwrap();
        let nest = ring.reorder(Ordering::Nested).unwrap();
        assert_eq!(nest.ordering(), Ordering::Nested);
        assert_ne!(nest.values(), ring.values());
        assert_eq!(nest.reorder(Ordering::Ring).unwrap(), ring);
    }

    #[test]
    fn test_scale_skips_unseen() {
        let mut m = SkyMap::filled(1, Ordering::Ring, 2.0).unwrap();
        m.values[3] = UNSEEN;
        m.scale(1e6);
        assert_eq!(m.values()[0], 2e6);
        assert_eq!(m.values()[3], UNSEEN);
        assert_eq!(m.num_seen(), 11);
        assert_eq!(m.range(), Some((2e6, 2e6)));
    }
}
