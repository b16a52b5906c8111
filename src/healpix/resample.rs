//! Resolution change for HEALPix maps.
//!
//! NESTED indices of the children of a pixel are contiguous, so both
//! directions run on the NESTED representation: degrading averages blocks
//! of `(nin / nout)^2` values, upgrading repeats each value that many times.

use tracing::debug;

use crate::util::{Error, Result};
use super::{is_unseen, Ordering, SkyMap, UNSEEN};

/// Options for [`ud_grade`].
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ResampleOptions {
    /// Output ordering; `None` keeps the input ordering.
    pub ordering: Option<Ordering>,
    /// Degraded pixel is UNSEEN if any child is UNSEEN.
    pub pessimistic: bool,
    /// Multiply values by `(nout / nin)^power`.
    pub power: Option<f64>,
}

impl ResampleOptions {
    pub fn with_ordering(mut self, ordering: Ordering) -> Self {
        self.ordering = Some(ordering);
        self
    }
}

/// Resample `map` to `nside_out`.
///
/// Both resolutions must be powers of two.
#[tracing::instrument(skip_all, fields(nside_in = map.nside(), nside_out = nside_out))]
pub fn ud_grade(map: &SkyMap, nside_out: u32, opts: &ResampleOptions) -> Result<SkyMap> {
    let nside_in = map.nside();
    for ns in [nside_in, nside_out] {
        if ns == 0 {
            return Err(Error::InvalidNside(0));
        }
        if !ns.is_power_of_two() {
            return Err(Error::NotPowerOfTwo(ns as u64));
        }
    }
    let ordering_out = opts.ordering.unwrap_or(map.ordering());

    let nested = map.reorder(Ordering::Nested)?;
    let mut values = if nside_out < nside_in {
        let ratio = (nside_in / nside_out) as usize;
        degrade(nested.values(), ratio * ratio, opts.pessimistic)
    } else if nside_out > nside_in {
        let ratio = (nside_out / nside_in) as usize;
        upgrade(nested.values(), ratio * ratio)
    } else {
        nested.into_values()
    };
    debug!(npix = values.len(), "resampled");

    if let Some(power) = opts.power {
        let factor = (nside_out as f64 / nside_in as f64).powf(power);
        for v in values.iter_mut().filter(|v| !is_unseen(**v)) {
            *v *= factor;
        }
    }

    SkyMap::new(nside_out, Ordering::Nested, values)?.reorder(ordering_out)
}

fn degrade(values: &[f64], block: usize, pessimistic: bool) -> Vec<f64> {
    values
        .chunks_exact(block)
        .map(|children| {
            let mut sum = 0.0;
            let mut seen = 0usize;
            for &v in children {
                if !is_unseen(v) {
                    sum += v;
                    seen += 1;
                }
            }
            if seen == 0 || (pessimistic && seen < block) {
                UNSEEN
            } else {
                sum / seen as f64
            }
        })
        .collect()
}

fn upgrade(values: &[f64], block: usize) -> Vec<f64> {
    values
        .iter()
        .flat_map(|&v| std::iter::repeat(v).take(block))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uniform_any_direction() {
        let map = SkyMap::filled(4, Ordering::Ring, 2.725).unwrap();
        for nside in [1, 2, 4, 8, 16] {
            let out = ud_grade(&map, nside, &ResampleOptions::default()).unwrap();
            assert_eq!(out.len(), 12 * (nside * nside) as usize);
            assert!(out.values().iter().all(|&v| (v - 2.725).abs() < 1e-12));
        }
    }

    #[test]
    fn test_degrade_averages_children() {
        let values: Vec<f64> = (0..48).map(f64::from).collect();
        let map = SkyMap::new(2, Ordering::Nested, values).unwrap();
        let out = ud_grade(&map, 1, &ResampleOptions::default()).unwrap();
        assert_eq!(out.values()[0], 1.5);
        assert_eq!(out.values()[11], 45.5);
    }

    #[test]
    fn test_degrade_unseen_handling() {
        let mut values = vec![1.0; 48];
        values[0] = UNSEEN;
        values[4..8].fill(UNSEEN);
        let map = SkyMap::new(2, Ordering::Nested, values).unwrap();

        let out = ud_grade(&map, 1, &ResampleOptions::default()).unwrap();
        assert_eq!(out.values()[0], 1.0);
        assert_eq!(out.values()[1], UNSEEN);

        let opts = ResampleOptions { pessimistic: true, ..Default::default() };
        let out = ud_grade(&map, 1, &opts).unwrap();
        assert_eq!(out.values()[0], UNSEEN);
    }

    #[test]
    fn test_degrade_then_upgrade_is_identity_on_block_constant_map() {
        let coarse: Vec<f64> = (0..12).map(|p| p as f64 * 10.0).collect();
        let coarse = SkyMap::new(1, Ordering::Ring, coarse).unwrap();
        let fine = ud_grade(&coarse, 4, &ResampleOptions::default()).unwrap();
        let back = ud_grade(&fine, 1, &ResampleOptions::default()).unwrap();
        assert_eq!(back, coarse);
    }

    #[test]
    fn test_power_and_ordering() {
        let map = SkyMap::filled(2, Ordering::Ring, 1.0).unwrap();
        let opts = ResampleOptions { power: Some(-2.0), ..Default::default() }
            .with_ordering(Ordering::Nested);
        let out = ud_grade(&map, 4, &opts).unwrap();
        assert_eq!(out.ordering(), Ordering::Nested);
        assert!(out.values().iter().all(|&v| (v - 0.25).abs() < 1e-15));
    }

    #[test]
    fn test_rejects_non_power_of_two() {
        let map = SkyMap::filled(3, Ordering::Ring, 0.0).unwrap();
        assert!(matches!(
            ud_grade(&map, 1, &ResampleOptions::default()),
            Err(Error::NotPowerOfTwo(3))
        ));
    }
}
