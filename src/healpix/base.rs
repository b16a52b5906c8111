//! HEALPix pixel indexing and geometry.
//!
//! Pixels are addressed through face-local coordinates `(ix, iy, face)`:
//! twelve base faces, each an `nside x nside` grid. RING and NESTED indices
//! are both converted through that representation, and all geometry
//! (centers, boundaries) is evaluated from continuous face coordinates.

use std::f64::consts::FRAC_PI_2;

use crate::util::{vec2ang, DVec3, Error, Result};
use super::Ordering;

/// Largest supported resolution parameter (2^29).
pub const MAX_NSIDE: u32 = 1 << 29;

/// Ring number (in units of nside) of the northernmost corner of each base face.
const JRLL: [i64; 12] = [2, 2, 2, 2, 3, 3, 3, 3, 4, 4, 4, 4];

/// Longitude index (in units of pi/4) of each base face center.
const JPLL: [i64; 12] = [1, 3, 5, 7, 0, 2, 4, 6, 1, 3, 5, 7];

// ============================================================================
// Bit interleaving for NESTED indices
// ============================================================================

/// Spread the low 32 bits of `v` onto the even bit positions.
#[inline]
fn spread_bits(v: u64) -> u64 {
    let mut x = v & 0xFFFF_FFFF;
    x = (x | (x << 16)) & 0x0000_FFFF_0000_FFFF;
    x = (x | (x << 8)) & 0x00FF_00FF_00FF_00FF;
    x = (x | (x << 4)) & 0x0F0F_0F0F_0F0F_0F0F;
    x = (x | (x << 2)) & 0x3333_3333_3333_3333;
    (x | (x << 1)) & 0x5555_5555_5555_5555
}

/// Gather the even bits of `v` into the low 32 bits.
#[inline]
fn compress_bits(v: u64) -> u64 {
    let mut x = v & 0x5555_5555_5555_5555;
    x = (x | (x >> 1)) & 0x3333_3333_3333_3333;
    x = (x | (x >> 2)) & 0x0F0F_0F0F_0F0F_0F0F;
    x = (x | (x >> 4)) & 0x00FF_00FF_00FF_00FF;
    x = (x | (x >> 8)) & 0x0000_FFFF_0000_FFFF;
    (x | (x >> 16)) & 0xFFFF_FFFF
}

/// Integer square root (floor).
#[inline]
fn isqrt(v: i64) -> i64 {
    let mut r = (v as f64).sqrt() as i64;
    while r * r > v {
        r -= 1;
    }
    while (r + 1) * (r + 1) <= v {
        r += 1;
    }
    r
}

// ============================================================================
// Healpix
// ============================================================================

/// A HEALPix tessellation at a fixed resolution.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Healpix {
    nside: i64,
    /// log2(nside) when nside is a power of two.
    order: Option<u32>,
    npface: i64,
    ncap: i64,
    npix: i64,
}

impl Healpix {
    /// Create a tessellation for `nside` in `1..=2^29`.
    pub fn new(nside: u32) -> Result<Self> {
        if nside == 0 || nside > MAX_NSIDE {
            return Err(Error::InvalidNside(nside as u64));
        }
        let order = nside.is_power_of_two().then(|| nside.trailing_zeros());
        let ns = nside as i64;
        Ok(Self {
            nside: ns,
            order,
            npface: ns * ns,
            ncap: 2 * ns * (ns - 1),
            npix: 12 * ns * ns,
        })
    }

    /// Number of pixels for a resolution, without building a tessellation.
    #[inline]
    pub fn npix_for(nside: u32) -> u64 {
        12 * (nside as u64) * (nside as u64)
    }

    /// Resolution parameter for a pixel count, if it is `12 * nside^2`.
    pub fn nside_for(npix: u64) -> Option<u32> {
        if npix == 0 || npix % 12 != 0 {
            return None;
        }
        let ns = isqrt((npix / 12) as i64) as u64;
        (ns * ns * 12 == npix && ns <= MAX_NSIDE as u64).then_some(ns as u32)
    }

    #[inline]
    pub fn nside(&self) -> u32 {
        self.nside as u32
    }

    #[inline]
    pub fn npix(&self) -> u64 {
        self.npix as u64
    }

    /// log2(nside), or `None` when nside is not a power of two.
    #[inline]
    pub fn order(&self) -> Option<u32> {
        self.order
    }

    /// Check if NESTED indexing is available at this resolution.
    #[inline]
    pub fn supports_nested(&self) -> bool {
        self.order.is_some()
    }

    fn check_pix(&self, pix: u64) -> Result<i64> {
        if pix >= self.npix as u64 {
            return Err(Error::PixelOutOfRange { index: pix, npix: self.npix as u64 });
        }
        Ok(pix as i64)
    }

    fn require_order(&self) -> Result<u32> {
        self.order.ok_or(Error::NotPowerOfTwo(self.nside as u64))
    }

    // ------------------------------------------------------------------------
    // Index conversions
    // ------------------------------------------------------------------------

    /// Face-local coordinates `(ix, iy, face)` of a pixel.
    pub fn pix2xyf(&self, pix: u64, ordering: Ordering) -> Result<(i64, i64, usize)> {
        let pix = self.check_pix(pix)?;
        match ordering {
            Ordering::Ring => Ok(self.ring2xyf(pix)),
            Ordering::Nested => {
                let order = self.require_order()?;
                Ok(self.nest2xyf(pix, order))
            }
        }
    }

    /// Pixel index of face-local coordinates.
    pub fn xyf2pix(&self, ix: i64, iy: i64, face: usize, ordering: Ordering) -> Result<u64> {
        if face >= 12 || !(0..self.nside).contains(&ix) || !(0..self.nside).contains(&iy) {
            return Err(Error::other(format!(
                "face coordinates ({ix}, {iy}, {face}) outside nside {}",
                self.nside
            )));
        }
        let pix = match ordering {
            Ordering::Ring => self.xyf2ring(ix, iy, face),
            Ordering::Nested => {
                let order = self.require_order()?;
                self.xyf2nest(ix, iy, face, order)
            }
        };
        Ok(pix as u64)
    }

    /// Convert a RING index to NESTED.
    pub fn ring2nest(&self, pix: u64) -> Result<u64> {
        let order = self.require_order()?;
        let (ix, iy, face) = self.ring2xyf(self.check_pix(pix)?);
        Ok(self.xyf2nest(ix, iy, face, order) as u64)
    }

    /// Convert a NESTED index to RING.
    pub fn nest2ring(&self, pix: u64) -> Result<u64> {
        let order = self.require_order()?;
        let (ix, iy, face) = self.nest2xyf(self.check_pix(pix)?, order);
        Ok(self.xyf2ring(ix, iy, face) as u64)
    }

    fn nest2xyf(&self, pix: i64, order: u32) -> (i64, i64, usize) {
        let face = (pix >> (2 * order)) as usize;
        let local = (pix & (self.npface - 1)) as u64;
        let ix = compress_bits(local) as i64;
        let iy = compress_bits(local >> 1) as i64;
        (ix, iy, face)
    }

    fn xyf2nest(&self, ix: i64, iy: i64, face: usize, order: u32) -> i64 {
        let local = spread_bits(ix as u64) + (spread_bits(iy as u64) << 1);
        ((face as i64) << (2 * order)) + local as i64
    }

    fn ring2xyf(&self, pix: i64) -> (i64, i64, usize) {
        let ns = self.nside;
        let nl2 = 2 * ns;
        let (iring, iphi, kshift, nr, face) = if pix < self.ncap {
            // North polar cap
            let iring = (1 + isqrt(1 + 2 * pix)) >> 1;
            let iphi = (pix + 1) - 2 * iring * (iring - 1);
            let face = (iphi - 1) / iring;
            (iring, iphi, 0, iring, face)
        } else if pix < self.npix - self.ncap {
            // Equatorial belt
            let ip = pix - self.ncap;
            let tmp = ip / (4 * ns);
            let iring = tmp + ns;
            let iphi = ip - tmp * 4 * ns + 1;
            let kshift = (iring + ns) & 1;
            let ire = tmp + 1;
            let irm = nl2 + 1 - tmp;
            let ifm = (iphi - (ire >> 1) + ns - 1) / ns;
            let ifp = (iphi - (irm >> 1) + ns - 1) / ns;
            let face = if ifp == ifm {
                ifp | 4
            } else if ifp < ifm {
                ifp
            } else {
                ifm + 8
            };
            (iring, iphi, kshift, ns, face)
        } else {
            // South polar cap
            let ip = self.npix - pix;
            let iring = (1 + isqrt(2 * ip - 1)) >> 1;
            let iphi = 4 * iring + 1 - (ip - 2 * iring * (iring - 1));
            let face = (iphi - 1) / iring + 8;
            (2 * nl2 - iring, iphi, 0, iring, face)
        };

        let face = face as usize;
        let irt = iring - (2 + (face >> 2) as i64) * ns + 1;
        let mut ipt = 2 * iphi - JPLL[face] * nr - kshift - 1;
        if ipt >= nl2 {
            ipt -= 8 * ns;
        }
        ((ipt - irt) >> 1, (-ipt - irt) >> 1, face)
    }

    fn xyf2ring(&self, ix: i64, iy: i64, face: usize) -> i64 {
        let ns = self.nside;
        let nl4 = 4 * ns;
        let jr = JRLL[face] * ns - ix - iy - 1;

        // Start pixel, pixels per ring / 4, and whether the ring is shifted.
        let (n_before, nr, shifted) = if jr < ns {
            (2 * jr * (jr - 1), jr, true)
        } else if jr < 3 * ns {
            (self.ncap + (jr - ns) * nl4, ns, ((jr - ns) & 1) == 0)
        } else {
            let nr = nl4 - jr;
            (self.npix - 2 * nr * (nr + 1), nr, true)
        };

        let kshift = if shifted { 0 } else { 1 };
        let mut jp = (JPLL[face] * nr + ix - iy + 1 + kshift) / 2;
        if jp < 1 {
            jp += nl4;
        }
        n_before + jp - 1
    }

    // ------------------------------------------------------------------------
    // Geometry
    // ------------------------------------------------------------------------

    /// Unit vector at continuous face coordinates `(x, y)` in `[0, 1]`.
    fn face_point(x: f64, y: f64, face: usize) -> DVec3 {
        let jr = JRLL[face] as f64 - x - y;
        let (z, nr, sth) = if jr < 1.0 {
            let tmp = jr * jr / 3.0;
            let z = 1.0 - tmp;
            (z, jr, (tmp * (2.0 - tmp)).sqrt())
        } else if jr > 3.0 {
            let nr = 4.0 - jr;
            let tmp = nr * nr / 3.0;
            let z = tmp - 1.0;
            (z, nr, (tmp * (2.0 - tmp)).sqrt())
        } else {
            let z = (2.0 - jr) * 2.0 / 3.0;
            (z, 1.0, ((1.0 - z) * (1.0 + z)).sqrt())
        };

        let mut tmp = JPLL[face] as f64 * nr + x - y;
        if tmp < 0.0 {
            tmp += 8.0;
        }
        if tmp >= 8.0 {
            tmp -= 8.0;
        }
        let phi = if nr < 1e-15 { 0.0 } else { 0.5 * FRAC_PI_2 * tmp / nr };
        let (sp, cp) = phi.sin_cos();
        DVec3::new(sth * cp, sth * sp, z)
    }

    /// Unit vector of a pixel center.
    pub fn pix2vec(&self, pix: u64, ordering: Ordering) -> Result<DVec3> {
        let (ix, iy, face) = self.pix2xyf(pix, ordering)?;
        let ns = self.nside as f64;
        Ok(Self::face_point((ix as f64 + 0.5) / ns, (iy as f64 + 0.5) / ns, face))
    }

    /// Colatitude and longitude (radians) of a pixel center.
    pub fn pix2ang(&self, pix: u64, ordering: Ordering) -> Result<(f64, f64)> {
        Ok(vec2ang(self.pix2vec(pix, ordering)?))
    }

    /// Boundary points of a pixel, counter-clockwise seen from outside.
    ///
    /// With `step = 1` these are the four corners in north, west, south,
    /// east order. Larger `step` values insert `step - 1` points along each
    /// edge, returning `4 * step` points.
    pub fn boundaries(&self, pix: u64, step: usize, ordering: Ordering) -> Result<Vec<DVec3>> {
        let mut out = Vec::with_capacity(4 * step.max(1));
        self.boundaries_into(pix, step, ordering, &mut out)?;
        Ok(out)
    }

    /// Append the boundary points of a pixel to `out`.
    pub fn boundaries_into(
        &self,
        pix: u64,
        step: usize,
        ordering: Ordering,
        out: &mut Vec<DVec3>,
    ) -> Result<()> {
        if step == 0 {
            return Err(Error::other("boundary step must be at least 1"));
        }
        let (ix, iy, face) = self.pix2xyf(pix, ordering)?;
        let ns = self.nside as f64;
        let (x0, y0) = (ix as f64, iy as f64);

        let edges: [fn(f64, f64, f64) -> (f64, f64); 4] = [
            |x, y, t| (x + 1.0 - t, y + 1.0), // north -> west
            |x, y, t| (x, y + 1.0 - t),       // west -> south
            |x, y, t| (x + t, y),             // south -> east
            |x, y, t| (x + 1.0, y + t),       // east -> north
        ];
        for edge in edges {
            for i in 0..step {
                let t = i as f64 / step as f64;
                let (x, y) = edge(x0, y0, t);
                out.push(Self::face_point(x / ns, y / ns, face));
            }
        }
        Ok(())
    }
}
