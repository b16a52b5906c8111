//! Math type re-exports and sphere helpers.
//!
//! Positions are double precision throughout; `glam::DVec3` is the
//! vector type for pixel centers, corners and mesh vertices.

pub use glam::DVec3;

use std::f64::consts::PI;

/// Colatitude and longitude of a direction, `phi` in `[0, 2pi)`.
#[inline]
pub fn vec2ang(v: DVec3) -> (f64, f64) {
    let theta = v.x.hypot(v.y).atan2(v.z);
    let mut phi = v.y.atan2(v.x);
    if phi < 0.0 {
        phi += 2.0 * PI;
    }
    (theta, phi)
}

/// Z-up sky coordinates to the Y-up convention of OBJ consumers:
/// `(x, y, z) -> (x, z, -y)`.
#[inline]
pub fn zup_to_yup(v: DVec3) -> DVec3 {
    DVec3::new(v.x, v.z, -v.y)
}

/// Inverse of [`zup_to_yup`]: `(x, y, z) -> (x, -z, y)`.
#[inline]
pub fn yup_to_zup(v: DVec3) -> DVec3 {
    DVec3::new(v.x, -v.z, v.y)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_axis_permutation() {
        let v = DVec3::new(1.0, 2.0, 3.0);
        assert_eq!(zup_to_yup(v), DVec3::new(1.0, 3.0, -2.0));
        assert_eq!(yup_to_zup(zup_to_yup(v)), v);
        // Not idempotent: a second application keeps rotating.
        assert_eq!(zup_to_yup(zup_to_yup(v)), DVec3::new(1.0, -2.0, -3.0));
        assert_ne!(zup_to_yup(zup_to_yup(v)), zup_to_yup(v));
    }

    #[test]
    fn test_vec2ang() {
        let (theta, phi) = vec2ang(DVec3::new(0.0, -2.0, 0.0));
        assert!((theta - PI / 2.0).abs() < 1e-12);
        assert!((phi - 1.5 * PI).abs() < 1e-12);
        assert_eq!(vec2ang(DVec3::Z), (0.0, 0.0));
    }
}
