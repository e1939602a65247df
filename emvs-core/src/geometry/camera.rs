//! Pinhole intrinsics and lens distortion coefficients

use glam::{DMat3, DVec2, DVec3};
use serde::{Deserialize, Serialize};

/// Pinhole camera intrinsics. Pixel `u` is the column, `v` the row.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CameraIntrinsics {
    pub fx: f64,
    pub fy: f64,
    pub cx: f64,
    pub cy: f64,
}

impl CameraIntrinsics {
    pub fn new(fx: f64, fy: f64, cx: f64, cy: f64) -> Self {
        Self { fx, fy, cx, cy }
    }

    /// The intrinsic matrix `K`.
    pub fn matrix(&self) -> DMat3 {
        DMat3::from_cols(
            DVec3::new(self.fx, 0.0, 0.0),
            DVec3::new(0.0, self.fy, 0.0),
            DVec3::new(self.cx, self.cy, 1.0),
        )
    }

    /// Pixel to normalized image coordinates.
    pub fn normalize(&self, pixel: DVec2) -> DVec2 {
        DVec2::new((pixel.x - self.cx) / self.fx, (pixel.y - self.cy) / self.fy)
    }

    /// Normalized image coordinates to pixel.
    pub fn denormalize(&self, point: DVec2) -> DVec2 {
        DVec2::new(point.x * self.fx + self.cx, point.y * self.fy + self.cy)
    }
}

/// Radial-tangential (plumb bob) distortion coefficients.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Distortion {
    pub k1: f64,
    pub k2: f64,
    pub p1: f64,
    pub p2: f64,
    pub k3: f64,
}

impl Distortion {
    /// Coefficients in `[k1, k2, p1, p2, k3]` order.
    pub fn from_array(coeffs: [f64; 5]) -> Self {
        let [k1, k2, p1, p2, k3] = coeffs;
        Self { k1, k2, p1, p2, k3 }
    }

    pub fn is_zero(&self) -> bool {
        self.k1 == 0.0 && self.k2 == 0.0 && self.p1 == 0.0 && self.p2 == 0.0 && self.k3 == 0.0
    }

    /// Apply the distortion model to an ideal normalized point.
    pub fn distort(&self, p: DVec2) -> DVec2 {
        let (x, y) = (p.x, p.y);
        let r2 = x * x + y * y;
        let radial = 1.0 + r2 * (self.k1 + r2 * (self.k2 + r2 * self.k3));
        DVec2::new(
            x * radial + 2.0 * self.p1 * x * y + self.p2 * (r2 + 2.0 * x * x),
            y * radial + self.p1 * (r2 + 2.0 * y * y) + 2.0 * self.p2 * x * y,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matrix_layout() {
        let k = CameraIntrinsics::new(200.0, 210.0, 120.0, 90.0).matrix();
        let p = k * DVec3::new(0.5, -0.25, 1.0);
        assert_eq!(p, DVec3::new(220.0, 37.5, 1.0));
    }

    #[test]
    fn test_normalize_round_trip() {
        let intrinsics = CameraIntrinsics::new(200.0, 200.0, 120.0, 90.0);
        let pixel = DVec2::new(37.0, 151.0);
        let back = intrinsics.denormalize(intrinsics.normalize(pixel));
        assert!((back - pixel).length() < 1e-12);
    }

    #[test]
    fn test_zero_distortion_is_identity() {
        let d = Distortion::default();
        assert!(d.is_zero());
        let p = DVec2::new(0.3, -0.2);
        assert_eq!(d.distort(p), p);
    }

    #[test]
    fn test_radial_distortion_pushes_outward() {
        let d = Distortion::from_array([0.1, 0.0, 0.0, 0.0, 0.0]);
        let p = DVec2::new(0.5, 0.0);
        let q = d.distort(p);
        assert!((q.x - 0.5 * (1.0 + 0.1 * 0.25)).abs() < 1e-12);
        assert_eq!(q.y, 0.0);
    }
}
