//! Dense 3x3 inversion capability

use glam::DMat3;

/// Matrix operations the plane sweep needs from a numeric backend.
pub trait Linalg: Send + Sync {
    /// Invert `m`, or `None` when it is singular or not finite.
    fn invert(&self, m: &DMat3) -> Option<DMat3>;
}

/// [`Linalg`] backed by glam.
#[derive(Debug, Clone, Copy)]
pub struct GlamLinalg {
    /// Determinants at or below this magnitude count as singular.
    pub epsilon: f64,
}

impl Default for GlamLinalg {
    fn default() -> Self {
        Self { epsilon: 1e-12 }
    }
}

impl Linalg for GlamLinalg {
    fn invert(&self, m: &DMat3) -> Option<DMat3> {
        if !m.is_finite() {
            return None;
        }
        let det = m.determinant();
        if !det.is_finite() || det.abs() <= self.epsilon {
            return None;
        }
        let inverse = m.inverse();
        inverse.is_finite().then_some(inverse)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::DVec3;

    #[test]
    fn test_invert_identity() {
        let inv = GlamLinalg::default().invert(&DMat3::IDENTITY).unwrap();
        assert_eq!(inv, DMat3::IDENTITY);
    }

    #[test]
    fn test_invert_singular() {
        let m = DMat3::from_cols(DVec3::X, DVec3::X, DVec3::Z);
        assert!(GlamLinalg::default().invert(&m).is_none());
    }

    #[test]
    fn test_invert_non_finite() {
        let m = DMat3::from_cols(DVec3::new(f64::NAN, 0.0, 0.0), DVec3::Y, DVec3::Z);
        assert!(GlamLinalg::default().invert(&m).is_none());
    }

    #[test]
    fn test_invert_product_is_identity() {
        let m = DMat3::from_cols(
            DVec3::new(2.0, 0.5, 0.0),
            DVec3::new(0.0, 3.0, 1.0),
            DVec3::new(1.0, 0.0, 4.0),
        );
        let inv = GlamLinalg::default().invert(&m).unwrap();
        assert!((m * inv).abs_diff_eq(DMat3::IDENTITY, 1e-12));
    }
}
