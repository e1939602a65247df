//! Perspective warp capability

use super::EvidenceImage;
use glam::{DMat3, DVec3};

/// Perspective image warping.
pub trait ImageWarp: Send + Sync {
    /// Fill `dst` by inverse mapping: every destination pixel `(col, row)`
    /// takes the source value at `sample_map * [col, row, 1]`.
    ///
    /// `sample_map` is the inverse of the forward (source to destination)
    /// transform.
    fn warp_perspective(&self, src: &EvidenceImage, sample_map: &DMat3, dst: &mut EvidenceImage);
}

/// [`ImageWarp`] with bilinear interpolation and zero borders.
#[derive(Debug, Clone, Copy, Default)]
pub struct BilinearWarp;

impl ImageWarp for BilinearWarp {
    fn warp_perspective(&self, src: &EvidenceImage, sample_map: &DMat3, dst: &mut EvidenceImage) {
        let cols = dst.cols();
        for (row, line) in dst.as_mut_slice().chunks_mut(cols.max(1)).enumerate() {
            let base = *sample_map * DVec3::new(0.0, row as f64, 1.0);
            for (col, value) in line.iter_mut().enumerate() {
                let p = base + sample_map.x_axis * col as f64;
                *value = if p.z.abs() < f64::EPSILON {
                    0.0
                } else {
                    src.sample_bilinear(p.x / p.z, p.y / p.z)
                };
            }
        }
    }
}
