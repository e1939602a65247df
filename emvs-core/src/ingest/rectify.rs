//! Lens undistortion of accumulated event images

use crate::geometry::{CameraIntrinsics, Distortion};
use crate::image::EvidenceImage;
use crate::ingest::EventImage;
use glam::DVec2;

/// Removes lens distortion from a drained event image.
pub trait Rectifier: Send + Sync {
    fn rectify(&self, events: &EventImage) -> EvidenceImage;
}

/// Undistortion for a pinhole camera with radial-tangential distortion.
///
/// Each ideal output pixel is pushed through the distortion model to find
/// where the lens imaged it, and the count image is sampled bilinearly there.
#[derive(Debug, Clone, Copy)]
pub struct PinholeRectifier {
    intrinsics: CameraIntrinsics,
    distortion: Distortion,
}

impl PinholeRectifier {
    pub fn new(intrinsics: CameraIntrinsics, distortion: Distortion) -> Self {
        Self {
            intrinsics,
            distortion,
        }
    }

    /// Source (distorted) pixel for an ideal output pixel.
    pub fn distorted_pixel(&self, pixel: DVec2) -> DVec2 {
        let ideal = self.intrinsics.normalize(pixel);
        self.intrinsics.denormalize(self.distortion.distort(ideal))
    }
}

impl Rectifier for PinholeRectifier {
    fn rectify(&self, events: &EventImage) -> EvidenceImage {
        let raw = events.to_evidence();
        if self.distortion.is_zero() {
            return raw;
        }
        EvidenceImage::from_fn(events.rows(), events.cols(), |row, col| {
            let src = self.distorted_pixel(DVec2::new(col as f64, row as f64));
            raw.sample_bilinear(src.x, src.y)
        })
    }
}
