//! Disparity Space Image: the (row, col, plane) evidence volume

use crate::error::{EmvsError, Result};
use crate::image::EvidenceImage;
use crate::reconstruction::DepthPlanes;
use glam::{DMat3, DVec3};
use ordered_float::OrderedFloat;
use std::cmp::Reverse;
use tracing::debug;

/// A pixel whose depth was recovered from the volume.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DsiPoint {
    pub row: usize,
    pub col: usize,
    /// Index of the winning depth plane.
    pub plane: usize,
    pub depth: f64,
    /// Accumulated evidence at the winning plane.
    pub evidence: f32,
    /// Back-projected point in the keyframe camera frame.
    pub position: DVec3,
}

/// Per-plane, per-pixel evidence accumulated over one keyframe's lifetime.
///
/// Slices are stored plane-major, so each depth plane is one contiguous
/// row-major image.
#[derive(Debug, Clone)]
pub struct DisparitySpaceVolume {
    rows: usize,
    cols: usize,
    planes: DepthPlanes,
    intrinsics_inverse: DMat3,
    data: Vec<f32>,
    accumulations: usize,
}

impl DisparitySpaceVolume {
    /// `intrinsics_inverse` is `K⁻¹`, used to back-project extracted pixels.
    pub fn new(rows: usize, cols: usize, planes: DepthPlanes, intrinsics_inverse: DMat3) -> Self {
        let data = vec![0.0; rows * cols * planes.len()];
        Self {
            rows,
            cols,
            planes,
            intrinsics_inverse,
            data,
            accumulations: 0,
        }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn planes(&self) -> &DepthPlanes {
        &self.planes
    }

    /// Number of images accumulated since construction or the last reset.
    pub fn accumulations(&self) -> usize {
        self.accumulations
    }

    /// True when nothing has been accumulated since the last reset.
    pub fn is_empty(&self) -> bool {
        self.accumulations == 0
    }

    fn slice_len(&self) -> usize {
        self.rows * self.cols
    }

    /// Evidence image for one depth plane.
    pub fn slice(&self, plane: usize) -> Option<&[f32]> {
        let len = self.slice_len();
        (plane < self.planes.len()).then(|| &self.data[plane * len..(plane + 1) * len])
    }

    pub fn value(&self, row: usize, col: usize, plane: usize) -> Option<f32> {
        if row >= self.rows || col >= self.cols {
            return None;
        }
        self.slice(plane).map(|s| s[row * self.cols + col])
    }

    /// The whole volume, plane-major.
    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    /// Add a warped image into one depth slice, elementwise.
    pub fn accumulate(&mut self, plane: usize, warped: &EvidenceImage) -> Result<()> {
        if plane >= self.planes.len() {
            return Err(EmvsError::PlaneOutOfRange {
                plane,
                planes: self.planes.len(),
            });
        }
        if warped.rows() != self.rows || warped.cols() != self.cols {
            return Err(EmvsError::ImageSizeMismatch {
                rows: self.rows,
                cols: self.cols,
                got_rows: warped.rows(),
                got_cols: warped.cols(),
            });
        }

        let len = self.slice_len();
        let slice = &mut self.data[plane * len..(plane + 1) * len];
        for (cell, value) in slice.iter_mut().zip(warped.as_slice()) {
            *cell += *value;
        }
        self.accumulations += 1;
        Ok(())
    }

    /// Recover one 3-D point per pixel from the evidence peaks.
    ///
    /// A pixel's depth is the plane with maximal evidence, ties going to the
    /// nearest plane. The pixel is kept only if that evidence is positive and
    /// at least `confidence_floor`. Reading the volume does not modify it.
    #[tracing::instrument(skip(self), fields(planes = self.planes.len()))]
    pub fn extract_points(&self, confidence_floor: f32) -> Vec<DsiPoint> {
        if self.is_empty() {
            return Vec::new();
        }

        let len = self.slice_len();
        let mut points = Vec::new();
        for pixel in 0..len {
            let peak = (0..self.planes.len())
                .map(|plane| (plane, self.data[plane * len + pixel]))
                .max_by_key(|&(plane, evidence)| (OrderedFloat(evidence), Reverse(plane)));

            let Some((plane, evidence)) = peak else {
                continue;
            };
            if evidence <= 0.0 || evidence < confidence_floor {
                continue;
            }
            let Some(depth) = self.planes.depth(plane) else {
                continue;
            };

            let (row, col) = (pixel / self.cols, pixel % self.cols);
            points.push(DsiPoint {
                row,
                col,
                plane,
                depth,
                evidence,
                position: self.back_project(row, col, depth),
            });
        }

        debug!("Extracted {} points from {} pixels", points.len(), len);
        points
    }

    /// `X = K⁻¹ · [col, row, 1]ᵀ · depth`
    pub fn back_project(&self, row: usize, col: usize, depth: f64) -> DVec3 {
        self.intrinsics_inverse * DVec3::new(col as f64, row as f64, 1.0) * depth
    }

    /// Zero the whole volume. Resetting an empty volume is a no-op.
    pub fn reset(&mut self) {
        self.data.fill(0.0);
        self.accumulations = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::CameraIntrinsics;
    use crate::reconstruction::PlaneSpacing;

    fn volume() -> DisparitySpaceVolume {
        let planes = DepthPlanes::new(1.0, 4.0, 4, PlaneSpacing::Linear).unwrap();
        let k = CameraIntrinsics::new(10.0, 10.0, 2.0, 1.5).matrix();
        DisparitySpaceVolume::new(3, 4, planes, k.inverse())
    }

    fn spike(row: usize, col: usize, value: f32) -> EvidenceImage {
        let mut img = EvidenceImage::new(3, 4);
        img.set(row, col, value);
        img
    }

    #[test]
    fn test_accumulate_adds_elementwise() {
        let mut dsi = volume();
        dsi.accumulate(1, &spike(0, 2, 1.5)).unwrap();
        dsi.accumulate(1, &spike(0, 2, 2.0)).unwrap();
        assert_eq!(dsi.value(0, 2, 1), Some(3.5));
        assert_eq!(dsi.value(0, 2, 0), Some(0.0));
        assert_eq!(dsi.accumulations(), 2);
    }

    #[test]
    fn test_accumulate_rejects_bad_input() {
        let mut dsi = volume();
        assert!(matches!(
            dsi.accumulate(4, &spike(0, 0, 1.0)),
            Err(EmvsError::PlaneOutOfRange { plane: 4, planes: 4 })
        ));
        assert!(matches!(
            dsi.accumulate(0, &EvidenceImage::new(2, 4)),
            Err(EmvsError::ImageSizeMismatch { .. })
        ));
        assert!(dsi.is_empty());
    }

    #[test]
    fn test_extract_empty_volume() {
        assert!(volume().extract_points(0.0).is_empty());
    }

    #[test]
    fn test_extract_picks_peak_and_back_projects() {
        let mut dsi = volume();
        dsi.accumulate(0, &spike(1, 2, 1.0)).unwrap();
        dsi.accumulate(2, &spike(1, 2, 5.0)).unwrap();
        let points = dsi.extract_points(0.0);
        assert_eq!(points.len(), 1);
        let p = points[0];
        assert_eq!((p.row, p.col, p.plane), (1, 2, 2));
        assert_eq!(p.depth, 3.0);
        assert_eq!(p.evidence, 5.0);
        // Column 2, row 1 with cx = 2, cy = 1.5, f = 10.
        assert!(p.position.abs_diff_eq(DVec3::new(0.0, -0.15, 3.0), 1e-12));
    }

    #[test]
    fn test_extract_confidence_floor() {
        let mut dsi = volume();
        dsi.accumulate(0, &spike(0, 0, 2.0)).unwrap();
        dsi.accumulate(1, &spike(2, 3, 6.0)).unwrap();
        let points = dsi.extract_points(4.0);
        assert_eq!(points.len(), 1);
        assert_eq!((points[0].row, points[0].col), (2, 3));
        // Evidence equal to the floor is kept.
        assert_eq!(dsi.extract_points(2.0).len(), 2);
    }

    #[test]
    fn test_extract_tie_goes_to_nearest_plane() {
        let mut dsi = volume();
        dsi.accumulate(3, &spike(0, 1, 2.0)).unwrap();
        dsi.accumulate(1, &spike(0, 1, 2.0)).unwrap();
        let points = dsi.extract_points(0.0);
        assert_eq!(points[0].plane, 1);
    }

    #[test]
    fn test_extract_is_idempotent() {
        let mut dsi = volume();
        dsi.accumulate(1, &spike(0, 0, 1.0)).unwrap();
        dsi.accumulate(3, &spike(2, 1, 3.0)).unwrap();
        let first = dsi.extract_points(0.5);
        let second = dsi.extract_points(0.5);
        assert_eq!(first, second);
    }

    #[test]
    fn test_reset_is_idempotent() {
        let mut dsi = volume();
        dsi.accumulate(2, &spike(1, 1, 4.0)).unwrap();
        dsi.reset();
        dsi.reset();
        let fresh = volume();
        assert_eq!(dsi.as_slice(), fresh.as_slice());
        assert!(dsi.is_empty());
        assert!(dsi.extract_points(0.0).is_empty());
    }
}
