//! Plane-induced homographies and the per-plane warp
//!
//! Follows the plane-sweep construction of Gallup et al., "Real-time
//! plane-sweeping stereo with multiple sweeping directions" (CVPR 2007). For a
//! plane `nᵀX = -d` in keyframe space the homography taking keyframe pixels to
//! current-camera pixels is
//!
//! ```text
//! H = K · (Rᵀ + Rᵀ·t·nᵀ / d) · K⁻¹
//! ```
//!
//! with `(R, t)` the [`RelativeTransform`] mapping current-camera points into
//! the keyframe (`X_k = R·X_c + t`). `Rᵀ` is therefore the keyframe-to-current
//! rotation and `-Rᵀ·t` the keyframe origin seen from the current camera; the
//! transposes are what make `H` map keyframe pixels to current pixels, and
//! `test_homography_matches_projection` pins this against explicit
//! projection. The current event image is carried onto the keyframe plane by
//! `H⁻¹`, implemented as an inverse-mapped warp sampling the current image at
//! `H · u_k`.

use crate::error::{EmvsError, Result};
use crate::geometry::{CameraIntrinsics, GlamLinalg, Linalg, RelativeTransform};
use crate::image::{BilinearWarp, EvidenceImage, ImageWarp};
use crate::reconstruction::DisparitySpaceVolume;
use glam::{DMat3, DVec3};
#[cfg(feature = "rayon")]
use rayon::prelude::*;
use tracing::{debug, warn};

/// Plane normal in keyframe space: the optical axis, facing the camera.
pub const PLANE_NORMAL: DVec3 = DVec3::new(0.0, 0.0, -1.0);

/// The two directions of a plane-induced homography.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlaneHomography {
    /// Keyframe pixel to current pixel (`H`).
    pub to_current: DMat3,
    /// Current pixel to keyframe pixel (`H⁻¹`).
    pub to_keyframe: DMat3,
}

/// Result of sweeping one event image across all depth planes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SweepReport {
    pub planes_swept: usize,
    pub planes_skipped: usize,
}

/// Warps rectified event images onto every depth plane of a keyframe.
pub struct PlaneSweepWarper<L: Linalg = GlamLinalg, W: ImageWarp = BilinearWarp> {
    intrinsics: DMat3,
    intrinsics_inverse: DMat3,
    rows: usize,
    cols: usize,
    linalg: L,
    warp: W,
}

impl PlaneSweepWarper {
    pub fn new(intrinsics: &CameraIntrinsics, rows: usize, cols: usize) -> Result<Self> {
        Self::with_capabilities(intrinsics, rows, cols, GlamLinalg::default(), BilinearWarp)
    }
}

impl<L: Linalg, W: ImageWarp> PlaneSweepWarper<L, W> {
    /// Fails with [`EmvsError::SingularIntrinsics`] when `K` cannot be
    /// inverted.
    pub fn with_capabilities(
        intrinsics: &CameraIntrinsics,
        rows: usize,
        cols: usize,
        linalg: L,
        warp: W,
    ) -> Result<Self> {
        let k = intrinsics.matrix();
        let k_inv = linalg.invert(&k).ok_or(EmvsError::SingularIntrinsics)?;
        Ok(Self {
            intrinsics: k,
            intrinsics_inverse: k_inv,
            rows,
            cols,
            linalg,
            warp,
        })
    }

    pub fn intrinsics(&self) -> DMat3 {
        self.intrinsics
    }

    pub fn intrinsics_inverse(&self) -> DMat3 {
        self.intrinsics_inverse
    }

    /// `H` for one depth hypothesis. Rejects non-positive or non-finite
    /// depths.
    pub fn homography(&self, relative: &RelativeTransform, depth: f64) -> Result<DMat3> {
        if !depth.is_finite() || depth <= 0.0 {
            return Err(EmvsError::InvalidDepth(depth));
        }
        let r = relative.rotation.transpose();
        let rt = r * relative.translation;
        let rtn = DMat3::from_cols(rt * PLANE_NORMAL.x, rt * PLANE_NORMAL.y, rt * PLANE_NORMAL.z);
        Ok(self.intrinsics * (r + rtn * (1.0 / depth)) * self.intrinsics_inverse)
    }

    /// Both directions of the homography, or `None` when `H` is not
    /// invertible (the plane passes through the current camera centre).
    pub fn plane_homography(
        &self,
        relative: &RelativeTransform,
        depth: f64,
    ) -> Result<Option<PlaneHomography>> {
        let to_current = self.homography(relative, depth)?;
        Ok(self.linalg.invert(&to_current).map(|to_keyframe| PlaneHomography {
            to_current,
            to_keyframe,
        }))
    }

    /// Warp `image` from the current view onto the keyframe image plane at
    /// `depth`. `None` when the homography is degenerate.
    pub fn warp_plane(
        &self,
        image: &EvidenceImage,
        relative: &RelativeTransform,
        depth: f64,
    ) -> Result<Option<EvidenceImage>> {
        let Some(homography) = self.plane_homography(relative, depth)? else {
            return Ok(None);
        };
        let mut warped = EvidenceImage::new(self.rows, self.cols);
        self.warp
            .warp_perspective(image, &homography.to_current, &mut warped);
        Ok(Some(warped))
    }

    fn warp_all(
        &self,
        image: &EvidenceImage,
        relative: &RelativeTransform,
        depths: &[f64],
    ) -> Result<Vec<Option<EvidenceImage>>> {
        #[cfg(feature = "rayon")]
        let iter = depths.par_iter();
        #[cfg(not(feature = "rayon"))]
        let iter = depths.iter();

        iter.map(|&depth| self.warp_plane(image, relative, depth))
            .collect()
    }

    /// Warp `image` onto every plane of `dsi` and accumulate the results.
    ///
    /// A plane whose homography cannot be inverted is skipped for this
    /// update only; the remaining planes still accumulate.
    pub fn sweep(
        &self,
        image: &EvidenceImage,
        relative: &RelativeTransform,
        dsi: &mut DisparitySpaceVolume,
    ) -> Result<SweepReport> {
        let warped = self.warp_all(image, relative, dsi.planes().depths())?;

        let mut report = SweepReport::default();
        for (plane, slice) in warped.into_iter().enumerate() {
            match slice {
                Some(slice) => {
                    dsi.accumulate(plane, &slice)?;
                    report.planes_swept += 1;
                }
                None => {
                    warn!("Skipping depth plane {}: degenerate homography", plane);
                    report.planes_skipped += 1;
                }
            }
        }

        debug!(
            "Swept {} planes ({} skipped)",
            report.planes_swept, report.planes_skipped
        );
        Ok(report)
    }
}
