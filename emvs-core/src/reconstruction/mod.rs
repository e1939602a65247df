//! Plane-sweep reconstruction
//!
//! This module turns rectified event images into world-frame map points:
//! - [`PlaneSweepWarper`] warps each image onto every depth hypothesis
//! - [`DisparitySpaceVolume`] accumulates the warped evidence per keyframe
//! - [`KeyframeManager`] decides keyframe boundaries from pose drift
//! - [`MapFuser`] moves extracted points into the world map
//! - [`ReconstructionSession`] wires them together behind a pose/event API

pub mod depth_planes;
pub mod dsi;
pub mod fuser;
pub mod keyframe;
pub mod session;
pub mod warper;

pub use depth_planes::{DepthPlanes, PlaneSpacing};
pub use dsi::{DisparitySpaceVolume, DsiPoint};
pub use fuser::MapFuser;
pub use keyframe::{
    ClosedKeyframe, DriftMetric, KeyframeConfig, KeyframeDecision, KeyframeManager, KeyframeState,
};
pub use session::{PoseOutcome, ReconstructionSession, SessionStats};
pub use warper::{PLANE_NORMAL, PlaneHomography, PlaneSweepWarper, SweepReport};
