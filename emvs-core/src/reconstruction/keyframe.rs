//! Keyframe selection from pose drift

use crate::reconstruction::{DisparitySpaceVolume, DsiPoint};
use emvs_data::Pose;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Distance between a pose and the keyframe reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DriftMetric {
    /// `|Δp| + w·|Δq|` with a component-wise quaternion difference. Not a
    /// true rotation distance: `q` and `-q` look far apart.
    #[default]
    Legacy,
    /// `|Δp| + w·θ` with `θ` the geodesic rotation angle.
    Geodesic,
}

impl DriftMetric {
    pub fn drift(&self, reference: &Pose, pose: &Pose, rotation_weight: f64) -> f64 {
        let translation = (pose.position - reference.position).length();
        let rotation = match self {
            DriftMetric::Legacy => {
                let a = pose.quaternion_components();
                let b = reference.quaternion_components();
                a.iter()
                    .zip(b.iter())
                    .map(|(x, y)| (x - y) * (x - y))
                    .sum::<f64>()
                    .sqrt()
            }
            DriftMetric::Geodesic => {
                let dot = pose.orientation.dot(reference.orientation).abs().min(1.0);
                2.0 * dot.acos()
            }
        };
        translation + rotation_weight * rotation
    }
}

/// Keyframe selection parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeyframeConfig {
    /// Drift above which the active keyframe is closed.
    pub drift_threshold: f64,
    /// Weight of the rotational term in the drift metric.
    pub rotation_weight: f64,
    pub metric: DriftMetric,
}

impl Default for KeyframeConfig {
    fn default() -> Self {
        Self {
            drift_threshold: 0.2,
            rotation_weight: 0.1,
            metric: DriftMetric::Legacy,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyframeState {
    /// Events are being swept into the active keyframe's volume.
    Accumulating,
    /// A keyframe boundary is being processed.
    Transitioning,
}

/// What to do with an incoming pose.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum KeyframeDecision {
    /// First pose: it becomes the keyframe reference.
    Bootstrap,
    /// Warp pending events from this pose into the active keyframe.
    Accumulate { drift: f64, drift_exceeded: bool },
    /// Close the active keyframe and adopt this pose as the next reference.
    Close { drift: f64 },
}

/// A closed keyframe: its reference pose and the points its volume yielded.
#[derive(Debug, Clone)]
pub struct ClosedKeyframe {
    pub index: usize,
    pub reference: Pose,
    pub points: Vec<DsiPoint>,
}

/// Tracks the active keyframe and owns the lifecycle of its volume.
pub struct KeyframeManager {
    config: KeyframeConfig,
    dsi: DisparitySpaceVolume,
    active_keyframe_pose: Option<Pose>,
    last_observed_pose: Option<Pose>,
    folded_since_transition: usize,
    keyframes_closed: usize,
    state: KeyframeState,
}

impl KeyframeManager {
    pub fn new(config: KeyframeConfig, dsi: DisparitySpaceVolume) -> Self {
        Self {
            config,
            dsi,
            active_keyframe_pose: None,
            last_observed_pose: None,
            folded_since_transition: 0,
            keyframes_closed: 0,
            state: KeyframeState::Accumulating,
        }
    }

    pub fn config(&self) -> &KeyframeConfig {
        &self.config
    }

    pub fn dsi(&self) -> &DisparitySpaceVolume {
        &self.dsi
    }

    pub fn dsi_mut(&mut self) -> &mut DisparitySpaceVolume {
        &mut self.dsi
    }

    pub fn active_keyframe_pose(&self) -> Option<&Pose> {
        self.active_keyframe_pose.as_ref()
    }

    pub fn last_observed_pose(&self) -> Option<&Pose> {
        self.last_observed_pose.as_ref()
    }

    pub fn state(&self) -> KeyframeState {
        self.state
    }

    /// Event batches swept into the volume since the last transition.
    pub fn folded_since_transition(&self) -> usize {
        self.folded_since_transition
    }

    pub fn keyframes_closed(&self) -> usize {
        self.keyframes_closed
    }

    /// Drift of `pose` from the active keyframe, if there is one.
    pub fn drift_to(&self, pose: &Pose) -> Option<f64> {
        self.active_keyframe_pose
            .as_ref()
            .map(|reference| self.config.metric.drift(reference, pose, self.config.rotation_weight))
    }

    /// Record an incoming pose and decide what it means for the keyframe.
    ///
    /// The pose always becomes the last observed pose. The keyframe closes
    /// only when drift exceeds the threshold and evidence was folded since
    /// the last transition; drifting with an empty volume keeps the current
    /// reference.
    pub fn observe(&mut self, pose: &Pose) -> KeyframeDecision {
        self.last_observed_pose = Some(*pose);

        let Some(drift) = self.drift_to(pose) else {
            self.active_keyframe_pose = Some(*pose);
            info!("Keyframe 0 bootstrapped at {:?}", pose.position);
            return KeyframeDecision::Bootstrap;
        };

        let drift_exceeded = drift > self.config.drift_threshold;
        if drift_exceeded && self.folded_since_transition > 0 {
            self.state = KeyframeState::Transitioning;
            return KeyframeDecision::Close { drift };
        }
        if drift_exceeded {
            debug!("Drift {:.4} over threshold with empty volume, keeping keyframe", drift);
        }
        KeyframeDecision::Accumulate {
            drift,
            drift_exceeded,
        }
    }

    /// Note that one event batch was swept into the volume.
    pub fn record_fold(&mut self) {
        self.folded_since_transition += 1;
    }

    /// Drain the active keyframe: extract its points, reset the volume and
    /// adopt `next_reference` (or keep the current reference when `None`).
    ///
    /// Returns `None` when no keyframe is active or nothing was folded.
    pub fn close(&mut self, next_reference: Option<Pose>, confidence_floor: f32) -> Option<ClosedKeyframe> {
        let reference = self.active_keyframe_pose?;
        if self.folded_since_transition == 0 {
            self.state = KeyframeState::Accumulating;
            return None;
        }

        self.state = KeyframeState::Transitioning;
        let points = self.dsi.extract_points(confidence_floor);
        self.dsi.reset();

        let index = self.keyframes_closed;
        self.keyframes_closed += 1;
        self.folded_since_transition = 0;
        if let Some(next) = next_reference {
            self.active_keyframe_pose = Some(next);
        }
        self.state = KeyframeState::Accumulating;

        info!(
            "Closed keyframe {} with {} extracted points",
            index,
            points.len()
        );
        Some(ClosedKeyframe {
            index,
            reference,
            points,
        })
    }
}
