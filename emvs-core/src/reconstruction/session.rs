//! The reconstruction session: one object owning all mutable mapping state
//!
//! Pose updates drive everything. Each pose closes the current event window:
//! the window's events are either swept into the active keyframe's volume, or,
//! when the pose has drifted far enough from a keyframe holding evidence, the
//! keyframe is closed, its points fused into the world map, and the window
//! dropped. A volume only ever holds windows captured under its own keyframe.

use crate::config::EmvsConfig;
use crate::error::{EmvsError, Result};
use crate::geometry::{GlamLinalg, GlamRigidTransform, Linalg, RigidTransform};
use crate::image::{BilinearWarp, EvidenceImage, ImageWarp};
use crate::ingest::{EventAccumulator, PinholeRectifier, Rectifier};
use crate::reconstruction::{
    DisparitySpaceVolume, KeyframeDecision, KeyframeManager, MapFuser, PlaneSweepWarper,
};
use crate::scene::{MapSink, WorldMap};
use emvs_data::{Event, Pose};
use tracing::{debug, info, warn};

/// What a pose update did.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PoseOutcome {
    /// The pose became the first keyframe reference.
    Bootstrapped,
    /// No events were pending and no keyframe closed.
    Idle,
    /// Pending events were swept into the active keyframe.
    Accumulated {
        planes_swept: usize,
        planes_skipped: usize,
        drift_exceeded: bool,
    },
    /// The active keyframe was closed and fused; the pose is the new reference.
    KeyframeClosed { points_added: usize, map_size: usize },
}

/// Running counters over the session's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SessionStats {
    pub poses_processed: usize,
    pub poses_rejected: usize,
    pub events_accepted: usize,
    pub events_dropped: usize,
    pub batches_folded: usize,
    /// Windows dropped because the pose closing them closed the keyframe.
    pub windows_discarded: usize,
    pub planes_skipped: usize,
    pub keyframes_closed: usize,
}

/// Incremental event-based mapper.
///
/// All methods take `&mut self`; a host delivering events and poses from
/// several threads must serialize calls, e.g. behind a `Mutex`.
pub struct ReconstructionSession<
    L: Linalg = GlamLinalg,
    W: ImageWarp = BilinearWarp,
    T: RigidTransform + Clone = GlamRigidTransform,
> {
    config: EmvsConfig,
    accumulator: EventAccumulator,
    rectifier: Box<dyn Rectifier>,
    warper: PlaneSweepWarper<L, W>,
    keyframes: KeyframeManager,
    fuser: MapFuser<T>,
    rigid: T,
    stats: SessionStats,
}

impl ReconstructionSession {
    /// Session with the glam backends and a pinhole rectifier built from the
    /// camera config.
    pub fn new(config: EmvsConfig) -> Result<Self> {
        let rectifier =
            PinholeRectifier::new(config.camera.intrinsics(), config.camera.distortion());
        Self::with_capabilities(
            config,
            Box::new(rectifier),
            GlamLinalg::default(),
            BilinearWarp,
            GlamRigidTransform,
        )
    }
}

impl<L: Linalg, W: ImageWarp, T: RigidTransform + Clone> ReconstructionSession<L, W, T> {
    pub fn with_capabilities(
        config: EmvsConfig,
        rectifier: Box<dyn Rectifier>,
        linalg: L,
        warp: W,
        rigid: T,
    ) -> Result<Self> {
        config.validate()?;
        let (rows, cols) = (config.sensor.rows, config.sensor.cols);

        let warper =
            PlaneSweepWarper::with_capabilities(&config.camera.intrinsics(), rows, cols, linalg, warp)?;
        let dsi = DisparitySpaceVolume::new(
            rows,
            cols,
            config.depth.planes()?,
            warper.intrinsics_inverse(),
        );

        info!(
            "Session ready: {}x{} sensor, {} depth planes in [{}, {}]",
            rows, cols, config.depth.planes, config.depth.min_depth, config.depth.max_depth
        );

        Ok(Self {
            accumulator: EventAccumulator::new(rows, cols, config.counter_policy),
            rectifier,
            warper,
            keyframes: KeyframeManager::new(config.keyframe, dsi),
            fuser: MapFuser::with_transform(rigid.clone()),
            rigid,
            stats: SessionStats::default(),
            config,
        })
    }

    /// Publish the map to `sink` after every fusion.
    pub fn with_sink(mut self, sink: impl MapSink + 'static) -> Self {
        self.fuser.add_sink(Box::new(sink));
        self
    }

    pub fn config(&self) -> &EmvsConfig {
        &self.config
    }

    pub fn stats(&self) -> SessionStats {
        self.stats
    }

    pub fn world_map(&self) -> &WorldMap {
        self.fuser.map()
    }

    pub fn dsi(&self) -> &DisparitySpaceVolume {
        self.keyframes.dsi()
    }

    pub fn keyframes(&self) -> &KeyframeManager {
        &self.keyframes
    }

    pub fn accumulator(&self) -> &EventAccumulator {
        &self.accumulator
    }

    /// Count a single event at `(row, col)`.
    pub fn add_event(&mut self, row: usize, col: usize) -> Result<()> {
        match self.accumulator.add_event(row, col) {
            Ok(()) => {
                self.stats.events_accepted += 1;
                Ok(())
            }
            Err(e) => {
                self.stats.events_dropped += 1;
                Err(e)
            }
        }
    }

    /// Count a batch of events. Out-of-range events are dropped; returns the
    /// number accepted.
    pub fn add_events(&mut self, events: &[Event]) -> usize {
        let dropped = self.accumulator.add_events(events);
        let accepted = events.len() - dropped;
        self.stats.events_accepted += accepted;
        self.stats.events_dropped += dropped;
        accepted
    }

    fn validate_pose(&self, pose: &Pose) -> Result<()> {
        if !pose.is_finite() {
            return Err(EmvsError::InvalidPose(format!(
                "non-finite components at t={}",
                pose.timestamp
            )));
        }
        let norm = pose.orientation.length();
        if (norm - 1.0).abs() > self.config.quaternion_tolerance {
            return Err(EmvsError::InvalidPose(format!(
                "quaternion norm {norm} at t={}",
                pose.timestamp
            )));
        }
        Ok(())
    }

    /// Process one pose update.
    ///
    /// A malformed pose is rejected before any state changes. So is a
    /// rectified window that does not match the sensor size; the window then
    /// stays pending.
    pub fn process_pose(&mut self, pose: &Pose) -> Result<PoseOutcome> {
        if let Err(e) = self.validate_pose(pose) {
            self.stats.poses_rejected += 1;
            warn!("Rejected pose: {}", e);
            return Err(e);
        }
        let window = self.rectify_pending()?;
        self.stats.poses_processed += 1;

        match self.keyframes.observe(pose) {
            KeyframeDecision::Bootstrap => {
                self.fold_window(window, pose)?;
                Ok(PoseOutcome::Bootstrapped)
            }
            KeyframeDecision::Close { drift } => {
                debug!("Drift {:.4} closes keyframe", drift);
                if window.is_some() {
                    self.discard_window();
                }
                let (points_added, map_size) = self
                    .close_keyframe(Some(*pose))
                    .unwrap_or((0, self.world_map().len()));
                Ok(PoseOutcome::KeyframeClosed {
                    points_added,
                    map_size,
                })
            }
            KeyframeDecision::Accumulate { drift_exceeded, .. } => {
                match self.fold_window(window, pose)? {
                    Some((planes_swept, planes_skipped)) => Ok(PoseOutcome::Accumulated {
                        planes_swept,
                        planes_skipped,
                        drift_exceeded,
                    }),
                    None => Ok(PoseOutcome::Idle),
                }
            }
        }
    }

    /// Close the active keyframe at end of stream, if it holds evidence.
    ///
    /// Returns the number of points fused, or `None` when there was nothing
    /// to close. The keyframe reference is kept.
    pub fn flush(&mut self) -> Option<usize> {
        self.close_keyframe(None).map(|(added, _)| added)
    }

    /// Rectify the pending window without consuming it.
    fn rectify_pending(&self) -> Result<Option<EvidenceImage>> {
        if !self.accumulator.has_events() {
            return Ok(None);
        }
        let rectified = self.rectifier.rectify(self.accumulator.image());
        let (rows, cols) = (self.config.sensor.rows, self.config.sensor.cols);
        if rectified.rows() != rows || rectified.cols() != cols {
            return Err(EmvsError::ImageSizeMismatch {
                rows,
                cols,
                got_rows: rectified.rows(),
                got_cols: rectified.cols(),
            });
        }
        Ok(Some(rectified))
    }

    /// Sweep a rectified window from `pose` into the active keyframe, then
    /// clear the accumulator.
    fn fold_window(
        &mut self,
        window: Option<EvidenceImage>,
        pose: &Pose,
    ) -> Result<Option<(usize, usize)>> {
        let Some(rectified) = window else {
            return Ok(None);
        };
        let Some(keyframe_pose) = self.keyframes.active_keyframe_pose().copied() else {
            return Ok(None);
        };

        let relative = self.rigid.relative(&keyframe_pose, pose);
        let report = self
            .warper
            .sweep(&rectified, &relative, self.keyframes.dsi_mut())?;
        let events = self.accumulator.drain_and_reset();

        self.keyframes.record_fold();
        self.stats.batches_folded += 1;
        self.stats.planes_skipped += report.planes_skipped;
        debug!(
            "Folded {} active pixels into keyframe ({} planes)",
            events.count_nonzero(),
            report.planes_swept
        );
        Ok(Some((report.planes_swept, report.planes_skipped)))
    }

    /// Drop the window closed by a keyframe transition. Its events belong to
    /// the old keyframe's time span and never reach the new volume.
    fn discard_window(&mut self) {
        let events = self.accumulator.drain_and_reset();
        self.stats.windows_discarded += 1;
        debug!(
            "Discarded window of {} active pixels at keyframe close",
            events.count_nonzero()
        );
    }

    fn close_keyframe(&mut self, next_reference: Option<Pose>) -> Option<(usize, usize)> {
        let floor = self.config.extraction.confidence_floor;
        let closed = self.keyframes.close(next_reference, floor)?;
        let added = self.fuser.fuse(&closed.points, &closed.reference);
        self.stats.keyframes_closed += 1;
        Some((added, self.world_map().len()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CameraConfig, DepthConfig, ExtractionConfig, SensorConfig};
    use crate::reconstruction::{KeyframeConfig, KeyframeState};
    use glam::{DQuat, DVec3};

    fn config() -> EmvsConfig {
        EmvsConfig {
            sensor: SensorConfig { rows: 32, cols: 32 },
            camera: CameraConfig {
                fx: 50.0,
                fy: 50.0,
                cx: 16.0,
                cy: 16.0,
                distortion: [0.0; 5],
            },
            depth: DepthConfig {
                min_depth: 1.0,
                max_depth: 3.0,
                planes: 5,
                ..DepthConfig::default()
            },
            keyframe: KeyframeConfig {
                drift_threshold: 0.5,
                ..KeyframeConfig::default()
            },
            extraction: ExtractionConfig {
                confidence_floor: 0.5,
            },
            ..EmvsConfig::default()
        }
    }

    fn at(x: f64) -> Pose {
        Pose::from_position(DVec3::new(x, 0.0, 0.0), 0.0)
    }

    #[test]
    fn test_first_pose_bootstraps() {
        let mut session = ReconstructionSession::new(config()).unwrap();
        assert_eq!(session.process_pose(&at(0.0)).unwrap(), PoseOutcome::Bootstrapped);
        assert_eq!(session.keyframes().active_keyframe_pose(), Some(&at(0.0)));
        assert!(session.dsi().is_empty());
    }

    #[test]
    fn test_bootstrap_folds_pending_events() {
        let mut session = ReconstructionSession::new(config()).unwrap();
        session.add_event(10, 12).unwrap();
        session.process_pose(&at(0.0)).unwrap();
        assert_eq!(session.dsi().accumulations(), 5);
        assert!(!session.accumulator().has_events());
    }

    #[test]
    fn test_pose_without_events_is_idle() {
        let mut session = ReconstructionSession::new(config()).unwrap();
        session.process_pose(&at(0.0)).unwrap();
        assert_eq!(session.process_pose(&at(0.1)).unwrap(), PoseOutcome::Idle);
    }

    #[test]
    fn test_events_accumulate() {
        let mut session = ReconstructionSession::new(config()).unwrap();
        session.process_pose(&at(0.0)).unwrap();
        session.add_event(16, 16).unwrap();
        let outcome = session.process_pose(&at(0.1)).unwrap();
        assert_eq!(
            outcome,
            PoseOutcome::Accumulated {
                planes_swept: 5,
                planes_skipped: 0,
                drift_exceeded: false,
            }
        );
        assert_eq!(session.keyframes().folded_since_transition(), 1);
        assert_eq!(session.stats().batches_folded, 1);
    }

    #[test]
    fn test_drift_with_evidence_closes_keyframe() {
        let mut session = ReconstructionSession::new(config()).unwrap();
        session.process_pose(&at(0.0)).unwrap();
        session.add_event(16, 16).unwrap();
        session.process_pose(&at(0.0)).unwrap();

        match session.process_pose(&at(1.0)).unwrap() {
            PoseOutcome::KeyframeClosed { points_added, map_size } => {
                assert!(points_added > 0);
                assert_eq!(map_size, points_added);
            }
            other => panic!("unexpected outcome {other:?}"),
        }
        assert_eq!(session.keyframes().active_keyframe_pose(), Some(&at(1.0)));
        assert_eq!(session.keyframes().state(), KeyframeState::Accumulating);
        assert!(session.dsi().is_empty());
        assert_eq!(session.stats().keyframes_closed, 1);
    }

    #[test]
    fn test_events_pending_at_close_are_discarded() {
        let mut session = ReconstructionSession::new(config()).unwrap();
        session.process_pose(&at(0.0)).unwrap();
        session.add_event(16, 16).unwrap();
        session.process_pose(&at(0.0)).unwrap();
        session.add_event(5, 5).unwrap();

        assert!(matches!(
            session.process_pose(&at(1.0)).unwrap(),
            PoseOutcome::KeyframeClosed { .. }
        ));
        assert!(!session.accumulator().has_events());
        assert_eq!(session.stats().windows_discarded, 1);
        assert_eq!(session.stats().batches_folded, 1);

        assert_eq!(session.process_pose(&at(1.05)).unwrap(), PoseOutcome::Idle);
        assert!(session.dsi().is_empty());
        assert_eq!(session.keyframes().folded_since_transition(), 0);
    }

    struct CroppingRectifier;

    impl Rectifier for CroppingRectifier {
        fn rectify(&self, events: &crate::ingest::EventImage) -> EvidenceImage {
            EvidenceImage::new(events.rows() - 1, events.cols())
        }
    }

    #[test]
    fn test_mis_sized_rectification_leaves_state_untouched() {
        let mut session = ReconstructionSession::with_capabilities(
            config(),
            Box::new(CroppingRectifier),
            GlamLinalg::default(),
            BilinearWarp,
            GlamRigidTransform,
        )
        .unwrap();
        session.process_pose(&at(0.0)).unwrap();
        session.add_event(16, 16).unwrap();

        assert!(matches!(
            session.process_pose(&at(0.1)),
            Err(EmvsError::ImageSizeMismatch {
                rows: 32,
                got_rows: 31,
                ..
            })
        ));
        assert_eq!(session.keyframes().last_observed_pose(), Some(&at(0.0)));
        assert_eq!(session.keyframes().folded_since_transition(), 0);
        assert!(session.accumulator().has_events());
        assert!(session.dsi().is_empty());
        assert_eq!(session.stats().poses_processed, 1);
    }

    #[test]
    fn test_rejects_nan_pose() {
        let mut session = ReconstructionSession::new(config()).unwrap();
        session.process_pose(&at(0.0)).unwrap();
        session.add_event(16, 16).unwrap();
        session.process_pose(&at(0.1)).unwrap();
        let before = session.dsi().as_slice().to_vec();

        session.add_event(3, 3).unwrap();
        let bad = Pose::from_position(DVec3::new(f64::NAN, 0.0, 0.0), 0.0);
        assert!(matches!(session.process_pose(&bad), Err(EmvsError::InvalidPose(_))));

        assert_eq!(session.keyframes().active_keyframe_pose(), Some(&at(0.0)));
        assert_eq!(session.keyframes().last_observed_pose(), Some(&at(0.1)));
        assert_eq!(session.dsi().as_slice(), before.as_slice());
        assert!(session.accumulator().has_events());
        assert_eq!(session.stats().poses_rejected, 1);
    }

    #[test]
    fn test_rejects_non_unit_quaternion() {
        let mut session = ReconstructionSession::new(config()).unwrap();
        let bad = Pose::new(DVec3::ZERO, DQuat::from_xyzw(0.0, 0.0, 0.0, 2.0), 0.0);
        assert!(session.process_pose(&bad).is_err());
        assert!(session.keyframes().active_keyframe_pose().is_none());
    }

    #[test]
    fn test_out_of_range_event() {
        let mut session = ReconstructionSession::new(config()).unwrap();
        assert!(matches!(
            session.add_event(32, 0),
            Err(EmvsError::PixelOutOfRange { .. })
        ));
        let accepted = session.add_events(&[Event::new(1, 1, 0.0, true), Event::new(99, 1, 0.0, true)]);
        assert_eq!(accepted, 1);
        assert_eq!(session.stats().events_dropped, 2);
        assert_eq!(session.stats().events_accepted, 1);
    }

    #[test]
    fn test_flush() {
        let mut session = ReconstructionSession::new(config()).unwrap();
        assert_eq!(session.flush(), None);
        session.process_pose(&at(0.0)).unwrap();
        assert_eq!(session.flush(), None);
        session.add_event(16, 16).unwrap();
        session.process_pose(&at(0.1)).unwrap();
        assert!(session.flush().unwrap() > 0);
        assert_eq!(session.keyframes().active_keyframe_pose(), Some(&at(0.0)));
        assert_eq!(session.flush(), None);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut bad = config();
        bad.depth.max_depth = 0.5;
        assert!(ReconstructionSession::new(bad).is_err());
    }
}
