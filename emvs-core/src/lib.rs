//! EMVS Core Crate
//!
//! Event-based multi-view stereo: incremental 3-D mapping from an event
//! camera with known poses. Events are counted per pixel between pose
//! updates, warped onto a stack of depth planes relative to the active
//! keyframe, and accumulated in a Disparity Space Image. When the camera has
//! moved far enough, per-pixel evidence peaks are extracted as 3-D points and
//! fused into a world-frame map.
//!
//! ## Modules
//!
//! - [`ingest`]: event counting and lens undistortion
//! - [`reconstruction`]: plane sweep, evidence volume, keyframes, fusion
//! - [`scene`]: the persistent world map and its publication boundary
//! - [`geometry`]: camera model and injectable numeric capabilities
//! - [`image`]: dense evidence images and perspective warping
//! - [`config`]: engine configuration

pub mod config;
pub mod error;
pub mod geometry;
pub mod image;
pub mod ingest;
pub mod reconstruction;
pub mod scene;

pub use config::EmvsConfig;
pub use error::{EmvsError, Result};
pub use reconstruction::{PoseOutcome, ReconstructionSession, SessionStats};
pub use scene::{MapPoint, MapSink, WorldMap};
