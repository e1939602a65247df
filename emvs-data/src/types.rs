//! Core record types for event and pose streams.
//!
//! Both records are plain values: the reconstruction engine copies what it
//! needs and never holds references into the stream buffers.

use glam::{DQuat, DVec3};
use serde::{Deserialize, Serialize};

/// A single brightness-change event from the sensor.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Pixel column.
    pub x: u16,
    /// Pixel row.
    pub y: u16,
    /// Timestamp in seconds.
    pub timestamp: f64,
    /// Brightness increase (`true`) or decrease (`false`).
    #[serde(default)]
    pub polarity: bool,
}

impl Event {
    pub fn new(x: u16, y: u16, timestamp: f64, polarity: bool) -> Self {
        Self {
            x,
            y,
            timestamp,
            polarity,
        }
    }

    pub fn row(&self) -> usize {
        self.y as usize
    }

    pub fn col(&self) -> usize {
        self.x as usize
    }
}

/// A stamped camera pose from the external tracker.
///
/// The pose places the camera in the world: a point `X_c` in the camera frame
/// sits at `orientation * X_c + position` in world coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    pub position: DVec3,
    /// Unit quaternion, serialized as `[x, y, z, w]`.
    pub orientation: DQuat,
    /// Timestamp in seconds.
    #[serde(default)]
    pub timestamp: f64,
}

impl Pose {
    pub fn new(position: DVec3, orientation: DQuat, timestamp: f64) -> Self {
        Self {
            position,
            orientation,
            timestamp,
        }
    }

    /// Pose at `position` with identity orientation.
    pub fn from_position(position: DVec3, timestamp: f64) -> Self {
        Self::new(position, DQuat::IDENTITY, timestamp)
    }

    /// Orientation as a raw `[x, y, z, w]` 4-vector.
    pub fn quaternion_components(&self) -> [f64; 4] {
        self.orientation.to_array()
    }

    /// True when every position and orientation component is finite.
    pub fn is_finite(&self) -> bool {
        self.position.is_finite() && self.orientation.is_finite()
    }
}

impl Default for Pose {
    fn default() -> Self {
        Self::new(DVec3::ZERO, DQuat::IDENTITY, 0.0)
    }
}
