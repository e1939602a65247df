//! Engine configuration
//!
//! Every field has a default so a config file only needs to name what it
//! changes. Defaults describe a 240x180 sensor with a generic lens.

use crate::error::{EmvsError, Result};
use crate::geometry::{CameraIntrinsics, Distortion};
use crate::ingest::CounterPolicy;
use crate::reconstruction::{DepthPlanes, KeyframeConfig, PlaneSpacing};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SensorConfig {
    pub rows: usize,
    pub cols: usize,
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self { rows: 180, cols: 240 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    pub fx: f64,
    pub fy: f64,
    pub cx: f64,
    pub cy: f64,
    /// `[k1, k2, p1, p2, k3]`
    pub distortion: [f64; 5],
}

impl CameraConfig {
    pub fn intrinsics(&self) -> CameraIntrinsics {
        CameraIntrinsics::new(self.fx, self.fy, self.cx, self.cy)
    }

    pub fn distortion(&self) -> Distortion {
        Distortion::from_array(self.distortion)
    }
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            fx: 200.0,
            fy: 200.0,
            cx: 120.0,
            cy: 90.0,
            distortion: [0.0; 5],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DepthConfig {
    pub min_depth: f64,
    pub max_depth: f64,
    pub planes: usize,
    pub spacing: PlaneSpacing,
}

impl DepthConfig {
    pub fn planes(&self) -> Result<DepthPlanes> {
        DepthPlanes::new(self.min_depth, self.max_depth, self.planes, self.spacing)
    }
}

impl Default for DepthConfig {
    fn default() -> Self {
        Self {
            min_depth: 0.5,
            max_depth: 5.0,
            planes: 100,
            spacing: PlaneSpacing::Linear,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Minimum peak evidence for a pixel to yield a point.
    pub confidence_floor: f32,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            confidence_floor: 8.0,
        }
    }
}

/// Complete engine configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmvsConfig {
    pub sensor: SensorConfig,
    pub camera: CameraConfig,
    pub depth: DepthConfig,
    pub keyframe: KeyframeConfig,
    pub extraction: ExtractionConfig,
    pub counter_policy: CounterPolicy,
    /// Allowed deviation of a pose quaternion's norm from 1.
    pub quaternion_tolerance: f64,
}

impl Default for EmvsConfig {
    fn default() -> Self {
        Self {
            sensor: SensorConfig::default(),
            camera: CameraConfig::default(),
            depth: DepthConfig::default(),
            keyframe: KeyframeConfig::default(),
            extraction: ExtractionConfig::default(),
            counter_policy: CounterPolicy::default(),
            quaternion_tolerance: 1e-3,
        }
    }
}

fn invalid(message: impl Into<String>) -> EmvsError {
    EmvsError::InvalidConfig(message.into())
}

impl EmvsConfig {
    /// Parse and validate a JSON config.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a JSON config file.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    /// Check the startup preconditions the pipeline relies on.
    pub fn validate(&self) -> Result<()> {
        if self.sensor.rows == 0 || self.sensor.cols == 0 {
            return Err(invalid("sensor dimensions must be positive"));
        }

        let cam = &self.camera;
        if !(cam.fx.is_finite() && cam.fx > 0.0 && cam.fy.is_finite() && cam.fy > 0.0) {
            return Err(invalid("focal lengths must be finite and positive"));
        }
        if !(cam.cx.is_finite() && cam.cy.is_finite()) {
            return Err(invalid("principal point must be finite"));
        }
        if cam.distortion.iter().any(|c| !c.is_finite()) {
            return Err(invalid("distortion coefficients must be finite"));
        }

        self.depth.planes()?;

        let kf = &self.keyframe;
        if !(kf.drift_threshold.is_finite() && kf.drift_threshold > 0.0) {
            return Err(invalid("keyframe drift threshold must be finite and positive"));
        }
        if !(kf.rotation_weight.is_finite() && kf.rotation_weight >= 0.0) {
            return Err(invalid("rotation weight must be finite and non-negative"));
        }

        let floor = self.extraction.confidence_floor;
        if !(floor.is_finite() && floor >= 0.0) {
            return Err(invalid("confidence floor must be finite and non-negative"));
        }
        if !(self.quaternion_tolerance.is_finite() && self.quaternion_tolerance > 0.0) {
            return Err(invalid("quaternion tolerance must be finite and positive"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reconstruction::DriftMetric;

    #[test]
    fn test_default_is_valid() {
        EmvsConfig::default().validate().unwrap();
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config = EmvsConfig::from_json_str(
            r#"{
                "sensor": {"rows": 100},
                "keyframe": {"metric": "geodesic"},
                "counter_policy": "wrapping"
            }"#,
        )
        .unwrap();
        assert_eq!(config.sensor.rows, 100);
        assert_eq!(config.sensor.cols, 240);
        assert_eq!(config.keyframe.metric, DriftMetric::Geodesic);
        assert_eq!(config.keyframe.drift_threshold, 0.2);
        assert_eq!(config.counter_policy, CounterPolicy::Wrapping);
        assert_eq!(config.depth.planes, 100);
    }

    #[test]
    fn test_rejects_invalid_depth() {
        let err = EmvsConfig::from_json_str(r#"{"depth": {"min_depth": 0.0}}"#).unwrap_err();
        assert!(matches!(err, EmvsError::InvalidDepth(_)));
    }

    #[test]
    fn test_rejects_bad_values() {
        let mut config = EmvsConfig::default();
        config.camera.fx = 0.0;
        assert!(config.validate().is_err());

        let mut config = EmvsConfig::default();
        config.sensor.cols = 0;
        assert!(config.validate().is_err());

        let mut config = EmvsConfig::default();
        config.keyframe.drift_threshold = f64::NAN;
        assert!(config.validate().is_err());

        let mut config = EmvsConfig::default();
        config.extraction.confidence_floor = -1.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_malformed_json() {
        assert!(matches!(
            EmvsConfig::from_json_str("{ nope"),
            Err(EmvsError::ConfigParse(_))
        ));
    }

    #[test]
    fn test_serialize_round_trip() {
        let config = EmvsConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        assert_eq!(EmvsConfig::from_json_str(&json).unwrap(), config);
    }
}
