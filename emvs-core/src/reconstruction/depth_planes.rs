//! Discretized depth hypotheses for the plane sweep

use crate::error::{EmvsError, Result};
use serde::{Deserialize, Serialize};

/// How plane depths are distributed between the minimum and maximum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaneSpacing {
    /// Uniform steps in depth.
    #[default]
    Linear,
    /// Uniform steps in inverse depth, denser near the camera.
    InverseDepth,
}

/// N fixed depth planes, increasing from `min_depth` to `max_depth`.
#[derive(Debug, Clone, PartialEq)]
pub struct DepthPlanes {
    depths: Vec<f64>,
}

impl DepthPlanes {
    pub fn new(min_depth: f64, max_depth: f64, count: usize, spacing: PlaneSpacing) -> Result<Self> {
        if !min_depth.is_finite() || min_depth <= 0.0 {
            return Err(EmvsError::InvalidDepth(min_depth));
        }
        if !max_depth.is_finite() || max_depth < min_depth {
            return Err(EmvsError::InvalidDepth(max_depth));
        }
        if count == 0 {
            return Err(EmvsError::InvalidConfig(
                "at least one depth plane is required".to_string(),
            ));
        }
        if count == 1 {
            return Ok(Self {
                depths: vec![min_depth],
            });
        }

        let steps = (count - 1) as f64;
        let depths = match spacing {
            PlaneSpacing::Linear => {
                let step = (max_depth - min_depth) / steps;
                (0..count).map(|i| min_depth + i as f64 * step).collect()
            }
            PlaneSpacing::InverseDepth => {
                let (near, far) = (1.0 / min_depth, 1.0 / max_depth);
                let step = (far - near) / steps;
                (0..count).map(|i| 1.0 / (near + i as f64 * step)).collect()
            }
        };
        Ok(Self { depths })
    }

    pub fn len(&self) -> usize {
        self.depths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.depths.is_empty()
    }

    pub fn depth(&self, index: usize) -> Option<f64> {
        self.depths.get(index).copied()
    }

    pub fn depths(&self) -> &[f64] {
        &self.depths
    }
}
