//! Error types for the reconstruction engine.

use thiserror::Error;

/// Errors surfaced by the reconstruction engine.
///
/// Every variant describes a rejected input or a configuration problem. None
/// of them leaves accumulated state partially updated.
#[derive(Debug, Error)]
pub enum EmvsError {
    #[error("Invalid pose: {0}")]
    InvalidPose(String),

    #[error("Pixel (row {row}, col {col}) outside {rows}x{cols} sensor")]
    PixelOutOfRange {
        row: usize,
        col: usize,
        rows: usize,
        cols: usize,
    },

    #[error("Invalid plane depth: {0}")]
    InvalidDepth(f64),

    #[error("Camera intrinsic matrix is singular")]
    SingularIntrinsics,

    #[error("Depth plane {plane} out of range (volume has {planes} planes)")]
    PlaneOutOfRange { plane: usize, planes: usize },

    #[error("Image is {got_rows}x{got_cols}, expected {rows}x{cols}")]
    ImageSizeMismatch {
        rows: usize,
        cols: usize,
        got_rows: usize,
        got_cols: usize,
    },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Config parse error: {0}")]
    ConfigParse(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, EmvsError>;
