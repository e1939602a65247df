//! Error types for the replay tool.

use emvs_core::EmvsError;
use emvs_data::DataError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Stream error: {0}")]
    Data(#[from] DataError),

    #[error("Mapping error: {0}")]
    Engine(#[from] EmvsError),

    #[error("Map output error: {0}")]
    Output(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
