//! Recorded stream loading and interleaving

mod loader;
mod merge;

pub use loader::{load_events, load_poses, read_records};
pub use merge::{StreamItem, merge_streams};

use thiserror::Error;

/// Errors that can occur while reading recorded streams.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed record at line {line}: {source}")]
    Json {
        line: usize,
        #[source]
        source: serde_json::Error,
    },
}
