//! EMVS Data Crate
//!
//! Wire records for event-camera mapping: brightness-change events, stamped
//! camera poses, and helpers for loading recorded streams and interleaving
//! them in arrival order. This crate knows nothing about the reconstruction
//! itself.

pub mod stream;
pub mod types;

pub use stream::{DataError, StreamItem, load_events, load_poses, merge_streams};
pub use types::{Event, Pose};
