//! Event ingestion
//!
//! Turns the raw event stream into per-window count images and removes lens
//! distortion before the images reach the plane sweep:
//! - [`EventAccumulator`] counts events per pixel between pose updates
//! - [`Rectifier`] undistorts a drained count image

pub mod accumulator;
pub mod rectify;

pub use accumulator::{CounterPolicy, EventAccumulator, EventImage};
pub use rectify::{PinholeRectifier, Rectifier};
