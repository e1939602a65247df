//! Persistent world-frame map
//!
//! - [`WorldMap`]: append-only point set fused across keyframes
//! - [`MapSink`]: publication boundary, receives the full map after each fusion

pub mod sink;
pub mod world_map;

pub use sink::MapSink;
pub use world_map::{MapPoint, WorldMap};
