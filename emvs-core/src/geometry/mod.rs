//! Camera model and the numeric capabilities the pipeline depends on.
//!
//! The engine never calls matrix inversion or rigid-body math directly; it
//! goes through [`Linalg`] and [`RigidTransform`] so tests and hosts can swap
//! in their own implementations.

mod camera;
mod linalg;
mod transform;

pub use camera::{CameraIntrinsics, Distortion};
pub use linalg::{GlamLinalg, Linalg};
pub use transform::{GlamRigidTransform, RelativeTransform, RigidTransform};
