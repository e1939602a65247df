//! Rigid-body transforms between camera poses

use emvs_data::Pose;
use glam::{DAffine3, DMat3, DVec3};

/// Rigid transform taking current-camera coordinates into the keyframe frame:
/// `X_k = rotation * X_c + translation`.
///
/// Derived from two poses whenever a warp is computed, never stored.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RelativeTransform {
    pub rotation: DMat3,
    pub translation: DVec3,
}

impl RelativeTransform {
    pub const IDENTITY: Self = Self {
        rotation: DMat3::IDENTITY,
        translation: DVec3::ZERO,
    };

    pub fn new(rotation: DMat3, translation: DVec3) -> Self {
        Self {
            rotation,
            translation,
        }
    }

    pub fn from_affine(affine: &DAffine3) -> Self {
        Self::new(affine.matrix3, affine.translation)
    }

    pub fn apply(&self, point: DVec3) -> DVec3 {
        self.rotation * point + self.translation
    }
}

/// Rigid-body operations on poses.
pub trait RigidTransform: Send + Sync {
    /// The transform placing camera-frame points in the world.
    fn world_from_camera(&self, pose: &Pose) -> DAffine3;

    /// Transform from the `current` camera frame into the `keyframe` frame.
    fn relative(&self, keyframe: &Pose, current: &Pose) -> RelativeTransform {
        let keyframe_from_world = self.world_from_camera(keyframe).inverse();
        RelativeTransform::from_affine(&(keyframe_from_world * self.world_from_camera(current)))
    }

    /// Map a keyframe-frame point into world coordinates.
    fn to_world(&self, keyframe: &Pose, point: DVec3) -> DVec3 {
        self.world_from_camera(keyframe).transform_point3(point)
    }
}

/// [`RigidTransform`] backed by glam.
#[derive(Debug, Clone, Copy, Default)]
pub struct GlamRigidTransform;

impl RigidTransform for GlamRigidTransform {
    fn world_from_camera(&self, pose: &Pose) -> DAffine3 {
        DAffine3::from_rotation_translation(pose.orientation, pose.position)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::DQuat;
    use std::f64::consts::FRAC_PI_2;

    #[test]
    fn test_relative_of_same_pose_is_identity() {
        let pose = Pose::new(
            DVec3::new(1.0, -2.0, 0.5),
            DQuat::from_rotation_y(0.3),
            0.0,
        );
        let rel = GlamRigidTransform.relative(&pose, &pose);
        assert!(rel.rotation.abs_diff_eq(DMat3::IDENTITY, 1e-12));
        assert!(rel.translation.abs_diff_eq(DVec3::ZERO, 1e-12));
    }

    #[test]
    fn test_relative_translation() {
        let keyframe = Pose::default();
        let current = Pose::from_position(DVec3::new(0.2, 0.0, 0.0), 0.0);
        let rel = GlamRigidTransform.relative(&keyframe, &current);
        assert!(rel.translation.abs_diff_eq(DVec3::new(0.2, 0.0, 0.0), 1e-12));
        // Camera origin sits at the current camera position in keyframe space.
        assert!(rel.apply(DVec3::ZERO).abs_diff_eq(DVec3::new(0.2, 0.0, 0.0), 1e-12));
    }

    #[test]
    fn test_relative_rotated_keyframe() {
        let keyframe = Pose::new(DVec3::ZERO, DQuat::from_rotation_z(FRAC_PI_2), 0.0);
        let current = Pose::from_position(DVec3::new(1.0, 0.0, 0.0), 0.0);
        let rel = GlamRigidTransform.relative(&keyframe, &current);
        // World +x is keyframe -y after a quarter turn about z.
        assert!(rel.apply(DVec3::ZERO).abs_diff_eq(DVec3::new(0.0, -1.0, 0.0), 1e-12));
    }

    #[test]
    fn test_to_world() {
        let keyframe = Pose::new(DVec3::new(0.0, 0.0, 1.0), DQuat::from_rotation_x(FRAC_PI_2), 0.0);
        let world = GlamRigidTransform.to_world(&keyframe, DVec3::new(0.0, 0.0, 2.0));
        assert!(world.abs_diff_eq(DVec3::new(0.0, -2.0, 1.0), 1e-12));
    }
}
