//! Fusion of keyframe points into the world map

use crate::geometry::{GlamRigidTransform, RigidTransform};
use crate::reconstruction::DsiPoint;
use crate::scene::{MapPoint, MapSink, WorldMap};
use emvs_data::Pose;
use tracing::info;

/// Moves extracted keyframe points into the world frame and appends them to
/// the map, then republishes the whole map.
pub struct MapFuser<T: RigidTransform = GlamRigidTransform> {
    rigid: T,
    map: WorldMap,
    sinks: Vec<Box<dyn MapSink>>,
}

impl MapFuser {
    pub fn new() -> Self {
        Self::with_transform(GlamRigidTransform)
    }
}

impl Default for MapFuser {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: RigidTransform> MapFuser<T> {
    pub fn with_transform(rigid: T) -> Self {
        Self {
            rigid,
            map: WorldMap::new(),
            sinks: Vec::new(),
        }
    }

    pub fn add_sink(&mut self, sink: Box<dyn MapSink>) {
        self.sinks.push(sink);
    }

    pub fn map(&self) -> &WorldMap {
        &self.map
    }

    /// Fuse keyframe-frame points taken at `keyframe_pose`.
    ///
    /// Every input point lands in the map; returns how many were added.
    #[tracing::instrument(skip_all, fields(points = points.len()))]
    pub fn fuse(&mut self, points: &[DsiPoint], keyframe_pose: &Pose) -> usize {
        let keyframe = self.map.keyframe_count();
        let world_points: Vec<MapPoint> = points
            .iter()
            .map(|p| {
                MapPoint::new(
                    self.rigid.to_world(keyframe_pose, p.position),
                    keyframe,
                    p.evidence,
                )
            })
            .collect();
        let added = self.map.append(world_points);

        info!("Fused {} points, map now holds {}", added, self.map.len());
        for sink in &mut self.sinks {
            sink.publish(&self.map);
        }
        added
    }
}
