//! Append-only world map

use glam::DVec3;
use serde::{Deserialize, Serialize};

/// A fused map point in world coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MapPoint {
    pub position: DVec3,
    /// Index of the keyframe that produced the point.
    pub keyframe: usize,
    /// Evidence the point was extracted with.
    pub evidence: f32,
}

impl MapPoint {
    pub fn new(position: DVec3, keyframe: usize, evidence: f32) -> Self {
        Self {
            position,
            keyframe,
            evidence,
        }
    }
}

/// World-frame points accumulated across keyframes.
///
/// Growth is monotonic: points are never pruned or deduplicated.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorldMap {
    points: Vec<MapPoint>,
    keyframes: usize,
}

impl WorldMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn points(&self) -> &[MapPoint] {
        &self.points
    }

    /// Number of keyframes fused into the map.
    pub fn keyframe_count(&self) -> usize {
        self.keyframes
    }

    /// Append one keyframe's worth of points.
    pub fn append(&mut self, points: impl IntoIterator<Item = MapPoint>) -> usize {
        let before = self.points.len();
        self.points.extend(points);
        self.keyframes += 1;
        self.points.len() - before
    }

    /// Axis-aligned bounds of the map, if it has any points.
    pub fn bounds(&self) -> Option<(DVec3, DVec3)> {
        let first = self.points.first()?.position;
        Some(self.points.iter().fold((first, first), |(lo, hi), p| {
            (lo.min(p.position), hi.max(p.position))
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_append_counts() {
        let mut map = WorldMap::new();
        let added = map.append(vec![
            MapPoint::new(DVec3::ZERO, 0, 1.0),
            MapPoint::new(DVec3::ONE, 0, 2.0),
        ]);
        assert_eq!(added, 2);
        assert_eq!(map.len(), 2);
        assert_eq!(map.keyframe_count(), 1);
    }

    #[test]
    fn test_duplicates_are_kept() {
        let mut map = WorldMap::new();
        let p = MapPoint::new(DVec3::new(1.0, 2.0, 3.0), 0, 1.0);
        map.append([p]);
        map.append([p]);
        assert_eq!(map.len(), 2);
    }

    #[test]
    fn test_bounds() {
        let mut map = WorldMap::new();
        assert!(map.bounds().is_none());
        map.append([
            MapPoint::new(DVec3::new(-1.0, 2.0, 0.5), 0, 1.0),
            MapPoint::new(DVec3::new(3.0, -4.0, 1.5), 0, 1.0),
        ]);
        let (lo, hi) = map.bounds().unwrap();
        assert_eq!(lo, DVec3::new(-1.0, -4.0, 0.5));
        assert_eq!(hi, DVec3::new(3.0, 2.0, 1.5));
    }

    #[test]
    fn test_json_round_trip() {
        let mut map = WorldMap::new();
        map.append([MapPoint::new(DVec3::new(0.5, 0.25, 2.0), 3, 4.0)]);
        let json = serde_json::to_string(&map).unwrap();
        let back: WorldMap = serde_json::from_str(&json).unwrap();
        assert_eq!(back, map);
    }
}
