//! Interleave event and pose streams in arrival order

use crate::types::{Event, Pose};

/// One record from either input stream.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StreamItem {
    Event(Event),
    Pose(Pose),
}

impl StreamItem {
    pub fn timestamp(&self) -> f64 {
        match self {
            StreamItem::Event(e) => e.timestamp,
            StreamItem::Pose(p) => p.timestamp,
        }
    }
}

/// Merge two individually time-ordered streams into one.
///
/// Each input keeps its own order. On equal timestamps the event goes first,
/// so it lands in the window that the pose closes.
pub fn merge_streams(events: &[Event], poses: &[Pose]) -> Vec<StreamItem> {
    let mut merged = Vec::with_capacity(events.len() + poses.len());
    let (mut ei, mut pi) = (0, 0);

    while ei < events.len() && pi < poses.len() {
        if events[ei].timestamp <= poses[pi].timestamp {
            merged.push(StreamItem::Event(events[ei]));
            ei += 1;
        } else {
            merged.push(StreamItem::Pose(poses[pi]));
            pi += 1;
        }
    }
    merged.extend(events[ei..].iter().copied().map(StreamItem::Event));
    merged.extend(poses[pi..].iter().copied().map(StreamItem::Pose));
    merged
}
