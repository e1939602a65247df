//! Map publication boundary

use crate::scene::WorldMap;

/// Receives the full world map after every fusion.
pub trait MapSink: Send {
    fn publish(&mut self, map: &WorldMap);
}

impl<F> MapSink for F
where
    F: FnMut(&WorldMap) + Send,
{
    fn publish(&mut self, map: &WorldMap) {
        self(map)
    }
}
