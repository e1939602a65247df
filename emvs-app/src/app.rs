//! Stream replay and map output

use crate::errors::AppError;
use emvs_core::{EmvsConfig, EmvsError, MapSink, ReconstructionSession, SessionStats, WorldMap};
use emvs_data::{Event, StreamItem, load_events, load_poses, merge_streams};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

pub struct ReplayOptions {
    pub config: Option<PathBuf>,
    pub events: PathBuf,
    pub poses: PathBuf,
    pub output: PathBuf,
}

/// Rewrites the whole map file on every publication.
struct JsonMapWriter {
    path: PathBuf,
}

impl JsonMapWriter {
    fn write(&self, map: &WorldMap) -> Result<(), AppError> {
        write_map(&self.path, map)
    }
}

impl MapSink for JsonMapWriter {
    fn publish(&mut self, map: &WorldMap) {
        if let Err(e) = self.write(map) {
            error!("Failed to publish map to {}: {}", self.path.display(), e);
        }
    }
}

fn write_map(path: &Path, map: &WorldMap) -> Result<(), AppError> {
    let mut writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer(&mut writer, map)?;
    writer.flush()?;
    Ok(())
}

pub fn run(options: &ReplayOptions) -> Result<(), AppError> {
    let config = match &options.config {
        Some(path) => {
            info!("Loading config from: {:?}", path);
            EmvsConfig::from_path(path)?
        }
        None => EmvsConfig::default(),
    };

    let events = load_events(&options.events)?;
    let poses = load_poses(&options.poses)?;
    let items = merge_streams(&events, &poses);

    let mut session = ReconstructionSession::new(config)?.with_sink(JsonMapWriter {
        path: options.output.clone(),
    });
    let stats = replay(&mut session, &items)?;

    // The map file is only written on fusion; make sure it exists even when
    // no keyframe ever closed.
    write_map(&options.output, session.world_map())?;

    info!(
        "Replayed {} poses ({} rejected), {} events ({} dropped)",
        stats.poses_processed, stats.poses_rejected, stats.events_accepted, stats.events_dropped
    );
    info!(
        "Map: {} points from {} keyframes, written to {:?}",
        session.world_map().len(),
        stats.keyframes_closed,
        options.output
    );
    if let Some((lo, hi)) = session.world_map().bounds() {
        info!("Map bounds: {:?} to {:?}", lo, hi);
    }
    Ok(())
}

/// Feed merged stream items through the session and flush the last keyframe.
///
/// Events between two poses are handed over as one batch. Malformed poses are
/// skipped; the rest of the stream still plays.
pub fn replay(
    session: &mut ReconstructionSession,
    items: &[StreamItem],
) -> Result<SessionStats, EmvsError> {
    let mut batch: Vec<Event> = Vec::new();
    for item in items {
        match item {
            StreamItem::Event(event) => batch.push(*event),
            StreamItem::Pose(pose) => {
                session.add_events(&batch);
                batch.clear();
                match session.process_pose(pose) {
                    Ok(_) => {}
                    Err(EmvsError::InvalidPose(reason)) => {
                        warn!("Skipping pose at t={}: {}", pose.timestamp, reason);
                    }
                    Err(e) => return Err(e),
                }
            }
        }
    }
    session.add_events(&batch);

    if let Some(added) = session.flush() {
        info!("Flushed final keyframe with {} points", added);
    }
    Ok(session.stats())
}
