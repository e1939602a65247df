//! JSON-lines stream loading

use crate::stream::DataError;
use crate::types::{Event, Pose};
use serde::de::DeserializeOwned;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use tracing::{debug, info};

/// Read one JSON record per line. Blank lines are skipped; line numbers in
/// errors are 1-based.
pub fn read_records<T, R>(reader: R) -> Result<Vec<T>, DataError>
where
    T: DeserializeOwned,
    R: BufRead,
{
    let mut records = Vec::new();
    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        let record = serde_json::from_str(trimmed).map_err(|source| DataError::Json {
            line: index + 1,
            source,
        })?;
        records.push(record);
    }
    Ok(records)
}

/// Load a recorded event stream.
#[tracing::instrument(skip_all, fields(path = %path.as_ref().display()))]
pub fn load_events<P: AsRef<Path>>(path: P) -> Result<Vec<Event>, DataError> {
    debug!("Loading events");
    let file = File::open(path.as_ref())?;
    let events: Vec<Event> = read_records(BufReader::new(file))?;
    info!("Loaded {} events", events.len());
    Ok(events)
}

/// Load a recorded pose stream.
#[tracing::instrument(skip_all, fields(path = %path.as_ref().display()))]
pub fn load_poses<P: AsRef<Path>>(path: P) -> Result<Vec<Pose>, DataError> {
    debug!("Loading poses");
    let file = File::open(path.as_ref())?;
    let poses: Vec<Pose> = read_records(BufReader::new(file))?;
    info!("Loaded {} poses", poses.len());
    Ok(poses)
}
