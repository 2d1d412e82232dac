// Track journal: published fixes written to and read back from JSONL files

use std::{
    fs::File,
    io::{BufWriter, Write},
    path::PathBuf,
    sync::mpsc::Receiver,
    time::{SystemTime, UNIX_EPOCH},
};

use log::warn;
use serde::{Deserialize, Serialize};
use serde_jsonlines::json_lines;

use crate::{BeaconError, fix::PositionFix};

/// One journaled fix: the position that went out plus its wall-clock capture
/// time in milliseconds since the epoch.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct FixRecord {
    pub unix_ms: u128,
    pub latitude: f64,
    pub longitude: f64,
}

impl FixRecord {
    /// Stamp `fix` with the current wall-clock time.
    pub fn captured_now(fix: &PositionFix) -> Self {
        let unix_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or(0);
        FixRecord {
            unix_ms,
            latitude: fix.latitude,
            longitude: fix.longitude,
        }
    }

    pub fn fix(&self) -> PositionFix {
        PositionFix {
            latitude: self.latitude,
            longitude: self.longitude,
        }
    }
}

/// Drain `records` into `file` as JSON lines until the sending side closes.
pub fn write_track(file: &PathBuf, records: Receiver<FixRecord>) -> Result<(), BeaconError> {
    let track_file = File::create(file).map_err(|e| BeaconError::JournalError { source: e })?;
    let mut track_writer = BufWriter::new(track_file);
    loop {
        match records.recv() {
            Ok(record) => {
                let _ = writeln!(track_writer, "{}", serde_json::to_string(&record).unwrap())
                    .map_err(|e| {
                        warn!("Error while writing fix record to track file: {}", e);
                    });
            }
            Err(_) => break,
        };
    }
    track_writer
        .flush()
        .map_err(|e| BeaconError::JournalError { source: e })?;
    Ok(())
}

/// Load every record of a JSONL track file.
pub fn read_track(file: &PathBuf) -> Result<Vec<FixRecord>, BeaconError> {
    let records = json_lines(file)
        .map_err(|e| BeaconError::TrackReadError { source: e })?
        .collect::<Result<Vec<FixRecord>, std::io::Error>>()
        .map_err(|e| BeaconError::TrackReadError { source: e })?;
    Ok(records)
}
