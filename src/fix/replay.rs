use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Sender;
use std::thread;

use log::{debug, info};

use crate::BeaconError;
use crate::journal::{self, FixRecord};
use crate::session::SessionEvent;

use super::{FixProducer, FixRequest, FixSubscription, PositionFix, sleep_unless_stopped};

/// Fix source that replays a previously journaled track file.
///
/// Records are delivered in file order at the subscription's nominal
/// interval. The feed simply ends once the track is exhausted; the session
/// stays active and keeps publishing nothing until the operator stops it.
pub struct ReplayFixProducer {
    fixes: Vec<PositionFix>,
}

impl ReplayFixProducer {
    /// Load every record of a JSONL track file up front.
    pub fn from_file(track_file: &PathBuf) -> Result<Self, BeaconError> {
        if !track_file.exists() {
            return Err(BeaconError::InvalidTrackFile {
                path: format!("{:?}", track_file),
            });
        }
        let records = journal::read_track(track_file)?;
        info!("Loaded {} fixes from {:?}", records.len(), track_file);
        Ok(ReplayFixProducer {
            fixes: records.iter().map(FixRecord::fix).collect(),
        })
    }

    pub fn from_fixes(fixes: Vec<PositionFix>) -> Self {
        ReplayFixProducer { fixes }
    }

    pub fn fix_count(&self) -> usize {
        self.fixes.len()
    }
}

impl FixProducer for ReplayFixProducer {
    fn subscribe(
        &mut self,
        request: &FixRequest,
        events: Sender<SessionEvent>,
    ) -> Result<FixSubscription, BeaconError> {
        let stop = Arc::new(AtomicBool::new(false));
        let thread_stop = Arc::clone(&stop);
        let fixes = self.fixes.clone();
        let interval = request.interval;
        let feed = thread::Builder::new()
            .name("replay-fix".to_string())
            .spawn(move || {
                for fix in fixes {
                    if thread_stop.load(Ordering::Relaxed) {
                        return;
                    }
                    if events.send(SessionEvent::Fix(fix)).is_err() {
                        debug!("Session queue closed, ending track replay");
                        return;
                    }
                    sleep_unless_stopped(interval, &thread_stop);
                }
                info!("Track replay exhausted");
            })
            .map_err(|e| BeaconError::FixProducerError {
                description: format!("Could not spawn replay thread: {e}"),
            })?;
        Ok(FixSubscription::new(stop, feed))
    }
}
