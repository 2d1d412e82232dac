use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Sender;
use std::thread;

use log::{debug, info};

use crate::BeaconError;
use crate::session::SessionEvent;

use super::{FixProducer, FixRequest, FixSubscription, PositionFix, sleep_unless_stopped};

// Walk origin when none is configured: UTech Kingston campus
const DEFAULT_ORIGIN_LAT: f64 = 18.0179;
const DEFAULT_ORIGIN_LON: f64 = -76.7674;
/// Radius of the simulated walk in degrees, roughly 100 m.
const WALK_RADIUS_DEG: f64 = 0.0009;
/// Angle advanced along the loop per fix, in radians.
const WALK_STEP_RAD: f64 = 0.05;

/// Fix source that traces a slow deterministic loop around an origin point.
///
/// Stands in for real positioning hardware so a live session can run on any
/// machine. The loop shape keeps consecutive coordinates close together,
/// which makes the published stream easy to eyeball on the subscriber side.
pub struct SimulatedFixProducer {
    origin: PositionFix,
}

impl SimulatedFixProducer {
    pub fn new(origin: PositionFix) -> Self {
        SimulatedFixProducer { origin }
    }
}

impl Default for SimulatedFixProducer {
    fn default() -> Self {
        SimulatedFixProducer::new(PositionFix {
            latitude: DEFAULT_ORIGIN_LAT,
            longitude: DEFAULT_ORIGIN_LON,
        })
    }
}

impl FixProducer for SimulatedFixProducer {
    fn subscribe(
        &mut self,
        request: &FixRequest,
        events: Sender<SessionEvent>,
    ) -> Result<FixSubscription, BeaconError> {
        let stop = Arc::new(AtomicBool::new(false));
        let thread_stop = Arc::clone(&stop);
        let origin = self.origin;
        let interval = request.interval;
        info!(
            "Starting simulated walk around {}, {}",
            origin.latitude, origin.longitude
        );
        let feed = thread::Builder::new()
            .name("sim-fix".to_string())
            .spawn(move || {
                let mut angle: f64 = 0.0;
                while !thread_stop.load(Ordering::Relaxed) {
                    let fix = PositionFix {
                        latitude: origin.latitude + WALK_RADIUS_DEG * angle.sin(),
                        longitude: origin.longitude + WALK_RADIUS_DEG * angle.cos(),
                    };
                    if events.send(SessionEvent::Fix(fix)).is_err() {
                        debug!("Session queue closed, ending simulated walk");
                        break;
                    }
                    angle += WALK_STEP_RAD;
                    sleep_unless_stopped(interval, &thread_stop);
                }
            })
            .map_err(|e| BeaconError::FixProducerError {
                description: format!("Could not spawn simulated fix thread: {e}"),
            })?;
        Ok(FixSubscription::new(stop, feed))
    }
}
