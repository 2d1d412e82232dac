// Position fixes and the producers that deliver them

pub mod mock;
pub(crate) mod replay;
pub(crate) mod simulated;

pub use mock::MockFixProducer;
pub use replay::ReplayFixProducer;
pub use simulated::SimulatedFixProducer;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Sender;
use std::thread::JoinHandle;
use std::time::Duration;

use log::warn;
use serde::{Deserialize, Serialize};

use crate::BeaconError;
use crate::session::SessionEvent;

/// Nominal delay between two position fixes, in milliseconds.
pub const FIX_INTERVAL_MS: u64 = 5000;
/// Shortest delay a producer may compress the cadence to, in milliseconds.
pub const FIX_FASTEST_INTERVAL_MS: u64 = 2000;

/// A single reported device position, in decimal degrees.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PositionFix {
    pub latitude: f64,
    pub longitude: f64,
}

/// Accuracy and power tradeoff requested from the fix source.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FixPriority {
    HighAccuracy,
    LowPower,
}

/// Cadence and accuracy a subscription asks its producer for.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FixRequest {
    pub interval: Duration,
    /// Floor for opportunistic early fixes. Local producers pace themselves
    /// on `interval` alone and never go below this.
    pub fastest_interval: Duration,
    pub priority: FixPriority,
}

impl Default for FixRequest {
    fn default() -> Self {
        FixRequest {
            interval: Duration::from_millis(FIX_INTERVAL_MS),
            fastest_interval: Duration::from_millis(FIX_FASTEST_INTERVAL_MS),
            priority: FixPriority::HighAccuracy,
        }
    }
}

/// Live feed of fixes out of a producer.
///
/// The session manager owns exactly one of these for the lifetime of an
/// active session. Cancelling stops the feed thread; fixes already queued
/// behind the cancellation are dropped by the manager's active-session guard.
pub struct FixSubscription {
    stop: Arc<AtomicBool>,
    feed: Option<JoinHandle<()>>,
}

impl FixSubscription {
    pub fn new(stop: Arc<AtomicBool>, feed: JoinHandle<()>) -> Self {
        FixSubscription {
            stop,
            feed: Some(feed),
        }
    }

    /// Handle for producers that deliver their fixes without a thread.
    pub fn detached(stop: Arc<AtomicBool>) -> Self {
        FixSubscription { stop, feed: None }
    }

    /// Stop the feed and wait for the producer thread to wind down.
    pub fn cancel(mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(feed) = self.feed.take() {
            if feed.join().is_err() {
                warn!("Position fix feed thread panicked before shutdown");
            }
        }
    }
}

/// A source of periodic position fixes.
///
/// Mirrors the push interface of a platform location provider: the session
/// subscribes with a cadence request and receives fixes as session events
/// until the subscription handle is cancelled. Producers exist for a
/// simulated device, for recorded track files, and as a scriptable test
/// double.
pub trait FixProducer: Send {
    /// Start delivering fixes into `events` at the requested cadence.
    fn subscribe(
        &mut self,
        request: &FixRequest,
        events: Sender<SessionEvent>,
    ) -> Result<FixSubscription, BeaconError>;
}

/// Sleep in short slices so a cancelled subscription wakes up promptly.
pub(crate) fn sleep_unless_stopped(total: Duration, stop: &AtomicBool) {
    const SLICE: Duration = Duration::from_millis(100);
    let mut remaining = total;
    while !stop.load(Ordering::Relaxed) && !remaining.is_zero() {
        let nap = remaining.min(SLICE);
        std::thread::sleep(nap);
        remaining = remaining.saturating_sub(nap);
    }
}
