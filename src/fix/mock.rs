use std::sync::atomic::AtomicBool;
use std::sync::mpsc::Sender;
use std::sync::{Arc, Mutex};

use crate::BeaconError;
use crate::session::SessionEvent;

use super::{FixProducer, FixRequest, FixSubscription, PositionFix};

/// Scriptable fix producer for tests.
///
/// Delivers a scripted burst of fixes synchronously at subscribe time, with
/// no thread and no timing, and records every cadence request it sees behind
/// a shared handle so tests keep visibility after the producer moves into
/// the session manager.
pub struct MockFixProducer {
    script: Vec<PositionFix>,
    requests: Arc<Mutex<Vec<FixRequest>>>,
    fail_subscribe: bool,
}

impl MockFixProducer {
    pub fn new() -> Self {
        MockFixProducer {
            script: Vec::new(),
            requests: Arc::new(Mutex::new(Vec::new())),
            fail_subscribe: false,
        }
    }

    /// Producer that emits `fixes` as soon as a session subscribes.
    pub fn with_script(fixes: Vec<PositionFix>) -> Self {
        MockFixProducer {
            script: fixes,
            ..MockFixProducer::new()
        }
    }

    /// Producer whose subscribe call always fails.
    pub fn failing() -> Self {
        MockFixProducer {
            fail_subscribe: true,
            ..MockFixProducer::new()
        }
    }

    /// Shared view of every cadence request received so far.
    pub fn requests(&self) -> Arc<Mutex<Vec<FixRequest>>> {
        Arc::clone(&self.requests)
    }
}

impl Default for MockFixProducer {
    fn default() -> Self {
        MockFixProducer::new()
    }
}

impl FixProducer for MockFixProducer {
    fn subscribe(
        &mut self,
        request: &FixRequest,
        events: Sender<SessionEvent>,
    ) -> Result<FixSubscription, BeaconError> {
        if self.fail_subscribe {
            return Err(BeaconError::FixProducerError {
                description: "scripted subscribe failure".to_string(),
            });
        }
        self.requests.lock().unwrap().push(*request);
        for fix in self.script.drain(..) {
            let _ = events.send(SessionEvent::Fix(fix));
        }
        Ok(FixSubscription::detached(Arc::new(AtomicBool::new(false))))
    }
}
