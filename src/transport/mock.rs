use std::collections::VecDeque;
use std::sync::atomic::AtomicUsize;
use std::sync::mpsc::Sender;
use std::sync::{Arc, Mutex};

use crate::BeaconError;
use crate::session::SessionEvent;

use super::{Transport, TransportEvent};

/// Outcome script for one `connect` call on the mock transport.
#[derive(Clone, Debug)]
pub enum ConnectScript {
    /// Deliver `Connected` through the session queue. The connection stays
    /// live until `disconnect`.
    Accept,
    /// Deliver `ConnectFailed` with this reason through the session queue.
    /// The failed attempt frees the connection slot.
    Reject(String),
    /// Fail the initiation synchronously, with no event at all.
    InitiationError(String),
    /// Deliver nothing. The attempt holds the connection slot until the test
    /// injects its own transport event and the session disconnects.
    Stall,
}

/// Scriptable broker transport for tests.
///
/// Connect outcomes are scripted per call and delivered through the same
/// session queue the real transport uses. The mock holds the real transport's
/// contract of one live connection or in-flight attempt at a time, so a
/// session that forgets to release the slot fails its tests. Published
/// messages and call counts sit behind shared handles so tests keep
/// visibility after the transport moves into the session manager.
pub struct MockTransport {
    events: Sender<SessionEvent>,
    scripts: VecDeque<ConnectScript>,
    published: Arc<Mutex<Vec<(String, Vec<u8>)>>>,
    connects: Arc<AtomicUsize>,
    disconnects: Arc<AtomicUsize>,
    live: bool,
    fail_publish: bool,
    fail_disconnect: bool,
}

impl MockTransport {
    pub fn new(events: Sender<SessionEvent>) -> Self {
        MockTransport {
            events,
            scripts: VecDeque::new(),
            published: Arc::new(Mutex::new(Vec::new())),
            connects: Arc::new(AtomicUsize::new(0)),
            disconnects: Arc::new(AtomicUsize::new(0)),
            live: false,
            fail_publish: false,
            fail_disconnect: false,
        }
    }

    /// Queue the outcome of the next `connect` call. Unscripted calls accept.
    pub fn script_connect(mut self, script: ConnectScript) -> Self {
        self.scripts.push_back(script);
        self
    }

    pub fn failing_publish(mut self) -> Self {
        self.fail_publish = true;
        self
    }

    pub fn failing_disconnect(mut self) -> Self {
        self.fail_disconnect = true;
        self
    }

    /// Shared view of every message published so far, as (topic, payload).
    pub fn published(&self) -> Arc<Mutex<Vec<(String, Vec<u8>)>>> {
        Arc::clone(&self.published)
    }

    pub fn connect_count(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.connects)
    }

    pub fn disconnect_count(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.disconnects)
    }
}

impl Transport for MockTransport {
    fn connect(&mut self) -> Result<(), BeaconError> {
        if self.live {
            return Err(BeaconError::ConnectError {
                reason: "a connection is already live".to_string(),
            });
        }
        self.connects.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        match self.scripts.pop_front().unwrap_or(ConnectScript::Accept) {
            ConnectScript::Accept => {
                self.live = true;
                let _ = self
                    .events
                    .send(SessionEvent::Transport(TransportEvent::Connected));
                Ok(())
            }
            ConnectScript::Reject(reason) => {
                let _ = self
                    .events
                    .send(SessionEvent::Transport(TransportEvent::ConnectFailed {
                        reason,
                    }));
                Ok(())
            }
            ConnectScript::InitiationError(reason) => Err(BeaconError::ConnectError { reason }),
            ConnectScript::Stall => {
                self.live = true;
                Ok(())
            }
        }
    }

    fn publish(&mut self, topic: &str, payload: Vec<u8>) -> Result<(), BeaconError> {
        if self.fail_publish {
            return Err(BeaconError::PublishError {
                reason: "scripted publish failure".to_string(),
            });
        }
        self.published.lock().unwrap().push((topic.to_string(), payload));
        Ok(())
    }

    fn disconnect(&mut self) -> Result<(), BeaconError> {
        self.disconnects
            .fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        // the slot frees even when the teardown errors, like the real
        // transport dropping its client
        self.live = false;
        if self.fail_disconnect {
            return Err(BeaconError::DisconnectError {
                reason: "scripted disconnect failure".to_string(),
            });
        }
        Ok(())
    }
}
