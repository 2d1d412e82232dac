use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::Sender;

use log::debug;

use crate::BeaconError;
use crate::session::{PermissionDecision, SessionEvent};

/// Gate in front of the device's location capability.
///
/// Mirrors a platform permission model: a cheap synchronous check, plus an
/// asynchronous request whose grant or deny decision comes back through the
/// session queue. The decision echoes the identifier the blocked start was
/// made with so a grant can resume that exact attempt.
pub trait PermissionGate: Send {
    /// Whether location access is currently granted.
    fn is_granted(&self) -> bool;

    /// Ask for access. The decision arrives later as a
    /// [`SessionEvent::Permission`] event.
    fn request(&mut self, identifier: String, events: Sender<SessionEvent>)
    -> Result<(), BeaconError>;
}

/// Permission gate backed by the standing consent recorded in the config
/// file. A headless deployment has no consent dialog to raise, so a request
/// simply answers with whatever consent is on record.
pub struct StaticPermissionGate {
    granted: bool,
}

impl StaticPermissionGate {
    pub fn new(granted: bool) -> Self {
        StaticPermissionGate { granted }
    }
}

impl PermissionGate for StaticPermissionGate {
    fn is_granted(&self) -> bool {
        self.granted
    }

    fn request(
        &mut self,
        identifier: String,
        events: Sender<SessionEvent>,
    ) -> Result<(), BeaconError> {
        debug!(
            "Answering location permission request from standing consent: {}",
            self.granted
        );
        events.send(SessionEvent::Permission(PermissionDecision {
            granted: self.granted,
            identifier,
        }))?;
        Ok(())
    }
}

/// Scriptable gate for tests: reports no grant until a request resolves,
/// then answers with the scripted decision and records it as the new
/// standing state.
pub struct ScriptedPermissionGate {
    granted: bool,
    decision: bool,
    requests: Arc<AtomicUsize>,
}

impl ScriptedPermissionGate {
    pub fn new(granted_now: bool, decision: bool) -> Self {
        ScriptedPermissionGate {
            granted: granted_now,
            decision,
            requests: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Shared count of requests raised so far.
    pub fn request_count(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.requests)
    }
}

impl PermissionGate for ScriptedPermissionGate {
    fn is_granted(&self) -> bool {
        self.granted
    }

    fn request(
        &mut self,
        identifier: String,
        events: Sender<SessionEvent>,
    ) -> Result<(), BeaconError> {
        self.requests.fetch_add(1, Ordering::Relaxed);
        self.granted = self.decision;
        events.send(SessionEvent::Permission(PermissionDecision {
            granted: self.decision,
            identifier,
        }))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;

    #[test]
    fn test_static_gate_answers_with_standing_consent() {
        let (events, decisions) = mpsc::channel();
        let mut gate = StaticPermissionGate::new(false);
        assert!(!gate.is_granted());

        gate.request("42".to_string(), events).unwrap();
        let event = decisions.recv().unwrap();
        let SessionEvent::Permission(decision) = event else {
            panic!("expected a permission decision");
        };
        assert!(!decision.granted);
        assert_eq!(decision.identifier, "42");
    }

    #[test]
    fn test_request_fails_when_the_session_queue_is_gone() {
        let (events, decisions) = mpsc::channel();
        drop(decisions);
        let mut gate = StaticPermissionGate::new(true);
        let result = gate.request("42".to_string(), events);
        assert!(matches!(
            result,
            Err(BeaconError::EventDispatchError { .. })
        ));
    }

    #[test]
    fn test_scripted_gate_grant_becomes_standing() {
        let (events, decisions) = mpsc::channel();
        let mut gate = ScriptedPermissionGate::new(false, true);
        let requests = gate.request_count();

        gate.request("7".to_string(), events).unwrap();
        assert_eq!(requests.load(Ordering::Relaxed), 1);
        assert!(gate.is_granted());
        let SessionEvent::Permission(decision) = decisions.recv().unwrap() else {
            panic!("expected a permission decision");
        };
        assert!(decision.granted);
    }
}
