use std::sync::mpsc::{Receiver, Sender};

use log::{debug, info, warn};

use crate::fix::{FixProducer, FixRequest, FixSubscription, PositionFix};
use crate::journal::FixRecord;
use crate::permission::PermissionGate;
use crate::transport::{Transport, TransportEvent};

use super::message::{LOCATION_TOPIC, OutgoingMessage};
use super::{
    ControlsState, PermissionDecision, SessionCommand, SessionEvent, SessionNotice, SessionState,
    SessionUpdate,
};

/// Owner of the one publishing session.
///
/// The manager never runs concurrently with itself: it consumes a single
/// event queue, so commands, transport outcomes, fixes, and permission
/// decisions are handled strictly one at a time. Anything asynchronous the
/// manager kicks off reports back by sending into that same queue.
pub struct SessionManager {
    state: SessionState,
    transport: Box<dyn Transport>,
    producer: Box<dyn FixProducer>,
    permissions: Box<dyn PermissionGate>,
    events: Sender<SessionEvent>,
    updates: Sender<SessionUpdate>,
    journal: Option<Sender<FixRecord>>,
    subscription: Option<FixSubscription>,
}

impl SessionManager {
    pub fn new(
        transport: Box<dyn Transport>,
        producer: Box<dyn FixProducer>,
        permissions: Box<dyn PermissionGate>,
        events: Sender<SessionEvent>,
        updates: Sender<SessionUpdate>,
    ) -> Self {
        SessionManager {
            state: SessionState::Idle,
            transport,
            producer,
            permissions,
            events,
            updates,
            journal: None,
            subscription: None,
        }
    }

    /// Journal every published fix to `journal` on top of publishing it.
    pub fn with_journal(mut self, journal: Sender<FixRecord>) -> Self {
        self.journal = Some(journal);
        self
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn subscription_live(&self) -> bool {
        self.subscription.is_some()
    }

    /// Drain the event queue until a shutdown command arrives.
    pub fn run(mut self, events: Receiver<SessionEvent>) {
        self.send_controls();
        for event in events {
            if !self.handle_event(event) {
                break;
            }
        }
        debug!("Session manager loop ended");
    }

    /// Apply one event. Returns `false` once the manager should wind down.
    pub fn handle_event(&mut self, event: SessionEvent) -> bool {
        match event {
            SessionEvent::Command(SessionCommand::Start { identifier }) => self.start(identifier),
            SessionEvent::Command(SessionCommand::Stop) => self.stop(),
            SessionEvent::Command(SessionCommand::Shutdown) => {
                self.shutdown();
                return false;
            }
            SessionEvent::Fix(fix) => self.on_fix(fix),
            SessionEvent::Transport(transport_event) => self.on_transport_event(transport_event),
            SessionEvent::Permission(decision) => self.on_permission_decision(decision),
        }
        true
    }

    fn start(&mut self, identifier: String) {
        if self.state != SessionState::Idle {
            warn!("Ignoring start request while the session is {:?}", self.state);
            return;
        }
        if identifier.is_empty() {
            self.notify(SessionNotice::EmptyIdentifier);
            return;
        }
        if !self.permissions.is_granted() {
            self.notify(SessionNotice::PermissionRequired);
            if let Err(e) = self.permissions.request(identifier, self.events.clone()) {
                warn!("Location permission request failed: {e}");
            }
            return;
        }
        match self.transport.connect() {
            Ok(()) => {
                debug!("Broker connection initiated for operator {identifier}");
                self.state = SessionState::Connecting {
                    identifier,
                    cancelled: false,
                };
            }
            Err(e) => self.notify(SessionNotice::ConnectionFailed(e.to_string())),
        }
    }

    fn stop(&mut self) {
        if matches!(self.state, SessionState::Active { .. }) {
            // Leave Active before tearing down so fixes still in flight from
            // a not yet cancelled subscription are dropped, never published.
            self.state = SessionState::Stopping;
            if let Some(subscription) = self.subscription.take() {
                subscription.cancel();
            }
            if let Err(e) = self.transport.disconnect() {
                // Non-fatal: the session counts as stopped regardless.
                warn!("Broker disconnect failed: {e}");
            }
            self.state = SessionState::Idle;
            self.notify(SessionNotice::Stopped);
            self.send_controls();
        } else if let SessionState::Connecting { cancelled, .. } = &mut self.state {
            // Not active yet, but neutralize the in-flight connect attempt.
            *cancelled = true;
            self.notify(SessionNotice::NotActive);
        } else {
            self.notify(SessionNotice::NotActive);
        }
    }

    fn shutdown(&mut self) {
        if matches!(self.state, SessionState::Active { .. }) {
            self.stop();
        } else if let SessionState::Connecting { cancelled, .. } = &mut self.state {
            *cancelled = true;
            if let Err(e) = self.transport.disconnect() {
                debug!("Disconnect during shutdown failed: {e}");
            }
        }
    }

    fn on_fix(&mut self, fix: PositionFix) {
        let SessionState::Active { identifier } = &self.state else {
            // Fixes can still arrive between stop and subscription teardown.
            debug!("Dropping fix {:?} outside an active session", fix);
            return;
        };
        let message = OutgoingMessage::new(identifier, &fix);
        match self.transport.publish(LOCATION_TOPIC, message.into_payload()) {
            Ok(()) => {
                if let Some(journal) = &self.journal {
                    let _ = journal.send(FixRecord::captured_now(&fix));
                }
            }
            Err(e) => {
                // Fire and forget per fix: the session keeps running.
                warn!("Could not publish fix: {e}");
            }
        }
    }

    fn on_transport_event(&mut self, event: TransportEvent) {
        match event {
            TransportEvent::Connected => self.on_connected(),
            TransportEvent::ConnectFailed { reason } => self.on_connect_failed(reason),
            TransportEvent::ConnectionLost { reason } => {
                // The session stays logically active on a dead connection
                // until the operator stops it. No automatic reconnect.
                self.notify(SessionNotice::ConnectionLost(reason));
            }
        }
    }

    fn on_connected(&mut self) {
        match std::mem::replace(&mut self.state, SessionState::Idle) {
            SessionState::Connecting {
                identifier,
                cancelled: false,
            } => match self
                .producer
                .subscribe(&FixRequest::default(), self.events.clone())
            {
                Ok(subscription) => {
                    info!("Session active for operator {identifier}");
                    self.subscription = Some(subscription);
                    self.state = SessionState::Active { identifier };
                    self.notify(SessionNotice::Started);
                    self.send_controls();
                }
                Err(e) => {
                    // No session without a fix feed, so close the fresh
                    // connection again.
                    if let Err(disconnect_err) = self.transport.disconnect() {
                        warn!("Disconnect after failed fix subscription failed: {disconnect_err}");
                    }
                    self.notify(SessionNotice::ConnectionFailed(e.to_string()));
                }
            },
            SessionState::Connecting {
                cancelled: true, ..
            } => {
                debug!("Connection established after stop, closing it");
                if let Err(e) = self.transport.disconnect() {
                    warn!("Disconnect of a cancelled connection failed: {e}");
                }
            }
            other => {
                warn!("Unexpected connect completion while {:?}", other);
                self.state = other;
            }
        }
    }

    fn on_connect_failed(&mut self, reason: String) {
        match std::mem::replace(&mut self.state, SessionState::Idle) {
            SessionState::Connecting {
                cancelled: false, ..
            } => {
                self.notify(SessionNotice::ConnectionFailed(reason));
            }
            SessionState::Connecting {
                cancelled: true, ..
            } => {
                debug!("Connect attempt failed after stop: {reason}");
            }
            other => {
                warn!("Unexpected connect failure while {:?}: {reason}", other);
                self.state = other;
            }
        }
    }

    fn on_permission_decision(&mut self, decision: PermissionDecision) {
        if decision.granted {
            info!("Location access granted, resuming start");
            self.start(decision.identifier);
        } else {
            self.notify(SessionNotice::PermissionDenied);
        }
    }

    fn notify(&self, notice: SessionNotice) {
        let _ = self.updates.send(SessionUpdate::Notice(notice));
    }

    fn send_controls(&self) {
        let active = matches!(self.state, SessionState::Active { .. });
        let _ = self.updates.send(SessionUpdate::Controls(ControlsState {
            start_enabled: !active,
            stop_enabled: active,
        }));
    }
}
