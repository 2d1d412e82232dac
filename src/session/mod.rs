// Publishing session lifecycle: states, events, and the manager that owns them

pub(crate) mod manager;
pub(crate) mod message;

pub use manager::SessionManager;
pub use message::{LOCATION_TOPIC, OutgoingMessage};

use std::fmt;

use crate::fix::PositionFix;
use crate::transport::TransportEvent;

/// Lifecycle of one publishing session.
///
/// Exactly one session exists at a time and every transition happens on the
/// session manager's own thread. `Connecting` carries a `cancelled` flag so a
/// stop issued while the broker handshake is still in flight can neutralize
/// the attempt without tearing anything down early.
#[derive(Clone, Debug, PartialEq)]
pub enum SessionState {
    Idle,
    Connecting { identifier: String, cancelled: bool },
    Active { identifier: String },
    Stopping,
}

/// Operator request handed to the session manager.
#[derive(Clone, Debug, PartialEq)]
pub enum SessionCommand {
    Start { identifier: String },
    Stop,
    Shutdown,
}

/// Outcome of an asynchronous location permission request, echoing the
/// identifier the blocked start attempt was made with.
#[derive(Clone, Debug, PartialEq)]
pub struct PermissionDecision {
    pub granted: bool,
    pub identifier: String,
}

/// Everything the session manager reacts to. Commands, transport outcomes,
/// position fixes, and permission decisions all funnel through one queue so
/// the manager never needs a lock.
#[derive(Clone, Debug)]
pub enum SessionEvent {
    Command(SessionCommand),
    Transport(TransportEvent),
    Fix(PositionFix),
    Permission(PermissionDecision),
}

/// User-facing outcome of a session operation.
#[derive(Clone, Debug, PartialEq)]
pub enum SessionNotice {
    Started,
    Stopped,
    EmptyIdentifier,
    PermissionRequired,
    PermissionDenied,
    ConnectionFailed(String),
    NotActive,
    ConnectionLost(String),
}

impl fmt::Display for SessionNotice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionNotice::Started => write!(f, "Publishing started"),
            SessionNotice::Stopped => write!(f, "Publishing stopped"),
            SessionNotice::EmptyIdentifier => {
                write!(f, "Enter an operator ID before starting")
            }
            SessionNotice::PermissionRequired => {
                write!(f, "Location access is required, requesting it now")
            }
            SessionNotice::PermissionDenied => write!(f, "Location access was denied"),
            SessionNotice::ConnectionFailed(reason) => {
                write!(f, "Could not connect to the broker: {reason}")
            }
            SessionNotice::NotActive => write!(f, "No publishing session is active"),
            SessionNotice::ConnectionLost(reason) => write!(f, "Connection lost: {reason}"),
        }
    }
}

/// Which operator controls should accept input right now.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ControlsState {
    pub start_enabled: bool,
    pub stop_enabled: bool,
}

/// Feedback pushed from the session manager to whatever front end is
/// attached, a console bridge here.
#[derive(Clone, Debug, PartialEq)]
pub enum SessionUpdate {
    Notice(SessionNotice),
    Controls(ControlsState),
}
