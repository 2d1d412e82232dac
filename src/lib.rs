// Library interface for geobeacon
// This allows integration tests to access internal modules

pub mod config;
pub mod console;
pub mod errors;
pub mod fix;
pub mod journal;
pub mod permission;
pub mod session;
pub mod transport;

// Re-export commonly used types
pub use errors::BeaconError;
pub use fix::{FixProducer, FixRequest, FixSubscription, PositionFix};
pub use session::{
    ControlsState, SessionCommand, SessionEvent, SessionManager, SessionNotice, SessionState,
    SessionUpdate,
};
pub use transport::{Transport, TransportEvent};
