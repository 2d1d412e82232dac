// Broker transport: the publish connection and its lifecycle events

pub mod mock;
pub(crate) mod mqtt;

pub use mock::{ConnectScript, MockTransport};
pub use mqtt::MqttTransport;

use crate::BeaconError;

/// Connection-level outcome delivered through the session queue.
#[derive(Clone, Debug, PartialEq)]
pub enum TransportEvent {
    /// The broker accepted the connection.
    Connected,
    /// The single connect attempt ended without a usable connection.
    ConnectFailed { reason: String },
    /// An established connection dropped. Nobody reconnects automatically;
    /// the operator decides what happens next.
    ConnectionLost { reason: String },
}

/// A persistent publish connection to the message broker.
///
/// Every operation is non-blocking. `connect` only initiates the attempt and
/// reports completion as a [`TransportEvent`], `publish` hands the message to
/// the client's outgoing queue, and `disconnect` tears the connection down
/// without waiting on the broker.
pub trait Transport: Send {
    /// Start a single connection attempt. Completion, success or failure,
    /// arrives later as a [`TransportEvent`]. At most one live connection or
    /// in-flight attempt exists at a time, but an attempt that already failed
    /// never blocks the next one.
    fn connect(&mut self) -> Result<(), BeaconError>;

    /// Queue one message for delivery on `topic`.
    fn publish(&mut self, topic: &str, payload: Vec<u8>) -> Result<(), BeaconError>;

    /// Drop the connection, including one still being established.
    fn disconnect(&mut self) -> Result<(), BeaconError>;
}
