// Error types for geobeacon

use crate::session::SessionEvent;
use snafu::Snafu;
use std::{io, sync::mpsc::SendError};

#[derive(Debug, Snafu)]
pub enum BeaconError {
    // Errors for the broker transport
    #[snafu(display("Could not start a broker connection: {reason}"))]
    ConnectError { reason: String },
    #[snafu(display("Transport is not connected"))]
    NotConnected,
    #[snafu(display("Could not hand the message to the broker client: {reason}"))]
    PublishError { reason: String },
    #[snafu(display("Could not disconnect from the broker: {reason}"))]
    DisconnectError { reason: String },

    // Errors for the position fix producer
    #[snafu(display("Position fix producer error"))]
    FixProducerError { description: String },

    // Errors while dispatching session events
    #[snafu(display("Error delivering event to the session queue"))]
    EventDispatchError {
        source: Box<SendError<SessionEvent>>,
    },

    // Errors for the track journal
    #[snafu(display("Error writing track journal"))]
    JournalError { source: io::Error },

    // Config management errors
    #[snafu(display("Could not find application data directory to save config file"))]
    NoConfigDir,
    #[snafu(display("Error writing config file"))]
    ConfigIOError { source: io::Error },
    #[snafu(display("Error serializing config file"))]
    ConfigSerializeError { source: serde_json::Error },

    // Track file errors
    #[snafu(display("Invalid track file: {path}"))]
    InvalidTrackFile { path: String },
    #[snafu(display("Error loading track file"))]
    TrackReadError { source: io::Error },
}

impl From<SendError<SessionEvent>> for BeaconError {
    fn from(value: SendError<SessionEvent>) -> Self {
        BeaconError::EventDispatchError {
            source: Box::new(value),
        }
    }
}
