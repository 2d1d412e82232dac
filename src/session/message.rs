use crate::fix::PositionFix;

/// Topic every location message goes out on. The deployed subscribers listen
/// here, so the name is load-bearing just like the payload shape below.
pub const LOCATION_TOPIC: &str = "assignment/location";

/// One location message, formatted and ready for the transport.
///
/// Built per fix from the identifier captured at session start plus the
/// fix's coordinates. The payload is the exact line the existing subscriber
/// fleet parses; coordinates use the shortest decimal form that round-trips
/// and always carry a decimal point, so whole degrees read `1.0`, never `1`:
///
/// ```text
/// Student ID: 42, Latitude: 18.0179, Longitude: -76.8099
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct OutgoingMessage {
    payload: String,
}

impl OutgoingMessage {
    pub fn new(operator_id: &str, fix: &PositionFix) -> Self {
        OutgoingMessage {
            // {:?} keeps the decimal point on whole degrees ("1.0", not "1")
            payload: format!(
                "Student ID: {}, Latitude: {:?}, Longitude: {:?}",
                operator_id, fix.latitude, fix.longitude
            ),
        }
    }

    pub fn payload(&self) -> &str {
        &self.payload
    }

    pub fn into_payload(self) -> Vec<u8> {
        self.payload.into_bytes()
    }
}
