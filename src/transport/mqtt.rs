use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Sender;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use log::{debug, info, warn};
use rumqttc::{Client, ConnectReturnCode, Connection, Event, MqttOptions, Packet, QoS};
use uuid::Uuid;

use crate::BeaconError;
use crate::config::BrokerConfig;
use crate::session::SessionEvent;

use super::{Transport, TransportEvent};

/// Capacity of the client's outgoing request queue.
const REQUEST_QUEUE_CAP: usize = 10;

/// MQTT-backed broker transport.
///
/// `connect` spawns a poller thread that drives the client event loop for a
/// single connection attempt: the CONNACK turns into
/// [`TransportEvent::Connected`], an error before it into `ConnectFailed`,
/// and an error after it into `ConnectionLost`. The poller never iterates
/// past an error because the event loop would silently reconnect, and
/// reconnecting is the operator's call here, not the transport's. When the
/// poller winds down it raises the `dead` flag, and the next `connect`
/// reclaims the stale client instead of refusing the attempt.
pub struct MqttTransport {
    broker: BrokerConfig,
    events: Sender<SessionEvent>,
    client: Option<Client>,
    poller: Option<JoinHandle<()>>,
    halting: Arc<AtomicBool>,
    dead: Arc<AtomicBool>,
}

impl MqttTransport {
    pub fn new(broker: BrokerConfig, events: Sender<SessionEvent>) -> Self {
        MqttTransport {
            broker,
            events,
            client: None,
            poller: None,
            halting: Arc::new(AtomicBool::new(false)),
            dead: Arc::new(AtomicBool::new(false)),
        }
    }

    fn client_id() -> String {
        format!("geobeacon-{}", Uuid::new_v4().simple())
    }
}

impl Transport for MqttTransport {
    fn connect(&mut self) -> Result<(), BeaconError> {
        if self.client.is_some() {
            if !self.dead.load(Ordering::Relaxed) {
                return Err(BeaconError::ConnectError {
                    reason: "a connection is already live".to_string(),
                });
            }
            // The poller exited after a failed attempt or a dropped
            // connection, leaving only stale handles behind.
            debug!("Reclaiming a dead broker connection");
            self.client = None;
            if let Some(poller) = self.poller.take() {
                if poller.join().is_err() {
                    warn!("MQTT poller thread panicked before shutdown");
                }
            }
        }
        let client_id = MqttTransport::client_id();
        info!(
            "Connecting to {}:{} as {}",
            self.broker.host, self.broker.port, client_id
        );
        let mut options = MqttOptions::new(client_id, self.broker.host.clone(), self.broker.port);
        options.set_keep_alive(Duration::from_secs(self.broker.keep_alive_s));
        let (client, connection) = Client::new(options, REQUEST_QUEUE_CAP);

        self.halting = Arc::new(AtomicBool::new(false));
        self.dead = Arc::new(AtomicBool::new(false));
        let halting = Arc::clone(&self.halting);
        let dead = Arc::clone(&self.dead);
        let events = self.events.clone();
        let poller = thread::Builder::new()
            .name("mqtt-poll".to_string())
            .spawn(move || poll_connection(connection, events, halting, dead))
            .map_err(|e| BeaconError::ConnectError {
                reason: format!("could not spawn poller thread: {e}"),
            })?;

        self.client = Some(client);
        self.poller = Some(poller);
        Ok(())
    }

    fn publish(&mut self, topic: &str, payload: Vec<u8>) -> Result<(), BeaconError> {
        let Some(client) = self.client.as_ref() else {
            return Err(BeaconError::NotConnected);
        };
        client
            .try_publish(topic, QoS::AtLeastOnce, false, payload)
            .map_err(|e| BeaconError::PublishError {
                reason: e.to_string(),
            })
    }

    fn disconnect(&mut self) -> Result<(), BeaconError> {
        let Some(client) = self.client.take() else {
            return Err(BeaconError::NotConnected);
        };
        self.halting.store(true, Ordering::Relaxed);
        let result = client.disconnect().map_err(|e| BeaconError::DisconnectError {
            reason: e.to_string(),
        });
        if let Some(poller) = self.poller.take() {
            if poller.join().is_err() {
                warn!("MQTT poller thread panicked before shutdown");
            }
        }
        result
    }
}

fn poll_connection(
    mut connection: Connection,
    events: Sender<SessionEvent>,
    halting: Arc<AtomicBool>,
    dead: Arc<AtomicBool>,
) {
    let mut connected = false;
    for notification in connection.iter() {
        match notification {
            Ok(Event::Incoming(Packet::ConnAck(ack))) => {
                if ack.code == ConnectReturnCode::Success {
                    debug!("Broker accepted the connection");
                    connected = true;
                    let _ = events.send(SessionEvent::Transport(TransportEvent::Connected));
                } else {
                    // the flag must go up before the event so that a retry
                    // prompted by it finds the attempt reclaimable
                    dead.store(true, Ordering::Relaxed);
                    let _ = events.send(SessionEvent::Transport(TransportEvent::ConnectFailed {
                        reason: format!("broker refused the connection: {:?}", ack.code),
                    }));
                    break;
                }
            }
            Ok(event) => debug!("MQTT event: {:?}", event),
            Err(e) => {
                dead.store(true, Ordering::Relaxed);
                if halting.load(Ordering::Relaxed) {
                    debug!("MQTT poller winding down after disconnect: {e}");
                } else if connected {
                    let _ =
                        events.send(SessionEvent::Transport(TransportEvent::ConnectionLost {
                            reason: e.to_string(),
                        }));
                } else {
                    let _ = events.send(SessionEvent::Transport(TransportEvent::ConnectFailed {
                        reason: e.to_string(),
                    }));
                }
                // iterating past an error would reconnect
                break;
            }
        }
    }
    dead.store(true, Ordering::Relaxed);
    debug!("MQTT poller finished");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc::{self, Receiver};
    use std::time::Duration;

    // Port 1 on loopback has no listener, so attempts are refused at once.
    fn refusing_broker() -> BrokerConfig {
        BrokerConfig {
            host: "127.0.0.1".to_string(),
            port: 1,
            keep_alive_s: 5,
        }
    }

    fn expect_connect_failed(events: &Receiver<SessionEvent>) {
        let event = events
            .recv_timeout(Duration::from_secs(10))
            .expect("no transport event arrived");
        assert!(matches!(
            event,
            SessionEvent::Transport(TransportEvent::ConnectFailed { .. })
        ));
    }

    #[test]
    fn test_refused_attempt_reports_connect_failed() {
        let (events_tx, events_rx) = mpsc::channel();
        let mut transport = MqttTransport::new(refusing_broker(), events_tx);

        transport.connect().unwrap();
        expect_connect_failed(&events_rx);
    }

    #[test]
    fn test_failed_attempt_does_not_block_a_retry() {
        let (events_tx, events_rx) = mpsc::channel();
        let mut transport = MqttTransport::new(refusing_broker(), events_tx);

        transport.connect().unwrap();
        expect_connect_failed(&events_rx);

        // the dead attempt is reclaimed rather than treated as still live
        transport.connect().expect("retry refused");
        expect_connect_failed(&events_rx);
    }

    #[test]
    fn test_publish_without_a_connection_is_rejected() {
        let (events_tx, _events_rx) = mpsc::channel();
        let mut transport = MqttTransport::new(refusing_broker(), events_tx);

        let result = transport.publish("assignment/location", b"hello".to_vec());
        assert!(matches!(result, Err(BeaconError::NotConnected)));
    }
}
