// Integration tests for the publishing session lifecycle
//
// These run the session manager on its own thread, exactly like the binary
// does, and drive it through the same event queue the console bridge and the
// transport feed:
// 1. Start a session and watch it come up
// 2. Publish fixes end to end with the exact subscriber payload
// 3. Stop and verify teardown
// 4. Exercise the failure paths an operator can hit

use std::sync::atomic::Ordering;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;
use std::time::{Duration, Instant};

use geobeacon::fix::{MockFixProducer, PositionFix};
use geobeacon::permission::{ScriptedPermissionGate, StaticPermissionGate};
use geobeacon::session::{
    ControlsState, SessionCommand, SessionEvent, SessionManager, SessionNotice, SessionUpdate,
};
use geobeacon::transport::{ConnectScript, MockTransport};

const UPDATE_TIMEOUT: Duration = Duration::from_secs(2);

/// Helper to wait for the next notice, skipping controls updates
fn next_notice(updates: &Receiver<SessionUpdate>) -> SessionNotice {
    loop {
        match updates.recv_timeout(UPDATE_TIMEOUT) {
            Ok(SessionUpdate::Notice(notice)) => return notice,
            Ok(SessionUpdate::Controls(_)) => continue,
            Err(e) => panic!("no notice arrived: {e}"),
        }
    }
}

/// Helper to wait for the next controls update, skipping notices
fn next_controls(updates: &Receiver<SessionUpdate>) -> ControlsState {
    loop {
        match updates.recv_timeout(UPDATE_TIMEOUT) {
            Ok(SessionUpdate::Controls(controls)) => return controls,
            Ok(SessionUpdate::Notice(_)) => continue,
            Err(e) => panic!("no controls update arrived: {e}"),
        }
    }
}

/// Helper to poll a shared condition until it holds or the timeout expires
fn wait_for(mut condition: impl FnMut() -> bool) {
    let deadline = Instant::now() + UPDATE_TIMEOUT;
    while Instant::now() < deadline {
        if condition() {
            return;
        }
        thread::sleep(Duration::from_millis(5));
    }
    panic!("condition not met in time");
}

fn send_command(events: &Sender<SessionEvent>, command: SessionCommand) {
    events
        .send(SessionEvent::Command(command))
        .expect("session queue closed");
}

#[test]
fn test_full_session_lifecycle() {
    let (events_tx, events_rx) = mpsc::channel();
    let (updates_tx, updates_rx) = mpsc::channel();

    let transport = MockTransport::new(events_tx.clone());
    let published = transport.published();
    let disconnects = transport.disconnect_count();
    let producer = MockFixProducer::with_script(vec![PositionFix {
        latitude: 18.0179,
        longitude: -76.8099,
    }]);
    let manager = SessionManager::new(
        Box::new(transport),
        Box::new(producer),
        Box::new(StaticPermissionGate::new(true)),
        events_tx.clone(),
        updates_tx,
    );
    let session = thread::spawn(move || manager.run(events_rx));

    // the manager announces its initial controls state on startup
    let controls = next_controls(&updates_rx);
    assert!(controls.start_enabled);
    assert!(!controls.stop_enabled);

    send_command(
        &events_tx,
        SessionCommand::Start {
            identifier: "42".to_string(),
        },
    );
    assert_eq!(next_notice(&updates_rx), SessionNotice::Started);
    let controls = next_controls(&updates_rx);
    assert!(!controls.start_enabled);
    assert!(controls.stop_enabled);

    // the scripted fix goes out with the exact subscriber payload
    wait_for(|| published.lock().unwrap().len() == 1);
    {
        let published = published.lock().unwrap();
        assert_eq!(published[0].0, "assignment/location");
        assert_eq!(
            String::from_utf8(published[0].1.clone()).unwrap(),
            "Student ID: 42, Latitude: 18.0179, Longitude: -76.8099"
        );
    }

    send_command(&events_tx, SessionCommand::Stop);
    assert_eq!(next_notice(&updates_rx), SessionNotice::Stopped);
    let controls = next_controls(&updates_rx);
    assert!(controls.start_enabled);
    assert!(!controls.stop_enabled);
    assert_eq!(disconnects.load(Ordering::Relaxed), 1);

    send_command(&events_tx, SessionCommand::Shutdown);
    session.join().expect("session thread panicked");
}

#[test]
fn test_connect_failure_reports_and_allows_retry() {
    let (events_tx, events_rx) = mpsc::channel();
    let (updates_tx, updates_rx) = mpsc::channel();

    // first attempt is refused, the second one goes through
    let transport = MockTransport::new(events_tx.clone())
        .script_connect(ConnectScript::Reject("connection refused".to_string()));
    let connects = transport.connect_count();
    let manager = SessionManager::new(
        Box::new(transport),
        Box::new(MockFixProducer::new()),
        Box::new(StaticPermissionGate::new(true)),
        events_tx.clone(),
        updates_tx,
    );
    let session = thread::spawn(move || manager.run(events_rx));

    send_command(
        &events_tx,
        SessionCommand::Start {
            identifier: "42".to_string(),
        },
    );
    assert_eq!(
        next_notice(&updates_rx),
        SessionNotice::ConnectionFailed("connection refused".to_string())
    );

    send_command(
        &events_tx,
        SessionCommand::Start {
            identifier: "42".to_string(),
        },
    );
    assert_eq!(next_notice(&updates_rx), SessionNotice::Started);
    assert_eq!(connects.load(Ordering::Relaxed), 2);

    send_command(&events_tx, SessionCommand::Shutdown);
    session.join().expect("session thread panicked");
}

#[test]
fn test_denied_permission_blocks_the_session() {
    let (events_tx, events_rx) = mpsc::channel();
    let (updates_tx, updates_rx) = mpsc::channel();

    let transport = MockTransport::new(events_tx.clone());
    let connects = transport.connect_count();
    let gate = ScriptedPermissionGate::new(false, false);
    let requests = gate.request_count();
    let manager = SessionManager::new(
        Box::new(transport),
        Box::new(MockFixProducer::new()),
        Box::new(gate),
        events_tx.clone(),
        updates_tx,
    );
    let session = thread::spawn(move || manager.run(events_rx));

    send_command(
        &events_tx,
        SessionCommand::Start {
            identifier: "42".to_string(),
        },
    );
    assert_eq!(next_notice(&updates_rx), SessionNotice::PermissionRequired);
    assert_eq!(next_notice(&updates_rx), SessionNotice::PermissionDenied);
    assert_eq!(requests.load(Ordering::Relaxed), 1);
    assert_eq!(connects.load(Ordering::Relaxed), 0);

    send_command(&events_tx, SessionCommand::Shutdown);
    session.join().expect("session thread panicked");
}

#[test]
fn test_empty_identifier_is_rejected_up_front() {
    let (events_tx, events_rx) = mpsc::channel();
    let (updates_tx, updates_rx) = mpsc::channel();

    let transport = MockTransport::new(events_tx.clone());
    let connects = transport.connect_count();
    let manager = SessionManager::new(
        Box::new(transport),
        Box::new(MockFixProducer::new()),
        Box::new(StaticPermissionGate::new(true)),
        events_tx.clone(),
        updates_tx,
    );
    let session = thread::spawn(move || manager.run(events_rx));

    send_command(
        &events_tx,
        SessionCommand::Start {
            identifier: String::new(),
        },
    );
    assert_eq!(next_notice(&updates_rx), SessionNotice::EmptyIdentifier);
    assert_eq!(connects.load(Ordering::Relaxed), 0);

    send_command(&events_tx, SessionCommand::Shutdown);
    session.join().expect("session thread panicked");
}

#[test]
fn test_connection_loss_surfaces_to_the_operator() {
    let (events_tx, events_rx) = mpsc::channel();
    let (updates_tx, updates_rx) = mpsc::channel();

    let transport = MockTransport::new(events_tx.clone());
    let connects = transport.connect_count();
    let manager = SessionManager::new(
        Box::new(transport),
        Box::new(MockFixProducer::new()),
        Box::new(StaticPermissionGate::new(true)),
        events_tx.clone(),
        updates_tx,
    );
    let session = thread::spawn(move || manager.run(events_rx));

    send_command(
        &events_tx,
        SessionCommand::Start {
            identifier: "42".to_string(),
        },
    );
    assert_eq!(next_notice(&updates_rx), SessionNotice::Started);

    // the poller reports the drop through the same queue everything else uses
    events_tx
        .send(SessionEvent::Transport(
            geobeacon::transport::TransportEvent::ConnectionLost {
                reason: "broken pipe".to_string(),
            },
        ))
        .expect("session queue closed");
    assert_eq!(
        next_notice(&updates_rx),
        SessionNotice::ConnectionLost("broken pipe".to_string())
    );

    // no automatic reconnect happened, and a plain stop still works
    assert_eq!(connects.load(Ordering::Relaxed), 1);
    send_command(&events_tx, SessionCommand::Stop);
    assert_eq!(next_notice(&updates_rx), SessionNotice::Stopped);

    send_command(&events_tx, SessionCommand::Shutdown);
    session.join().expect("session thread panicked");
}
