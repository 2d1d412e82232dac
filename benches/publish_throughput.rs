use criterion::{Criterion, black_box, criterion_group, criterion_main};
use geobeacon::fix::{MockFixProducer, PositionFix};
use geobeacon::permission::StaticPermissionGate;
use geobeacon::session::{
    OutgoingMessage, SessionCommand, SessionEvent, SessionManager, SessionUpdate,
};
use geobeacon::transport::MockTransport;
use std::sync::mpsc::{self, Receiver};
use std::time::Duration;

fn sample_fix(point_no: usize) -> PositionFix {
    PositionFix {
        latitude: 18.0179 + (point_no as f64) * 1e-6,
        longitude: -76.8099 - (point_no as f64) * 1e-6,
    }
}

/// Build an active session around the mock transport, draining the start
/// handshake so only fix handling is measured.
fn active_manager() -> (
    SessionManager,
    Receiver<SessionEvent>,
    Receiver<SessionUpdate>,
) {
    let (events_tx, events_rx) = mpsc::channel();
    let (updates_tx, updates_rx) = mpsc::channel();
    let transport = MockTransport::new(events_tx.clone());
    let mut manager = SessionManager::new(
        Box::new(transport),
        Box::new(MockFixProducer::new()),
        Box::new(StaticPermissionGate::new(true)),
        events_tx,
        updates_tx,
    );
    manager.handle_event(SessionEvent::Command(SessionCommand::Start {
        identifier: "42".to_string(),
    }));
    while let Ok(event) = events_rx.try_recv() {
        manager.handle_event(event);
    }
    while updates_rx.try_recv().is_ok() {}
    (manager, events_rx, updates_rx)
}

fn bench_message_formatting(c: &mut Criterion) {
    let mut group = c.benchmark_group("message_formatting");

    let fix = sample_fix(0);
    group.bench_function("format_location_message", |b| {
        b.iter(|| black_box(OutgoingMessage::new(black_box("42"), black_box(&fix))));
    });

    group.bench_function("format_and_encode_payload", |b| {
        b.iter(|| black_box(OutgoingMessage::new("42", &fix).into_payload()));
    });

    group.finish();
}

fn bench_session_processing(c: &mut Criterion) {
    let mut group = c.benchmark_group("session_processing");

    group.bench_function("publish_single_fix", |b| {
        let (mut manager, _events_rx, _updates_rx) = active_manager();
        b.iter(|| {
            manager.handle_event(SessionEvent::Fix(black_box(sample_fix(0))));
        });
    });

    group.bench_function("publish_1000_fixes", |b| {
        b.iter(|| {
            let (mut manager, _events_rx, _updates_rx) = active_manager();
            for point_no in 0..1000 {
                manager.handle_event(SessionEvent::Fix(sample_fix(point_no)));
            }
        });
    });

    group.finish();
}

criterion_group! {
    name = benches;
    config = Criterion::default()
        .measurement_time(Duration::from_secs(10))
        .sample_size(100);
    targets = bench_message_formatting, bench_session_processing
}
criterion_main!(benches);
