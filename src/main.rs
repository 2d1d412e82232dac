use std::{path::PathBuf, sync::mpsc, thread};

use clap::{Parser, Subcommand};
use log::warn;

use geobeacon::config::AppConfig;
use geobeacon::console;
use geobeacon::errors::BeaconError;
use geobeacon::fix::{FixProducer, ReplayFixProducer, SimulatedFixProducer};
use geobeacon::journal::{self, FixRecord};
use geobeacon::permission::StaticPermissionGate;
use geobeacon::session::{SessionCommand, SessionEvent, SessionManager};
use geobeacon::transport::MqttTransport;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
struct Args {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    Run {
        #[arg(short, long)]
        id: Option<String>,

        #[arg(long)]
        broker_host: Option<String>,

        #[arg(long)]
        broker_port: Option<u16>,

        #[arg(short, long)]
        track: Option<PathBuf>,

        #[arg(short, long)]
        journal: Option<PathBuf>,
    },
    Inspect {
        #[arg(short, long)]
        input: PathBuf,
    },
}

fn run(
    id: Option<String>,
    broker_host: Option<String>,
    broker_port: Option<u16>,
    track: Option<PathBuf>,
    journal_file: Option<PathBuf>,
) -> Result<(), BeaconError> {
    let mut config = AppConfig::from_local_file().unwrap_or_default();
    if let Some(host) = broker_host {
        config.broker.host = host;
    }
    if let Some(port) = broker_port {
        config.broker.port = port;
    }
    if let Some(id) = id {
        config.operator_id = Some(id);
    }

    let (events_tx, events_rx) = mpsc::channel();
    let (updates_tx, updates_rx) = mpsc::channel();

    // Ctrl-C winds the session down through the regular queue, so a live
    // broker connection still disconnects and the journal still flushes
    let ctrlc_events = events_tx.clone();
    ctrlc::set_handler(move || {
        println!("Exiting...");
        let _ = ctrlc_events.send(SessionEvent::Command(SessionCommand::Shutdown));
    })
    .expect("Could not set Ctrl-C handler");

    let transport = MqttTransport::new(config.broker.clone(), events_tx.clone());
    let producer: Box<dyn FixProducer> = match &track {
        Some(track_file) => Box::new(ReplayFixProducer::from_file(track_file)?),
        None => Box::new(SimulatedFixProducer::default()),
    };
    let permissions = StaticPermissionGate::new(config.allow_location);

    let mut manager = SessionManager::new(
        Box::new(transport),
        producer,
        Box::new(permissions),
        events_tx.clone(),
        updates_tx,
    );

    // the journal gets its own channel and thread so publishing never waits
    // on disk
    let mut journal_thread = None;
    if let Some(journal_file) = journal_file {
        let (journal_tx, journal_rx) = mpsc::channel::<FixRecord>();
        manager = manager.with_journal(journal_tx);
        journal_thread = Some(thread::spawn(move || {
            if let Err(e) = journal::write_track(&journal_file, journal_rx) {
                warn!("Track journal stopped: {e}");
            }
        }));
    }

    let session = thread::spawn(move || manager.run(events_rx));

    let prefill = config.operator_id.clone();
    let console_events = events_tx;
    let input = thread::spawn(move || console::run_input_loop(console_events, prefill));

    console::render_updates(updates_rx);

    // updates closing means the manager is done; dropping it closed the
    // journal channel, so the writer flushes its tail and returns
    if session.join().is_err() {
        warn!("Session manager thread panicked");
    }
    if let Some(journal_thread) = journal_thread {
        if journal_thread.join().is_err() {
            warn!("Track journal thread panicked");
        }
    }

    // remember the identifier the operator last used as the next prefill;
    // after a Ctrl-C the input thread is still parked on stdin, so only a
    // clean quit gets to save it
    if input.is_finished() {
        if let Ok(last_identifier) = input.join() {
            if last_identifier.is_some() && last_identifier != config.operator_id {
                config.operator_id = last_identifier;
                if let Err(e) = config.save() {
                    warn!("Could not save config: {e}");
                }
            }
        }
    }
    Ok(())
}

fn inspect(input: &PathBuf) -> Result<(), BeaconError> {
    if !input.exists() {
        return Err(BeaconError::InvalidTrackFile {
            path: format!("{:?}", input),
        });
    }
    let records = journal::read_track(input)?;
    let Some((first, last)) = records.first().zip(records.last()) else {
        println!("Track {:?} is empty", input);
        return Ok(());
    };
    let span_ms = last.unix_ms.saturating_sub(first.unix_ms);
    let mut min_lat = first.latitude;
    let mut max_lat = first.latitude;
    let mut min_lon = first.longitude;
    let mut max_lon = first.longitude;
    for record in &records {
        min_lat = min_lat.min(record.latitude);
        max_lat = max_lat.max(record.latitude);
        min_lon = min_lon.min(record.longitude);
        max_lon = max_lon.max(record.longitude);
    }
    println!("Track {:?}", input);
    println!("  fixes: {}", records.len());
    println!("  span: {:.1} s", span_ms as f64 / 1000.0);
    println!("  latitude: {} to {}", min_lat, max_lat);
    println!("  longitude: {} to {}", min_lon, max_lon);
    Ok(())
}

fn main() {
    #[cfg(debug_assertions)]
    colog::init();

    let cli = Args::parse();
    match &cli.command {
        Commands::Run {
            id,
            broker_host,
            broker_port,
            track,
            journal,
        } => run(
            id.clone(),
            broker_host.clone(),
            *broker_port,
            track.clone(),
            journal.clone(),
        )
        .expect("Error while running the location publisher"),
        Commands::Inspect { input } => {
            inspect(input).expect("Error while inspecting track file");
        }
    };
}
