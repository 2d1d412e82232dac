// Console bridge: operator commands in, session feedback out

use std::io::{self, BufRead};
use std::sync::mpsc::{Receiver, Sender};

use log::debug;

use crate::session::{SessionCommand, SessionEvent, SessionUpdate};

/// One parsed operator command line.
#[derive(Clone, Debug, PartialEq)]
pub enum ConsoleCommand {
    /// Start publishing, optionally rebinding the identifier field first.
    Start(Option<String>),
    Stop,
    Quit,
    Help,
}

/// Parse one line of operator input. Identifiers are free-form, so everything
/// after the `start` verb is the identifier, spaces included. Unknown input
/// is `None`.
pub fn parse_line(line: &str) -> Option<ConsoleCommand> {
    let trimmed = line.trim();
    let (verb, rest) = match trimmed.split_once(char::is_whitespace) {
        Some((verb, rest)) => (verb, rest.trim_start()),
        None => (trimmed, ""),
    };
    let command = match verb {
        "start" => {
            if rest.is_empty() {
                ConsoleCommand::Start(None)
            } else {
                ConsoleCommand::Start(Some(rest.to_string()))
            }
        }
        "stop" => ConsoleCommand::Stop,
        "quit" | "exit" => ConsoleCommand::Quit,
        "help" => ConsoleCommand::Help,
        _ => return None,
    };
    Some(command)
}

/// Read operator commands from stdin and translate them into session events.
///
/// The identifier argument of `start` behaves like a text field: once set it
/// sticks, and a bare `start` reuses it. Returns the field's final value so
/// it can be remembered as the next run's prefill. Reaching end of input
/// counts as quitting.
pub fn run_input_loop(events: Sender<SessionEvent>, prefill: Option<String>) -> Option<String> {
    let mut identifier_field = prefill;
    print_usage();
    for line in io::stdin().lock().lines() {
        let Ok(line) = line else {
            break;
        };
        match parse_line(&line) {
            Some(ConsoleCommand::Start(explicit)) => {
                if let Some(identifier) = explicit {
                    identifier_field = Some(identifier);
                }
                let identifier = identifier_field.clone().unwrap_or_default();
                if events
                    .send(SessionEvent::Command(SessionCommand::Start { identifier }))
                    .is_err()
                {
                    break;
                }
            }
            Some(ConsoleCommand::Stop) => {
                if events
                    .send(SessionEvent::Command(SessionCommand::Stop))
                    .is_err()
                {
                    break;
                }
            }
            Some(ConsoleCommand::Quit) => {
                let _ = events.send(SessionEvent::Command(SessionCommand::Shutdown));
                return identifier_field;
            }
            Some(ConsoleCommand::Help) => print_usage(),
            None => {
                if !line.trim().is_empty() {
                    println!("Unknown command: {}", line.trim());
                    print_usage();
                }
            }
        }
    }
    // stdin closed without a quit command
    let _ = events.send(SessionEvent::Command(SessionCommand::Shutdown));
    identifier_field
}

/// Render session feedback as short operator-facing lines until the session
/// manager goes away.
pub fn render_updates(updates: Receiver<SessionUpdate>) {
    for update in updates {
        match update {
            SessionUpdate::Notice(notice) => println!("* {notice}"),
            SessionUpdate::Controls(controls) => {
                // no buttons to disable on a console; tracked for logs only
                debug!(
                    "Controls now start={} stop={}",
                    controls.start_enabled, controls.stop_enabled
                );
            }
        }
    }
}

fn print_usage() {
    println!("Commands: start [operator-id] | stop | quit | help");
}
