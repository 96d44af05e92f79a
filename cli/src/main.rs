use clap::Clap;
use flume::{Receiver, Sender};
use helpers::general::trim_discriminator;
use racebot::core::controller::RaceController;
use racebot::interfaces::host_interface::{Actor, ActorId, Command, Event, EventKind, Intent};
use racebot::pre::bot_opts::BotOpts;
use racebot::pre::check_bot_pars::check_bot_pars;
use racebot::pre::read_bot_pars::{read_bot_pars, BotPars};
use std::collections::HashMap;
use std::fs;
use std::io::{self, BufRead};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, SystemTime};

fn main() -> anyhow::Result<()> {
    // PRE-PROCESSING ------------------------------------------------------------------------------
    // get bot options from the command line arguments and read the bot parameters
    let bot_opts: BotOpts = BotOpts::parse();
    let bot_pars = read_bot_pars(bot_opts.parfile_path.as_path())?;

    // check bot parameters
    check_bot_pars(&bot_pars)?;

    println!(
        "INFO: Listening for race commands with prefix {} ({} moderators configured)",
        bot_pars.command_prefix,
        bot_pars.moderators.len()
    );

    // EXECUTION -----------------------------------------------------------------------------------
    // create channels for the chat -> dispatch and dispatch -> renderer streams
    let (tx_intent, rx_intent) = flume::unbounded();
    let (tx_event, rx_event) = flume::unbounded();

    // renderer thread: prints events and performs the fire-and-forget result-file writes
    let results_dir = PathBuf::from(&bot_pars.results_dir);
    let _ = thread::spawn(move || render_events(&rx_event, &results_dir));

    // chat reader thread: parses console lines into intents
    let bot_pars_thread = bot_pars.clone();
    let tx_event_reader = tx_event.clone();
    let _ = thread::spawn(move || {
        read_chat_lines(&bot_pars_thread, &tx_intent, &tx_event_reader)
    });

    // dispatch loop: one intent is processed to completion before the next one is taken, which
    // also keeps the start countdown free of interleaved commands
    let mut controller = RaceController::new(Duration::from_secs_f64(bot_pars.countdown_pause));

    for intent in rx_intent.iter() {
        if bot_opts.debug {
            println!("DEBUG: Dispatching {:?}", intent);
        }
        controller.handle(&intent, &tx_event)?;
    }

    Ok(())
}

/// render_events prints incoming events to the console and writes requested result files. A
/// failed file write is reported as a warning and never interrupts the event stream.
fn render_events(rx_event: &Receiver<Event>, results_dir: &Path) {
    for event in rx_event.iter() {
        match event {
            Event::Text { kind, body } => match kind {
                EventKind::Info => println!("{}", body),
                EventKind::Error => println!("ERROR: {}", body),
            },
            Event::WriteFile { file_name, content } => {
                let filepath = results_dir.join(&file_name);
                if let Err(err) = fs::write(&filepath, &content) {
                    println!(
                        "WARNING: Failed to write result file {}: {}",
                        filepath.display(),
                        err
                    );
                }
            }
        }
    }
}

/// read_chat_lines reads `<user>: <prefix><command> [args]` lines from stdin and delivers the
/// parsed intents. Lines without the command prefix and unknown commands are ignored.
fn read_chat_lines(bot_pars: &BotPars, tx_intent: &Sender<Intent>, tx_event: &Sender<Event>) {
    let mut directory = ActorDirectory::new(&bot_pars.moderators);
    let stdin = io::stdin();

    for line in stdin.lock().lines() {
        let line = match line {
            Ok(line) => line,
            Err(_) => break,
        };

        let (name, message) = match split_chat_line(&line) {
            Some(parts) => parts,
            None => continue,
        };
        let text = match message.strip_prefix(bot_pars.command_prefix.as_str()) {
            Some(text) => text,
            None => continue,
        };

        match parse_command(text) {
            Parsed::Command(command) => {
                let intent = Intent {
                    actor: directory.resolve(name),
                    command,
                    now: SystemTime::now(),
                };
                if tx_intent.send(intent).is_err() {
                    break;
                }
            }
            Parsed::MissingArgument => {
                let reply =
                    Event::error("Missing required argument for command.".to_owned());
                if tx_event.send(reply).is_err() {
                    break;
                }
            }
            Parsed::Unknown => {}
        }
    }
}

/// ActorDirectory assigns a stable opaque id to every display name seen on the console and
/// resolves the moderator capability from the bot parameters.
struct ActorDirectory {
    ids: HashMap<String, u64>,
    moderators: Vec<String>,
}

impl ActorDirectory {
    fn new(moderators: &[String]) -> ActorDirectory {
        ActorDirectory {
            ids: HashMap::new(),
            moderators: moderators.to_vec(),
        }
    }

    fn resolve(&mut self, display_name: &str) -> Actor {
        let next_id = self.ids.len() as u64 + 1;
        let id = *self.ids.entry(display_name.to_owned()).or_insert(next_id);

        Actor {
            id: ActorId(id),
            display_name: display_name.to_owned(),
            is_moderator: self
                .moderators
                .iter()
                .any(|moderator| moderator == trim_discriminator(display_name)),
        }
    }
}

enum Parsed {
    Command(Command),
    MissingArgument,
    Unknown,
}

/// split_chat_line splits a console line into the speaking user and the message part.
fn split_chat_line(line: &str) -> Option<(&str, &str)> {
    let (name, message) = line.split_once(':')?;
    let name = name.trim();
    let message = message.trim();

    if name.is_empty() || message.is_empty() {
        return None;
    }
    Some((name, message))
}

/// parse_command maps a prefix-stripped message onto a race command. Commands carrying an
/// argument take the rest of the message verbatim.
fn parse_command(text: &str) -> Parsed {
    let mut parts = text.splitn(2, char::is_whitespace);
    let keyword = parts.next().unwrap_or("");
    let arg = parts.next().map(str::trim).unwrap_or("");

    match keyword {
        "createrace" => Parsed::Command(Command::Create),
        "startrace" => Parsed::Command(Command::Start),
        "endrace" => Parsed::Command(Command::End),
        "setgoal" => parse_arg(arg, Command::SetGoal),
        "setgame" => parse_arg(arg, Command::SetGame),
        "goal" => Parsed::Command(Command::Goal),
        "game" => Parsed::Command(Command::Game),
        "join" => Parsed::Command(Command::Join),
        "unjoin" => Parsed::Command(Command::Leave),
        "ready" => Parsed::Command(Command::Ready),
        "unready" => Parsed::Command(Command::Unready),
        "quit" => Parsed::Command(Command::Quit),
        "unquit" => Parsed::Command(Command::Unquit),
        "done" => Parsed::Command(Command::Finish),
        "undone" => Parsed::Command(Command::Unfinish),
        "comment" => parse_arg(arg, Command::Comment),
        "time" => Parsed::Command(Command::Time),
        "entrants" => Parsed::Command(Command::Entrants),
        "results" => Parsed::Command(Command::Results),
        _ => Parsed::Unknown,
    }
}

fn parse_arg(arg: &str, build: fn(String) -> Command) -> Parsed {
    if arg.is_empty() {
        Parsed::MissingArgument
    } else {
        Parsed::Command(build(arg.to_owned()))
    }
}
