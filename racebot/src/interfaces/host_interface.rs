use std::time::SystemTime;

/// Countdown steps sent during the race start (the go signal follows after one more pause).
pub const COUNTDOWN_STEPS: [&str; 5] = ["5", "4", "3", "2", "1"];

/// Number of pauses between the start announcement and the go signal.
pub const COUNTDOWN_PAUSES: u32 = 6;

/// ActorId is the stable opaque identity of a chat participant as assigned by the host
/// platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ActorId(pub u64);

impl ActorId {
    /// mention returns the addressable mention string for the actor.
    pub fn mention(&self) -> String {
        format!("<@{}>", self.0)
    }
}

/// * `id` - Stable opaque actor identity
/// * `display_name` - Human-readable name, may carry a #discriminator suffix
/// * `is_moderator` - Capability flag resolved by the host, trusted as given
#[derive(Debug, Clone)]
pub struct Actor {
    pub id: ActorId,
    pub display_name: String,
    pub is_moderator: bool,
}

/// Command is an already-parsed race action requested by an actor. Payload-carrying variants
/// hold the remainder of the chat message verbatim.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Create,
    Start,
    End,
    SetGoal(String),
    SetGame(String),
    Goal,
    Game,
    Join,
    Leave,
    Ready,
    Unready,
    Quit,
    Unquit,
    Finish,
    Unfinish,
    Comment(String),
    Time,
    Entrants,
    Results,
}

/// Intent is one validated request delivered by the host collaborator. The capability flag and
/// the clock reading are trusted as given.
#[derive(Debug, Clone)]
pub struct Intent {
    pub actor: Actor,
    pub command: Command,
    pub now: SystemTime,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Info,
    Error,
}

/// Event is one outcome returned to the host, either a text line to deliver or a request to
/// persist a result file.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Text { kind: EventKind, body: String },
    WriteFile { file_name: String, content: String },
}

impl Event {
    /// info wraps a body as an informational text event.
    pub fn info(body: String) -> Event {
        Event::Text {
            kind: EventKind::Info,
            body,
        }
    }

    /// error wraps a body as an error text event.
    pub fn error(body: String) -> Event {
        Event::Text {
            kind: EventKind::Error,
            body,
        }
    }
}
