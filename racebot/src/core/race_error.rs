use std::error::Error;
use std::fmt;

/// StartBlocker identifies the first unmet precondition that keeps a created race from
/// starting. The variants are checked in declaration order and the check short-circuits on the
/// first failing one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartBlocker {
    NoRacers,
    NoneReady,
    NotAllReady,
    SingleRacer,
    NoGoal,
    NoGame,
}

/// RaceError covers every recoverable failure of a race command. Each variant renders as the
/// chat reply sent back to the requesting actor; none of them is fatal to the process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RaceError {
    PermissionDenied { action: &'static str },
    AlreadyCreated,
    AlreadyStarted,
    StillRunning,
    NoRaceCreated,
    NoRaceRunning,
    NotStarted,
    CannotStart(StartBlocker),
    LeaveWhileRunning,
    AlreadyJoined,
    NotJoined,
    AlreadyReady,
    NotReadyYet,
    AlreadyQuit,
    AlreadyFinished,
    NeverQuit,
    NotFinished,
    MustFinishFirst,
}

impl fmt::Display for RaceError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            RaceError::PermissionDenied { action } => write!(
                f,
                "Only members with moderator permissions can {} races.",
                action
            ),
            RaceError::AlreadyCreated => write!(
                f,
                "Race already created, please end the current race to create a new one."
            ),
            RaceError::AlreadyStarted => write!(
                f,
                "Race already started, please end the current race to create a new one."
            ),
            RaceError::StillRunning => write!(
                f,
                "Race currently started, please end it before starting a new one."
            ),
            RaceError::NoRaceCreated => write!(f, "No race has been created!"),
            RaceError::NoRaceRunning => write!(f, "No race currently running!"),
            RaceError::NotStarted => write!(f, "No race has been started!"),
            RaceError::CannotStart(blocker) => match blocker {
                StartBlocker::NoRacers => write!(f, "There are no racers in the race!"),
                StartBlocker::NoneReady => write!(f, "There is no one ready in the race!"),
                StartBlocker::NotAllReady => write!(f, "Not everyone is ready yet!"),
                StartBlocker::SingleRacer => {
                    write!(f, "A race needs at least two racers to start!")
                }
                StartBlocker::NoGoal => write!(f, "Race goal is not set yet!"),
                StartBlocker::NoGame => write!(f, "Race game is not set yet!"),
            },
            RaceError::LeaveWhileRunning => write!(
                f,
                "You can't leave a race that is running. Please quit the race instead."
            ),
            RaceError::AlreadyJoined => write!(f, "You already joined the race!"),
            RaceError::NotJoined => write!(f, "You didn't join the race."),
            RaceError::AlreadyReady => write!(f, "You already set yourself as ready!"),
            RaceError::NotReadyYet => write!(f, "You did not set yourself as ready yet!"),
            RaceError::AlreadyQuit => write!(
                f,
                "You already quit the race. Please undone or unquit if you want to rejoin the \
                race."
            ),
            RaceError::AlreadyFinished => write!(
                f,
                "You have already completed the race. Please undone if you want to undo your \
                previous race completion."
            ),
            RaceError::NeverQuit => write!(f, "You never quit the race."),
            RaceError::NotFinished => write!(f, "You have not completed the race yet."),
            RaceError::MustFinishFirst => write!(
                f,
                "You didn't complete the race yet. Either done if you finished or quit if you \
                wish to forfeit before commenting."
            ),
        }
    }
}

impl Error for RaceError {}
