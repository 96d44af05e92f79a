use helpers::timefmt::trunc_to_secs;
use std::time::{Duration, SystemTime};

/// Phase is the lifecycle state of the single race session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Created,
    Started,
}

impl Default for Phase {
    fn default() -> Self {
        Phase::Idle
    }
}

/// RaceSession holds the lifecycle phase and the race-level metadata. At most one session
/// exists per process; the timestamps are set once per lifecycle pass and everything is cleared
/// on end.
#[derive(Debug, Default)]
pub struct RaceSession {
    pub phase: Phase,
    created_at: Option<SystemTime>,
    started_at: Option<SystemTime>,
    pub goal: Option<String>,
    pub game: Option<String>,
    pub results_printed: bool,
    output_file_id: Option<String>,
}

impl RaceSession {
    pub fn new() -> RaceSession {
        RaceSession::default()
    }

    /// create moves the session from Idle to Created and derives the result-file id from the
    /// creation time.
    pub fn create(&mut self, now: SystemTime) {
        self.phase = Phase::Created;
        self.created_at = Some(now);
        self.output_file_id = Some(format!("race_{}.txt", unix_secs(now)));
    }

    /// start moves the session from Created to Started and stamps the global start time.
    pub fn start(&mut self, started_at: SystemTime) {
        self.phase = Phase::Started;
        self.started_at = Some(started_at);
    }

    /// reset clears all fields and returns the session to Idle.
    pub fn reset(&mut self) {
        *self = RaceSession::default();
    }

    pub fn started_at(&self) -> Option<SystemTime> {
        self.started_at
    }

    /// output_file_id returns the name of the persisted result file for the current race. It is
    /// stable for the life of one race.
    pub fn output_file_id(&self) -> Option<&str> {
        self.output_file_id.as_deref()
    }

    /// running_time returns the elapsed time since the race start, truncated to whole seconds
    /// and clamped at zero.
    pub fn running_time(&self, now: SystemTime) -> Option<Duration> {
        let started_at = self.started_at?;
        Some(trunc_to_secs(
            now.duration_since(started_at).unwrap_or(Duration::ZERO),
        ))
    }
}

fn unix_secs(t: SystemTime) -> u64 {
    t.duration_since(SystemTime::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
