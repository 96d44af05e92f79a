use crate::core::race_error::RaceError;
use crate::core::session::Phase;
use crate::interfaces::host_interface::{Actor, ActorId};
use helpers::timefmt::trunc_to_secs;
use std::time::{Duration, SystemTime};

/// Outcome is the tri-state completion status of a racer. Finished durations are whole seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Running,
    Forfeited,
    Finished(Duration),
}

/// * `id` - Stable actor identity the entry is keyed by
/// * `display_name` - Name used when rendering without mentions
/// * `outcome` - Completion status, Running until the racer reports
/// * `ready` - Pre-start readiness, kept but meaningless once the race runs
/// * `personal_start` - Time the racer's own clock is measured from
/// * `comment` - Free-text note, settable once the outcome is terminal
#[derive(Debug, Clone)]
pub struct RacerEntry {
    pub id: ActorId,
    pub display_name: String,
    pub outcome: Outcome,
    pub ready: bool,
    pub personal_start: Option<SystemTime>,
    pub comment: String,
}

/// RacerRegistry holds one entry per joined participant, in join order. Every operation is
/// validated against the current session phase. The aggregate counters are maintained
/// incrementally and always equal the corresponding counts over the entries.
#[derive(Debug, Default)]
pub struct RacerRegistry {
    entries: Vec<RacerEntry>,
    num_racers: usize,
    num_ready: usize,
    num_finished: usize,
}

impl RacerRegistry {
    pub fn new() -> RacerRegistry {
        RacerRegistry::default()
    }

    pub fn entries(&self) -> &[RacerEntry] {
        &self.entries
    }

    pub fn get(&self, id: ActorId) -> Option<&RacerEntry> {
        self.entries.iter().find(|entry| entry.id == id)
    }

    pub fn num_racers(&self) -> usize {
        self.num_racers
    }

    pub fn num_ready(&self) -> usize {
        self.num_ready
    }

    pub fn num_finished(&self) -> usize {
        self.num_finished
    }

    /// all_finished checks if every racer has reached a terminal outcome (at least one racer
    /// must be present).
    pub fn all_finished(&self) -> bool {
        self.num_racers > 0 && self.num_finished == self.num_racers
    }

    /// clear removes all entries, used when the session ends.
    pub fn clear(&mut self) {
        *self = RacerRegistry::default();
    }

    /// join adds an entry for the actor. Racers joining a running race are implicitly ready and
    /// their personal clock starts at the join time instead of the global start time.
    pub fn join(&mut self, actor: &Actor, phase: Phase, now: SystemTime) -> Result<(), RaceError> {
        if phase == Phase::Idle {
            return Err(RaceError::NoRaceCreated);
        }
        if self.get(actor.id).is_some() {
            return Err(RaceError::AlreadyJoined);
        }

        let mid_race = phase == Phase::Started;
        self.entries.push(RacerEntry {
            id: actor.id,
            display_name: actor.display_name.to_owned(),
            outcome: Outcome::Running,
            ready: mid_race,
            personal_start: if mid_race { Some(now) } else { None },
            comment: String::new(),
        });
        self.num_racers += 1;
        if mid_race {
            self.num_ready += 1;
        }
        Ok(())
    }

    /// leave removes the actor's entry. Leaving is only possible before the race has started;
    /// a running race must be quit instead.
    pub fn leave(&mut self, id: ActorId, phase: Phase) -> Result<(), RaceError> {
        match phase {
            Phase::Idle => return Err(RaceError::NoRaceRunning),
            Phase::Started => return Err(RaceError::LeaveWhileRunning),
            Phase::Created => {}
        }
        let idx = self.idx(id).ok_or(RaceError::NotJoined)?;

        let entry = self.entries.remove(idx);
        self.num_racers -= 1;
        if entry.ready {
            self.num_ready -= 1;
        }
        Ok(())
    }

    pub fn set_ready(&mut self, id: ActorId, phase: Phase) -> Result<(), RaceError> {
        if phase != Phase::Created {
            return Err(RaceError::NoRaceCreated);
        }
        let entry = self.entry_mut(id)?;
        if entry.ready {
            return Err(RaceError::AlreadyReady);
        }

        entry.ready = true;
        self.num_ready += 1;
        Ok(())
    }

    pub fn unset_ready(&mut self, id: ActorId, phase: Phase) -> Result<(), RaceError> {
        if phase != Phase::Created {
            return Err(RaceError::NoRaceCreated);
        }
        let entry = self.entry_mut(id)?;
        if !entry.ready {
            return Err(RaceError::NotReadyYet);
        }

        entry.ready = false;
        self.num_ready -= 1;
        Ok(())
    }

    /// quit forfeits a running racer. Forfeiting counts as completing the race.
    pub fn quit(&mut self, id: ActorId, phase: Phase) -> Result<(), RaceError> {
        if phase != Phase::Started {
            return Err(RaceError::NoRaceRunning);
        }
        let entry = self.entry_mut(id)?;
        match entry.outcome {
            Outcome::Running => {
                entry.outcome = Outcome::Forfeited;
                entry.comment = String::new();
                self.num_finished += 1;
                Ok(())
            }
            Outcome::Forfeited => Err(RaceError::AlreadyQuit),
            Outcome::Finished(_) => Err(RaceError::AlreadyFinished),
        }
    }

    /// unquit puts a forfeited racer back into the race.
    pub fn unquit(&mut self, id: ActorId, phase: Phase) -> Result<(), RaceError> {
        if phase != Phase::Started {
            return Err(RaceError::NoRaceRunning);
        }
        let entry = self.entry_mut(id)?;
        match entry.outcome {
            Outcome::Running => Err(RaceError::NotFinished),
            Outcome::Finished(_) => Err(RaceError::NeverQuit),
            Outcome::Forfeited => {
                entry.outcome = Outcome::Running;
                self.num_finished -= 1;
                Ok(())
            }
        }
    }

    /// finish records a running racer's completion and returns the time taken, measured from
    /// the racer's personal start, truncated to whole seconds and clamped at zero.
    pub fn finish(
        &mut self,
        id: ActorId,
        phase: Phase,
        now: SystemTime,
    ) -> Result<Duration, RaceError> {
        if phase != Phase::Started {
            return Err(RaceError::NoRaceRunning);
        }
        let entry = self.entry_mut(id)?;
        match entry.outcome {
            Outcome::Running => {
                let personal_start = entry
                    .personal_start
                    .expect("Racer has no personal start time after the race start!");
                let time_taken = trunc_to_secs(
                    now.duration_since(personal_start).unwrap_or(Duration::ZERO),
                );

                entry.outcome = Outcome::Finished(time_taken);
                entry.comment = String::new();
                self.num_finished += 1;
                Ok(time_taken)
            }
            Outcome::Forfeited => Err(RaceError::AlreadyQuit),
            Outcome::Finished(_) => Err(RaceError::AlreadyFinished),
        }
    }

    /// unfinish resets any terminal outcome back to Running. This also covers forfeits, so it
    /// subsumes unquit.
    pub fn unfinish(&mut self, id: ActorId, phase: Phase) -> Result<(), RaceError> {
        if phase != Phase::Started {
            return Err(RaceError::NoRaceRunning);
        }
        let entry = self.entry_mut(id)?;
        if let Outcome::Running = entry.outcome {
            return Err(RaceError::NotFinished);
        }

        entry.outcome = Outcome::Running;
        self.num_finished -= 1;
        Ok(())
    }

    /// set_comment attaches a comment to a racer who has finished or forfeited.
    pub fn set_comment(
        &mut self,
        id: ActorId,
        phase: Phase,
        comment: &str,
    ) -> Result<(), RaceError> {
        if phase != Phase::Started {
            return Err(RaceError::NoRaceRunning);
        }
        let entry = self.entry_mut(id)?;
        if let Outcome::Running = entry.outcome {
            return Err(RaceError::MustFinishFirst);
        }

        entry.comment = comment.to_owned();
        Ok(())
    }

    /// begin_race stamps every present racer's personal start with the global start time and
    /// resets the completion counter for the new race.
    pub fn begin_race(&mut self, started_at: SystemTime) {
        for entry in self.entries.iter_mut() {
            entry.personal_start = Some(started_at);
        }
        self.num_finished = 0;
    }

    fn idx(&self, id: ActorId) -> Option<usize> {
        self.entries.iter().position(|entry| entry.id == id)
    }

    fn entry_mut(&mut self, id: ActorId) -> Result<&mut RacerEntry, RaceError> {
        let idx = self.idx(id).ok_or(RaceError::NotJoined)?;
        Ok(&mut self.entries[idx])
    }
}
