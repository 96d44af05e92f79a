use crate::core::race_error::{RaceError, StartBlocker};
use crate::core::registry::RacerRegistry;
use crate::core::session::{Phase, RaceSession};
use crate::interfaces::host_interface::{
    Actor, Command, Event, Intent, COUNTDOWN_PAUSES, COUNTDOWN_STEPS,
};
use crate::post::race_report::RaceReport;
use anyhow::Context;
use flume::Sender;
use helpers::general::trim_discriminator;
use helpers::timefmt::format_hms;
use std::fmt::Write;
use std::thread::sleep;
use std::time::{Duration, SystemTime};

/// RaceController owns the single race session and its racer registry, and is the only
/// component that mutates them. One intent is processed to completion before the next; the
/// start countdown runs inside handle, so no other command can interleave with it.
#[derive(Debug)]
pub struct RaceController {
    session: RaceSession,
    registry: RacerRegistry,
    countdown_pause: Duration,
}

impl RaceController {
    pub fn new(countdown_pause: Duration) -> RaceController {
        RaceController {
            session: RaceSession::new(),
            registry: RacerRegistry::new(),
            countdown_pause,
        }
    }

    /// handle validates the intent against the current phase, applies it, and sends the
    /// resulting events. Race-level failures are sent back as error events; only a broken
    /// event channel is a hard error.
    pub fn handle(&mut self, intent: &Intent, tx: &Sender<Event>) -> anyhow::Result<()> {
        // the countdown interleaves sends and pauses, so start bypasses the collect-then-send
        // path of every other command
        if intent.command == Command::Start {
            return self.start(intent, tx);
        }

        let events = match self.dispatch(intent) {
            Ok(events) => events,
            Err(err) => vec![Event::error(err.to_string())],
        };
        send_all(tx, events)
    }

    /// reset clears the session and the registry, returning the controller to the idle state.
    pub fn reset(&mut self) {
        self.session.reset();
        self.registry.clear();
    }

    fn dispatch(&mut self, intent: &Intent) -> Result<Vec<Event>, RaceError> {
        let actor = &intent.actor;
        match &intent.command {
            Command::Create => self.create(actor, intent.now),
            Command::End => self.end(actor),
            Command::SetGoal(goal) => self.set_goal(actor, goal),
            Command::SetGame(game) => self.set_game(actor, game),
            Command::Goal => self.goal(),
            Command::Game => self.game(),
            Command::Join => self.join(actor, intent.now),
            Command::Leave => self.leave(actor),
            Command::Ready => self.ready(actor),
            Command::Unready => self.unready(actor),
            Command::Quit => self.quit(actor),
            Command::Unquit => self.unquit(actor),
            Command::Finish => self.finish(actor, intent.now),
            Command::Unfinish => self.unfinish(actor),
            Command::Comment(comment) => self.comment(actor, comment),
            Command::Time => self.time(intent.now),
            Command::Entrants => self.entrants(),
            Command::Results => self.results(),
            Command::Start => unreachable!("start is handled before dispatching"),
        }
    }

    // ---------------------------------------------------------------------------------------------
    // LIFECYCLE COMMANDS (MODERATOR) --------------------------------------------------------------
    // ---------------------------------------------------------------------------------------------

    fn create(&mut self, actor: &Actor, now: SystemTime) -> Result<Vec<Event>, RaceError> {
        require_moderator(actor, "create")?;
        match self.session.phase {
            Phase::Created => Err(RaceError::AlreadyCreated),
            Phase::Started => Err(RaceError::AlreadyStarted),
            Phase::Idle => {
                self.session.create(now);
                Ok(vec![Event::info("Creating race.".to_owned())])
            }
        }
    }

    /// start runs the countdown and moves the race into the running phase. The whole sequence
    /// holds the exclusive borrow on the controller, which is the start-in-progress guard.
    fn start(&mut self, intent: &Intent, tx: &Sender<Event>) -> anyhow::Result<()> {
        if let Err(err) = self.check_start(&intent.actor) {
            return send(tx, Event::error(err.to_string()));
        }

        send(tx, Event::info("Starting race...".to_owned()))?;
        for step in COUNTDOWN_STEPS.iter() {
            sleep(self.countdown_pause);
            send(tx, Event::info((*step).to_owned()))?;
        }
        sleep(self.countdown_pause);
        send(tx, Event::info("Go!".to_owned()))?;

        // the race officially starts once the countdown has elapsed
        let started_at = intent.now + self.countdown_pause * COUNTDOWN_PAUSES;
        self.session.start(started_at);
        self.registry.begin_race(started_at);
        Ok(())
    }

    /// check_start verifies the start preconditions in their fixed priority order and
    /// short-circuits on the first unmet one.
    fn check_start(&self, actor: &Actor) -> Result<(), RaceError> {
        require_moderator(actor, "start")?;
        match self.session.phase {
            Phase::Started => return Err(RaceError::StillRunning),
            Phase::Idle => return Err(RaceError::NoRaceCreated),
            Phase::Created => {}
        }

        let blocker = if self.registry.num_racers() == 0 {
            Some(StartBlocker::NoRacers)
        } else if self.registry.num_ready() == 0 {
            Some(StartBlocker::NoneReady)
        } else if self.registry.num_ready() != self.registry.num_racers() {
            Some(StartBlocker::NotAllReady)
        } else if self.registry.num_racers() < 2 {
            Some(StartBlocker::SingleRacer)
        } else if self.session.goal.is_none() {
            Some(StartBlocker::NoGoal)
        } else if self.session.game.is_none() {
            Some(StartBlocker::NoGame)
        } else {
            None
        };

        match blocker {
            Some(blocker) => Err(RaceError::CannotStart(blocker)),
            None => Ok(()),
        }
    }

    fn end(&mut self, actor: &Actor) -> Result<Vec<Event>, RaceError> {
        require_moderator(actor, "end")?;
        if self.session.phase == Phase::Idle {
            return Err(RaceError::NoRaceCreated);
        }

        let mut events = vec![Event::info("The race has ended!".to_owned())];
        if self.session.phase == Phase::Started && !self.session.results_printed {
            events.extend(self.render_results(true));
        }
        self.reset();
        Ok(events)
    }

    fn set_goal(&mut self, actor: &Actor, goal: &str) -> Result<Vec<Event>, RaceError> {
        require_moderator(actor, "set goals for")?;
        if self.session.phase == Phase::Idle {
            return Err(RaceError::NoRaceCreated);
        }

        self.session.goal = Some(goal.to_owned());
        Ok(vec![Event::info("Goal set.".to_owned())])
    }

    fn set_game(&mut self, actor: &Actor, game: &str) -> Result<Vec<Event>, RaceError> {
        require_moderator(actor, "set games for")?;
        if self.session.phase == Phase::Idle {
            return Err(RaceError::NoRaceCreated);
        }

        self.session.game = Some(game.to_owned());
        Ok(vec![Event::info("Game set.".to_owned())])
    }

    // ---------------------------------------------------------------------------------------------
    // RACER COMMANDS ------------------------------------------------------------------------------
    // ---------------------------------------------------------------------------------------------

    fn join(&mut self, actor: &Actor, now: SystemTime) -> Result<Vec<Event>, RaceError> {
        self.registry.join(actor, self.session.phase, now)?;
        Ok(vec![Event::info(format!(
            "{} has joined the race!",
            trim_discriminator(&actor.display_name)
        ))])
    }

    fn leave(&mut self, actor: &Actor) -> Result<Vec<Event>, RaceError> {
        self.registry.leave(actor.id, self.session.phase)?;
        Ok(vec![Event::info(format!(
            "{} has left the race!",
            trim_discriminator(&actor.display_name)
        ))])
    }

    fn ready(&mut self, actor: &Actor) -> Result<Vec<Event>, RaceError> {
        // once the race runs, readiness no longer applies and the command never mutates state
        if self.session.phase == Phase::Started {
            let mut events = vec![Event::info(
                "You don't need to ready after the race has started.".to_owned(),
            )];
            if self.registry.get(actor.id).is_none() {
                events.push(Event::info(
                    "Feel free to join the currently running race! Your timer will start from \
                     whenever you join."
                        .to_owned(),
                ));
            }
            return Ok(events);
        }

        self.registry.set_ready(actor.id, self.session.phase)?;
        Ok(vec![Event::info(format!(
            "{} is ready!",
            trim_discriminator(&actor.display_name)
        ))])
    }

    fn unready(&mut self, actor: &Actor) -> Result<Vec<Event>, RaceError> {
        if self.session.phase == Phase::Started {
            return Ok(vec![Event::info(
                "The race is already running, it's a bit too late to unready.".to_owned(),
            )]);
        }

        self.registry.unset_ready(actor.id, self.session.phase)?;
        Ok(vec![Event::info(format!(
            "{} is no longer ready!",
            trim_discriminator(&actor.display_name)
        ))])
    }

    fn quit(&mut self, actor: &Actor) -> Result<Vec<Event>, RaceError> {
        self.registry.quit(actor.id, self.session.phase)?;
        let mut events = vec![Event::info(format!(
            "{} has quit the race!",
            trim_discriminator(&actor.display_name)
        ))];
        events.extend(self.check_race_complete());
        Ok(events)
    }

    fn unquit(&mut self, actor: &Actor) -> Result<Vec<Event>, RaceError> {
        self.registry.unquit(actor.id, self.session.phase)?;
        self.session.results_printed = false;
        Ok(vec![Event::info(format!(
            "{} is back in the race!",
            trim_discriminator(&actor.display_name)
        ))])
    }

    fn finish(&mut self, actor: &Actor, now: SystemTime) -> Result<Vec<Event>, RaceError> {
        let time_taken = self.registry.finish(actor.id, self.session.phase, now)?;
        let mut events = vec![Event::info(format!(
            "{} has finished the race in {}!",
            trim_discriminator(&actor.display_name),
            format_hms(time_taken.as_secs())
        ))];
        events.extend(self.check_race_complete());
        Ok(events)
    }

    fn unfinish(&mut self, actor: &Actor) -> Result<Vec<Event>, RaceError> {
        self.registry.unfinish(actor.id, self.session.phase)?;
        self.session.results_printed = false;
        Ok(vec![Event::info(format!(
            "{} is back in the race!",
            trim_discriminator(&actor.display_name)
        ))])
    }

    fn comment(&mut self, actor: &Actor, comment: &str) -> Result<Vec<Event>, RaceError> {
        self.registry
            .set_comment(actor.id, self.session.phase, comment)?;
        // a late comment invalidates the last printed report; the comment itself is accepted
        // silently
        self.session.results_printed = false;
        Ok(Vec::new())
    }

    // ---------------------------------------------------------------------------------------------
    // QUERY COMMANDS ------------------------------------------------------------------------------
    // ---------------------------------------------------------------------------------------------

    fn goal(&self) -> Result<Vec<Event>, RaceError> {
        if self.session.phase == Phase::Idle {
            return Err(RaceError::NoRaceCreated);
        }
        match &self.session.goal {
            Some(goal) => Ok(vec![Event::info(format!("Race goal: {}", goal))]),
            None => Ok(vec![Event::info("Race goal is not set yet!".to_owned())]),
        }
    }

    fn game(&self) -> Result<Vec<Event>, RaceError> {
        if self.session.phase == Phase::Idle {
            return Err(RaceError::NoRaceCreated);
        }
        match &self.session.game {
            Some(game) => Ok(vec![Event::info(format!("Race game: {}", game))]),
            None => Ok(vec![Event::info("Race game is not set yet!".to_owned())]),
        }
    }

    fn time(&self, now: SystemTime) -> Result<Vec<Event>, RaceError> {
        if self.session.phase != Phase::Started {
            return Err(RaceError::NoRaceRunning);
        }
        let elapsed = self.session.running_time(now).unwrap_or(Duration::ZERO);
        Ok(vec![Event::info(format!(
            "Race has been running for {}",
            format_hms(elapsed.as_secs())
        ))])
    }

    fn entrants(&self) -> Result<Vec<Event>, RaceError> {
        if self.session.phase == Phase::Idle {
            return Err(RaceError::NoRaceRunning);
        }
        if self.registry.entries().is_empty() {
            return Ok(vec![Event::info("No entrants yet!".to_owned())]);
        }

        let mut racer_list = String::from("Race entrants:\n");
        for entry in self.registry.entries() {
            let status = if entry.ready { " (ready)" } else { "" };
            writeln!(
                &mut racer_list,
                " {}{}",
                trim_discriminator(&entry.display_name),
                status
            )
            .unwrap();
        }
        Ok(vec![Event::info(racer_list)])
    }

    fn results(&self) -> Result<Vec<Event>, RaceError> {
        match self.session.phase {
            Phase::Started => Ok(self.render_results(false)),
            Phase::Created => Err(RaceError::NotStarted),
            Phase::Idle => Err(RaceError::NoRaceCreated),
        }
    }

    // ---------------------------------------------------------------------------------------------
    // RESULTS -------------------------------------------------------------------------------------
    // ---------------------------------------------------------------------------------------------

    /// check_race_complete emits the final report once every racer has reached a terminal
    /// outcome.
    fn check_race_complete(&mut self) -> Vec<Event> {
        if !self.registry.all_finished() {
            return Vec::new();
        }

        let mut events = vec![Event::info("Everyone has completed the race!".to_owned())];
        events.extend(self.render_results(true));
        self.session.results_printed = true;
        events
    }

    /// render_results produces the report event and, if there is a body to persist, the
    /// file-write request for the host.
    fn render_results(&self, mention_players: bool) -> Vec<Event> {
        let report = RaceReport::from_registry(
            &self.registry,
            self.session.game.as_deref().unwrap_or(""),
            self.session.goal.as_deref().unwrap_or(""),
        );
        let (text, file_text) = report.render(mention_players);

        let mut events = vec![Event::info(text)];
        if let Some(content) = file_text {
            if let Some(file_name) = self.session.output_file_id() {
                events.push(Event::WriteFile {
                    file_name: file_name.to_owned(),
                    content,
                });
            }
        }
        events
    }
}

fn require_moderator(actor: &Actor, action: &'static str) -> Result<(), RaceError> {
    if actor.is_moderator {
        Ok(())
    } else {
        Err(RaceError::PermissionDenied { action })
    }
}

fn send(tx: &Sender<Event>, event: Event) -> anyhow::Result<()> {
    tx.send(event)
        .context("Failed to send event to the host renderer!")
}

fn send_all(tx: &Sender<Event>, events: Vec<Event>) -> anyhow::Result<()> {
    for event in events {
        send(tx, event)?;
    }
    Ok(())
}

#[cfg(test)]
mod controller_tests {
    use super::*;
    use crate::interfaces::host_interface::{ActorId, EventKind};

    fn moderator(id: u64, name: &str) -> Actor {
        Actor {
            id: ActorId(id),
            display_name: name.to_owned(),
            is_moderator: true,
        }
    }

    fn racer(id: u64, name: &str) -> Actor {
        Actor {
            id: ActorId(id),
            display_name: name.to_owned(),
            is_moderator: false,
        }
    }

    fn at(secs: u64) -> SystemTime {
        SystemTime::UNIX_EPOCH + Duration::from_secs(1_600_000_000 + secs)
    }

    fn dispatch(
        controller: &mut RaceController,
        actor: &Actor,
        command: Command,
        now: SystemTime,
    ) -> Vec<Event> {
        let (tx, rx) = flume::unbounded();
        let intent = Intent {
            actor: actor.clone(),
            command,
            now,
        };
        controller.handle(&intent, &tx).unwrap();
        drop(tx);
        rx.iter().collect()
    }

    fn texts(events: &[Event]) -> Vec<String> {
        events
            .iter()
            .filter_map(|event| match event {
                Event::Text { body, .. } => Some(body.to_owned()),
                _ => None,
            })
            .collect()
    }

    fn has_error(events: &[Event], expected: &RaceError) -> bool {
        events.iter().any(|event| {
            matches!(event, Event::Text { kind, body }
                if *kind == EventKind::Error && *body == expected.to_string())
        })
    }

    /// Creates a race with two ready racers, goal and game set, not yet started.
    fn ready_race(controller: &mut RaceController) -> (Actor, Actor, Actor) {
        let admin = moderator(100, "admin#0001");
        let alice = racer(1, "alice#1111");
        let bob = racer(2, "bob#2222");

        dispatch(controller, &admin, Command::Create, at(0));
        dispatch(controller, &alice, Command::Join, at(1));
        dispatch(controller, &bob, Command::Join, at(1));
        dispatch(controller, &alice, Command::Ready, at(2));
        dispatch(controller, &bob, Command::Ready, at(2));
        dispatch(controller, &admin, Command::SetGoal("100%".to_owned()), at(3));
        dispatch(controller, &admin, Command::SetGame("Doom".to_owned()), at(3));

        (admin, alice, bob)
    }

    fn started_race(controller: &mut RaceController) -> (Actor, Actor, Actor) {
        let (admin, alice, bob) = ready_race(controller);
        dispatch(controller, &admin, Command::Start, at(10));
        (admin, alice, bob)
    }

    #[test]
    fn test_create_requires_moderator() {
        let mut controller = RaceController::new(Duration::ZERO);
        let events = dispatch(&mut controller, &racer(1, "alice"), Command::Create, at(0));
        assert!(has_error(
            &events,
            &RaceError::PermissionDenied { action: "create" }
        ));
        assert_eq!(controller.session.phase, Phase::Idle);
    }

    #[test]
    fn test_create_only_from_idle() {
        let mut controller = RaceController::new(Duration::ZERO);
        let admin = moderator(100, "admin");

        dispatch(&mut controller, &admin, Command::Create, at(0));
        let events = dispatch(&mut controller, &admin, Command::Create, at(1));
        assert!(has_error(&events, &RaceError::AlreadyCreated));

        started_race(&mut controller);
        let events = dispatch(&mut controller, &admin, Command::Create, at(20));
        assert!(has_error(&events, &RaceError::AlreadyStarted));
    }

    #[test]
    fn test_start_blocker_priority_order() {
        let admin = moderator(100, "admin");
        let alice = racer(1, "alice");
        let bob = racer(2, "bob");

        // no racers at all
        let mut controller = RaceController::new(Duration::ZERO);
        dispatch(&mut controller, &admin, Command::Create, at(0));
        let events = dispatch(&mut controller, &admin, Command::Start, at(1));
        assert!(has_error(
            &events,
            &RaceError::CannotStart(StartBlocker::NoRacers)
        ));

        // nobody ready
        dispatch(&mut controller, &alice, Command::Join, at(2));
        let events = dispatch(&mut controller, &admin, Command::Start, at(3));
        assert!(has_error(
            &events,
            &RaceError::CannotStart(StartBlocker::NoneReady)
        ));

        // partially ready
        dispatch(&mut controller, &bob, Command::Join, at(4));
        dispatch(&mut controller, &alice, Command::Ready, at(5));
        let events = dispatch(&mut controller, &admin, Command::Start, at(6));
        assert!(has_error(
            &events,
            &RaceError::CannotStart(StartBlocker::NotAllReady)
        ));

        // a single ready racer is not enough
        let mut controller = RaceController::new(Duration::ZERO);
        dispatch(&mut controller, &admin, Command::Create, at(0));
        dispatch(&mut controller, &alice, Command::Join, at(1));
        dispatch(&mut controller, &alice, Command::Ready, at(2));
        let events = dispatch(&mut controller, &admin, Command::Start, at(3));
        assert!(has_error(
            &events,
            &RaceError::CannotStart(StartBlocker::SingleRacer)
        ));

        // goal before game
        let mut controller = RaceController::new(Duration::ZERO);
        dispatch(&mut controller, &admin, Command::Create, at(0));
        dispatch(&mut controller, &alice, Command::Join, at(1));
        dispatch(&mut controller, &bob, Command::Join, at(1));
        dispatch(&mut controller, &alice, Command::Ready, at(2));
        dispatch(&mut controller, &bob, Command::Ready, at(2));
        let events = dispatch(&mut controller, &admin, Command::Start, at(3));
        assert!(has_error(
            &events,
            &RaceError::CannotStart(StartBlocker::NoGoal)
        ));

        dispatch(&mut controller, &admin, Command::SetGoal("100%".to_owned()), at(4));
        let events = dispatch(&mut controller, &admin, Command::Start, at(5));
        assert!(has_error(
            &events,
            &RaceError::CannotStart(StartBlocker::NoGame)
        ));
    }

    #[test]
    fn test_start_countdown_and_personal_starts() {
        let mut controller = RaceController::new(Duration::ZERO);
        let (admin, _, _) = ready_race(&mut controller);

        let events = dispatch(&mut controller, &admin, Command::Start, at(10));
        assert_eq!(
            texts(&events),
            vec!["Starting race...", "5", "4", "3", "2", "1", "Go!"]
        );

        assert_eq!(controller.session.phase, Phase::Started);
        assert_eq!(controller.session.started_at(), Some(at(10)));
        for entry in controller.registry.entries() {
            assert_eq!(entry.personal_start, Some(at(10)));
        }
    }

    #[test]
    fn test_mid_race_joiner_gets_join_time() {
        let mut controller = RaceController::new(Duration::ZERO);
        started_race(&mut controller);

        let carol = racer(3, "carol");
        dispatch(&mut controller, &carol, Command::Join, at(25));
        let entry = controller.registry.get(ActorId(3)).unwrap();
        assert!(entry.ready);
        assert_eq!(entry.personal_start, Some(at(25)));
    }

    #[test]
    fn test_full_race_auto_reports_with_mentions() {
        let mut controller = RaceController::new(Duration::ZERO);
        let (_, alice, bob) = started_race(&mut controller);

        // bob is faster than alice
        let events = dispatch(&mut controller, &bob, Command::Finish, at(30));
        assert_eq!(texts(&events), vec!["bob has finished the race in 0:00:20!"]);
        assert!(!controller.session.results_printed);

        let events = dispatch(&mut controller, &alice, Command::Finish, at(40));
        let bodies = texts(&events);
        assert_eq!(bodies[0], "alice has finished the race in 0:00:30!");
        assert_eq!(bodies[1], "Everyone has completed the race!");

        let report = &bodies[2];
        assert!(report.contains("Race game: Doom"));
        assert!(report.contains("Race goal: 100%"));
        let bob_pos = report.find("1. <@2> 0:00:20").unwrap();
        let alice_pos = report.find("2. <@1> 0:00:30").unwrap();
        assert!(bob_pos < alice_pos);

        assert!(events.iter().any(|event| matches!(
            event,
            Event::WriteFile { file_name, .. } if file_name == "race_1600000000.txt"
        )));
        assert!(controller.session.results_printed);
    }

    #[test]
    fn test_forfeit_ranks_after_finishers() {
        let mut controller = RaceController::new(Duration::ZERO);
        let (_, alice, bob) = started_race(&mut controller);

        dispatch(&mut controller, &alice, Command::Quit, at(15));
        let events = dispatch(&mut controller, &bob, Command::Finish, at(30));
        let bodies = texts(&events);
        assert_eq!(bodies[1], "Everyone has completed the race!");

        let report = &bodies[2];
        let bob_pos = report.find("1. <@2> 0:00:20").unwrap();
        let alice_pos = report.find("2. <@1> Forfeited").unwrap();
        assert!(bob_pos < alice_pos);
        assert!(controller.session.results_printed);
    }

    #[test]
    fn test_comment_rules_and_report_invalidation() {
        let mut controller = RaceController::new(Duration::ZERO);
        let (_, alice, bob) = started_race(&mut controller);

        let events = dispatch(
            &mut controller,
            &alice,
            Command::Comment("gg".to_owned()),
            at(20),
        );
        assert!(has_error(&events, &RaceError::MustFinishFirst));

        dispatch(&mut controller, &alice, Command::Finish, at(30));
        dispatch(&mut controller, &bob, Command::Finish, at(40));
        assert!(controller.session.results_printed);

        // a late comment is accepted silently and invalidates the printed report
        let events = dispatch(
            &mut controller,
            &alice,
            Command::Comment("gg".to_owned()),
            at(50),
        );
        assert!(events.is_empty());
        assert_eq!(controller.registry.get(ActorId(1)).unwrap().comment, "gg");
        assert!(!controller.session.results_printed);
    }

    #[test]
    fn test_end_twice_fails_second_time() {
        let mut controller = RaceController::new(Duration::ZERO);
        let admin = moderator(100, "admin");

        dispatch(&mut controller, &admin, Command::Create, at(0));
        let events = dispatch(&mut controller, &admin, Command::End, at(1));
        assert_eq!(texts(&events), vec!["The race has ended!"]);
        assert_eq!(controller.session.phase, Phase::Idle);

        let events = dispatch(&mut controller, &admin, Command::End, at(2));
        assert!(has_error(&events, &RaceError::NoRaceCreated));
    }

    #[test]
    fn test_end_prints_pending_results() {
        let mut controller = RaceController::new(Duration::ZERO);
        let (admin, alice, _) = started_race(&mut controller);

        dispatch(&mut controller, &alice, Command::Finish, at(30));
        let events = dispatch(&mut controller, &admin, Command::End, at(60));
        let bodies = texts(&events);
        assert_eq!(bodies[0], "The race has ended!");
        assert!(bodies[1].contains("1. <@1> 0:00:20"));
        assert!(bodies[1].contains("2. <@2>"));
        assert!(events
            .iter()
            .any(|event| matches!(event, Event::WriteFile { .. })));

        assert_eq!(controller.session.phase, Phase::Idle);
        assert_eq!(controller.registry.num_racers(), 0);
    }

    #[test]
    fn test_end_skips_already_printed_results() {
        let mut controller = RaceController::new(Duration::ZERO);
        let (admin, alice, bob) = started_race(&mut controller);

        dispatch(&mut controller, &alice, Command::Finish, at(30));
        dispatch(&mut controller, &bob, Command::Finish, at(40));
        let events = dispatch(&mut controller, &admin, Command::End, at(60));
        assert_eq!(texts(&events), vec!["The race has ended!"]);
    }

    #[test]
    fn test_leave_during_race_directs_to_quit() {
        let mut controller = RaceController::new(Duration::ZERO);
        let (_, alice, _) = started_race(&mut controller);

        let events = dispatch(&mut controller, &alice, Command::Leave, at(20));
        assert!(has_error(&events, &RaceError::LeaveWhileRunning));
        assert_eq!(controller.registry.num_racers(), 2);
    }

    #[test]
    fn test_ready_after_start_is_informational() {
        let mut controller = RaceController::new(Duration::ZERO);
        let (_, alice, _) = started_race(&mut controller);
        let ready_before = controller.registry.num_ready();

        let events = dispatch(&mut controller, &alice, Command::Ready, at(20));
        assert_eq!(
            texts(&events),
            vec!["You don't need to ready after the race has started."]
        );
        assert!(events
            .iter()
            .all(|event| matches!(event, Event::Text { kind, .. } if *kind == EventKind::Info)));

        // a bystander additionally gets invited to join mid-race
        let events = dispatch(&mut controller, &racer(9, "dave"), Command::Ready, at(21));
        assert_eq!(texts(&events).len(), 2);

        let events = dispatch(&mut controller, &alice, Command::Unready, at(22));
        assert_eq!(
            texts(&events),
            vec!["The race is already running, it's a bit too late to unready."]
        );
        assert_eq!(controller.registry.num_ready(), ready_before);
    }

    #[test]
    fn test_unfinish_reopens_race_and_retriggers_report() {
        let mut controller = RaceController::new(Duration::ZERO);
        let (_, alice, bob) = started_race(&mut controller);

        dispatch(&mut controller, &alice, Command::Finish, at(30));
        dispatch(&mut controller, &bob, Command::Finish, at(40));
        assert!(controller.session.results_printed);

        let events = dispatch(&mut controller, &bob, Command::Unfinish, at(50));
        assert_eq!(texts(&events), vec!["bob is back in the race!"]);
        assert!(!controller.session.results_printed);
        assert_eq!(controller.registry.num_finished(), 1);

        let events = dispatch(&mut controller, &bob, Command::Finish, at(60));
        let bodies = texts(&events);
        assert_eq!(bodies[1], "Everyone has completed the race!");
        assert!(controller.session.results_printed);
    }

    #[test]
    fn test_results_query_without_mentions() {
        let mut controller = RaceController::new(Duration::ZERO);
        let admin = moderator(100, "admin");

        let events = dispatch(&mut controller, &admin, Command::Results, at(0));
        assert!(has_error(&events, &RaceError::NoRaceCreated));

        ready_race(&mut controller);
        let events = dispatch(&mut controller, &admin, Command::Results, at(5));
        assert!(has_error(&events, &RaceError::NotStarted));

        dispatch(&mut controller, &admin, Command::Start, at(10));
        let alice = racer(1, "alice#1111");
        dispatch(&mut controller, &alice, Command::Finish, at(30));

        let events = dispatch(&mut controller, &admin, Command::Results, at(35));
        let bodies = texts(&events);
        assert!(bodies[0].contains("1. alice 0:00:20"));
        assert!(bodies[0].contains("2. bob"));
        assert!(events
            .iter()
            .any(|event| matches!(event, Event::WriteFile { .. })));
        assert!(!controller.session.results_printed);
    }

    #[test]
    fn test_query_commands() {
        let mut controller = RaceController::new(Duration::ZERO);
        let admin = moderator(100, "admin");
        let alice = racer(1, "alice#1111");

        let events = dispatch(&mut controller, &alice, Command::Goal, at(0));
        assert!(has_error(&events, &RaceError::NoRaceCreated));

        dispatch(&mut controller, &admin, Command::Create, at(0));
        let events = dispatch(&mut controller, &alice, Command::Goal, at(1));
        assert_eq!(texts(&events), vec!["Race goal is not set yet!"]);

        dispatch(&mut controller, &admin, Command::SetGoal("100%".to_owned()), at(2));
        let events = dispatch(&mut controller, &alice, Command::Goal, at(3));
        assert_eq!(texts(&events), vec!["Race goal: 100%"]);

        let events = dispatch(&mut controller, &alice, Command::Entrants, at(4));
        assert_eq!(texts(&events), vec!["No entrants yet!"]);

        dispatch(&mut controller, &alice, Command::Join, at(5));
        dispatch(&mut controller, &alice, Command::Ready, at(6));
        let events = dispatch(&mut controller, &alice, Command::Entrants, at(7));
        assert_eq!(texts(&events), vec!["Race entrants:\n alice (ready)\n"]);

        let events = dispatch(&mut controller, &alice, Command::Time, at(8));
        assert!(has_error(&events, &RaceError::NoRaceRunning));
    }

    #[test]
    fn test_time_reports_elapsed() {
        let mut controller = RaceController::new(Duration::ZERO);
        let (_, alice, _) = started_race(&mut controller);

        let events = dispatch(&mut controller, &alice, Command::Time, at(101));
        assert_eq!(texts(&events), vec!["Race has been running for 0:01:31"]);
    }

    #[test]
    fn test_set_goal_requires_moderator() {
        let mut controller = RaceController::new(Duration::ZERO);
        let admin = moderator(100, "admin");
        dispatch(&mut controller, &admin, Command::Create, at(0));

        let events = dispatch(
            &mut controller,
            &racer(1, "alice"),
            Command::SetGoal("100%".to_owned()),
            at(1),
        );
        assert!(has_error(
            &events,
            &RaceError::PermissionDenied {
                action: "set goals for"
            }
        ));
        assert!(controller.session.goal.is_none());
    }
}
