use crate::core::registry::{Outcome, RacerRegistry};
use crate::interfaces::host_interface::ActorId;
use helpers::general::trim_discriminator;
use helpers::timefmt::format_hms;
use std::fmt::Write;
use std::time::Duration;

/// ReportEntry is the per-racer snapshot used for ranking and formatting the results.
#[derive(Debug, Clone)]
pub struct ReportEntry {
    pub id: ActorId,
    pub display_name: String,
    pub outcome: Outcome,
    pub comment: String,
}

/// RaceReport contains all race information that is required for post-processing the results.
/// Entries are stored in join order.
#[derive(Debug, Clone)]
pub struct RaceReport {
    pub game: String,
    pub goal: String,
    pub entries: Vec<ReportEntry>,
}

impl RaceReport {
    /// from_registry snapshots the registry in join order.
    pub fn from_registry(registry: &RacerRegistry, game: &str, goal: &str) -> RaceReport {
        RaceReport {
            game: game.to_owned(),
            goal: goal.to_owned(),
            entries: registry
                .entries()
                .iter()
                .map(|entry| ReportEntry {
                    id: entry.id,
                    display_name: entry.display_name.to_owned(),
                    outcome: entry.outcome,
                    comment: entry.comment.to_owned(),
                })
                .collect(),
        }
    }

    /// render produces the chat report and the machine-parseable file twin. Finished racers
    /// are ranked ascending by their time with join order breaking ties, followed by forfeits
    /// and still-running racers in join order, all sharing one continuous rank sequence.
    /// Without any entries only the header block is produced and no file text is returned, so
    /// the caller can skip the persistence side effect.
    pub fn render(&self, mention_players: bool) -> (String, Option<String>) {
        let mut finished: Vec<(&ReportEntry, Duration)> = self
            .entries
            .iter()
            .filter_map(|entry| match entry.outcome {
                Outcome::Finished(time_taken) => Some((entry, time_taken)),
                _ => None,
            })
            .collect();
        finished.sort_by_key(|&(_, time_taken)| time_taken);

        let forfeited = self
            .entries
            .iter()
            .filter(|entry| entry.outcome == Outcome::Forfeited);
        let running = self
            .entries
            .iter()
            .filter(|entry| entry.outcome == Outcome::Running);

        let mut body = String::new();
        let mut file_body = String::new();
        let mut rank = 1;

        for (entry, time_taken) in finished {
            let time = format_hms(time_taken.as_secs());
            push_terminal_lines(&mut body, &mut file_body, entry, &time, rank, mention_players);
            rank += 1;
        }
        for entry in forfeited {
            push_terminal_lines(
                &mut body,
                &mut file_body,
                entry,
                "Forfeited",
                rank,
                mention_players,
            );
            rank += 1;
        }
        for entry in running {
            let name = render_name(entry, mention_players);
            writeln!(&mut body, "{}. {}", rank, name).unwrap();
            writeln!(&mut file_body, "{}.|{}", rank, name).unwrap();
            rank += 1;
        }

        let report = format!(
            "Race game: {}\nRace goal: {}\nRace results:\n{}",
            self.game, self.goal, body
        );
        let file_text = if self.entries.is_empty() {
            None
        } else {
            Some(file_body)
        };

        (report, file_text)
    }
}

/// push_terminal_lines appends the report and file lines for a racer with a terminal outcome
/// (a finishing time or the forfeiture marker). The file twin carries the comment on its own
/// line.
fn push_terminal_lines(
    body: &mut String,
    file_body: &mut String,
    entry: &ReportEntry,
    time: &str,
    rank: u32,
    mention_players: bool,
) {
    let name = render_name(entry, mention_players);
    writeln!(body, "{}. {} {} {}", rank, name, time, entry.comment).unwrap();
    writeln!(file_body, "{}.|{}|{}", rank, name, time).unwrap();
    writeln!(file_body, "{}", entry.comment).unwrap();
}

fn render_name(entry: &ReportEntry, mention_players: bool) -> String {
    if mention_players {
        entry.id.mention()
    } else {
        trim_discriminator(&entry.display_name).to_owned()
    }
}
