use anyhow::Context;
use serde::Deserialize;
use std::fs::OpenOptions;
use std::path::Path;

/// * `command_prefix` - Prefix that marks a chat line as a bot command, e.g. "!"
/// * `moderators` - Display names (without discriminator) that carry moderator capability
/// * `results_dir` - Directory the race result files are written to
/// * `countdown_pause` - (s) Pause between two steps of the race start countdown
#[derive(Debug, Deserialize, Clone)]
pub struct BotPars {
    pub command_prefix: String,
    pub moderators: Vec<String>,
    pub results_dir: String,
    pub countdown_pause: f64,
}

/// read_bot_pars reads the JSON file and decodes the JSON string into the bot parameters
/// struct.
pub fn read_bot_pars(filepath: &Path) -> anyhow::Result<BotPars> {
    // open file
    let fh = OpenOptions::new()
        .read(true)
        .open(filepath)
        .context(format!(
            "Failed to open parameter file {}!",
            filepath.display()
        ))?;

    // read and parse parameter file content
    let pars = serde_json::from_reader(&fh).context(format!(
        "Failed to parse parameter file {}!",
        filepath.display()
    ))?;
    Ok(pars)
}
