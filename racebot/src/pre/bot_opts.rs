use clap::{AppSettings, Clap};
use std::path::PathBuf;

#[derive(Debug, Clap, Clone)]
#[clap(
    version = "0.1.0",
    name = "race-bot",
    about = "A chat race coordination bot written in Rust"
)]
#[clap(setting = AppSettings::ColoredHelp)]
pub struct BotOpts {
    // FLAGS ---------------------------------------------------------------------------------------
    /// Activate debug printing of the dispatched intents
    #[clap(short, long)]
    pub debug: bool,

    // OPTIONS -------------------------------------------------------------------------------------
    /// Set path to the bot parameter file
    #[clap(parse(from_os_str), short, long)]
    pub parfile_path: PathBuf,
}
