use crate::pre::read_bot_pars::BotPars;
use anyhow::Context;
use helpers::general::InputValueError;

/// check_bot_pars assures that the inserted parameters are within reasonable limits and raises
/// an error if not.
pub fn check_bot_pars(bot_pars: &BotPars) -> anyhow::Result<()> {
    if bot_pars.command_prefix.is_empty() {
        return Err(InputValueError).context("command_prefix must not be empty!");
    }

    if bot_pars.command_prefix.chars().count() > 3 {
        return Err(InputValueError).context(format!(
            "command_prefix \"{}\" is longer than the reasonable maximum of three characters!",
            bot_pars.command_prefix
        ));
    }

    if !(0.0 <= bot_pars.countdown_pause && bot_pars.countdown_pause <= 10.0) {
        return Err(InputValueError).context(format!(
            "countdown_pause is {:.3}s, which is not within the reasonable range of [0.0, 10.0]s!",
            bot_pars.countdown_pause
        ));
    }

    if bot_pars.results_dir.is_empty() {
        return Err(InputValueError).context("results_dir must not be empty!");
    }

    Ok(())
}
