pub mod bot_opts;
pub mod check_bot_pars;
pub mod read_bot_pars;
