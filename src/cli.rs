use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};

use crate::core::timer::TimerState;

#[derive(Parser, Debug)]
#[command(name = "pomopair")]
#[command(about = "🍅 A shared Pomodoro timer with two-player break games")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Focus phase length in minutes
    #[arg(
        long,
        global = true,
        env = "POMOPAIR_FOCUS_MINUTES",
        default_value_t = 25,
        value_parser = clap::value_parser!(u32).range(1..=90)
    )]
    pub focus_minutes: u32,

    /// Rest phase length in minutes
    #[arg(
        long,
        global = true,
        env = "POMOPAIR_REST_MINUTES",
        default_value_t = 5,
        value_parser = clap::value_parser!(u32).range(1..=90)
    )]
    pub rest_minutes: u32,

    /// Seconds to wait for the host before giving up
    #[arg(long, global = true, env = "POMOPAIR_CONNECT_TIMEOUT", default_value_t = 10)]
    pub connect_timeout_secs: u64,

    /// Where logs go; the terminal belongs to the UI
    #[arg(long, global = true, env = "POMOPAIR_LOG_FILE", default_value = "pomopair.log")]
    pub log_file: PathBuf,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Create a session and print its code
    Host,
    /// Join a session by code
    Join {
        /// The host's session code
        code: String,
    },
    /// Timer only, no peer
    Solo,
    /// Print a game's rules and exit
    Rules {
        /// Game id, e.g. tictactoe, memory, minicraft
        game: String,
    },
}

/// Settings resolved from flags and environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub focus_secs: u32,
    pub rest_secs: u32,
    pub connect_timeout: Duration,
    pub log_file: PathBuf,
}

impl Config {
    pub fn timer_state(&self) -> TimerState {
        TimerState::new(self.focus_secs, self.rest_secs)
    }
}

impl Cli {
    pub fn config(&self) -> Config {
        Config {
            focus_secs: self.focus_minutes * 60,
            rest_secs: self.rest_minutes * 60,
            connect_timeout: Duration::from_secs(self.connect_timeout_secs),
            log_file: self.log_file.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_subcommand_means_lobby() {
        let cli = Cli::try_parse_from(["pomopair"]).unwrap();
        assert_eq!(cli.command, None);
    }

    #[test]
    fn join_takes_code_and_global_flags() {
        let cli = Cli::try_parse_from(["pomopair", "join", "abc123", "--focus-minutes", "50"]).unwrap();
        assert_eq!(cli.command, Some(Commands::Join { code: "abc123".into() }));
        let config = cli.config();
        assert_eq!(config.focus_secs, 50 * 60);
        assert_eq!(config.timer_state().time_remaining, 50 * 60);
    }

    #[test]
    fn rules_takes_any_game_name() {
        let cli = Cli::try_parse_from(["pomopair", "rules", "chess"]).unwrap();
        assert_eq!(cli.command, Some(Commands::Rules { game: "chess".into() }));
    }

    #[test]
    fn zero_minute_focus_is_rejected() {
        assert!(Cli::try_parse_from(["pomopair", "solo", "--focus-minutes", "0"]).is_err());
    }
}
