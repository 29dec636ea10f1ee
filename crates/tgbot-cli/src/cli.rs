//! CLI argument definitions for tgbot.
//!
//! All `clap` structures live here so that `main.rs` stays focused on
//! dispatching subcommands.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// tgbot -- a Telegram bot backed by SQLite and an OpenAI-compatible API.
#[derive(Parser)]
#[command(
    name = "tgbot",
    version,
    about = "tgbot -- Telegram bot with OpenAI capabilities",
    long_about = "Polls the Telegram Bot API, dispatches /commands against a local SQLite \
                  store and answers other messages through an OpenAI-compatible chat API."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the bot: long-poll Telegram and handle every update.
    Run {
        /// Configuration file (defaults to config/default.toml when present).
        #[arg(long, short)]
        config: Option<PathBuf>,

        /// Telegram long-polling timeout in seconds (overrides the config).
        #[arg(long)]
        poll_timeout: Option<u64>,
    },

    /// Print a JSON health report and exit non-zero unless everything is green.
    Status {
        /// Configuration file (defaults to config/default.toml when present).
        #[arg(long, short)]
        config: Option<PathBuf>,

        /// File to touch when every item is green.
        #[arg(long)]
        ready_file: Option<PathBuf>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_accepts_overrides() {
        let cli = Cli::try_parse_from(["tgbot", "run", "--config", "bot.toml", "--poll-timeout", "5"])
            .unwrap();
        match cli.command {
            Commands::Run {
                config,
                poll_timeout,
            } => {
                assert_eq!(config, Some(PathBuf::from("bot.toml")));
                assert_eq!(poll_timeout, Some(5));
            }
            Commands::Status { .. } => panic!("expected run"),
        }
    }

    #[test]
    fn status_takes_a_ready_file() {
        let cli = Cli::try_parse_from(["tgbot", "status", "--ready-file", "/tmp/ready"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Status { ready_file: Some(ref p), config: None } if p == &PathBuf::from("/tmp/ready")
        ));
    }

    #[test]
    fn a_subcommand_is_required() {
        assert!(Cli::try_parse_from(["tgbot"]).is_err());
    }
}
