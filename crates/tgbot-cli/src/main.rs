//! CLI entry point for tgbot.
//!
//! This binary provides the `tgbot` command with subcommands for running
//! the bot and checking its health.

mod bot;
mod chat;
mod cli;
mod config;
mod helpers;
mod status;

use anyhow::Result;
use clap::Parser;

use crate::cli::{Cli, Commands};
use crate::config::load_config;
use crate::helpers::init_tracing;

#[tokio::main]
async fn main() -> Result<()> {
    // A missing .env file is fine; real environment variables still apply.
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            config,
            poll_timeout,
        } => {
            let mut config = load_config(config.as_deref())?;
            if let Some(secs) = poll_timeout {
                config.telegram.poll_timeout_secs = secs;
            }
            init_tracing(&config.log.level, config.log.json);
            bot::cmd_run(config).await
        }
        Commands::Status { config, ready_file } => {
            let config = load_config(config.as_deref())?;
            init_tracing(&config.log.level, config.log.json);
            if !status::cmd_status(&config, ready_file.as_deref()).await? {
                std::process::exit(1);
            }
            Ok(())
        }
    }
}
