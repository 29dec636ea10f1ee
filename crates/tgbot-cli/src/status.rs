//! Subcommand: `tgbot status` -- health report.
//!
//! Prints `{"statusVersion": 1, "items": [...]}` to stdout. Each item names
//! one dependency of the bot and colours it green, gray, yellow or red. When
//! every item is green an optional ready file is touched so that an
//! orchestrator can poll for it.

use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;
use tgbot_adapters::{AdapterError, TelegramClient};
use tgbot_store::{Database, RecordStore, USER_TABLE};
use tracing::{info, warn};

use crate::config::AppConfig;

/// Version of the report layout.
pub const STATUS_VERSION: u32 = 1;

/// Health colour of one item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Green,
    Gray,
    Yellow,
    Red,
}

/// One line of the report.
#[derive(Debug, Clone, Serialize)]
pub struct StatusItem {
    pub identifier: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub status: Status,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusReport {
    pub status_version: u32,
    pub items: Vec<StatusItem>,
}

impl StatusReport {
    pub fn new(items: Vec<StatusItem>) -> Self {
        Self {
            status_version: STATUS_VERSION,
            items,
        }
    }

    /// Whether every item is green.
    pub fn all_green(&self) -> bool {
        self.items.iter().all(|i| i.status == Status::Green)
    }
}

// ---------------------------------------------------------------------------
// Checks
// ---------------------------------------------------------------------------

/// Whether the bot token is accepted by Telegram.
pub async fn telegram_status(config: &AppConfig) -> StatusItem {
    let (status, message) = match config.telegram_token() {
        Err(_) => (
            Status::Gray,
            Some("No bot token configured (env: TG_BOT_API_KEY)".to_owned()),
        ),
        Ok(token) => match fetch_bot_username(token, &config.telegram.api_base).await {
            Ok(username) => (Status::Green, username.map(|u| format!("Running as @{u}"))),
            Err(AdapterError::Api { description, .. }) => (Status::Red, Some(description)),
            Err(e) => (Status::Yellow, Some(e.to_string())),
        },
    };
    StatusItem {
        identifier: "tgbot",
        name: "Telegram Bot",
        description: "Telegram bot with OpenAI capabilities",
        status,
        message,
    }
}

async fn fetch_bot_username(token: &str, api_base: &str) -> tgbot_adapters::Result<Option<String>> {
    let client = TelegramClient::new(token)?.with_api_base(api_base)?;
    Ok(client.get_me().await?.username)
}

/// Whether an OpenAI key is configured. Its validity is not checked.
pub fn openai_status(config: &AppConfig) -> StatusItem {
    let configured = config.openai_key().is_some();
    StatusItem {
        identifier: "openaicreds",
        name: "OpenAI Credentials",
        description: "Have you configured your OpenAI credentials (env: OPENAI_API_KEY)?",
        status: if configured { Status::Green } else { Status::Gray },
        message: Some(if configured {
            "Yes!".to_owned()
        } else {
            "No, please set the OPENAI_API_KEY environment variable".to_owned()
        }),
    }
}

/// Whether the database file exists, opens and holds the `User` table.
pub async fn database_status(path: &Path) -> StatusItem {
    let (status, message) = if !path.exists() {
        (
            Status::Gray,
            Some(format!("{} does not exist yet; start the bot once", path.display())),
        )
    } else {
        match count_users(path).await {
            Ok(n) => (Status::Green, Some(format!("{n} known users"))),
            Err(e) => (Status::Red, Some(format!("{e:#}"))),
        }
    };
    StatusItem {
        identifier: "database",
        name: "Database",
        description: "SQLite store holding the bot's users",
        status,
        message,
    }
}

async fn count_users(path: &Path) -> Result<usize> {
    let db = Database::open(path).context("failed to open database")?;
    let rows = RecordStore::new(db)
        .select_rows(USER_TABLE, None)
        .await
        .context("failed to read the User table")?;
    Ok(rows.len())
}

/// Run every check.
pub async fn collect(config: &AppConfig) -> StatusReport {
    StatusReport::new(vec![
        telegram_status(config).await,
        openai_status(config),
        database_status(&config.database.path).await,
    ])
}

/// Create `path` when missing and bump its modification time.
fn touch(path: &Path) -> std::io::Result<()> {
    std::fs::OpenOptions::new()
        .create(true)
        .truncate(false)
        .write(true)
        .open(path)?
        .set_modified(std::time::SystemTime::now())
}

// ---------------------------------------------------------------------------
// Subcommand
// ---------------------------------------------------------------------------

/// Print the report. Returns whether every item is green.
pub async fn cmd_status(config: &AppConfig, ready_file: Option<&Path>) -> Result<bool> {
    let report = collect(config).await;
    println!(
        "{}",
        serde_json::to_string_pretty(&report).context("failed to encode status report")?
    );

    let ok = report.all_green();
    if ok {
        if let Some(path) = ready_file {
            touch(path).with_context(|| format!("failed to touch {}", path.display()))?;
            info!(path = %path.display(), "all green, ready file touched");
        }
    } else {
        let failing: Vec<&str> = report
            .items
            .iter()
            .filter(|i| i.status != Status::Green)
            .map(|i| i.identifier)
            .collect();
        warn!(
            checked_at = %chrono::Utc::now().to_rfc3339(),
            ?failing,
            "status not OK"
        );
    }
    Ok(ok)
}
