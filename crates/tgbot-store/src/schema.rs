//! Startup schema: every table the bot needs, created if missing.
//!
//! Bootstrap runs once before any command is registered. Each table is
//! created by its own script so a failure names the offending table.

use tracing::{debug, info};

use crate::db::Database;
use crate::error::{StoreError, StoreResult};
use crate::script::Envelope;

/// Table holding one row per known Telegram user.
pub const USER_TABLE: &str = "User";

/// Key/value table for bot-level state such as the polling offset.
pub const BOT_STATE_TABLE: &str = "BotState";

struct TableDef {
    name: &'static str,
    sql: &'static str,
}

static TABLES: &[TableDef] = &[
    TableDef {
        name: USER_TABLE,
        sql: r#"
            CREATE TABLE IF NOT EXISTS User (
                userID      INTEGER PRIMARY KEY,
                chatID      INTEGER,
                username    TEXT,
                firstname   TEXT,
                isBot       BOOLEAN,
                createdDate TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
            )
        "#,
    },
    TableDef {
        name: BOT_STATE_TABLE,
        sql: r#"
            CREATE TABLE IF NOT EXISTS BotState (
                key   TEXT PRIMARY KEY,
                value TEXT NOT NULL
            )
        "#,
    },
];

/// Create every missing table. Existing tables and their rows are left
/// untouched, so running this twice is harmless.
pub async fn bootstrap(db: &Database) -> StoreResult<()> {
    for table in TABLES {
        debug!(table = table.name, "ensuring table exists");
        if let Envelope::Error(e) = db.run_script(table.sql).await {
            return Err(StoreError::Bootstrap {
                table: table.name,
                message: e.to_string(),
            });
        }
    }
    info!(tables = TABLES.len(), "schema bootstrap complete");
    Ok(())
}
