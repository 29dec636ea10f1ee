//! # tgbot-store
//!
//! Storage engine for tgbot.
//!
//! Turns value-typed record descriptions into bound SQL, runs scripts of
//! classified statements against an embedded SQLite file, and layers CRUD
//! operations and typed table views on top.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │  UserStore / BotStateStore (typed)      │
//! ├─────────────────────────────────────────┤
//! │  RecordStore (insert/upsert/select/del) │
//! ├─────────────────────────────────────────┤
//! │  Statement + Envelope (classify, run)   │
//! │  SqlValue  (literal / bound parameter)  │
//! ├─────────────────────────────────────────┤
//! │  Database (rusqlite WAL, spawn_blocking)│
//! └─────────────────────────────────────────┘
//! ```
//!
//! ## Quick start
//!
//! ```ignore
//! use tgbot_store::{Database, Record, RecordStore};
//!
//! let db = Database::open_and_bootstrap("tgbot.db").await?;
//! let records = RecordStore::new(db.clone());
//! records
//!     .upsert("User", &Record::new().with("userID", 42_i64), Some(&Record::new().with("userID", 42_i64)))
//!     .await?;
//! ```

pub mod bot_state;
pub mod db;
pub mod error;
pub mod record;
pub mod records;
pub mod schema;
pub mod script;
pub mod users;
pub mod value;

// ── re-exports ───────────────────────────────────────────────────────

pub use bot_state::{BotStateStore, POLL_OFFSET_KEY};
pub use db::Database;
pub use error::{StoreError, StoreResult};
pub use record::{Predicate, Record};
pub use records::{RecordStore, UpsertOutcome, identifier};
pub use schema::{BOT_STATE_TABLE, USER_TABLE};
pub use script::{Envelope, Statement, StatementKind, classify, split_statements};
pub use users::{BotUser, Recipient, UserStore};
pub use value::{CURRENT_TIMESTAMP, SqlValue};
