//! Typed view over the `User` table.
//!
//! Rows are written on a user's first `/start` and read back for greetings
//! and broadcasts. Everything goes through [`RecordStore`], so values are
//! bound and identifiers validated like any other record operation.

use chrono::NaiveDateTime;
use serde::Serialize;
use tracing::{instrument, warn};

use crate::error::{StoreError, StoreResult};
use crate::record::{Predicate, Record};
use crate::records::{RecordStore, UpsertOutcome};
use crate::schema::USER_TABLE;

/// Column names of the `User` table.
pub mod columns {
    pub const USER_ID: &str = "userID";
    pub const CHAT_ID: &str = "chatID";
    pub const USERNAME: &str = "username";
    pub const FIRST_NAME: &str = "firstname";
    pub const IS_BOT: &str = "isBot";
    pub const CREATED_DATE: &str = "createdDate";
}

/// Format SQLite uses for `CURRENT_TIMESTAMP`.
const SQLITE_TIMESTAMP: &str = "%Y-%m-%d %H:%M:%S";

/// A known bot user, and the recipient shape used by broadcasts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BotUser {
    pub user_id: i64,
    pub chat_id: i64,
    /// Telegram handle; empty when the user has none.
    pub username: String,
    pub first_name: String,
    pub is_bot: bool,
    /// Set by the database on insert; `None` for rows not yet stored.
    pub created_date: Option<NaiveDateTime>,
}

/// Broadcast recipients are plain user rows.
pub type Recipient = BotUser;

impl BotUser {
    /// Predicate selecting the row of `user_id`.
    pub fn key(user_id: i64) -> Predicate {
        Record::new().with(columns::USER_ID, user_id)
    }

    /// Record holding every writable column. `createdDate` is left to the
    /// column default.
    pub fn to_record(&self) -> Record {
        Record::new()
            .with(columns::USER_ID, self.user_id)
            .with(columns::CHAT_ID, self.chat_id)
            .with(columns::USERNAME, self.username.as_str())
            .with(columns::FIRST_NAME, self.first_name.as_str())
            .with(columns::IS_BOT, self.is_bot)
    }

    /// Decode a `User` row. Only `userID` is mandatory; missing text
    /// columns read as empty and a missing chat id falls back to the user id
    /// (private chats share the id).
    pub fn from_record(record: &Record) -> StoreResult<Self> {
        let user_id = record.get_i64(columns::USER_ID).ok_or_else(|| {
            StoreError::InvalidArgument(format!("User row without {}", columns::USER_ID))
        })?;
        Ok(Self {
            user_id,
            chat_id: record.get_i64(columns::CHAT_ID).unwrap_or(user_id),
            username: record.get_str(columns::USERNAME).unwrap_or_default().to_owned(),
            first_name: record.get_str(columns::FIRST_NAME).unwrap_or_default().to_owned(),
            is_bot: record.get_bool(columns::IS_BOT).unwrap_or(false),
            created_date: record
                .get_str(columns::CREATED_DATE)
                .and_then(|s| NaiveDateTime::parse_from_str(s, SQLITE_TIMESTAMP).ok()),
        })
    }
}

/// Typed access to the `User` table.
#[derive(Clone)]
pub struct UserStore {
    records: RecordStore,
}

impl UserStore {
    pub fn new(records: RecordStore) -> Self {
        Self { records }
    }

    /// Look up a user by id.
    #[instrument(skip(self))]
    pub async fn find(&self, user_id: i64) -> StoreResult<Option<BotUser>> {
        self.records
            .select_one_row(USER_TABLE, &BotUser::key(user_id))
            .await?
            .map(|row| BotUser::from_record(&row))
            .transpose()
    }

    /// Insert or update the row keyed by the user's id.
    #[instrument(skip(self, user), fields(user_id = user.user_id))]
    pub async fn save(&self, user: &BotUser) -> StoreResult<UpsertOutcome> {
        self.records
            .upsert(USER_TABLE, &user.to_record(), Some(&BotUser::key(user.user_id)))
            .await
    }

    /// Every stored user. Rows that cannot be decoded are logged and skipped.
    #[instrument(skip(self))]
    pub async fn all(&self) -> StoreResult<Vec<BotUser>> {
        let rows = self.records.select_rows(USER_TABLE, None).await?;
        Ok(rows
            .iter()
            .filter_map(|row| match BotUser::from_record(row) {
                Ok(user) => Some(user),
                Err(e) => {
                    warn!(error = %e, "skipping malformed User row");
                    None
                }
            })
            .collect())
    }
}
