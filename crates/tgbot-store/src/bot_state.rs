//! Key-value store for persistent bot state.
//!
//! Holds simple string pairs in the `BotState` table. The Telegram polling
//! offset lives here so a restart does not replay old updates.

use tracing::{debug, instrument};

use crate::error::StoreResult;
use crate::record::Record;
use crate::records::RecordStore;
use crate::schema::BOT_STATE_TABLE;

/// Key under which the next `getUpdates` offset is stored.
pub const POLL_OFFSET_KEY: &str = "telegram.offset";

/// Persistent key-value store for bot state.
#[derive(Clone)]
pub struct BotStateStore {
    records: RecordStore,
}

impl BotStateStore {
    pub fn new(records: RecordStore) -> Self {
        Self { records }
    }

    fn key(key: &str) -> Record {
        Record::new().with("key", key)
    }

    /// Get a value by key, returning `None` if not found.
    #[instrument(skip(self))]
    pub async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        let value = self
            .records
            .select_scalar(BOT_STATE_TABLE, "value", Some(&Self::key(key)))
            .await?;
        Ok(value.and_then(|v| v.as_str().map(str::to_owned)))
    }

    /// Set a value for a key (insert or update).
    #[instrument(skip(self, value))]
    pub async fn set(&self, key: &str, value: &str) -> StoreResult<()> {
        let record = Self::key(key).with("value", value);
        self.records
            .upsert(BOT_STATE_TABLE, &record, Some(&Self::key(key)))
            .await?;
        debug!(key, "bot state updated");
        Ok(())
    }

    /// Delete a key, returning `true` if it existed.
    #[instrument(skip(self))]
    pub async fn delete(&self, key: &str) -> StoreResult<bool> {
        let deleted = self
            .records
            .delete_where(BOT_STATE_TABLE, &Self::key(key))
            .await?;
        Ok(deleted > 0)
    }

    /// Get a value parsed as i64, returning `None` if not found or unparseable.
    pub async fn get_i64(&self, key: &str) -> StoreResult<Option<i64>> {
        let val = self.get(key).await?;
        Ok(val.and_then(|v| v.parse().ok()))
    }

    /// Set an i64 value.
    pub async fn set_i64(&self, key: &str, value: i64) -> StoreResult<()> {
        self.set(key, &value.to_string()).await
    }
}

// ── tests ────────────────────────────────────────────────────────────
