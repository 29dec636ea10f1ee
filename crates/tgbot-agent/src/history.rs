//! Per-user conversation history.
//!
//! Every Telegram user gets an independent, bounded message log. Updates
//! are handled on separate tasks, so the map is a `DashMap` and each user's
//! entry is locked only for the duration of one push or snapshot.

use dashmap::DashMap;

use crate::llm::types::Message;

/// Default number of messages kept per user.
pub const DEFAULT_HISTORY_WINDOW: usize = 20;

/// Bounded conversation logs keyed by user id.
#[derive(Debug)]
pub struct ConversationHistory {
    logs: DashMap<i64, Vec<Message>>,
    window: usize,
}

impl Default for ConversationHistory {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_WINDOW)
    }
}

impl ConversationHistory {
    /// Keep at most `window` messages per user (at least one).
    pub fn new(window: usize) -> Self {
        Self {
            logs: DashMap::new(),
            window: window.max(1),
        }
    }

    pub fn window(&self) -> usize {
        self.window
    }

    /// Append a message, dropping the oldest ones beyond the window.
    pub fn push(&self, user_id: i64, message: Message) {
        let mut log = self.logs.entry(user_id).or_default();
        log.push(message);
        let excess = log.len().saturating_sub(self.window);
        if excess > 0 {
            log.drain(..excess);
        }
    }

    /// A copy of the user's messages, oldest first.
    pub fn snapshot(&self, user_id: i64) -> Vec<Message> {
        self.logs
            .get(&user_id)
            .map(|log| log.value().clone())
            .unwrap_or_default()
    }

    /// Forget everything about one user.
    pub fn clear(&self, user_id: i64) {
        self.logs.remove(&user_id);
    }

    /// Number of users with a non-empty history.
    pub fn users(&self) -> usize {
        self.logs.len()
    }
}
