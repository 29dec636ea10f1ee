//! Per-message context handed to command handlers.

use std::sync::Arc;

use tgbot_adapters::{Messenger, ParseMode};

use crate::error::Result;

/// The Telegram user who sent a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sender {
    pub id: i64,
    pub is_bot: bool,
    pub first_name: String,
    pub username: Option<String>,
}

impl From<&tgbot_adapters::User> for Sender {
    fn from(user: &tgbot_adapters::User) -> Self {
        Self {
            id: user.id,
            is_bot: user.is_bot,
            first_name: user.first_name.clone(),
            username: user.username.clone(),
        }
    }
}

/// Who sent a message, where it came from, and a way to answer.
#[derive(Clone)]
pub struct CommandContext {
    pub sender: Sender,
    pub chat_id: i64,
    pub text: String,
    messenger: Arc<dyn Messenger>,
}

impl std::fmt::Debug for CommandContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandContext")
            .field("sender", &self.sender)
            .field("chat_id", &self.chat_id)
            .field("text", &self.text)
            .finish_non_exhaustive()
    }
}

impl CommandContext {
    pub fn new(
        sender: Sender,
        chat_id: i64,
        text: impl Into<String>,
        messenger: Arc<dyn Messenger>,
    ) -> Self {
        Self {
            sender,
            chat_id,
            text: text.into(),
            messenger,
        }
    }

    /// The messenger replies go through.
    pub fn messenger(&self) -> &dyn Messenger {
        self.messenger.as_ref()
    }

    /// Reply with plain text to the originating chat.
    pub async fn reply(&self, text: &str) -> Result<()> {
        self.reply_with(text, None).await
    }

    /// Reply to the originating chat with an explicit parse mode.
    pub async fn reply_with(&self, text: &str, parse_mode: Option<ParseMode>) -> Result<()> {
        self.messenger
            .send_message(self.chat_id, text, parse_mode)
            .await?;
        Ok(())
    }
}
