//! # tgbot-adapters
//!
//! Messaging adapters for tgbot.
//!
//! The [`Messenger`] trait is the only outbound seam command handlers see.
//! [`TelegramClient`] implements it over the Telegram Bot API and also
//! exposes the inbound side (`getUpdates`) and file link resolution used by
//! the polling loop and photo handling.

pub mod error;
pub mod telegram;
pub mod traits;
pub mod types;

pub use error::{AdapterError, Result};
pub use telegram::{MAX_MESSAGE_LEN, TELEGRAM_API_BASE, TelegramClient, split_message};
pub use traits::{Messenger, ParseMode};
pub use types::{Chat, File, Message, PhotoSize, Update, User};
