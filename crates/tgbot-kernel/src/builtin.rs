//! Commands every deployment has: `/start` and `/help`.

use tgbot_adapters::ParseMode;
use tgbot_store::{BotUser, UserStore};
use tracing::info;

use crate::broadcast::{DEFAULT_BROADCAST_CONCURRENCY, broadcast};
use crate::error::Result;
use crate::help::render_listing;
use crate::registry::{CommandDescriptor, CommandHelp, CommandInvocation, CommandRegistry};

/// Reply to a user who is already known.
pub fn welcome_back(first_name: &str) -> String {
    format!("Welcome back, {first_name}!")
}

/// Reply to a user seen for the first time.
pub const ACTIVATED: &str = "TGBot activated!";

/// Announcement sent to everyone else when a new user arrives.
pub fn new_user_announcement(first_name: &str, username: &str) -> String {
    format!("{first_name} ({username}) started using TGBOT")
}

/// Knobs for the built-in commands.
#[derive(Debug, Clone, Copy)]
pub struct BuiltinOptions {
    pub broadcast_concurrency: usize,
}

impl Default for BuiltinOptions {
    fn default() -> Self {
        Self {
            broadcast_concurrency: DEFAULT_BROADCAST_CONCURRENCY,
        }
    }
}

/// Register `/start` then `/help`. Returns their descriptors.
pub fn register_builtins(
    registry: &mut CommandRegistry,
    options: BuiltinOptions,
) -> Result<Vec<CommandDescriptor>> {
    let concurrency = options.broadcast_concurrency;

    let start_cmd = registry.register(
        CommandDescriptor::new(
            "start",
            CommandHelp::new("Start using Telegram bot.", "/start"),
        ),
        move |inv: CommandInvocation| start(inv, concurrency),
    )?;

    let help_cmd = registry.register(
        CommandDescriptor::new("help", CommandHelp::new("Show this command", "/help")),
        help,
    )?;

    Ok(vec![start_cmd, help_cmd])
}

/// Greet a returning user, or announce, activate and store a new one.
async fn start(inv: CommandInvocation, concurrency: usize) -> Result<()> {
    let users = UserStore::new(inv.store.clone());
    let sender = &inv.ctx.sender;

    if users.find(sender.id).await?.is_some() {
        return inv.ctx.reply(&welcome_back(&sender.first_name)).await;
    }

    let username = sender.username.clone().unwrap_or_default();
    let report = broadcast(
        &users,
        inv.ctx.messenger(),
        &new_user_announcement(&sender.first_name, &username),
        Some(sender.id),
        concurrency,
    )
    .await;

    let replied = inv.ctx.reply(ACTIVATED).await;

    users
        .save(&BotUser {
            user_id: sender.id,
            chat_id: inv.ctx.chat_id,
            username,
            first_name: sender.first_name.clone(),
            is_bot: sender.is_bot,
            created_date: None,
        })
        .await?;

    info!(
        user_id = sender.id,
        announced_to = report.sent,
        "new user activated"
    );
    replied
}

async fn help(inv: CommandInvocation) -> Result<()> {
    let listing = render_listing(inv.registry.descriptors());
    inv.ctx
        .reply_with(&listing, Some(ParseMode::Markdown))
        .await
}
