//! Subcommand: `tgbot run` -- the Telegram polling loop.
//!
//! Long-polls `getUpdates`, persists the offset after every update and
//! handles each message on its own task: commands go to the dispatcher,
//! everything else (and commands nobody registered) to the chat handler.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tgbot_adapters::{Message, Messenger, TelegramClient};
use tgbot_agent::{Completion, ConversationHistory, LlmClient, LlmClientConfig};
use tgbot_kernel::{
    BuiltinOptions, CommandContext, CommandRegistry, DispatchOutcome, Dispatcher, Sender,
    register_builtins,
};
use tgbot_store::{BotStateStore, Database, POLL_OFFSET_KEY, RecordStore};
use tracing::{debug, info, warn};

use crate::chat::{ChatHandler, ERROR_REPLY};
use crate::config::AppConfig;
use crate::helpers::install_panic_hook;

/// Pause after a failed poll.
const POLL_RETRY_DELAY: Duration = Duration::from_secs(5);

/// Everything an update task needs.
struct Services {
    telegram: Arc<TelegramClient>,
    dispatcher: Dispatcher,
    chat: ChatHandler,
}

/// Run the bot until Ctrl+C.
pub async fn cmd_run(config: AppConfig) -> Result<()> {
    install_panic_hook();
    info!("starting tgbot");

    let token = config.telegram_token()?;
    let telegram = Arc::new(
        TelegramClient::new(token)
            .and_then(|c| c.with_api_base(&config.telegram.api_base))
            .context("failed to create Telegram client")?,
    );

    let me = telegram
        .get_me()
        .await
        .context("failed to verify the bot token with getMe")?;
    let bot_username = me.username.clone().unwrap_or_default();

    // Storage must be ready before any command is registered.
    let db = Database::open_and_bootstrap(config.database.path.clone())
        .await
        .with_context(|| format!("failed to open database {}", config.database.path.display()))?;
    let records = RecordStore::new(db);
    info!(path = %config.database.path.display(), "store initialized");

    let mut registry = CommandRegistry::new();
    let builtins = register_builtins(
        &mut registry,
        BuiltinOptions {
            broadcast_concurrency: config.bot.broadcast_concurrency,
        },
    )
    .context("failed to register built-in commands")?;
    info!(commands = builtins.len(), "commands registered");

    let mut dispatcher = Dispatcher::new(registry, records.clone());
    if !bot_username.is_empty() {
        dispatcher = dispatcher.with_bot_username(bot_username.as_str());
    }

    let services = Arc::new(Services {
        telegram: Arc::clone(&telegram),
        dispatcher,
        chat: build_chat_handler(&config)?,
    });

    let poll_timeout = config.telegram.poll_timeout_secs;
    println!();
    println!("  tgbot v{}", env!("CARGO_PKG_VERSION"));
    println!(
        "  OpenAI: {}",
        if services.chat.has_completion() { "configured" } else { "not configured (dummy replies)" }
    );
    println!("  Long-poll timeout: {poll_timeout}s");
    println!("  Bot is running. Send messages to @{bot_username} on Telegram.");
    println!("  Press Ctrl+C to stop.");
    println!();

    // Polling loop -- restore offset from persistent state.
    let bot_state = BotStateStore::new(records);
    let mut offset = match bot_state.get_i64(POLL_OFFSET_KEY).await {
        Ok(saved) => saved.unwrap_or(0),
        Err(e) => {
            warn!(error = %e, "could not read saved polling offset, starting from 0");
            0
        }
    };
    if offset > 0 {
        info!(offset, "restored Telegram polling offset from database");
    }

    loop {
        let updates = tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("shutdown requested");
                return Ok(());
            }
            polled = telegram.get_updates(offset, poll_timeout) => polled,
        };

        let updates = match updates {
            Ok(updates) => updates,
            Err(e) => {
                warn!(error = %e, "Telegram poll failed, retrying");
                tokio::time::sleep(POLL_RETRY_DELAY).await;
                continue;
            }
        };

        for update in updates {
            offset = update.update_id + 1;

            // Persist offset so we don't reprocess messages after a restart.
            if let Err(e) = bot_state.set_i64(POLL_OFFSET_KEY, offset).await {
                warn!(error = %e, offset, "failed to persist polling offset");
            }

            let Some(message) = update.message else {
                debug!(update_id = update.update_id, "ignoring non-message update");
                continue;
            };

            let services = Arc::clone(&services);
            tokio::spawn(async move { handle_message(&services, message).await });
        }
    }
}

/// Chat handler backed by the configured OpenAI-compatible endpoint, or the
/// dummy handler when no key is set.
fn build_chat_handler(config: &AppConfig) -> Result<ChatHandler> {
    let history = ConversationHistory::new(config.bot.history_window);

    let completion: Option<Arc<dyn Completion>> = match config.openai_key() {
        Some(key) => {
            let client = LlmClient::new(LlmClientConfig::openai_compatible(
                key,
                config.openai.chat_model.as_str(),
                config.openai.base_url.as_str(),
            ))
            .context("failed to create completion client")?;
            info!(base_url = %config.openai.base_url, model = %config.openai.chat_model, "completion client ready");
            Some(Arc::new(client))
        }
        None => {
            warn!("OPENAI_API_KEY not set, chat replies will be dummy answers");
            None
        }
    };

    Ok(ChatHandler::new(completion, history)
        .with_models(config.openai.chat_model.as_str(), config.openai.vision_model.as_str())
        .with_system_prompt(config.openai.system_prompt.as_str()))
}

/// Route one message. Failures are logged, never propagated.
async fn handle_message(services: &Services, message: Message) {
    let Some(from) = message.from.as_ref() else {
        debug!(message_id = message.message_id, "ignoring message without sender");
        return;
    };
    let chat_id = message.chat.id;
    let messenger: Arc<dyn Messenger> = services.telegram.clone();

    if let Some(text) = message.text.as_deref() {
        if message.is_command() {
            let ctx = CommandContext::new(Sender::from(from), chat_id, text, Arc::clone(&messenger));
            match services.dispatcher.dispatch(ctx).await {
                DispatchOutcome::Unknown => {}
                outcome => {
                    debug!(user_id = from.id, ?outcome, "command dispatched");
                    return;
                }
            }
        }
        if let Err(e) = services
            .chat
            .handle_text(messenger.as_ref(), from.id, chat_id, text)
            .await
        {
            warn!(user_id = from.id, chat_id, error = %e, "failed to answer text message");
        }
        return;
    }

    let Some(photo) = message.largest_photo() else {
        return;
    };
    if !services.chat.has_completion() {
        return;
    }

    let result = match services.telegram.get_file_link(&photo.file_id).await {
        Ok(url) => {
            services
                .chat
                .handle_photo(messenger.as_ref(), from.id, chat_id, &url)
                .await
        }
        Err(e) => {
            warn!(user_id = from.id, error = %e, "failed to resolve photo link");
            messenger.send_message(chat_id, ERROR_REPLY, None).await
        }
    };
    if let Err(e) = result {
        warn!(user_id = from.id, chat_id, error = %e, "failed to answer photo message");
    }
}
