//! Command dispatcher.
//!
//! For every command message the dispatcher:
//!
//! 1. parses `/name[@bot] arg arg …` into a name and argument tokens,
//! 2. looks the name up in the frozen [`CommandRegistry`],
//! 3. answers with the command's help when too few arguments were given,
//! 4. otherwise runs the handler, containing any error or panic.
//!
//! Nothing that happens inside a handler can take the caller down.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use tgbot_adapters::ParseMode;
use tgbot_store::RecordStore;
use tracing::{debug, error, warn};

use crate::context::CommandContext;
use crate::help::render_full;
use crate::registry::{CommandInvocation, CommandRegistry};

/// What happened to one command message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// The handler ran to completion.
    Handled,
    /// Too few arguments; help was sent instead.
    HelpShown,
    /// The handler returned an error or panicked. Already logged.
    Failed,
    /// Not a command, not one of ours, or not registered.
    Unknown,
}

/// A parsed command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedCommand<'a> {
    pub name: &'a str,
    /// `bot` in `/name@bot`.
    pub mention: Option<&'a str>,
    /// Tokens after the first one produced by splitting the remainder.
    pub args: Vec<String>,
}

impl ParsedCommand<'_> {
    /// Number of argument tokens.
    pub fn arg_count(&self) -> usize {
        self.args.len()
    }
}

/// Parse a command message.
///
/// The command token runs up to the first whitespace. The rest of the text
/// is split on single spaces; the first resulting token (the empty string
/// before the separating space) is not an argument. A bare command therefore
/// has zero arguments, and consecutive spaces produce empty arguments.
pub fn parse_command(text: &str) -> Option<ParsedCommand<'_>> {
    let body = text.strip_prefix('/')?;
    let token_end = body.find(char::is_whitespace).unwrap_or(body.len());
    let (token, remainder) = body.split_at(token_end);

    let (name, mention) = match token.split_once('@') {
        Some((name, bot)) => (name, Some(bot)),
        None => (token, None),
    };
    if name.is_empty() {
        return None;
    }

    let args = remainder
        .split(' ')
        .skip(1)
        .map(str::to_owned)
        .collect();

    Some(ParsedCommand {
        name,
        mention,
        args,
    })
}

/// Routes command messages to registered handlers.
#[derive(Clone)]
pub struct Dispatcher {
    registry: Arc<CommandRegistry>,
    store: RecordStore,
    bot_username: Option<String>,
}

impl Dispatcher {
    /// Freeze `registry` and bind it to `store`.
    pub fn new(registry: CommandRegistry, store: RecordStore) -> Self {
        Self {
            registry: Arc::new(registry),
            store,
            bot_username: None,
        }
    }

    /// Ignore `/cmd@other_bot` commands addressed to a different bot.
    #[must_use]
    pub fn with_bot_username(mut self, username: impl Into<String>) -> Self {
        self.bot_username = Some(username.into());
        self
    }

    pub fn registry(&self) -> &CommandRegistry {
        &self.registry
    }

    /// Handle one message. Never fails; see [`DispatchOutcome`].
    pub async fn dispatch(&self, ctx: CommandContext) -> DispatchOutcome {
        let Some(parsed) = parse_command(&ctx.text) else {
            return DispatchOutcome::Unknown;
        };

        if let (Some(mention), Some(ours)) = (parsed.mention, self.bot_username.as_deref())
            && !mention.eq_ignore_ascii_case(ours)
        {
            debug!(command = parsed.name, mention, "command addressed to another bot");
            return DispatchOutcome::Unknown;
        }

        let Some((descriptor, handler)) = self.registry.get(parsed.name) else {
            debug!(command = parsed.name, "unknown command");
            return DispatchOutcome::Unknown;
        };

        if parsed.arg_count() < descriptor.min_args {
            debug!(
                command = %descriptor.name,
                given = parsed.arg_count(),
                required = descriptor.min_args,
                "too few arguments, replying with help"
            );
            let help = render_full(descriptor);
            if let Err(e) = ctx.reply_with(&help, Some(ParseMode::Markdown)).await {
                warn!(command = %descriptor.name, error = %e, "failed to send help");
            }
            return DispatchOutcome::HelpShown;
        }

        let command = descriptor.name.clone();
        let sender = ctx.sender.id;
        let invocation = CommandInvocation {
            store: self.store.clone(),
            args: parsed.args,
            ctx,
            command: command.clone(),
            registry: Arc::clone(&self.registry),
        };

        debug!(command = %command, sender, "dispatching command");

        match AssertUnwindSafe(handler.handle(invocation))
            .catch_unwind()
            .await
        {
            Ok(Ok(())) => DispatchOutcome::Handled,
            Ok(Err(e)) => {
                error!(command = %command, sender, error = %e, "command handler failed");
                DispatchOutcome::Failed
            }
            Err(payload) => {
                error!(
                    command = %command,
                    sender,
                    panic = %panic_message(payload.as_ref()),
                    "command handler panicked"
                );
                DispatchOutcome::Failed
            }
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_owned()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_owned()
    }
}
