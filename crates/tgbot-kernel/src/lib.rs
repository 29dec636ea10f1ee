//! # tgbot-kernel
//!
//! Command kernel for tgbot.
//!
//! Provides:
//!
//! - **Registry** -- ordered table of named commands with argument-count
//!   preconditions and help text.
//! - **Dispatcher** -- parses command messages, enforces preconditions,
//!   runs handlers and contains their failures.
//! - **Broadcast** -- fan a message out to every known user.
//! - **Built-ins** -- `/start` and `/help`.

pub mod broadcast;
pub mod builtin;
pub mod context;
pub mod dispatcher;
pub mod error;
pub mod help;
pub mod registry;

// Re-export the most commonly used types at the crate root.
pub use broadcast::{BroadcastReport, DEFAULT_BROADCAST_CONCURRENCY, broadcast};
pub use builtin::{BuiltinOptions, register_builtins};
pub use context::{CommandContext, Sender};
pub use dispatcher::{DispatchOutcome, Dispatcher, ParsedCommand, parse_command};
pub use error::{KernelError, Result};
pub use help::{render_brief, render_full, render_listing};
pub use registry::{
    CommandDescriptor, CommandHandler, CommandHelp, CommandInvocation, CommandRegistry,
};
