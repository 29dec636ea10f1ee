//! Command registry.
//!
//! A strategy table from command name to `{descriptor, handler}`. Commands
//! are registered once at startup and kept in registration order, which is
//! the order `/help` lists them in. After startup the registry is frozen
//! inside the [`Dispatcher`](crate::Dispatcher) and only read.
//!
//! # Example
//!
//! ```rust
//! # use tgbot_kernel::{CommandDescriptor, CommandHelp, CommandInvocation, CommandRegistry};
//! let mut registry = CommandRegistry::new();
//! registry
//!     .register(
//!         CommandDescriptor::new("ping", CommandHelp::new("Check the bot is alive", "/ping")),
//!         |inv: CommandInvocation| async move { inv.ctx.reply("pong").await },
//!     )
//!     .unwrap();
//! assert!(registry.get("ping").is_some());
//! ```

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use tgbot_store::RecordStore;

use crate::context::CommandContext;
use crate::error::{KernelError, Result};

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

/// Help text of a command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommandHelp {
    /// One-line description.
    pub info: String,
    /// How to call it, e.g. `/remind <minutes> <text>`.
    pub usage: String,
    pub example: Option<String>,
}

impl CommandHelp {
    pub fn new(info: impl Into<String>, usage: impl Into<String>) -> Self {
        Self {
            info: info.into(),
            usage: usage.into(),
            example: None,
        }
    }

    #[must_use]
    pub fn with_example(mut self, example: impl Into<String>) -> Self {
        self.example = Some(example.into());
        self
    }
}

/// Static description of a registered command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommandDescriptor {
    /// Name without the leading slash. Case-sensitive.
    pub name: String,
    /// Arguments required before the handler runs.
    pub min_args: usize,
    pub help: CommandHelp,
}

impl CommandDescriptor {
    pub fn new(name: impl Into<String>, help: CommandHelp) -> Self {
        Self {
            name: name.into(),
            min_args: 0,
            help,
        }
    }

    #[must_use]
    pub fn with_min_args(mut self, min_args: usize) -> Self {
        self.min_args = min_args;
        self
    }
}

/// Everything a handler gets for one invocation.
pub struct CommandInvocation {
    pub store: RecordStore,
    pub ctx: CommandContext,
    /// Command name as registered.
    pub command: String,
    /// Space-separated tokens after the command.
    pub args: Vec<String>,
    /// The full registry, for commands that describe other commands.
    pub registry: Arc<CommandRegistry>,
}

/// The behaviour behind a command.
///
/// Closures `Fn(CommandInvocation) -> impl Future<Output = Result<()>>`
/// implement this trait, so most commands never name it.
#[async_trait]
pub trait CommandHandler: Send + Sync {
    async fn handle(&self, invocation: CommandInvocation) -> Result<()>;
}

#[async_trait]
impl<F, Fut> CommandHandler for F
where
    F: Fn(CommandInvocation) -> Fut + Send + Sync,
    Fut: Future<Output = Result<()>> + Send + 'static,
{
    async fn handle(&self, invocation: CommandInvocation) -> Result<()> {
        (self)(invocation).await
    }
}

struct Entry {
    descriptor: CommandDescriptor,
    handler: Arc<dyn CommandHandler>,
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// Ordered command table.
#[derive(Default)]
pub struct CommandRegistry {
    entries: Vec<Entry>,
    index: HashMap<String, usize>,
}

impl std::fmt::Debug for CommandRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.entries.iter().map(|e| &e.descriptor.name))
            .finish()
    }
}

impl CommandRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a command and return its descriptor.
    ///
    /// Names must be non-empty, must not start with `/` and must not
    /// contain whitespace or `@`. Registering a name twice is an error.
    pub fn register<H>(
        &mut self,
        descriptor: CommandDescriptor,
        handler: H,
    ) -> Result<CommandDescriptor>
    where
        H: CommandHandler + 'static,
    {
        validate_name(&descriptor.name)?;
        if self.index.contains_key(&descriptor.name) {
            return Err(KernelError::DuplicateCommand {
                name: descriptor.name,
            });
        }

        tracing::info!(command = %descriptor.name, min_args = descriptor.min_args, "command registered");

        self.index
            .insert(descriptor.name.clone(), self.entries.len());
        self.entries.push(Entry {
            descriptor: descriptor.clone(),
            handler: Arc::new(handler),
        });
        Ok(descriptor)
    }

    /// Look up a command by name.
    pub fn get(&self, name: &str) -> Option<(&CommandDescriptor, Arc<dyn CommandHandler>)> {
        self.index.get(name).map(|&idx| {
            let entry = &self.entries[idx];
            (&entry.descriptor, Arc::clone(&entry.handler))
        })
    }

    /// Descriptors in registration order.
    pub fn descriptors(&self) -> impl Iterator<Item = &CommandDescriptor> {
        self.entries.iter().map(|e| &e.descriptor)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn validate_name(name: &str) -> Result<()> {
    let reason = if name.is_empty() {
        "name is empty"
    } else if name.starts_with('/') {
        "name must not include the leading slash"
    } else if name.chars().any(char::is_whitespace) {
        "name must not contain whitespace"
    } else if name.contains('@') {
        "name must not contain `@`"
    } else {
        return Ok(());
    };
    Err(KernelError::InvalidCommandName {
        name: name.to_owned(),
        reason: reason.to_owned(),
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    async fn noop(_inv: CommandInvocation) -> Result<()> {
        Ok(())
    }

    fn descriptor(name: &str) -> CommandDescriptor {
        CommandDescriptor::new(name, CommandHelp::new("info", format!("/{name}")))
    }

    #[test]
    fn registration_keeps_order() {
        let mut r = CommandRegistry::new();
        for name in ["start", "help", "alpha"] {
            r.register(descriptor(name), noop).unwrap();
        }
        let names: Vec<&str> = r.descriptors().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["start", "help", "alpha"]);
        assert_eq!(r.len(), 3);
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let mut r = CommandRegistry::new();
        r.register(descriptor("start"), noop).unwrap();
        let err = r.register(descriptor("start"), noop).unwrap_err();
        assert!(matches!(err, KernelError::DuplicateCommand { .. }));
        assert_eq!(r.len(), 1);
    }

    #[test]
    fn names_are_case_sensitive() {
        let mut r = CommandRegistry::new();
        r.register(descriptor("start"), noop).unwrap();
        r.register(descriptor("Start"), noop).unwrap();
        assert!(r.get("START").is_none());
    }

    #[test]
    fn bad_names_are_rejected() {
        let mut r = CommandRegistry::new();
        for bad in ["", "/start", "two words", "cmd@bot"] {
            assert!(
                matches!(
                    r.register(descriptor(bad), noop),
                    Err(KernelError::InvalidCommandName { .. })
                ),
                "{bad:?} should be rejected"
            );
        }
        assert!(r.is_empty());
    }

    #[test]
    fn register_returns_descriptor() {
        let mut r = CommandRegistry::new();
        let d = r
            .register(descriptor("remind").with_min_args(2), noop)
            .unwrap();
        assert_eq!(d.min_args, 2);
        assert_eq!(r.get("remind").unwrap().0, &d);
    }
}
