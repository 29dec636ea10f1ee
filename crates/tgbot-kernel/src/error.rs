//! Kernel error types.
//!
//! All kernel subsystems surface errors through [`KernelError`], which is the
//! single error type returned by every public API in this crate, and the
//! error type command handlers return.

use tgbot_adapters::AdapterError;
use tgbot_store::StoreError;

/// Unified error type for the command kernel.
#[derive(Debug, thiserror::Error)]
pub enum KernelError {
    // -- Registry errors ----------------------------------------------------
    /// A command with this name is already registered.
    #[error("command already registered: /{name}")]
    DuplicateCommand { name: String },

    /// The command name cannot be registered.
    #[error("invalid command name `{name}`: {reason}")]
    InvalidCommandName { name: String, reason: String },

    // -- Handler errors -----------------------------------------------------
    /// A handler gave up on an invocation.
    #[error("handler for /{command} failed: {reason}")]
    Handler { command: String, reason: String },

    // -- Upstream crate errors ----------------------------------------------
    /// An error propagated from the store crate.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Sending a message failed.
    #[error("messenger error: {0}")]
    Messenger(#[from] AdapterError),
}

/// Convenience alias used throughout the kernel crate.
pub type Result<T> = std::result::Result<T, KernelError>;
