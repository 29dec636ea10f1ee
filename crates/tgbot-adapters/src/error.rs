//! Adapter error types.
//!
//! All messaging operations surface errors through [`AdapterError`]. Each
//! variant carries the Bot API method involved so callers can log a useful
//! line without inspecting opaque strings.

/// Unified error type for tgbot adapters.
#[derive(Debug, thiserror::Error)]
pub enum AdapterError {
    /// Telegram answered with `ok: false`.
    #[error("Telegram API error in `{method}` (code {code}): {description}")]
    Api {
        method: String,
        code: i64,
        description: String,
    },

    /// The HTTP request could not be sent or its body could not be read.
    #[error("request to `{method}` failed: {reason}")]
    RequestFailed { method: String, reason: String },

    /// The response did not have the expected shape.
    #[error("unexpected response from `{method}`: {reason}")]
    InvalidResponse { method: String, reason: String },

    /// JSON serialization or deserialization failed.
    #[error("serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// Configuration error in adapter setup.
    #[error("configuration error: {0}")]
    ConfigError(String),
}

/// Convenience alias used throughout the adapters crate.
pub type Result<T> = std::result::Result<T, AdapterError>;
