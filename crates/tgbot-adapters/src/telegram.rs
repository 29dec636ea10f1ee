//! Telegram Bot API client.
//!
//! Thin typed wrapper over the four Bot API methods the bot uses:
//!
//! - `getMe`: verify the token and learn the bot's username
//! - `getUpdates`: long-poll for incoming messages
//! - `sendMessage`: reply to a chat
//! - `getFile`: resolve a photo's download link
//!
//! All methods are POSTed as JSON to `{api_base}/bot{token}/{method}`.

use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tracing::{debug, warn};
use url::Url;

use crate::error::{AdapterError, Result};
use crate::traits::{Messenger, ParseMode};
use crate::types::{File, Message, Update, User};

/// Default Bot API host.
pub const TELEGRAM_API_BASE: &str = "https://api.telegram.org";

/// Maximum text length of one Telegram message.
pub const MAX_MESSAGE_LEN: usize = 4096;

/// Slack added on top of the long-poll timeout before the HTTP request
/// itself is abandoned.
const POLL_GRACE: Duration = Duration::from_secs(10);

/// Telegram Bot API client.
///
/// Cloning is cheap; clones share the HTTP connection pool.
#[derive(Clone)]
pub struct TelegramClient {
    token: String,
    api_base: Url,
    http: reqwest::Client,
}

impl std::fmt::Debug for TelegramClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramClient")
            .field("api_base", &self.api_base.as_str())
            .finish_non_exhaustive()
    }
}

impl TelegramClient {
    /// Create a client for `token` against the public Bot API.
    pub fn new(token: impl Into<String>) -> Result<Self> {
        let token = token.into();
        if token.trim().is_empty() {
            return Err(AdapterError::ConfigError("Telegram bot token is empty".into()));
        }
        let http = reqwest::Client::builder()
            .user_agent(concat!("tgbot/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| AdapterError::ConfigError(format!("failed to build HTTP client: {e}")))?;
        let api_base = Url::parse(TELEGRAM_API_BASE)
            .map_err(|e| AdapterError::ConfigError(format!("invalid API base: {e}")))?;
        Ok(Self {
            token,
            api_base,
            http,
        })
    }

    /// Point the client at a different Bot API server (self-hosted or test).
    pub fn with_api_base(mut self, base: &str) -> Result<Self> {
        self.api_base = Url::parse(base)
            .map_err(|e| AdapterError::ConfigError(format!("invalid API base `{base}`: {e}")))?;
        Ok(self)
    }

    // -----------------------------------------------------------------------
    // URL construction
    // -----------------------------------------------------------------------

    fn base(&self) -> &str {
        self.api_base.as_str().trim_end_matches('/')
    }

    /// Full URL for a Bot API method.
    pub fn api_url(&self, method: &str) -> String {
        format!("{}/bot{}/{}", self.base(), self.token, method)
    }

    /// Download URL for a `file_path` returned by `getFile`.
    pub fn file_url(&self, file_path: &str) -> String {
        format!("{}/file/bot{}/{}", self.base(), self.token, file_path)
    }

    // -----------------------------------------------------------------------
    // Response parsing
    // -----------------------------------------------------------------------

    /// Check the `ok` field of a Bot API response.
    ///
    /// Telegram responses follow the format:
    /// `{ "ok": true, "result": ... }` on success, or
    /// `{ "ok": false, "error_code": 400, "description": "..." }` on failure.
    pub fn parse_telegram_response(response: &Value, method: &str) -> Result<()> {
        let ok = response
            .get("ok")
            .and_then(|v| v.as_bool())
            .unwrap_or(false);

        if !ok {
            let code = response
                .get("error_code")
                .and_then(|v| v.as_i64())
                .unwrap_or(-1);
            let description = response
                .get("description")
                .and_then(|v| v.as_str())
                .unwrap_or("unknown error");
            return Err(AdapterError::Api {
                method: method.to_string(),
                code,
                description: description.to_string(),
            });
        }

        Ok(())
    }

    /// Extract and decode the `result` field of a successful response.
    pub fn decode_result<T: DeserializeOwned>(response: Value, method: &str) -> Result<T> {
        Self::parse_telegram_response(&response, method)?;
        let result = match response {
            Value::Object(mut map) => map.remove("result"),
            _ => None,
        }
        .ok_or_else(|| AdapterError::InvalidResponse {
            method: method.to_string(),
            reason: "missing `result` field".into(),
        })?;
        Ok(serde_json::from_value(result)?)
    }

    async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        body: Value,
        timeout: Option<Duration>,
    ) -> Result<T> {
        let url = self.api_url(method);
        debug!(method, "calling Telegram Bot API");

        let mut request = self.http.post(&url).json(&body);
        if let Some(timeout) = timeout {
            request = request.timeout(timeout);
        }

        let response = request.send().await.map_err(|e| AdapterError::RequestFailed {
            method: method.to_string(),
            reason: e.without_url().to_string(),
        })?;

        let json_resp: Value = response.json().await.map_err(|e| AdapterError::RequestFailed {
            method: method.to_string(),
            reason: format!("failed to parse response: {}", e.without_url()),
        })?;

        Self::decode_result(json_resp, method)
    }

    // -----------------------------------------------------------------------
    // Bot API methods
    // -----------------------------------------------------------------------

    /// Identify the bot behind the token.
    pub async fn get_me(&self) -> Result<User> {
        self.call("getMe", json!({}), None).await
    }

    /// Long-poll for updates with `update_id >= offset`, waiting up to
    /// `timeout_secs` for the first one.
    pub async fn get_updates(&self, offset: i64, timeout_secs: u64) -> Result<Vec<Update>> {
        let body = json!({
            "offset": offset,
            "timeout": timeout_secs,
            "allowed_updates": ["message"],
        });
        let http_timeout = Duration::from_secs(timeout_secs) + POLL_GRACE;
        self.call("getUpdates", body, Some(http_timeout)).await
    }

    /// Send one text message (at most [`MAX_MESSAGE_LEN`] bytes).
    pub async fn send_text(
        &self,
        chat_id: i64,
        text: &str,
        parse_mode: Option<ParseMode>,
    ) -> Result<Message> {
        let mut body = json!({
            "chat_id": chat_id,
            "text": text,
        });
        if let Some(mode) = parse_mode {
            body["parse_mode"] = json!(mode.as_str());
        }
        debug!(chat_id, len = text.len(), "sending Telegram message");
        self.call("sendMessage", body, None).await
    }

    /// File metadata for `file_id`.
    pub async fn get_file(&self, file_id: &str) -> Result<File> {
        self.call("getFile", json!({ "file_id": file_id }), None).await
    }

    /// Public download link for `file_id`.
    pub async fn get_file_link(&self, file_id: &str) -> Result<String> {
        let file = self.get_file(file_id).await?;
        let path = file.file_path.ok_or_else(|| AdapterError::InvalidResponse {
            method: "getFile".into(),
            reason: format!("file `{file_id}` has no file_path"),
        })?;
        Ok(self.file_url(&path))
    }
}

#[async_trait]
impl Messenger for TelegramClient {
    /// Long texts are split into several messages at line or word
    /// boundaries. Stops at the first chunk that fails.
    async fn send_message(
        &self,
        chat_id: i64,
        text: &str,
        parse_mode: Option<ParseMode>,
    ) -> Result<()> {
        let chunks = split_message(text, MAX_MESSAGE_LEN);
        let total = chunks.len();
        for (idx, chunk) in chunks.iter().enumerate() {
            if let Err(e) = self.send_text(chat_id, chunk, parse_mode).await {
                warn!(chat_id, chunk = idx + 1, total, error = %e, "failed to send message chunk");
                return Err(e);
            }
        }
        Ok(())
    }
}

/// Split `text` into chunks of at most `max_len` bytes, preferring newline
/// then space boundaries and never splitting a UTF-8 character.
pub fn split_message(text: &str, max_len: usize) -> Vec<String> {
    if text.len() <= max_len {
        return vec![text.to_owned()];
    }

    let mut chunks = Vec::new();
    let mut remaining = text;

    while !remaining.is_empty() {
        if remaining.len() <= max_len {
            chunks.push(remaining.to_owned());
            break;
        }

        let mut boundary = max_len;
        while boundary > 0 && !remaining.is_char_boundary(boundary) {
            boundary -= 1;
        }

        let mut split_at = remaining[..boundary]
            .rfind('\n')
            .unwrap_or_else(|| remaining[..boundary].rfind(' ').unwrap_or(boundary));

        // A separator at position 0 would produce an empty chunk forever.
        if split_at == 0 {
            split_at = boundary;
        }

        chunks.push(remaining[..split_at].to_owned());
        remaining = remaining[split_at..].trim_start();
    }

    chunks
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> TelegramClient {
        TelegramClient::new("123:ABC").unwrap()
    }

    #[test]
    fn empty_token_is_rejected() {
        assert!(matches!(
            TelegramClient::new("  "),
            Err(AdapterError::ConfigError(_))
        ));
    }

    #[test]
    fn api_url_constructs_correct_url() {
        assert_eq!(
            client().api_url("getMe"),
            "https://api.telegram.org/bot123:ABC/getMe"
        );
    }

    #[test]
    fn file_url_uses_file_prefix() {
        let c = client().with_api_base("http://localhost:8081/").unwrap();
        assert_eq!(
            c.file_url("photos/file_1.jpg"),
            "http://localhost:8081/file/bot123:ABC/photos/file_1.jpg"
        );
    }

    #[test]
    fn debug_output_hides_token() {
        let rendered = format!("{:?}", client());
        assert!(!rendered.contains("ABC"));
    }

    #[test]
    fn parse_telegram_response_succeeds_on_ok_true() {
        let resp = json!({"ok": true, "result": {}});
        assert!(TelegramClient::parse_telegram_response(&resp, "getMe").is_ok());
    }

    #[test]
    fn parse_telegram_response_fails_on_ok_false() {
        let resp = json!({"ok": false, "error_code": 401, "description": "Unauthorized"});
        match TelegramClient::parse_telegram_response(&resp, "getMe") {
            Err(AdapterError::Api {
                method,
                code,
                description,
            }) => {
                assert_eq!(method, "getMe");
                assert_eq!(code, 401);
                assert_eq!(description, "Unauthorized");
            }
            other => panic!("expected Api error, got {other:?}"),
        }
    }

    #[test]
    fn parse_telegram_response_fails_on_missing_ok() {
        let resp = json!({"result": []});
        assert!(TelegramClient::parse_telegram_response(&resp, "getUpdates").is_err());
    }

    #[test]
    fn decode_result_reads_typed_payload() {
        let resp = json!({
            "ok": true,
            "result": {"id": 7, "is_bot": true, "first_name": "tgbot", "username": "tg_bot"}
        });
        let me: User = TelegramClient::decode_result(resp, "getMe").unwrap();
        assert!(me.is_bot);
        assert_eq!(me.username.as_deref(), Some("tg_bot"));
    }

    #[test]
    fn decode_result_requires_result_field() {
        let resp = json!({"ok": true});
        let err = TelegramClient::decode_result::<User>(resp, "getMe").unwrap_err();
        assert!(matches!(err, AdapterError::InvalidResponse { .. }));
    }

    #[test]
    fn split_short_message_is_single_chunk() {
        assert_eq!(split_message("hello", 10), vec!["hello"]);
    }

    #[test]
    fn split_prefers_newlines() {
        let chunks = split_message("aaaa\nbbbb\ncccc", 10);
        assert_eq!(chunks, vec!["aaaa\nbbbb", "cccc"]);
    }

    #[test]
    fn split_never_breaks_characters() {
        let text = "ééééé";
        let chunks = split_message(text, 3);
        assert!(chunks.iter().all(|c| c.len() <= 3));
        assert_eq!(chunks.concat(), text);
    }
}
