//! OpenAI-compatible chat completion client.
//!
//! Targets the **OpenAI Chat Completions API** and any endpoint that speaks
//! the same protocol (Azure proxies, Ollama, vLLM, Together). Requests are
//! non-streaming; the answer is the text of the first choice.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use serde_json::{Value, json};

use crate::error::{AgentError, Result};
use crate::llm::types::ChatRequest;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Default OpenAI API base URL.
pub const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

/// Default model for text conversations.
pub const DEFAULT_CHAT_MODEL: &str = "gpt-3.5-turbo-1106";

/// Default model for image understanding.
pub const DEFAULT_VISION_MODEL: &str = "gpt-4o-mini";

/// Whole-request timeout for completion calls.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

// ---------------------------------------------------------------------------
// Client configuration
// ---------------------------------------------------------------------------

/// Configuration for one completion endpoint.
#[derive(Debug, Clone)]
pub struct LlmClientConfig {
    /// API key sent as a bearer token.
    pub api_key: String,
    /// Base URL for the API (e.g. `https://api.openai.com/v1`).
    pub base_url: String,
    /// Model used when a request leaves `model` empty.
    pub default_model: String,
    /// Default maximum tokens per response; `None` leaves it to the server.
    pub max_tokens: Option<u32>,
}

impl LlmClientConfig {
    /// Create a configuration for the OpenAI API.
    pub fn openai(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self::openai_compatible(api_key, model, OPENAI_BASE_URL)
    }

    /// Create a configuration for any OpenAI-compatible API.
    pub fn openai_compatible(
        api_key: impl Into<String>,
        model: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: base_url.into(),
            default_model: model.into(),
            max_tokens: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Completion seam
// ---------------------------------------------------------------------------

/// Something that turns a conversation into the model's next answer.
#[async_trait]
pub trait Completion: Send + Sync {
    /// Run `request` and return the answer text.
    async fn complete(&self, request: &ChatRequest) -> Result<String>;
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// HTTP client for the Chat Completions endpoint.
///
/// Cloning is cheap; clones share the connection pool.
#[derive(Clone)]
pub struct LlmClient {
    config: LlmClientConfig,
    http: reqwest::Client,
}

impl std::fmt::Debug for LlmClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmClient")
            .field("base_url", &self.config.base_url)
            .field("default_model", &self.config.default_model)
            .finish_non_exhaustive()
    }
}

impl LlmClient {
    /// Create a new client with the given configuration.
    pub fn new(config: LlmClientConfig) -> Result<Self> {
        if config.api_key.trim().is_empty() {
            return Err(AgentError::MissingApiKey {
                provider: "openai".into(),
            });
        }
        if config.base_url.trim().is_empty() {
            return Err(AgentError::ConfigError {
                reason: "completion base URL is empty".into(),
            });
        }

        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| AgentError::LlmRequestFailed {
                reason: format!("failed to build HTTP client: {e}"),
            })?;

        Ok(Self { config, http })
    }

    /// The model used when a request does not name one.
    pub fn default_model(&self) -> &str {
        &self.config.default_model
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/chat/completions",
            self.config.base_url.trim_end_matches('/')
        )
    }

    // -- Request building ----------------------------------------------------

    /// Build the JSON body for the Chat Completions API.
    pub fn build_request_body(&self, request: &ChatRequest) -> Result<Value> {
        let model = if request.model.is_empty() {
            self.config.default_model.as_str()
        } else {
            request.model.as_str()
        };

        let mut body = json!({
            "model": model,
            "messages": serde_json::to_value(&request.messages)?,
            "n": 1,
            "stream": false,
        });

        if let Some(max) = request.max_tokens.or(self.config.max_tokens) {
            body["max_tokens"] = json!(max);
        }
        if let Some(temp) = request.temperature {
            body["temperature"] = json!(temp);
        }
        if let Some(p) = request.presence_penalty {
            body["presence_penalty"] = json!(p);
        }
        if let Some(p) = request.frequency_penalty {
            body["frequency_penalty"] = json!(p);
        }

        Ok(body)
    }

    /// Send the HTTP request to the Chat Completions endpoint.
    async fn send_request(&self, body: &Value) -> Result<reqwest::Response> {
        let url = self.endpoint();

        let mut headers = HeaderMap::new();
        let auth_value = format!("Bearer {}", self.config.api_key);
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&auth_value).map_err(|e| AgentError::LlmRequestFailed {
                reason: format!("invalid authorization header: {e}"),
            })?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        tracing::debug!(url = %url, model = %body["model"], "sending completion request");

        self.http
            .post(&url)
            .headers(headers)
            .json(body)
            .send()
            .await
            .map_err(|e| AgentError::LlmRequestFailed {
                reason: e.without_url().to_string(),
            })
    }
}

#[async_trait]
impl Completion for LlmClient {
    async fn complete(&self, request: &ChatRequest) -> Result<String> {
        let body = self.build_request_body(request)?;
        let resp = self.send_request(&body).await?;

        let status = resp.status();
        let text = resp
            .text()
            .await
            .map_err(|e| AgentError::LlmRequestFailed {
                reason: format!("failed to read response body: {e}"),
            })?;

        if !status.is_success() {
            return Err(AgentError::LlmRequestFailed {
                reason: format!("API returned {status}: {text}"),
            });
        }

        let v: Value = serde_json::from_str(&text).map_err(|e| AgentError::LlmParseFailed {
            reason: format!("invalid JSON response: {e}"),
        })?;

        parse_openai_response(&v)
    }
}

/// Extract the answer text from a Chat Completions response.
pub fn parse_openai_response(v: &Value) -> Result<String> {
    let message = &v["choices"][0]["message"];

    if message.is_null() {
        return Err(AgentError::LlmParseFailed {
            reason: "missing `choices[0].message` in response".into(),
        });
    }

    match &message["content"] {
        Value::String(s) => Ok(s.clone()),
        Value::Null => Err(AgentError::LlmParseFailed {
            reason: "answer has no text content".into(),
        }),
        other => Err(AgentError::LlmParseFailed {
            reason: format!("unexpected content type: {other}"),
        }),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
