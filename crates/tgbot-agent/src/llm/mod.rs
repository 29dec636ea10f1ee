//! LLM integration layer.
//!
//! - [`types`] -- Messages, multi-part content and the request shape.
//! - [`client`] -- HTTP client for OpenAI-compatible completion endpoints.

pub mod client;
pub mod types;

pub use client::{
    Completion, DEFAULT_CHAT_MODEL, DEFAULT_VISION_MODEL, LlmClient, LlmClientConfig,
    OPENAI_BASE_URL, parse_openai_response,
};
pub use types::{ChatRequest, Content, ContentPart, ImageUrl, Message, Role};
