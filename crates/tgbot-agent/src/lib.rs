//! # tgbot-agent
//!
//! Conversational layer for tgbot: an OpenAI-compatible completion client
//! for text and image prompts, and bounded per-user conversation history.

pub mod error;
pub mod history;
pub mod llm;

pub use error::{AgentError, Result};
pub use history::{ConversationHistory, DEFAULT_HISTORY_WINDOW};
pub use llm::{
    ChatRequest, Completion, Content, ContentPart, DEFAULT_CHAT_MODEL, DEFAULT_VISION_MODEL,
    ImageUrl, LlmClient, LlmClientConfig, Message, OPENAI_BASE_URL, Role,
};
