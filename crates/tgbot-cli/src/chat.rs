//! Conversational handlers for messages that are not commands.
//!
//! Text goes to the chat model together with the user's history. Photos are
//! described by the vision model and the description is remembered as
//! context for later questions.

use std::sync::Arc;

use tgbot_adapters::Messenger;
use tgbot_agent::{
    ChatRequest, Completion, ConversationHistory, DEFAULT_CHAT_MODEL, DEFAULT_VISION_MODEL,
    Message,
};
use tracing::{debug, warn};

use crate::config::DEFAULT_SYSTEM_PROMPT;

/// Instruction sent with every photo.
pub const VISION_PROMPT: &str = "Tell me what do you see in this picture.";

/// Reply when a completion (or fetching its input) fails.
pub const ERROR_REPLY: &str = "An error occurred while processing your request.";

/// Reply to every text message when no API key is configured.
pub const DUMMY_REPLY: &str =
    "I'm unable to answer as I'm a dummy bot. Do you have your OpenAI credentials configured?";

const PHOTO_NOTE_PREFIX: &str =
    "User has provided a photo, and the photo contents description is here: ";

const CHAT_PRESENCE_PENALTY: f32 = 0.2;
const VISION_MAX_TOKENS: u32 = 1000;
const VISION_FREQUENCY_PENALTY: f32 = 2.0;

/// Answers free text and photos through a completion backend.
pub struct ChatHandler {
    completion: Option<Arc<dyn Completion>>,
    history: ConversationHistory,
    system_prompt: String,
    chat_model: String,
    vision_model: String,
}

impl ChatHandler {
    /// `None` for `completion` turns the handler into the dummy bot.
    pub fn new(completion: Option<Arc<dyn Completion>>, history: ConversationHistory) -> Self {
        Self {
            completion,
            history,
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_owned(),
            chat_model: DEFAULT_CHAT_MODEL.to_owned(),
            vision_model: DEFAULT_VISION_MODEL.to_owned(),
        }
    }

    #[must_use]
    pub fn with_models(mut self, chat: impl Into<String>, vision: impl Into<String>) -> Self {
        self.chat_model = chat.into();
        self.vision_model = vision.into();
        self
    }

    #[must_use]
    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = prompt.into();
        self
    }

    /// Whether a completion backend is configured.
    pub fn has_completion(&self) -> bool {
        self.completion.is_some()
    }

    pub fn history(&self) -> &ConversationHistory {
        &self.history
    }

    /// System prompt followed by the user's history.
    pub fn text_request(&self, user_id: i64) -> ChatRequest {
        let mut messages = vec![Message::system(self.system_prompt.as_str())];
        messages.extend(self.history.snapshot(user_id));
        ChatRequest {
            presence_penalty: Some(CHAT_PRESENCE_PENALTY),
            ..ChatRequest::new(messages).with_model(self.chat_model.as_str())
        }
    }

    /// A single multi-part user message asking for a description of `image_url`.
    pub fn vision_request(&self, image_url: &str) -> ChatRequest {
        ChatRequest {
            max_tokens: Some(VISION_MAX_TOKENS),
            frequency_penalty: Some(VISION_FREQUENCY_PENALTY),
            ..ChatRequest::new(vec![Message::user_with_image(VISION_PROMPT, image_url)])
                .with_model(self.vision_model.as_str())
        }
    }

    /// Answer a text message.
    ///
    /// The user's message enters the history before the completion runs and
    /// stays there even when it fails; the answer is appended only on
    /// success.
    pub async fn handle_text(
        &self,
        messenger: &dyn Messenger,
        user_id: i64,
        chat_id: i64,
        text: &str,
    ) -> tgbot_adapters::Result<()> {
        let Some(completion) = &self.completion else {
            return messenger.send_message(chat_id, DUMMY_REPLY, None).await;
        };

        self.history.push(user_id, Message::user(text));
        let request = self.text_request(user_id);
        debug!(user_id, messages = request.messages.len(), "requesting chat completion");

        match completion.complete(&request).await {
            Ok(answer) => {
                messenger.send_message(chat_id, &answer, None).await?;
                self.history.push(user_id, Message::assistant(answer));
                Ok(())
            }
            Err(e) => {
                warn!(user_id, error = %e, "chat completion failed");
                messenger.send_message(chat_id, ERROR_REPLY, None).await
            }
        }
    }

    /// Describe a photo the user sent. Without a backend photos are ignored.
    pub async fn handle_photo(
        &self,
        messenger: &dyn Messenger,
        user_id: i64,
        chat_id: i64,
        image_url: &str,
    ) -> tgbot_adapters::Result<()> {
        let Some(completion) = &self.completion else {
            return Ok(());
        };

        match completion.complete(&self.vision_request(image_url)).await {
            Ok(description) => {
                self.history.push(
                    user_id,
                    Message::system(format!("{PHOTO_NOTE_PREFIX}{description}")),
                );
                messenger.send_message(chat_id, &description, None).await
            }
            Err(e) => {
                warn!(user_id, error = %e, "vision completion failed");
                messenger.send_message(chat_id, ERROR_REPLY, None).await
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use tgbot_adapters::ParseMode;
    use tgbot_agent::{AgentError, Content, ContentPart, Role};

    use super::*;

    #[derive(Default)]
    struct Outbox(Mutex<Vec<(i64, String)>>);

    impl Outbox {
        fn texts(&self) -> Vec<String> {
            self.0.lock().unwrap().iter().map(|(_, t)| t.clone()).collect()
        }
    }

    #[async_trait]
    impl Messenger for Outbox {
        async fn send_message(
            &self,
            chat_id: i64,
            text: &str,
            _parse_mode: Option<ParseMode>,
        ) -> tgbot_adapters::Result<()> {
            self.0.lock().unwrap().push((chat_id, text.to_owned()));
            Ok(())
        }
    }

    /// Answers with a fixed string, or fails when `answer` is `None`.
    struct Scripted {
        answer: Option<&'static str>,
        seen: Mutex<Vec<ChatRequest>>,
    }

    impl Scripted {
        fn answering(answer: &'static str) -> Arc<Self> {
            Arc::new(Self {
                answer: Some(answer),
                seen: Mutex::new(Vec::new()),
            })
        }

        fn failing() -> Arc<Self> {
            Arc::new(Self {
                answer: None,
                seen: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl Completion for Scripted {
        async fn complete(&self, request: &ChatRequest) -> tgbot_agent::Result<String> {
            self.seen.lock().unwrap().push(request.clone());
            self.answer
                .map(str::to_owned)
                .ok_or_else(|| AgentError::LlmRequestFailed {
                    reason: "connection refused".into(),
                })
        }
    }

    fn handler(backend: Option<Arc<Scripted>>) -> ChatHandler {
        ChatHandler::new(
            backend.map(|b| b as Arc<dyn Completion>),
            ConversationHistory::new(10),
        )
    }

    #[tokio::test]
    async fn without_backend_every_text_gets_the_dummy_reply() {
        let chat = handler(None);
        let out = Outbox::default();
        chat.handle_text(&out, 1, 100, "hi").await.unwrap();
        chat.handle_photo(&out, 1, 100, "https://x/y.jpg").await.unwrap();
        assert_eq!(out.texts(), vec![DUMMY_REPLY.to_owned()]);
        assert_eq!(chat.history().users(), 0);
    }

    #[tokio::test]
    async fn text_goes_through_history() {
        let backend = Scripted::answering("Hello!");
        let chat = handler(Some(backend.clone()));
        let out = Outbox::default();

        chat.handle_text(&out, 7, 70, "hi").await.unwrap();
        chat.handle_text(&out, 7, 70, "again").await.unwrap();

        assert_eq!(out.texts(), vec!["Hello!", "Hello!"]);
        let seen = backend.seen.lock().unwrap();
        assert_eq!(seen[0].model, DEFAULT_CHAT_MODEL);
        assert_eq!(seen[0].presence_penalty, Some(CHAT_PRESENCE_PENALTY));
        assert_eq!(seen[0].messages[0].role, Role::System);
        assert_eq!(seen[0].messages[0].content_text(), DEFAULT_SYSTEM_PROMPT);
        // system, hi, Hello!, again
        assert_eq!(seen[1].messages.len(), 4);
        assert_eq!(seen[1].messages[2].role, Role::Assistant);
        assert_eq!(chat.history().snapshot(7).len(), 4);
    }

    #[tokio::test]
    async fn failed_completion_keeps_question_and_replies_with_error() {
        let chat = handler(Some(Scripted::failing()));
        let out = Outbox::default();
        chat.handle_text(&out, 3, 30, "question").await.unwrap();

        assert_eq!(out.texts(), vec![ERROR_REPLY.to_owned()]);
        let history = chat.history().snapshot(3);
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].role, Role::User);
    }

    #[tokio::test]
    async fn photo_description_is_replied_and_remembered() {
        let backend = Scripted::answering("A cat on a sofa.");
        let chat = handler(Some(backend.clone())).with_models("chat-m", "vision-m");
        let out = Outbox::default();

        chat.handle_photo(&out, 5, 50, "https://files/cat.jpg").await.unwrap();

        assert_eq!(out.texts(), vec!["A cat on a sofa."]);
        let history = chat.history().snapshot(5);
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].role, Role::System);
        assert!(history[0].content_text().ends_with("description is here: A cat on a sofa."));

        let seen = backend.seen.lock().unwrap();
        let request = &seen[0];
        assert_eq!(request.model, "vision-m");
        assert_eq!(request.max_tokens, Some(VISION_MAX_TOKENS));
        assert_eq!(request.frequency_penalty, Some(VISION_FREQUENCY_PENALTY));
        match &request.messages[0].content {
            Content::Parts(parts) => {
                assert!(matches!(&parts[0], ContentPart::Text { text } if text == VISION_PROMPT));
                assert!(
                    matches!(&parts[1], ContentPart::ImageUrl { image_url } if image_url.url == "https://files/cat.jpg")
                );
            }
            other => panic!("expected multi-part content, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn failed_vision_replies_with_error_and_remembers_nothing() {
        let chat = handler(Some(Scripted::failing()));
        let out = Outbox::default();
        chat.handle_photo(&out, 5, 50, "https://files/cat.jpg").await.unwrap();
        assert_eq!(out.texts(), vec![ERROR_REPLY.to_owned()]);
        assert!(chat.history().snapshot(5).is_empty());
    }

    #[test]
    fn custom_system_prompt_leads_the_request() {
        let chat = handler(None).with_system_prompt("Be brief.");
        let request = chat.text_request(1);
        assert_eq!(request.messages.len(), 1);
        assert_eq!(request.messages[0].content_text(), "Be brief.");
    }
}
