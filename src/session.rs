//! One user's conversation about one document.
//!
//! The session owns the chat history, the text of the current document and
//! its cached sentiment label. History only grows until [`ChatSession::reset`];
//! nothing is persisted across restarts.

use tracing::{info, warn};

use crate::config::AssistantConfig;
use crate::error::AssistantError;
use crate::llm::{relay, ChatRequest, RelayUpdate, SharedBackend};
use crate::model::{ChatRole, ChatTurn, ExtractedDocument, Sentiment};
use crate::prompts::{build_prompt, preview, ASSISTANT_SYSTEM_PROMPT};
use crate::sentiment;

/// Prefix of the assistant turn recorded when a document question fails
pub const FAILURE_PREFIX: &str = "❌ ";

pub struct ChatSession {
    backend: SharedBackend,
    config: AssistantConfig,
    messages: Vec<ChatTurn>,
    document: Option<ExtractedDocument>,
    sentiment: Sentiment,
}

impl ChatSession {
    pub fn new(backend: SharedBackend, config: AssistantConfig) -> Self {
        Self {
            backend,
            config,
            messages: Vec::new(),
            document: None,
            sentiment: Sentiment::Neutral,
        }
    }

    /// Make `document` the chat context and cache its sentiment
    pub fn load_document(&mut self, document: ExtractedDocument) -> Sentiment {
        self.sentiment = sentiment::analyze(&document.text);
        info!(
            kind = %document.kind,
            chars = document.char_count(),
            pages = document.page_count,
            sentiment = %self.sentiment,
            "Loaded document"
        );
        self.document = Some(document);
        self.sentiment
    }

    /// Drop the current document, e.g. after a failed extraction
    pub fn clear_document(&mut self) {
        self.document = None;
        self.sentiment = Sentiment::Neutral;
    }

    /// Forget the conversation and the document
    pub fn reset(&mut self) {
        self.messages.clear();
        self.clear_document();
    }

    pub fn messages(&self) -> &[ChatTurn] {
        &self.messages
    }

    pub fn document(&self) -> Option<&ExtractedDocument> {
        self.document.as_ref()
    }

    pub fn context_text(&self) -> Option<&str> {
        self.document.as_ref().map(|d| d.text.as_str())
    }

    pub fn has_document(&self) -> bool {
        self.document.is_some()
    }

    pub fn sentiment(&self) -> Sentiment {
        self.sentiment
    }

    pub fn config(&self) -> &AssistantConfig {
        &self.config
    }

    /// Set the model used for later questions
    pub fn set_model(&mut self, model: impl Into<String>) {
        self.config.model = model.into();
    }

    /// Preview of the document text, cut at the configured limit
    pub fn preview(&self) -> Option<String> {
        self.context_text()
            .map(|text| preview(text, self.config.preview_limit))
    }

    /// The prompt that `ask` would send for `question`
    pub fn prompt_for(&self, question: &str) -> String {
        build_prompt(
            question,
            self.context_text(),
            self.sentiment,
            self.config.context_limit,
        )
    }

    /// Ask a question about the loaded document (or a general one without).
    ///
    /// The question is recorded before the request goes out. On success the
    /// reply is recorded; on failure the error message is recorded as the
    /// assistant turn, exactly as it was shown, and the error is returned.
    pub async fn ask<F>(&mut self, question: &str, on_update: F) -> Result<String, AssistantError>
    where
        F: FnMut(RelayUpdate<'_>),
    {
        let request = ChatRequest::new(self.config.model.clone(), self.prompt_for(question));
        self.messages.push(ChatTurn::user(question));
        self.exchange(request, on_update, true).await
    }

    /// Plain conversation without document grounding.
    ///
    /// Sends the assistant system prompt and the earlier turns as history.
    /// Failure turns are never sent, and a failed reply records nothing.
    pub async fn chat<F>(&mut self, input: &str, on_update: F) -> Result<String, AssistantError>
    where
        F: FnMut(RelayUpdate<'_>),
    {
        let history = self
            .messages
            .iter()
            .filter(|turn| !is_failure_turn(turn))
            .cloned()
            .collect();
        let request = ChatRequest::new(self.config.model.clone(), input)
            .with_system(ASSISTANT_SYSTEM_PROMPT)
            .with_history(history);
        self.messages.push(ChatTurn::user(input));
        self.exchange(request, on_update, false).await
    }

    async fn exchange<F>(
        &mut self,
        request: ChatRequest,
        on_update: F,
        record_failure: bool,
    ) -> Result<String, AssistantError>
    where
        F: FnMut(RelayUpdate<'_>),
    {
        let outcome = match self.backend.stream_completion(request).await {
            Ok(deltas) => relay(deltas, on_update).await,
            Err(e) => Err(e),
        };

        match outcome {
            Ok(reply) => {
                self.messages.push(ChatTurn::assistant(reply.clone()));
                Ok(reply)
            }
            Err(e) => {
                warn!(backend = self.backend.name(), error = %e, "Chat request failed");
                if record_failure {
                    self.messages
                        .push(ChatTurn::assistant(format!("{}{}", FAILURE_PREFIX, e)));
                }
                Err(e)
            }
        }
    }
}

fn is_failure_turn(turn: &ChatTurn) -> bool {
    turn.role == ChatRole::Assistant && turn.content.starts_with(FAILURE_PREFIX)
}
