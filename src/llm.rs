//! Chat backends and the streaming relay.
//!
//! Every backend turns a [`ChatRequest`] into a [`DeltaStream`] of text
//! fragments. [`relay`] drains that stream, keeps the running reply, and hands
//! each update to the caller so the front end can redraw as tokens arrive.
//!
//! Backends:
//! - [`OllamaBackend`](crate::ollama::OllamaBackend): local inference server, NDJSON stream
//! - [`OpenAiBackend`](crate::openai::OpenAiBackend): hosted chat-completion API, SSE stream
//! - [`RigBackend`]: any rig-core `CompletionModel` (OpenRouter by default), answered in one piece
//! - [`MockBackend`]: scripted replies for tests
//!
//! # Example
//! ```ignore
//! use docchat::{create_backend, AssistantConfig};
//!
//! let config = AssistantConfig::from_env();
//! let backend = create_backend(&config)?;
//! ```

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use rig::{
    client::CompletionClient,
    completion::{AssistantContent, CompletionModel},
    message::Message,
    providers::openrouter,
    OneOrMany,
};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{debug, info};

use crate::config::{AssistantConfig, BackendKind};
use crate::error::AssistantError;
use crate::model::{ChatRole, ChatTurn};
use crate::ollama::OllamaBackend;
use crate::openai::OpenAiBackend;
use crate::stream::Accumulator;

pub use crate::stream::DeltaStream;

/// One request to a chat backend
#[derive(Debug, Clone, PartialEq)]
pub struct ChatRequest {
    pub model: String,
    /// The newest user message (already templated)
    pub prompt: String,
    pub system: Option<String>,
    /// Earlier turns, oldest first, excluding `prompt`
    pub history: Vec<ChatTurn>,
}

impl ChatRequest {
    pub fn new(model: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            prompt: prompt.into(),
            system: None,
            history: Vec::new(),
        }
    }

    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    pub fn with_history(mut self, history: Vec<ChatTurn>) -> Self {
        self.history = history;
        self
    }
}

/// A source of streamed chat completions.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Short name for logs and the status line
    fn name(&self) -> &str;

    /// Start a completion and return its text deltas
    async fn stream_completion(&self, request: ChatRequest)
        -> Result<DeltaStream, AssistantError>;
}

/// Type alias for a backend shared across tasks
pub type SharedBackend = Arc<dyn ChatBackend>;

/// Progress handed to the caller after each non-empty delta
#[derive(Debug, Clone, Copy)]
pub struct RelayUpdate<'a> {
    /// The fragment that just arrived
    pub delta: &'a str,
    /// Full reply so far
    pub text: &'a str,
}

/// Drain a delta stream, reporting the running reply after every fragment.
///
/// Returns the complete reply. The first error from the stream ends the relay.
pub async fn relay<F>(mut deltas: DeltaStream, mut on_update: F) -> Result<String, AssistantError>
where
    F: FnMut(RelayUpdate<'_>),
{
    let mut reply = Accumulator::new();
    while let Some(delta) = deltas.next().await {
        let delta = delta?;
        if let Some(text) = reply.push(&delta) {
            on_update(RelayUpdate {
                delta: &delta,
                text,
            });
        }
    }
    debug!(deltas = reply.delta_count(), "Relay finished");
    Ok(reply.into_text())
}

/// HTTP client for streamed completions.
///
/// `timeout` bounds connecting and each wait for the next body chunk, never
/// the whole response, so a long reply survives while tokens keep arriving.
pub(crate) fn streaming_client(timeout: Duration) -> Result<reqwest::Client, AssistantError> {
    reqwest::Client::builder()
        .connect_timeout(timeout)
        .read_timeout(timeout)
        .build()
        .map_err(|e| AssistantError::Config(format!("failed to create HTTP client: {}", e)))
}

/// Build the backend selected by `config`
pub fn create_backend(config: &AssistantConfig) -> Result<SharedBackend, AssistantError> {
    let backend: SharedBackend = match config.resolved_backend() {
        BackendKind::OpenAi => {
            let key = config.openai_api_key.clone().ok_or_else(|| {
                AssistantError::Config("the hosted backend needs OPENAI_API_KEY".to_string())
            })?;
            Arc::new(OpenAiBackend::new(
                &config.openai_base_url,
                key,
                config.timeout(),
            )?
            .with_max_tokens(config.max_tokens)
            .with_temperature(config.temperature))
        }
        BackendKind::OpenRouter => {
            let key = config.openrouter_api_key.clone().ok_or_else(|| {
                AssistantError::Config("the openrouter backend needs OPENROUTER_API_KEY".to_string())
            })?;
            let client = openrouter::Client::builder(&key)
                .base_url(config.openrouter_base_url.as_str())
                .build();
            Arc::new(
                RigBackend::new(client.completion_model(&config.model))
                    .with_temperature(config.temperature)
                    .with_max_tokens(Some(u64::from(config.max_tokens))),
            )
        }
        BackendKind::Ollama | BackendKind::Auto => {
            Arc::new(OllamaBackend::new(&config.ollama_host, config.timeout())?)
        }
    };
    info!(backend = backend.name(), model = %config.model, "Selected chat backend");
    Ok(backend)
}

/// Backend adapter for any rig-core completion model.
///
/// rig completions are not streamed here; the whole reply arrives as a single
/// delta, which keeps every provider rig supports usable behind the same
/// relay.
///
/// # Example
/// ```ignore
/// use rig::client::CompletionClient;
/// use rig::providers::anthropic;
/// use docchat::llm::RigBackend;
///
/// let client = anthropic::Client::from_env();
/// let backend = RigBackend::new(client.completion_model("claude-sonnet-4-20250514"));
/// ```
pub struct RigBackend<M: CompletionModel> {
    model: Arc<M>,
    temperature: f64,
    max_tokens: Option<u64>,
}

impl<M: CompletionModel> RigBackend<M> {
    pub fn new(model: M) -> Self {
        Self {
            model: Arc::new(model),
            temperature: 0.2,
            max_tokens: Some(1024),
        }
    }

    pub fn with_temperature(mut self, temp: f64) -> Self {
        self.temperature = temp.clamp(0.0, 2.0);
        self
    }

    pub fn with_max_tokens(mut self, tokens: Option<u64>) -> Self {
        self.max_tokens = tokens;
        self
    }

    async fn complete(&self, request: &ChatRequest) -> Result<String, AssistantError> {
        let history: Vec<Message> = request
            .history
            .iter()
            .filter_map(|turn| match turn.role {
                ChatRole::User => Some(Message::user(turn.content.clone())),
                ChatRole::Assistant => Some(Message::assistant(turn.content.clone())),
                ChatRole::System => None,
            })
            .collect();

        let mut builder = self
            .model
            .completion_request(request.prompt.as_str())
            .messages(history)
            .temperature(self.temperature);

        if let Some(system) = &request.system {
            builder = builder.preamble(system.clone());
        }
        if let Some(max_tokens) = self.max_tokens {
            builder = builder.max_tokens(max_tokens);
        }

        self.model
            .completion(builder.build())
            .await
            .map(|r| extract_text_from_response(&r.choice))
            .map_err(|e| AssistantError::Llm(e.to_string()))
    }
}

/// Extract text content from assistant response
fn extract_text_from_response(content: &OneOrMany<AssistantContent>) -> String {
    content
        .iter()
        .filter_map(|c| match c {
            AssistantContent::Text(text) => Some(text.text.clone()),
            AssistantContent::Reasoning(_) => None,
            AssistantContent::ToolCall(_) => None,
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[async_trait]
impl<M: CompletionModel + Send + Sync + 'static> ChatBackend for RigBackend<M> {
    fn name(&self) -> &str {
        "rig"
    }

    async fn stream_completion(
        &self,
        request: ChatRequest,
    ) -> Result<DeltaStream, AssistantError> {
        let text = self.complete(&request).await?;
        Ok(stream::iter(vec![Ok(text)]).boxed())
    }
}

/// A scripted backend for tests
pub struct MockBackend {
    deltas: Vec<String>,
    failure: Option<String>,
    refuse: Option<String>,
    requests: Mutex<Vec<ChatRequest>>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::with_deltas(["A mock ", "reply"])
    }

    pub fn with_deltas<I, S>(deltas: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            deltas: deltas.into_iter().map(Into::into).collect(),
            failure: None,
            refuse: None,
            requests: Mutex::new(Vec::new()),
        }
    }

    /// End the stream with a network error after the scripted deltas
    pub fn failing_after(mut self, message: impl Into<String>) -> Self {
        self.failure = Some(message.into());
        self
    }

    /// Fail before any delta is produced, as an unreachable server would
    pub fn refusing(mut self, message: impl Into<String>) -> Self {
        self.refuse = Some(message.into());
        self
    }

    /// Requests received so far
    pub fn requests(&self) -> Vec<ChatRequest> {
        self.requests
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ChatBackend for MockBackend {
    fn name(&self) -> &str {
        "mock"
    }

    async fn stream_completion(
        &self,
        request: ChatRequest,
    ) -> Result<DeltaStream, AssistantError> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request);
        }
        if let Some(message) = &self.refuse {
            return Err(AssistantError::Network(message.clone()));
        }

        let mut items: Vec<Result<String, AssistantError>> =
            self.deltas.iter().cloned().map(Ok).collect();
        if let Some(message) = &self.failure {
            items.push(Err(AssistantError::Network(message.clone())));
        }
        Ok(stream::iter(items).boxed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn relay_reports_running_text() {
        let backend = MockBackend::with_deltas(["Hel", "", "lo", "!"]);
        let deltas = backend
            .stream_completion(ChatRequest::new("llama3", "hi"))
            .await
            .unwrap();

        let mut seen = Vec::new();
        let reply = relay(deltas, |update| seen.push(update.text.to_string()))
            .await
            .unwrap();

        assert_eq!(reply, "Hello!");
        assert_eq!(seen, vec!["Hel", "Hello", "Hello!"]);
    }

    #[tokio::test]
    async fn relay_stops_on_error() {
        let backend = MockBackend::with_deltas(["partial"]).failing_after("connection reset");
        let deltas = backend
            .stream_completion(ChatRequest::new("llama3", "hi"))
            .await
            .unwrap();

        let mut updates = 0;
        let result = relay(deltas, |_| updates += 1).await;
        assert_eq!(updates, 1);
        assert!(matches!(result, Err(AssistantError::Network(_))));
    }

    #[test]
    fn auto_backend_without_key_is_local() {
        let config = AssistantConfig::default();
        let backend = create_backend(&config).unwrap();
        assert_eq!(backend.name(), "ollama");
    }

    #[test]
    fn openrouter_backend_goes_through_rig() {
        let mut config = AssistantConfig::default()
            .with_backend(BackendKind::OpenRouter)
            .with_model("meta-llama/llama-3-8b-instruct");
        assert!(matches!(
            create_backend(&config),
            Err(AssistantError::Config(_))
        ));

        config.openrouter_api_key = Some("sk-or-test".to_string());
        let backend = create_backend(&config).unwrap();
        assert_eq!(backend.name(), "rig");
    }

    #[test]
    fn hosted_backend_requires_key() {
        let config = AssistantConfig::default().with_backend(BackendKind::OpenAi);
        assert!(matches!(
            create_backend(&config),
            Err(AssistantError::Config(_))
        ));
    }
}
