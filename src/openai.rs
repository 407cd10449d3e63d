//! Hosted chat-completion backend (OpenAI-compatible API).
//!
//! Sends `POST {base}/chat/completions` with `stream: true` and reads the
//! server-sent events until `data: [DONE]` or a finish reason.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, info};

use crate::error::AssistantError;
use crate::llm::{streaming_client, ChatBackend, ChatRequest};
use crate::stream::{decode_lines, sse_outcome, DeltaStream};

pub struct OpenAiBackend {
    client: Client,
    base_url: String,
    api_key: String,
    max_tokens: u32,
    temperature: f64,
}

impl OpenAiBackend {
    pub fn new(
        base_url: &str,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, AssistantError> {
        url::Url::parse(base_url).map_err(|e| {
            AssistantError::Config(format!("invalid API base URL '{}': {}", base_url, e))
        })?;
        let client = streaming_client(timeout)?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            max_tokens: 1024,
            temperature: 0.2,
        })
    }

    pub fn with_max_tokens(mut self, tokens: u32) -> Self {
        self.max_tokens = tokens;
        self
    }

    pub fn with_temperature(mut self, temp: f64) -> Self {
        self.temperature = temp.clamp(0.0, 2.0);
        self
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }

    /// JSON body for a streamed chat completion
    pub fn request_body(&self, request: &ChatRequest) -> Value {
        let mut messages = Vec::with_capacity(request.history.len() + 2);
        if let Some(system) = &request.system {
            messages.push(json!({ "role": "system", "content": system }));
        }
        for turn in &request.history {
            messages.push(json!({ "role": turn.role.as_str(), "content": turn.content }));
        }
        messages.push(json!({ "role": "user", "content": request.prompt }));

        json!({
            "model": request.model,
            "messages": messages,
            "max_tokens": self.max_tokens,
            "temperature": self.temperature,
            "stream": true,
        })
    }
}

#[async_trait]
impl ChatBackend for OpenAiBackend {
    fn name(&self) -> &str {
        "openai"
    }

    async fn stream_completion(
        &self,
        request: ChatRequest,
    ) -> Result<DeltaStream, AssistantError> {
        let body = self.request_body(&request);
        info!(model = %request.model, history = request.history.len(), "Sending request to hosted API");

        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(AssistantError::UpstreamStatus { status, body });
        }

        debug!("Hosted API stream opened");
        Ok(decode_lines(response.bytes_stream(), sse_outcome))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ChatTurn;

    fn backend() -> OpenAiBackend {
        OpenAiBackend::new("https://api.openai.com/v1/", "sk-test", Duration::from_secs(5))
            .unwrap()
    }

    #[test]
    fn body_carries_streaming_defaults() {
        let body = backend().request_body(&ChatRequest::new("gpt-4", "What is this?"));
        assert_eq!(body["stream"], true);
        assert_eq!(body["max_tokens"], 1024);
        assert_eq!(body["temperature"], 0.2);
        let messages = body["messages"].as_array().unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0]["role"], "user");
    }

    #[test]
    fn body_orders_system_history_prompt() {
        let request = ChatRequest::new("gpt-4", "Next")
            .with_system("Be honest.")
            .with_history(vec![ChatTurn::user("First"), ChatTurn::assistant("Answer")]);
        let body = backend().request_body(&request);
        let roles: Vec<&str> = body["messages"]
            .as_array()
            .unwrap()
            .iter()
            .map(|m| m["role"].as_str().unwrap())
            .collect();
        assert_eq!(roles, vec!["system", "user", "assistant", "user"]);
    }

    #[test]
    fn endpoint_strips_trailing_slash() {
        assert_eq!(
            backend().endpoint(),
            "https://api.openai.com/v1/chat/completions"
        );
    }
}
