//! Local inference server backend (Ollama HTTP API).
//!
//! Single prompts go to `/api/generate`; requests that carry conversation
//! history go to `/api/chat`. Both stream one JSON object per line and finish
//! with `"done": true`.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, info};
use url::Url;

use crate::error::AssistantError;
use crate::llm::{streaming_client, ChatBackend, ChatRequest};
use crate::stream::{decode_lines, ollama_outcome, DeltaStream};

pub struct OllamaBackend {
    client: Client,
    host: Url,
}

impl OllamaBackend {
    pub fn new(host: &str, timeout: Duration) -> Result<Self, AssistantError> {
        let mut host = Url::parse(host)
            .map_err(|e| AssistantError::Config(format!("invalid Ollama host '{}': {}", host, e)))?;
        // Endpoints are joined relative to the host, so keep any path prefix
        if !host.path().ends_with('/') {
            let path = format!("{}/", host.path());
            host.set_path(&path);
        }
        let client = streaming_client(timeout)?;
        Ok(Self { client, host })
    }

    pub fn host(&self) -> &Url {
        &self.host
    }

    fn endpoint(&self, path: &str) -> Result<Url, AssistantError> {
        self.host
            .join(path)
            .map_err(|e| AssistantError::Config(format!("invalid endpoint {}: {}", path, e)))
    }

    /// Path and JSON body for a request
    pub fn request_body(request: &ChatRequest) -> (&'static str, Value) {
        if request.history.is_empty() {
            let mut body = json!({
                "model": request.model,
                "prompt": request.prompt,
                "stream": true,
            });
            if let Some(system) = &request.system {
                body["system"] = json!(system);
            }
            return ("api/generate", body);
        }

        let mut messages = Vec::with_capacity(request.history.len() + 2);
        if let Some(system) = &request.system {
            messages.push(json!({ "role": "system", "content": system }));
        }
        for turn in &request.history {
            messages.push(json!({ "role": turn.role.as_str(), "content": turn.content }));
        }
        messages.push(json!({ "role": "user", "content": request.prompt }));

        (
            "api/chat",
            json!({
                "model": request.model,
                "messages": messages,
                "stream": true,
            }),
        )
    }
}

#[async_trait]
impl ChatBackend for OllamaBackend {
    fn name(&self) -> &str {
        "ollama"
    }

    async fn stream_completion(
        &self,
        request: ChatRequest,
    ) -> Result<DeltaStream, AssistantError> {
        let (path, body) = Self::request_body(&request);
        let url = self.endpoint(path)?;
        info!(url = %url, model = %request.model, history = request.history.len(), "Sending request to Ollama");

        let response = self.client.post(url).json(&body).send().await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(AssistantError::UpstreamStatus { status, body });
        }

        debug!("Ollama stream opened");
        Ok(decode_lines(response.bytes_stream(), ollama_outcome))
    }
}
