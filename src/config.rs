//! Runtime configuration for the assistant.
//!
//! Values come from three places, later ones overriding earlier ones:
//! built-in defaults, an optional TOML file, then environment variables
//! (a `.env` file in the working directory is loaded first).

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use std::{env, fs};
use tracing::debug;

use crate::error::AssistantError;
use crate::prompts::{DEFAULT_CONTEXT_LIMIT, DEFAULT_PREVIEW_LIMIT};

pub const DEFAULT_MODEL: &str = "llama3";
pub const DEFAULT_OLLAMA_HOST: &str = "http://localhost:11434";
pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_OPENROUTER_BASE_URL: &str = "https://openrouter.ai/api/v1";

/// Local model sizes offered to the user
pub const SUGGESTED_MODELS: &[&str] = &["llama3", "llama3:8b", "llama3:70b"];

/// Which LLM backend answers questions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Hosted API when an API key is configured, local server otherwise
    #[default]
    Auto,
    Ollama,
    OpenAi,
    /// OpenRouter through rig-core, answered without streaming
    OpenRouter,
}

impl BackendKind {
    /// Settle `Auto` into a concrete backend
    pub fn resolve(self, openai_api_key: Option<&str>) -> BackendKind {
        match self {
            BackendKind::Auto => match openai_api_key {
                Some(key) if !key.trim().is_empty() => BackendKind::OpenAi,
                _ => BackendKind::Ollama,
            },
            other => other,
        }
    }

    pub fn parse(value: &str) -> Option<BackendKind> {
        match value.trim().to_lowercase().as_str() {
            "auto" => Some(BackendKind::Auto),
            "ollama" | "local" => Some(BackendKind::Ollama),
            "openai" | "hosted" => Some(BackendKind::OpenAi),
            "openrouter" | "rig" => Some(BackendKind::OpenRouter),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AssistantConfig {
    pub model: String,
    pub backend: BackendKind,
    pub ollama_host: String,
    pub openai_api_key: Option<String>,
    pub openai_base_url: String,
    pub openrouter_api_key: Option<String>,
    pub openrouter_base_url: String,
    /// Connect timeout and longest silence between streamed chunks, in seconds
    pub timeout_secs: u64,
    /// Characters of document text sent with each question
    pub context_limit: usize,
    /// Characters shown in the document preview
    pub preview_limit: usize,
    /// Output cap for the hosted API
    pub max_tokens: u32,
    pub temperature: f64,
    /// Explicit tesseract binary, skipping discovery
    pub tesseract_path: Option<PathBuf>,
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            backend: BackendKind::Auto,
            ollama_host: DEFAULT_OLLAMA_HOST.to_string(),
            openai_api_key: None,
            openai_base_url: DEFAULT_OPENAI_BASE_URL.to_string(),
            openrouter_api_key: None,
            openrouter_base_url: DEFAULT_OPENROUTER_BASE_URL.to_string(),
            timeout_secs: 120,
            context_limit: DEFAULT_CONTEXT_LIMIT,
            preview_limit: DEFAULT_PREVIEW_LIMIT,
            max_tokens: 1024,
            temperature: 0.2,
            tesseract_path: None,
        }
    }
}

impl AssistantConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Defaults overridden by the process environment
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv();
        let mut config = Self::default();
        config.apply_env();
        config
    }

    /// Load a TOML file, then apply environment overrides on top
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, AssistantError> {
        let _ = dotenvy::dotenv();
        let raw = fs::read_to_string(path.as_ref())?;
        let mut config: AssistantConfig = toml::from_str(&raw)?;
        config.apply_env();
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml_str(raw: &str) -> Result<Self, AssistantError> {
        let config: AssistantConfig = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    fn apply_env(&mut self) {
        if let Ok(host) = env::var("OLLAMA_HOST") {
            if !host.trim().is_empty() {
                self.ollama_host = normalize_host(&host);
            }
        }
        if let Ok(key) = env::var("OPENAI_API_KEY") {
            if !key.trim().is_empty() {
                self.openai_api_key = Some(key);
            }
        }
        if let Ok(base) = env::var("OPENAI_BASE_URL") {
            if !base.trim().is_empty() {
                self.openai_base_url = base.trim_end_matches('/').to_string();
            }
        }
        if let Ok(key) = env::var("OPENROUTER_API_KEY") {
            if !key.trim().is_empty() {
                self.openrouter_api_key = Some(key);
            }
        }
        if let Ok(base) = env::var("OPENROUTER_ENDPOINT") {
            if !base.trim().is_empty() {
                self.openrouter_base_url = normalize_openrouter_endpoint(&base);
            }
        }
        if let Ok(model) = env::var("DOCCHAT_MODEL") {
            if !model.trim().is_empty() {
                self.model = model;
            }
        }
        if let Ok(path) = env::var("TESSERACT_PATH") {
            if !path.trim().is_empty() {
                self.tesseract_path = Some(PathBuf::from(path));
            }
        }
        debug!(
            model = %self.model,
            ollama_host = %self.ollama_host,
            has_openai_key = self.openai_api_key.is_some(),
            "Applied environment configuration"
        );
    }

    pub fn validate(&self) -> Result<(), AssistantError> {
        if self.model.trim().is_empty() {
            return Err(AssistantError::Config("model name is empty".to_string()));
        }
        if self.context_limit == 0 {
            return Err(AssistantError::Config(
                "context_limit must be greater than zero".to_string(),
            ));
        }
        url::Url::parse(&self.ollama_host).map_err(|e| {
            AssistantError::Config(format!("invalid ollama_host '{}': {}", self.ollama_host, e))
        })?;
        url::Url::parse(&self.openai_base_url).map_err(|e| {
            AssistantError::Config(format!(
                "invalid openai_base_url '{}': {}",
                self.openai_base_url, e
            ))
        })?;
        url::Url::parse(&self.openrouter_base_url).map_err(|e| {
            AssistantError::Config(format!(
                "invalid openrouter_base_url '{}': {}",
                self.openrouter_base_url, e
            ))
        })?;
        Ok(())
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_backend(mut self, backend: BackendKind) -> Self {
        self.backend = backend;
        self
    }

    pub fn with_context_limit(mut self, limit: usize) -> Self {
        self.context_limit = limit.max(1);
        self
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// The backend that will actually be used
    pub fn resolved_backend(&self) -> BackendKind {
        self.backend.resolve(self.openai_api_key.as_deref())
    }
}

/// Accept `host:port` as well as full URLs for OLLAMA_HOST
fn normalize_host(raw: &str) -> String {
    let trimmed = raw.trim().trim_end_matches('/');
    if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        trimmed.to_string()
    } else {
        format!("http://{}", trimmed)
    }
}

/// OpenRouter's API lives under `/api/v1`; accept the bare `/api` form too
fn normalize_openrouter_endpoint(raw: &str) -> String {
    let endpoint = raw.trim().trim_end_matches('/');
    if endpoint.ends_with("/v1") {
        endpoint.to_string()
    } else {
        format!("{}/v1", endpoint)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auto_prefers_hosted_api_when_key_present() {
        assert_eq!(
            BackendKind::Auto.resolve(Some("sk-test")),
            BackendKind::OpenAi
        );
        assert_eq!(BackendKind::Auto.resolve(Some("  ")), BackendKind::Ollama);
        assert_eq!(BackendKind::Auto.resolve(None), BackendKind::Ollama);
        assert_eq!(
            BackendKind::Ollama.resolve(Some("sk-test")),
            BackendKind::Ollama
        );
    }

    #[test]
    fn parses_backend_aliases() {
        assert_eq!(BackendKind::parse(" OpenAI "), Some(BackendKind::OpenAi));
        assert_eq!(BackendKind::parse("local"), Some(BackendKind::Ollama));
        assert_eq!(BackendKind::parse("auto"), Some(BackendKind::Auto));
        assert_eq!(BackendKind::parse("rig"), Some(BackendKind::OpenRouter));
        assert_eq!(BackendKind::parse("azure"), None);
    }

    #[test]
    fn normalizes_bare_host() {
        assert_eq!(normalize_host("127.0.0.1:11434"), "http://127.0.0.1:11434");
        assert_eq!(
            normalize_host("https://llm.internal/"),
            "https://llm.internal"
        );
    }

    #[test]
    fn openrouter_endpoint_gets_version_suffix() {
        assert_eq!(
            normalize_openrouter_endpoint("https://openrouter.ai/api/"),
            "https://openrouter.ai/api/v1"
        );
        assert_eq!(
            normalize_openrouter_endpoint("https://openrouter.ai/api/v1"),
            "https://openrouter.ai/api/v1"
        );
    }

    #[test]
    fn toml_fills_missing_fields_with_defaults() {
        let config = AssistantConfig::from_toml_str("model = \"llama3:8b\"\nbackend = \"ollama\"")
            .unwrap();
        assert_eq!(config.model, "llama3:8b");
        assert_eq!(config.backend, BackendKind::Ollama);
        assert_eq!(config.context_limit, 8000);
        assert_eq!(config.ollama_host, DEFAULT_OLLAMA_HOST);
    }

    #[test]
    fn rejects_bad_host() {
        let result = AssistantConfig::from_toml_str("ollama_host = \"not a url\"");
        assert!(matches!(result, Err(AssistantError::Config(_))));
    }
}
