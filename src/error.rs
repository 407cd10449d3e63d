use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AssistantError {
    #[error("IO error: {0} - Please check file permissions and path")]
    Io(#[from] io::Error),

    #[error("Unsupported format: {0} - Upload a JPG, PNG or PDF file")]
    UnsupportedFormat(String),

    #[error("OCR failed: {0}")]
    Ocr(String),

    #[error("OCR unavailable: {0} - Install Tesseract OCR or set TESSERACT_PATH")]
    OcrUnavailable(String),

    #[error("PDF reading failed: {0}")]
    Pdf(String),

    #[error("{0}")]
    NoTextFound(String),

    #[error("Connection error: {0} - Please check that the LLM server is reachable")]
    Network(String),

    #[error("Upstream returned {status}: {body}")]
    UpstreamStatus { status: u16, body: String },

    #[error("LLM error: {0} - Please check your API configuration")]
    Llm(String),

    #[error("Stream error: {0}")]
    Stream(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl AssistantError {
    /// Whether the failure came from extraction rather than from the LLM.
    pub fn is_extraction_error(&self) -> bool {
        matches!(
            self,
            AssistantError::Ocr(_)
                | AssistantError::OcrUnavailable(_)
                | AssistantError::Pdf(_)
                | AssistantError::NoTextFound(_)
                | AssistantError::UnsupportedFormat(_)
        )
    }
}

impl From<reqwest::Error> for AssistantError {
    fn from(error: reqwest::Error) -> Self {
        AssistantError::Network(error.to_string())
    }
}

impl From<serde_json::Error> for AssistantError {
    fn from(error: serde_json::Error) -> Self {
        AssistantError::Stream(error.to_string())
    }
}

impl From<toml::de::Error> for AssistantError {
    fn from(error: toml::de::Error) -> Self {
        AssistantError::Config(error.to_string())
    }
}

impl From<String> for AssistantError {
    fn from(error: String) -> Self {
        AssistantError::Llm(error)
    }
}

impl From<&str> for AssistantError {
    fn from(error: &str) -> Self {
        AssistantError::Llm(error.to_string())
    }
}
