use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::AssistantError;

/// The two upload kinds the assistant knows how to read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentKind {
    /// Photographed or scanned page, read with OCR
    Image,
    /// PDF with an extractable text layer
    Pdf,
}

impl DocumentKind {
    pub fn label(&self) -> &'static str {
        match self {
            DocumentKind::Image => "Image (OCR)",
            DocumentKind::Pdf => "PDF",
        }
    }
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Text pulled out of an uploaded file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractedDocument {
    pub kind: DocumentKind,
    /// File name the text came from, if known
    pub source: Option<String>,
    /// Number of pages that contributed text (1 for images)
    pub page_count: usize,
    pub text: String,
}

impl ExtractedDocument {
    pub fn new(kind: DocumentKind, text: impl Into<String>) -> Self {
        Self {
            kind,
            source: None,
            page_count: 1,
            text: text.into(),
        }
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn with_page_count(mut self, count: usize) -> Self {
        self.page_count = count;
        self
    }

    pub fn char_count(&self) -> usize {
        self.text.chars().count()
    }
}

/// Coarse sentiment label cached per loaded document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Positive,
    Negative,
    #[default]
    Neutral,
}

impl Sentiment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Sentiment::Positive => "positive",
            Sentiment::Negative => "negative",
            Sentiment::Neutral => "neutral",
        }
    }

    pub fn emoji(&self) -> &'static str {
        match self {
            Sentiment::Positive => "😊",
            Sentiment::Negative => "😔",
            Sentiment::Neutral => "😐",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            Sentiment::Positive => "Positive",
            Sentiment::Negative => "Negative",
            Sentiment::Neutral => "Neutral",
        }
    }
}

impl fmt::Display for Sentiment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

impl ChatRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChatRole::System => "system",
            ChatRole::User => "user",
            ChatRole::Assistant => "assistant",
        }
    }
}

/// One message in the conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: ChatRole,
    pub content: String,
}

impl ChatTurn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::System,
            content: content.into(),
        }
    }
}

/// Options passed to an extractor for a single upload
#[derive(Debug, Clone, Default)]
pub struct ExtractOptions {
    /// File extension including the leading dot (e.g. ".png")
    pub file_extension: Option<String>,
    /// Original file name, carried into the result
    pub source: Option<String>,
}

impl ExtractOptions {
    pub fn with_extension(mut self, ext: impl Into<String>) -> Self {
        self.file_extension = Some(ext.into());
        self
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }
}

/// Pulls plain text out of one upload type.
#[async_trait]
pub trait TextExtractor: Send + Sync {
    /// Which kind of upload this extractor handles
    fn kind(&self) -> DocumentKind;

    /// Extract text from raw file bytes
    async fn extract(
        &self,
        bytes: Bytes,
        options: ExtractOptions,
    ) -> Result<ExtractedDocument, AssistantError>;

    /// Extensions this extractor accepts, without the leading dot
    fn supported_extensions(&self) -> &[&str];

    fn can_handle(&self, extension: &str) -> bool {
        let ext = extension.trim_start_matches('.').to_lowercase();
        self.supported_extensions().contains(&ext.as_str())
    }
}
