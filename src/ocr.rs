//! Image text extraction through the Tesseract OCR binary.
//!
//! The upload is written to a temporary file carrying its original extension
//! and handed to `tesseract <file> stdout`. Nothing is linked against
//! libtesseract, so the binary only has to exist at runtime.

use async_trait::async_trait;
use bytes::Bytes;
use std::io::Write;
use std::path::{Path, PathBuf};
use tokio::process::Command;
use tracing::{debug, warn};

use crate::error::AssistantError;
use crate::model::{DocumentKind, ExtractOptions, ExtractedDocument, TextExtractor};

/// Install locations checked after the configured path and `PATH`
const COMMON_TESSERACT_PATHS: &[&str] = &[
    r"C:\Program Files\Tesseract-OCR\tesseract.exe",
    r"C:\Program Files (x86)\Tesseract-OCR\tesseract.exe",
    "/usr/bin/tesseract",
    "/usr/local/bin/tesseract",
    "/opt/homebrew/bin/tesseract",
];

pub const NO_TEXT_IN_IMAGE: &str = "No text detected in image";

/// Locate a tesseract binary.
///
/// Order: explicit path, each `PATH` entry, then the common install paths.
pub fn find_tesseract(configured: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = configured {
        if path.is_file() {
            return Some(path.to_path_buf());
        }
        warn!(path = %path.display(), "Configured tesseract path does not exist");
    }

    if let Ok(path) = which::which("tesseract") {
        return Some(path);
    }

    COMMON_TESSERACT_PATHS
        .iter()
        .map(PathBuf::from)
        .find(|p| p.is_file())
}

pub struct ImageExtractor {
    tesseract: Option<PathBuf>,
    language: Option<String>,
}

impl ImageExtractor {
    /// Discover tesseract from `PATH` and the usual locations
    pub fn new() -> Self {
        Self::with_tesseract_path(None)
    }

    pub fn with_tesseract_path(path: Option<PathBuf>) -> Self {
        let tesseract = find_tesseract(path.as_deref());
        if tesseract.is_none() {
            warn!("Tesseract not found. OCR will not work until it is installed");
        }
        Self {
            tesseract,
            language: None,
        }
    }

    /// Tesseract language code(s), e.g. "eng" or "eng+deu"
    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }

    pub fn tesseract_path(&self) -> Option<&Path> {
        self.tesseract.as_deref()
    }

    async fn run_tesseract(&self, bytes: &[u8], extension: &str) -> Result<String, AssistantError> {
        let binary = self.tesseract.as_ref().ok_or_else(|| {
            AssistantError::OcrUnavailable("tesseract binary not found".to_string())
        })?;

        let suffix = format!(".{}", extension.trim_start_matches('.'));
        let mut input = tempfile::Builder::new()
            .prefix("docchat-ocr-")
            .suffix(&suffix)
            .tempfile()?;
        input.write_all(bytes)?;
        input.flush()?;

        let mut command = Command::new(binary);
        command.arg(input.path()).arg("stdout");
        if let Some(lang) = &self.language {
            command.arg("-l").arg(lang);
        }

        debug!(binary = %binary.display(), bytes = bytes.len(), "Running tesseract");
        let output = command
            .output()
            .await
            .map_err(|e| AssistantError::Ocr(format!("failed to start tesseract: {}", e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            return Err(AssistantError::Ocr(if stderr.is_empty() {
                format!("tesseract exited with {}", output.status)
            } else {
                stderr
            }));
        }

        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}

impl Default for ImageExtractor {
    fn default() -> Self {
        Self::new()
    }
}

/// Sniff the image format from magic bytes
pub fn detect_image_extension(bytes: &[u8]) -> Option<&'static str> {
    match infer::get(bytes) {
        Some(kind) if kind.matcher_type() == infer::MatcherType::Image => Some(kind.extension()),
        _ => None,
    }
}

#[async_trait]
impl TextExtractor for ImageExtractor {
    fn kind(&self) -> DocumentKind {
        DocumentKind::Image
    }

    async fn extract(
        &self,
        bytes: Bytes,
        options: ExtractOptions,
    ) -> Result<ExtractedDocument, AssistantError> {
        let extension = options
            .file_extension
            .as_deref()
            .map(|e| e.trim_start_matches('.').to_lowercase())
            .or_else(|| detect_image_extension(&bytes).map(str::to_string))
            .unwrap_or_else(|| "png".to_string());

        if !self.can_handle(&extension) {
            return Err(AssistantError::UnsupportedFormat(format!(
                "Expected an image file, got .{}",
                extension
            )));
        }

        let text = self.run_tesseract(&bytes, &extension).await?;
        if text.is_empty() {
            return Err(AssistantError::NoTextFound(NO_TEXT_IN_IMAGE.to_string()));
        }

        let mut document = ExtractedDocument::new(DocumentKind::Image, text);
        if let Some(source) = options.source {
            document = document.with_source(source);
        }
        Ok(document)
    }

    fn supported_extensions(&self) -> &[&str] {
        &["jpg", "jpeg", "png", "bmp", "gif", "tif", "tiff", "webp"]
    }
}
