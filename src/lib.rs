pub mod config;
pub mod error;
pub mod llm;
pub mod model;
pub mod ocr;
pub mod ollama;
pub mod openai;
pub mod pdf;
pub mod prompts;
pub mod report;
pub mod sentiment;
pub mod session;
pub mod stream;

use bytes::Bytes;
use error::AssistantError;
use mime_guess::MimeGuess;
use model::{DocumentKind, ExtractOptions, ExtractedDocument, TextExtractor};
use ocr::ImageExtractor;
use pdf::PdfExtractor;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

// Re-export key types
pub use config::{AssistantConfig, BackendKind};
pub use llm::{
    create_backend, relay, ChatBackend, ChatRequest, MockBackend, RelayUpdate, RigBackend,
    SharedBackend,
};
pub use model::{ChatRole, ChatTurn, Sentiment};
pub use report::{generate_report, report_file_name};
pub use session::ChatSession;

/// Picks an extractor for an upload and runs it
pub struct DocumentLoader {
    extractors: Vec<Box<dyn TextExtractor>>,
}

impl DocumentLoader {
    /// Loader with the image (OCR) and PDF extractors
    pub fn new() -> Self {
        Self::with_tesseract_path(None)
    }

    pub fn with_tesseract_path(tesseract: Option<PathBuf>) -> Self {
        let mut loader = DocumentLoader {
            extractors: Vec::new(),
        };
        loader.register_extractor(Box::new(ImageExtractor::with_tesseract_path(tesseract)));
        loader.register_extractor(Box::new(PdfExtractor));
        loader
    }

    pub fn from_config(config: &AssistantConfig) -> Self {
        Self::with_tesseract_path(config.tesseract_path.clone())
    }

    /// Later registrations take precedence
    pub fn register_extractor(&mut self, extractor: Box<dyn TextExtractor>) {
        self.extractors.insert(0, extractor);
    }

    /// Detect file type from path
    /// Priority: 1) File extension (if handled), 2) infer magic bytes, 3) MIME guess
    pub fn detect_file_type(&self, file_path: &Path) -> Option<String> {
        if let Some(ext) = file_path.extension().and_then(|e| e.to_str()) {
            let ext_with_dot = format!(".{}", ext.to_lowercase());
            if self.find_extractor(&ext_with_dot).is_some() {
                return Some(ext_with_dot);
            }
        }

        if let Some(kind) = infer::get_from_path(file_path).ok().flatten() {
            return Some(format!(".{}", kind.extension()));
        }

        if let Some(mime) = MimeGuess::from_path(file_path).first() {
            let guessed = match mime.essence_str() {
                "application/pdf" => Some(".pdf"),
                "image/jpeg" => Some(".jpg"),
                "image/png" => Some(".png"),
                _ => None,
            };
            if let Some(ext) = guessed {
                return Some(ext.to_string());
            }
        }

        file_path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| format!(".{}", e.to_lowercase()))
    }

    /// Detect file type from bytes
    pub fn detect_bytes(&self, bytes: &[u8]) -> Option<String> {
        infer::get(bytes).map(|kind| format!(".{}", kind.extension()))
    }

    fn find_extractor(&self, extension: &str) -> Option<&dyn TextExtractor> {
        self.extractors
            .iter()
            .find(|e| e.can_handle(extension))
            .map(|e| e.as_ref())
    }

    fn extractor_for_kind(&self, kind: DocumentKind) -> Option<&dyn TextExtractor> {
        self.extractors
            .iter()
            .find(|e| e.kind() == kind)
            .map(|e| e.as_ref())
    }

    /// Extract text from a local file
    pub async fn load_path(
        &self,
        path: impl AsRef<Path>,
        kind: Option<DocumentKind>,
    ) -> Result<ExtractedDocument, AssistantError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(AssistantError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("File '{}' not found", path.display()),
            )));
        }

        let bytes = tokio::fs::read(path).await?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string());
        let extension = self.detect_file_type(path);
        self.load_with_extension(Bytes::from(bytes), name, extension, kind)
            .await
    }

    /// Extract text from uploaded bytes.
    ///
    /// `name` is used for its extension when present; otherwise the type is
    /// sniffed from the bytes. An explicit `kind` overrides both.
    pub async fn load_bytes(
        &self,
        bytes: Bytes,
        name: Option<&str>,
        kind: Option<DocumentKind>,
    ) -> Result<ExtractedDocument, AssistantError> {
        let extension = name
            .and_then(|n| Path::new(n).extension())
            .and_then(|e| e.to_str())
            .map(|e| format!(".{}", e.to_lowercase()))
            .filter(|e| self.find_extractor(e).is_some())
            .or_else(|| self.detect_bytes(&bytes));
        self.load_with_extension(bytes, name.map(str::to_string), extension, kind)
            .await
    }

    async fn load_with_extension(
        &self,
        bytes: Bytes,
        name: Option<String>,
        extension: Option<String>,
        kind: Option<DocumentKind>,
    ) -> Result<ExtractedDocument, AssistantError> {
        let ext = extension.as_deref().unwrap_or("");

        let extractor = match kind {
            Some(kind) => self.extractor_for_kind(kind),
            None => self.find_extractor(ext),
        }
        .ok_or_else(|| {
            AssistantError::UnsupportedFormat(if ext.is_empty() {
                "could not detect the file type".to_string()
            } else {
                format!("no extractor for extension {}", ext)
            })
        })?;

        // A forced kind ignores an extension it does not handle
        let mut options = ExtractOptions::default();
        if !ext.is_empty() && extractor.can_handle(ext) {
            options = options.with_extension(ext);
        }
        if let Some(name) = name {
            options = options.with_source(name);
        }

        debug!(kind = %extractor.kind(), extension = ext, bytes = bytes.len(), "Extracting text");
        let document = extractor.extract(bytes, options).await?;
        info!(
            kind = %document.kind,
            chars = document.char_count(),
            "Successfully processed {}",
            document.kind
        );
        Ok(document)
    }
}

impl Default for DocumentLoader {
    fn default() -> Self {
        Self::new()
    }
}
