//! PDF text extraction.
//!
//! Uses `pdf-extract` for the text layer. Pages are separated by form feeds in
//! its output; each page that yields text is prefixed with a
//! `--- Page N ---` marker so the model can cite page numbers.

use async_trait::async_trait;
use bytes::Bytes;
use tracing::debug;

use crate::error::AssistantError;
use crate::model::{DocumentKind, ExtractOptions, ExtractedDocument, TextExtractor};

pub const NO_TEXT_IN_PDF: &str = "No text found in PDF";

pub struct PdfExtractor;

impl PdfExtractor {
    /// Extract raw text from PDF bytes and split it by page
    fn extract_text_by_page(bytes: &[u8]) -> Result<Vec<String>, AssistantError> {
        let text_content = pdf_extract::extract_text_from_mem(bytes)
            .map_err(|e| AssistantError::Pdf(e.to_string()))?;

        Ok(split_pages(&text_content))
    }
}

/// Split extractor output on form feeds
pub fn split_pages(text: &str) -> Vec<String> {
    text.split('\x0c').map(|s| s.to_string()).collect()
}

/// Join page texts with `--- Page N ---` markers.
///
/// Each page is trimmed first; pages left empty (including whitespace-only
/// ones) get no marker. Page numbers follow the physical page index, so blank
/// pages leave gaps. Returns `None` when no page has any text.
pub fn join_pages(pages: &[String]) -> Option<(String, usize)> {
    let mut text = String::new();
    let mut with_text = 0;

    for (i, page) in pages.iter().enumerate() {
        let page_text = page.trim();
        if page_text.is_empty() {
            continue;
        }
        with_text += 1;
        text.push_str(&format!("\n--- Page {} ---\n{}", i + 1, page_text));
    }

    let text = text.trim().to_string();
    if text.is_empty() {
        None
    } else {
        Some((text, with_text))
    }
}

#[async_trait]
impl TextExtractor for PdfExtractor {
    fn kind(&self) -> DocumentKind {
        DocumentKind::Pdf
    }

    async fn extract(
        &self,
        bytes: Bytes,
        options: ExtractOptions,
    ) -> Result<ExtractedDocument, AssistantError> {
        if let Some(ext) = &options.file_extension {
            if !self.can_handle(ext) {
                return Err(AssistantError::UnsupportedFormat(format!(
                    "Expected PDF file, got {}",
                    ext
                )));
            }
        }

        let pages = tokio::task::spawn_blocking(move || Self::extract_text_by_page(&bytes))
            .await
            .map_err(|e| AssistantError::Pdf(format!("extraction task failed: {}", e)))??;

        debug!(pages = pages.len(), "Extracted PDF text layer");

        let (text, page_count) = join_pages(&pages)
            .ok_or_else(|| AssistantError::NoTextFound(NO_TEXT_IN_PDF.to_string()))?;

        let mut document = ExtractedDocument::new(DocumentKind::Pdf, text).with_page_count(page_count);
        if let Some(source) = options.source {
            document = document.with_source(source);
        }
        Ok(document)
    }

    fn supported_extensions(&self) -> &[&str] {
        &["pdf"]
    }
}
