//! File-type dispatch and extraction error surfacing
use async_trait::async_trait;
use bytes::Bytes;
use std::io::Write;

use docchat::error::AssistantError;
use docchat::model::{DocumentKind, ExtractOptions, ExtractedDocument, TextExtractor};
use docchat::DocumentLoader;

/// Stands in for tesseract so tests do not depend on it being installed
struct EchoImageExtractor;

#[async_trait]
impl TextExtractor for EchoImageExtractor {
    fn kind(&self) -> DocumentKind {
        DocumentKind::Image
    }

    async fn extract(
        &self,
        bytes: Bytes,
        options: ExtractOptions,
    ) -> Result<ExtractedDocument, AssistantError> {
        let mut doc = ExtractedDocument::new(
            DocumentKind::Image,
            format!(
                "{} bytes as {}",
                bytes.len(),
                options.file_extension.unwrap_or_default()
            ),
        );
        if let Some(source) = options.source {
            doc = doc.with_source(source);
        }
        Ok(doc)
    }

    fn supported_extensions(&self) -> &[&str] {
        &["jpg", "jpeg", "png"]
    }
}

fn loader() -> DocumentLoader {
    let mut loader = DocumentLoader::new();
    loader.register_extractor(Box::new(EchoImageExtractor));
    loader
}

const PNG_HEADER: [u8; 16] = [
    0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x00, 0x00, 0x0D, 0x49, 0x48, 0x44,
    0x52,
];

#[tokio::test]
async fn test_image_dispatch_by_extension() {
    let mut file = tempfile::Builder::new().suffix(".PNG").tempfile().unwrap();
    file.write_all(&PNG_HEADER).unwrap();

    let doc = loader().load_path(file.path(), None).await.unwrap();
    assert_eq!(doc.kind, DocumentKind::Image);
    assert_eq!(doc.text, "16 bytes as .png");
    assert!(doc.source.unwrap().ends_with(".PNG"));
}

#[tokio::test]
async fn test_image_dispatch_by_magic_bytes() {
    let doc = loader()
        .load_bytes(Bytes::from_static(&PNG_HEADER), Some("upload"), None)
        .await
        .unwrap();
    assert_eq!(doc.kind, DocumentKind::Image);
    assert_eq!(doc.text, "16 bytes as .png");
    assert_eq!(doc.source.as_deref(), Some("upload"));
}

#[tokio::test]
async fn test_forced_kind_wins() {
    let doc = loader()
        .load_bytes(Bytes::from_static(b"raw"), Some("scan.dat"), Some(DocumentKind::Image))
        .await
        .unwrap();
    assert_eq!(doc.kind, DocumentKind::Image);
    assert_eq!(doc.text, "3 bytes as ");
}

#[tokio::test]
async fn test_unsupported_extension() {
    let result = loader()
        .load_bytes(Bytes::from_static(b"plain text"), Some("notes.txt"), None)
        .await;
    assert!(matches!(result, Err(AssistantError::UnsupportedFormat(_))));
}

#[tokio::test]
async fn test_broken_pdf_is_reported() {
    let result = loader()
        .load_bytes(
            Bytes::from_static(b"%PDF-1.4\nthis is not really a pdf"),
            Some("broken.pdf"),
            None,
        )
        .await;
    match result {
        Err(e) => {
            assert!(e.is_extraction_error());
            assert!(e.to_string().starts_with("PDF reading failed"));
        }
        Ok(doc) => panic!("expected failure, got {:?}", doc),
    }
}

#[tokio::test]
async fn test_missing_file() {
    let result = loader()
        .load_path("does/not/exist.pdf", None)
        .await;
    assert!(matches!(result, Err(AssistantError::Io(_))));
}

#[test]
fn test_detect_file_type() {
    let loader = loader();
    assert_eq!(
        loader.detect_file_type(std::path::Path::new("Report.PDF")),
        Some(".pdf".to_string())
    );
    assert_eq!(
        loader.detect_file_type(std::path::Path::new("photo.jpeg")),
        Some(".jpeg".to_string())
    );
    assert_eq!(loader.detect_bytes(b"%PDF-1.7\n"), Some(".pdf".to_string()));
}
