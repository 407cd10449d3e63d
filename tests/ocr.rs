//! Image extraction against stand-in tesseract binaries
#![cfg(unix)]

use bytes::Bytes;
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use docchat::error::AssistantError;
use docchat::model::{DocumentKind, ExtractOptions, TextExtractor};
use docchat::ocr::{ImageExtractor, NO_TEXT_IN_IMAGE};

const PNG_HEADER: [u8; 8] = [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];

fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    path
}

fn png_options() -> ExtractOptions {
    ExtractOptions::default()
        .with_extension(".png")
        .with_source("scan.png")
}

// Scripts run one after another in a single test so no other thread forks
// while one of them is still open for writing.
#[tokio::test]
async fn test_tesseract_process_outcomes() {
    let dir = tempfile::tempdir().unwrap();

    // Non-zero exit surfaces stderr
    let failing = write_script(
        dir.path(),
        "tesseract-fail",
        "echo 'Error opening data file eng.traineddata' >&2\nexit 1",
    );
    let extractor = ImageExtractor::with_tesseract_path(Some(failing.clone()));
    assert_eq!(extractor.tesseract_path(), Some(failing.as_path()));
    let result = extractor
        .extract(Bytes::from_static(&PNG_HEADER), png_options())
        .await;
    match result {
        Err(AssistantError::Ocr(message)) => {
            assert_eq!(message, "Error opening data file eng.traineddata")
        }
        other => panic!("expected an OCR error, got {:?}", other),
    }

    // Successful run: input file keeps its suffix, output is trimmed
    let working = write_script(
        dir.path(),
        "tesseract-ok",
        "case \"$1\" in *.png) ;; *) exit 4 ;; esac\n[ \"$2\" = stdout ] || exit 3\nprintf '  Invoice 42\\n\\n'",
    );
    let document = ImageExtractor::with_tesseract_path(Some(working))
        .extract(Bytes::from_static(&PNG_HEADER), png_options())
        .await
        .unwrap();
    assert_eq!(document.kind, DocumentKind::Image);
    assert_eq!(document.text, "Invoice 42");
    assert_eq!(document.source.as_deref(), Some("scan.png"));

    // Blank output is reported as no text
    let silent = write_script(dir.path(), "tesseract-blank", "echo");
    let result = ImageExtractor::with_tesseract_path(Some(silent))
        .extract(Bytes::from_static(&PNG_HEADER), png_options())
        .await;
    match result {
        Err(AssistantError::NoTextFound(message)) => assert_eq!(message, NO_TEXT_IN_IMAGE),
        other => panic!("expected no text, got {:?}", other),
    }
}
