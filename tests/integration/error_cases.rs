//! Integration tests for whole-operation failures.

use bidpack::compile::{CompilationRequest, Compiler, DocumentDescriptor, IndexOptions, StampOptions};
use bidpack::compress::CompressionEngine;
use bidpack::config::{CompressionTier, EngineConfig};
use bidpack::error::{CompilationError, CompressionError, LoadError, MergeError, StampError};
use bidpack::file_size_label;
use bidpack::merge::Merger;
use tempfile::TempDir;

use crate::common::write_pdf;

#[tokio::test]
async fn test_compile_empty_request() {
    let dir = TempDir::new().unwrap();
    let request = CompilationRequest::new("Empty", dir.path().join("empty.pdf"));

    let result = Compiler::new().compile(&request).await;
    let err = result.unwrap_err();
    assert!(matches!(err, CompilationError::NoValidDocuments));
    assert_eq!(err.to_string(), "no valid documents");
    assert!(!dir.path().join("empty.pdf").exists());
}

#[tokio::test]
async fn test_compile_all_documents_missing() {
    let dir = TempDir::new().unwrap();
    let request = CompilationRequest::new("Missing", dir.path().join("out.pdf"))
        .with_document(DocumentDescriptor::new("A", dir.path().join("a.pdf"), 1))
        .with_document(DocumentDescriptor::new("B", dir.path().join("b.pdf"), 2));

    let result = Compiler::new().compile(&request).await;
    assert!(matches!(result, Err(CompilationError::NoValidDocuments)));
}

#[tokio::test]
async fn test_compile_invalid_start_from() {
    let dir = TempDir::new().unwrap();
    let request = CompilationRequest::new("Invalid", dir.path().join("out.pdf"))
        .with_document(DocumentDescriptor::new("A", write_pdf(&dir, "a", 1), 1))
        .with_index_options(IndexOptions::with_index(0));

    let result = Compiler::new().compile(&request).await;
    assert!(matches!(result, Err(CompilationError::InvalidRequest(_))));
}

#[tokio::test]
async fn test_compile_bad_stamp_is_fatal() {
    let dir = TempDir::new().unwrap();
    let not_an_image = dir.path().join("seal.png");
    std::fs::write(&not_an_image, b"definitely not a png").unwrap();

    let request = CompilationRequest::new("Stamped", dir.path().join("out.pdf"))
        .with_document(DocumentDescriptor::new("A", write_pdf(&dir, "a", 1), 1))
        .with_stamp(StampOptions::new(&not_an_image));

    let result = Compiler::new().compile(&request).await;
    assert!(matches!(
        result,
        Err(CompilationError::Stamp(StampError::UnsupportedImage { .. }))
    ));
    assert!(!dir.path().join("out.pdf").exists());
}

#[tokio::test]
async fn test_merge_nothing() {
    let dir = TempDir::new().unwrap();
    let result = Merger::new().merge_all(&[], &dir.path().join("out.pdf")).await;

    let err = result.unwrap_err();
    assert!(matches!(err, MergeError::NoValidSubmissions));
    assert_eq!(err.to_string(), "no valid submissions");
}

#[tokio::test]
async fn test_merge_all_missing() {
    let dir = TempDir::new().unwrap();
    let paths = vec![dir.path().join("x.pdf"), dir.path().join("y.pdf")];

    let result = Merger::new().merge_all(&paths, &dir.path().join("out.pdf")).await;
    assert!(matches!(result, Err(MergeError::NoValidSubmissions)));
}

#[tokio::test]
async fn test_compress_missing_input() {
    let dir = TempDir::new().unwrap();
    let engine = CompressionEngine::in_process_only(&EngineConfig::default());

    let result = engine
        .compress(
            &dir.path().join("missing.pdf"),
            &dir.path().join("out.pdf"),
            CompressionTier::Recommended,
        )
        .await;
    assert!(matches!(
        result,
        Err(CompressionError::Unreadable(LoadError::NotFound { .. }))
    ));
}

#[tokio::test]
async fn test_compress_not_a_pdf() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("notes.pdf");
    std::fs::write(&input, b"meeting notes").unwrap();
    let engine = CompressionEngine::in_process_only(&EngineConfig::default());

    let result = engine
        .compress(&input, &dir.path().join("out.pdf"), CompressionTier::Extreme)
        .await;
    assert!(matches!(result, Err(CompressionError::InvalidDocument { .. })));
}

#[test]
fn test_file_size_label() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("blob.bin");
    std::fs::write(&path, vec![0u8; 1024 * 1024 + 512 * 1024]).unwrap();

    assert_eq!(file_size_label(&path).unwrap(), "1.50 MB");
    assert!(matches!(
        file_size_label(&dir.path().join("missing")),
        Err(LoadError::NotFound { .. })
    ));
}
