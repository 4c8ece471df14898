//! Integration tests for merging compiled submissions.

use bidpack::compile::{CompilationRequest, Compiler, DocumentDescriptor, IndexOptions};
use bidpack::merge::Merger;
use tempfile::TempDir;

use crate::common::{drawn_page_number, init_tracing, load, page_text, write_pdf};

#[tokio::test]
async fn test_merge_compiled_submissions() {
    init_tracing();
    let dir = TempDir::new().unwrap();

    let technical = dir.path().join("technical.pdf");
    let request = CompilationRequest::new("Technical", &technical)
        .with_document(DocumentDescriptor::new("Method", write_pdf(&dir, "method", 2), 1))
        .with_index_options(IndexOptions::with_index(1));
    Compiler::new().compile(&request).await.unwrap();

    let financial = dir.path().join("financial.pdf");
    let request = CompilationRequest::new("Financial", &financial)
        .with_document(DocumentDescriptor::new("Prices", write_pdf(&dir, "prices", 1), 1));
    Compiler::new().compile(&request).await.unwrap();

    let output = dir.path().join("bid/merged.pdf");
    let stats = Merger::new()
        .merge_with_statistics(&[technical, financial], &output)
        .await
        .unwrap();

    assert_eq!(stats.files_merged, 2);
    assert_eq!(stats.total_pages, 4);
    assert!(stats.file_size > 0);

    let doc = load(&output);
    assert_eq!(doc.get_pages().len(), 4);
    assert!(page_text(&doc, 1).contains("(INDEX) Tj"));
    assert!(page_text(&doc, 4).contains("prices-Page-1"));

    // numbering from each submission is kept as-is
    assert_eq!(drawn_page_number(&doc, 3), Some(3));
    assert_eq!(drawn_page_number(&doc, 4), Some(1));
}

#[tokio::test]
async fn test_merge_raw_documents_in_array_order() {
    let dir = TempDir::new().unwrap();
    let first = write_pdf(&dir, "first", 1);
    let second = write_pdf(&dir, "second", 2);
    let output = dir.path().join("merged.pdf");

    let merged = Merger::new()
        .merge_all(&[second, first], &output)
        .await
        .unwrap();
    assert_eq!(merged, output);

    let doc = load(&output);
    assert!(page_text(&doc, 1).contains("second-Page-1"));
    assert!(page_text(&doc, 3).contains("first-Page-1"));
    assert_eq!(drawn_page_number(&doc, 1), None);
}

#[tokio::test]
async fn test_merge_skips_corrupt_submission() {
    let dir = TempDir::new().unwrap();
    let good = write_pdf(&dir, "good", 2);
    let corrupt = dir.path().join("corrupt.pdf");
    std::fs::write(&corrupt, b"this is not a PDF").unwrap();

    let stats = Merger::new()
        .merge_with_statistics(&[corrupt.clone(), good], &dir.path().join("merged.pdf"))
        .await
        .unwrap();

    assert_eq!(stats.files_merged, 1);
    assert_eq!(stats.skipped, vec![corrupt]);
    assert_eq!(stats.total_pages, 2);
}
