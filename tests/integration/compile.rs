//! Integration tests for compiling responses.

use bidpack::compile::{CompilationRequest, Compiler, DocumentDescriptor, IndexOptions, StampOptions};
use bidpack::config::{EngineConfig, StampPosition};
use bidpack::metadata::MetadataManager;
use rstest::rstest;
use tempfile::TempDir;

use crate::common::{
    drawn_page_number, init_tracing, load, page_text, write_indirect_contents_pdf, write_pdf,
    write_stamp_png,
};

#[tokio::test]
async fn test_compile_without_index_keeps_order() {
    init_tracing();
    let dir = TempDir::new().unwrap();
    let output = dir.path().join("out/technical.pdf");

    let request = CompilationRequest::new("Technical Response", &output)
        .with_document(DocumentDescriptor::new("Method", write_pdf(&dir, "method", 3), 2))
        .with_document(DocumentDescriptor::new("Profile", write_pdf(&dir, "profile", 2), 1))
        .with_document(DocumentDescriptor::new("Annex", write_pdf(&dir, "annex", 1), 3));

    let report = Compiler::new().compile_with_report(&request).await.unwrap();
    assert_eq!(report.total_pages, 6);
    assert_eq!(report.index_pages, 0);
    assert_eq!(report.documents_included, 3);
    assert!(report.skipped.is_empty());

    let doc = load(&output);
    assert_eq!(doc.get_pages().len(), 6);

    let expected = [
        "profile-Page-1",
        "profile-Page-2",
        "method-Page-1",
        "method-Page-2",
        "method-Page-3",
        "annex-Page-1",
    ];
    for (i, label) in expected.iter().enumerate() {
        let page = i as u32 + 1;
        assert!(page_text(&doc, page).contains(label), "page {page} should show {label}");
        assert_eq!(drawn_page_number(&doc, page), Some(page));
    }
}

#[rstest]
#[case(1)]
#[case(5)]
#[tokio::test]
async fn test_compile_with_index_numbers_entries(#[case] start_from: u32) {
    let dir = TempDir::new().unwrap();
    let output = dir.path().join("financial.pdf");

    let request = CompilationRequest::new("Financial Response", &output)
        .with_document(DocumentDescriptor::new("Prices", write_pdf(&dir, "prices", 2), 1))
        .with_document(DocumentDescriptor::new("Guarantee", write_pdf(&dir, "guarantee", 3), 2))
        .with_document(DocumentDescriptor::new("Forms", write_pdf(&dir, "forms", 1), 3))
        .with_index_options(IndexOptions::with_index(start_from))
        .with_bid_number("RFQ-17");

    let report = Compiler::new().compile_with_report(&request).await.unwrap();
    assert_eq!(report.index_pages, 1);
    assert_eq!(report.total_pages, 7);

    let doc = load(&output);
    let index = page_text(&doc, 1);
    assert!(index.contains("(INDEX) Tj"));
    assert!(index.contains("(Bid Number: RFQ-17) Tj"));
    for expected in [start_from + 1, start_from + 3, start_from + 6] {
        assert!(
            index.contains(&format!("({expected}) Tj")),
            "index should reference page {expected}"
        );
    }

    assert!(page_text(&doc, 2).contains("prices-Page-1"));
    assert_eq!(drawn_page_number(&doc, 2), Some(start_from + 1));

    let numbers: Vec<u32> = (1..=7).filter_map(|p| drawn_page_number(&doc, p)).collect();
    let expected: Vec<u32> = (start_from..start_from + 7).collect();
    assert_eq!(numbers, expected);
}

#[tokio::test]
async fn test_compile_long_index_spans_pages() {
    let dir = TempDir::new().unwrap();
    let output = dir.path().join("long.pdf");

    let mut request = CompilationRequest::new("Checklist", &output)
        .with_index_options(IndexOptions::with_index(1));
    for i in 0..30 {
        let path = write_pdf(&dir, &format!("attachment-{i:02}"), 1);
        request = request.with_document(DocumentDescriptor::new(format!("Attachment {i}"), path, i));
    }

    let report = Compiler::new().compile_with_report(&request).await.unwrap();
    assert_eq!(report.index_pages, 2);
    assert_eq!(report.total_pages, 32);

    let doc = load(&output);
    assert!(page_text(&doc, 3).contains("attachment-00-Page-1"));
    assert_eq!(drawn_page_number(&doc, 3), Some(3));
    assert_eq!(drawn_page_number(&doc, 32), Some(32));
}

#[tokio::test]
async fn test_compile_skips_missing_documents() {
    let dir = TempDir::new().unwrap();
    let output = dir.path().join("partial.pdf");

    let request = CompilationRequest::new("Partial", &output)
        .with_document(DocumentDescriptor::new("Present", write_pdf(&dir, "present", 2), 1))
        .with_document(DocumentDescriptor::new("Absent", dir.path().join("absent.pdf"), 2))
        .with_index_options(IndexOptions::with_index(1));

    let report = Compiler::new().compile_with_report(&request).await.unwrap();
    assert_eq!(report.documents_included, 1);
    assert_eq!(report.skipped.len(), 1);
    assert_eq!(report.skipped[0].display_name, "Absent");
    assert_eq!(report.total_pages, 3);

    let doc = load(&output);
    assert!(!page_text(&doc, 1).contains("(Absent) Tj"));
}

#[tokio::test]
async fn test_compile_with_stamp() {
    let dir = TempDir::new().unwrap();
    let output = dir.path().join("stamped.pdf");
    let seal = write_stamp_png(&dir, 40, 20);

    let request = CompilationRequest::new("Stamped", &output)
        .with_document(DocumentDescriptor::new("Letter", write_pdf(&dir, "letter", 2), 1))
        .with_index_options(IndexOptions::with_index(1))
        .with_stamp(
            StampOptions::new(&seal)
                .with_position(StampPosition::TopRight)
                .with_opacity(0.5),
        );

    Compiler::new().compile(&request).await.unwrap();

    let doc = load(&output);
    assert!(!page_text(&doc, 1).contains("/BpStamp Do"));
    for page in 2..=3 {
        let text = page_text(&doc, page);
        assert!(text.contains("/BpStamp Do"), "content page {page} should be stamped");
        assert!(text.contains("letter-Page"));
    }
}

#[tokio::test]
async fn test_compile_keeps_indirect_content_arrays() {
    let dir = TempDir::new().unwrap();
    let output = dir.path().join("indirect.pdf");
    let seal = write_stamp_png(&dir, 30, 30);

    let request = CompilationRequest::new("Indirect", &output)
        .with_document(DocumentDescriptor::new(
            "Scanned",
            write_indirect_contents_pdf(&dir, "scanned", 2),
            1,
        ))
        .with_index_options(IndexOptions::with_index(1))
        .with_stamp(StampOptions::new(&seal));

    Compiler::new().compile(&request).await.unwrap();

    let doc = load(&output);
    for page in 2..=3 {
        let text = page_text(&doc, page);
        assert!(text.contains(&format!("scanned-Page-{}", page - 1)));
        assert!(text.contains("/BpStamp Do"));
        assert_eq!(drawn_page_number(&doc, page), Some(page));
    }
}

#[tokio::test]
async fn test_compile_with_bookmarks_and_metadata() {
    let dir = TempDir::new().unwrap();
    let output = dir.path().join("bookmarked.pdf");

    let request = CompilationRequest::new("Technical Response", &output)
        .with_response_type("technical")
        .with_bid_number("BID-9")
        .with_bookmarks(true)
        .with_document(DocumentDescriptor::new("One", write_pdf(&dir, "one", 1), 1))
        .with_document(DocumentDescriptor::new("Two", write_pdf(&dir, "two", 1), 2));

    Compiler::new().compile(&request).await.unwrap();

    let doc = load(&output);
    assert!(doc.catalog().unwrap().has(b"Outlines"));
    let info = MetadataManager::new().get_info(&doc);
    assert_eq!(info.title.as_deref(), Some("Technical Response"));
    assert_eq!(info.keywords.as_deref(), Some("BID-9"));
}

#[tokio::test]
async fn test_compile_with_custom_config() {
    let dir = TempDir::new().unwrap();
    let output = dir.path().join("custom.pdf");

    let mut config = EngineConfig::default();
    config.write.atomic = false;
    config.numbering.font_size = 8.0;

    let request = CompilationRequest::new("Custom", &output)
        .with_document(DocumentDescriptor::new("Only", write_pdf(&dir, "only", 2), 1));

    let report = Compiler::with_config(&config)
        .compile_with_report(&request)
        .await
        .unwrap();
    assert_eq!(report.total_pages, 2);
    assert_eq!(drawn_page_number(&load(&output), 2), Some(2));
}
