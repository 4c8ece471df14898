//! Integration tests for size-targeted compression.

use bidpack::compress::{CompressionEngine, CompressionMethod, compression_ratio, plan_for_tier};
use bidpack::config::{CompressionTier, EngineConfig};
use lopdf::{Object, Stream, dictionary};
use rstest::rstest;
use std::path::PathBuf;
use tempfile::TempDir;

use crate::common::{build_pdf, init_tracing, load, page_text};

/// A PDF whose first page draws an uncompressed noisy RGB image.
fn write_image_pdf(dir: &TempDir, side: u32) -> PathBuf {
    let mut doc = build_pdf(2, "scan");
    let data: Vec<u8> = (0..side * side * 3)
        .map(|i| ((i * 31 + i / 5) % 241) as u8)
        .collect();
    let image_id = doc.add_object(
        Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => side as i64,
                "Height" => side as i64,
                "ColorSpace" => "DeviceRGB",
                "BitsPerComponent" => 8,
            },
            data,
        )
        .with_compression(false),
    );

    let pages = doc.get_pages();
    let first = pages[&1];
    let content_id = doc.add_object(Stream::new(
        dictionary! {},
        format!("q {side} 0 0 {side} 72 72 cm /Scan Do Q").into_bytes(),
    ));
    let page = doc.get_object_mut(first).unwrap().as_dict_mut().unwrap();
    let contents = page.get(b"Contents").unwrap().clone();
    page.set("Contents", vec![contents, Object::Reference(content_id)]);
    let resources = page.get_mut(b"Resources").unwrap().as_dict_mut().unwrap();
    resources.set("XObject", dictionary! { "Scan" => image_id });

    let path = dir.path().join("scan.pdf");
    doc.save(&path).unwrap();
    path
}

#[rstest]
#[case(CompressionTier::Light)]
#[case(CompressionTier::Recommended)]
#[case(CompressionTier::Extreme)]
#[tokio::test]
async fn test_in_process_compression_shrinks_images(#[case] tier: CompressionTier) {
    init_tracing();
    let dir = TempDir::new().unwrap();
    let input = write_image_pdf(&dir, 200);
    let output = dir.path().join(format!("out/{tier}.pdf"));

    let engine = CompressionEngine::in_process_only(&EngineConfig::default());
    let result = engine.compress(&input, &output, tier).await.unwrap();

    assert_eq!(result.method, CompressionMethod::InProcess);
    assert!(result.compressed_size_kb < result.original_size_kb);
    assert!(result.compression_ratio > 0);
    assert_eq!(
        result.compression_ratio,
        compression_ratio(result.original_size_kb, result.compressed_size_kb)
    );
    assert!(result.iterations <= EngineConfig::default().compression.max_iterations);

    let doc = load(&output);
    assert_eq!(doc.get_pages().len(), 2);
    assert!(page_text(&doc, 2).contains("scan-Page-2"));
}

#[tokio::test]
async fn test_unreachable_target_is_best_effort() {
    let dir = TempDir::new().unwrap();
    let input = write_image_pdf(&dir, 64);
    let output = dir.path().join("tiny.pdf");

    let mut config = EngineConfig::default();
    config.compression.max_iterations = 2;
    let engine = CompressionEngine::in_process_only(&config);

    // success does not depend on reaching the target
    let result = engine
        .compress(&input, &output, CompressionTier::Extreme)
        .await
        .unwrap();
    let target = plan_for_tier(result.original_size_kb, CompressionTier::Extreme).target_size_kb;
    assert!(result.iterations <= 2);
    assert_eq!(result.target_reached, result.compressed_size_kb <= target as f64);
    assert!(output.exists());
}

#[tokio::test]
async fn test_detected_engine_compresses() {
    let dir = TempDir::new().unwrap();
    let input = write_image_pdf(&dir, 64);
    let output = dir.path().join("detected.pdf");

    // uses Ghostscript when installed, in-process otherwise
    let engine = CompressionEngine::new(&EngineConfig::default());
    let result = engine
        .compress(&input, &output, CompressionTier::Recommended)
        .await
        .unwrap();

    assert_eq!(result.compressed_file_path, output);
    assert_eq!(load(&output).get_pages().len(), 2);
}

#[tokio::test]
async fn test_missing_ghostscript_falls_back() {
    let dir = TempDir::new().unwrap();
    let input = write_image_pdf(&dir, 64);
    let output = dir.path().join("fallback.pdf");

    let mut config = EngineConfig::default();
    config.compression.ghostscript_binary = "bidpack-missing-gs".to_string();
    let engine = CompressionEngine::new(&config);
    assert_eq!(engine.preferred_method(), CompressionMethod::InProcess);

    let result = engine
        .compress(&input, &output, CompressionTier::Light)
        .await
        .unwrap();
    assert_eq!(result.method, CompressionMethod::InProcess);
}
