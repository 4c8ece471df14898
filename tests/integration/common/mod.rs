//! Shared helpers for the integration tests.
//!
//! Fixtures are generated on the fly: lopdf documents whose pages carry
//! identifiable text, and stamp images drawn with the `image` crate.

#![allow(dead_code)]

use image::{Rgba, RgbaImage};
use lopdf::{Document, Object, Stream, dictionary};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Install a test subscriber once; honours `RUST_LOG`.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Build a document with `pages` Letter pages showing `{label}-Page-{n}`.
pub fn build_pdf(pages: usize, label: &str) -> Document {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    });

    let mut kids = Vec::new();
    for n in 1..=pages {
        let content = format!("BT /F1 14 Tf 72 700 Td ({label}-Page-{n}) Tj ET");
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.into_bytes()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
            "Resources" => dictionary! {
                "Font" => dictionary! { "F1" => font_id },
            },
            "Contents" => content_id,
        });
        kids.push(Object::Reference(page_id));
    }

    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => pages as i64,
        }),
    );

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc
}

/// Write a generated PDF named `{name}.pdf` into `dir`.
pub fn write_pdf(dir: &TempDir, name: &str, pages: usize) -> PathBuf {
    let path = dir.path().join(format!("{name}.pdf"));
    build_pdf(pages, name)
        .save(&path)
        .expect("Failed to write fixture PDF");
    path
}

/// Write a PDF whose pages reference their content through an indirect array.
///
/// Each page's `Contents` is `n 0 R`, where object `n` is `[s 0 R]`.
pub fn write_indirect_contents_pdf(dir: &TempDir, name: &str, pages: usize) -> PathBuf {
    let mut doc = build_pdf(pages, name);
    for page_id in doc.get_pages().into_values() {
        let stream = doc
            .get_dictionary(page_id)
            .and_then(|page| page.get(b"Contents"))
            .expect("fixture page has contents")
            .clone();
        let array_id = doc.add_object(Object::Array(vec![stream]));
        doc.get_object_mut(page_id)
            .and_then(Object::as_dict_mut)
            .expect("fixture page is a dictionary")
            .set("Contents", Object::Reference(array_id));
    }

    let path = dir.path().join(format!("{name}.pdf"));
    doc.save(&path).expect("Failed to write fixture PDF");
    path
}

/// Write a semi-transparent red PNG of `width` x `height` pixels.
pub fn write_stamp_png(dir: &TempDir, width: u32, height: u32) -> PathBuf {
    let path = dir.path().join("seal.png");
    let image = RgbaImage::from_fn(width, height, |x, _| {
        if x % 2 == 0 {
            Rgba([200, 20, 20, 255])
        } else {
            Rgba([200, 20, 20, 128])
        }
    });
    image.save(&path).expect("Failed to write stamp image");
    path
}

/// Decoded content of the 1-based `page_number` as lossy UTF-8.
pub fn page_text(doc: &Document, page_number: u32) -> String {
    let pages = doc.get_pages();
    let page_id = pages
        .get(&page_number)
        .unwrap_or_else(|| panic!("page {page_number} missing"));
    let content = doc.get_page_content(*page_id).expect("Failed to read page content");
    String::from_utf8_lossy(&content).into_owned()
}

/// Page number drawn on the page as `Page no : N`, if any.
pub fn drawn_page_number(doc: &Document, page_number: u32) -> Option<u32> {
    let text = page_text(doc, page_number);
    let start = text.find("(Page no : ")? + "(Page no : ".len();
    let digits: String = text[start..].chars().take_while(char::is_ascii_digit).collect();
    digits.parse().ok()
}

/// Load a PDF, panicking with the path on failure.
pub fn load(path: &Path) -> Document {
    Document::load(path).unwrap_or_else(|e| panic!("Failed to load {}: {e}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_pdf() {
        let doc = build_pdf(3, "fixture");
        assert_eq!(doc.get_pages().len(), 3);
        assert!(page_text(&doc, 2).contains("fixture-Page-2"));
        assert_eq!(drawn_page_number(&doc, 1), None);
    }
}
