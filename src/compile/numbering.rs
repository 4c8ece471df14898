//! Page number labels.

use lopdf::content::Operation;
use lopdf::{Document, Object, ObjectId};

use super::text::{Font, show_text};
use crate::config::NumberingLayout;
use crate::error::PageError;
use crate::pages;

/// Draws a centered `Page no : N` label near the bottom edge of a page.
#[derive(Debug, Clone, Default)]
pub struct PageNumberer {
    layout: NumberingLayout,
}

impl PageNumberer {
    /// Create a numberer with the given layout.
    pub fn new(layout: NumberingLayout) -> Self {
        Self { layout }
    }

    /// Label text for page `n`.
    pub fn label(n: u32) -> String {
        format!("Page no : {n}")
    }

    /// Number a single page.
    ///
    /// Calling this twice on the same page draws the label twice.
    pub fn number(&self, doc: &mut Document, page_id: ObjectId, n: u32) -> Result<(), PageError> {
        self.number_pages(doc, &[page_id], n)?;
        Ok(())
    }

    /// Number `page_ids` consecutively starting at `first`.
    ///
    /// The font object is shared by all labelled pages.
    ///
    /// # Returns
    ///
    /// The number following the last page.
    pub fn number_pages(
        &self,
        doc: &mut Document,
        page_ids: &[ObjectId],
        first: u32,
    ) -> Result<u32, PageError> {
        if page_ids.is_empty() {
            return Ok(first);
        }

        let font = Font::Helvetica;
        let font_id = doc.add_object(font.dictionary());
        let mut n = first;

        for &page_id in page_ids {
            let mediabox = pages::page_box(doc, page_id);
            let label = Self::label(n);
            let width = font.text_width(&label, self.layout.font_size);
            let x = mediabox.llx + (mediabox.width() - width) / 2.0;
            let y = mediabox.lly + self.layout.baseline;

            let mut operations = vec![Operation::new("g", vec![Object::Integer(0)])];
            operations.extend(show_text(font, self.layout.font_size, x, y, &label));

            pages::add_resource(
                doc,
                page_id,
                "Font",
                font.resource_name(),
                Object::Reference(font_id),
            )?;
            pages::overlay_content(doc, page_id, pages::encode_operations(operations)?)?;
            n += 1;
        }

        Ok(n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pages::testing::{page_text, sample_document};
    use lopdf::content::Content;

    #[test]
    fn test_label() {
        assert_eq!(PageNumberer::label(7), "Page no : 7");
    }

    #[test]
    fn test_number_pages_sequence() {
        let mut doc = sample_document(3, "doc");
        let ids = pages::page_ids(&doc);

        let next = PageNumberer::default()
            .number_pages(&mut doc, &ids, 5)
            .unwrap();

        assert_eq!(next, 8);
        assert!(page_text(&doc, 1).contains("(Page no : 5) Tj"));
        assert!(page_text(&doc, 2).contains("(Page no : 6) Tj"));
        assert!(page_text(&doc, 3).contains("(Page no : 7) Tj"));
        // Original content survives.
        assert!(page_text(&doc, 2).contains("doc-Page-2"));
    }

    #[test]
    fn test_label_is_centered() {
        let mut doc = sample_document(1, "doc");
        let page_id = pages::page_ids(&doc)[0];
        PageNumberer::default().number(&mut doc, page_id, 1).unwrap();

        let content = Content::decode(&doc.get_page_content(page_id).unwrap()).unwrap();
        let operations = &content.operations;
        let tj = operations
            .iter()
            .position(|op| {
                op.operator == "Tj"
                    && matches!(&op.operands[0], Object::String(s, _) if s == b"Page no : 1")
            })
            .unwrap();
        let td = &operations[tj - 1];
        assert_eq!(td.operator, "Td");

        let width = Font::Helvetica.text_width("Page no : 1", 10.0);
        let x = pages::as_number(&td.operands[0]).unwrap();
        let y = pages::as_number(&td.operands[1]).unwrap();
        assert!((x - (612.0 - width) / 2.0).abs() < 0.01);
        assert!((y - 20.0).abs() < 0.01);
    }

    #[test]
    fn test_font_resource_registered() {
        let mut doc = sample_document(1, "doc");
        let page_id = pages::page_ids(&doc)[0];
        PageNumberer::default().number(&mut doc, page_id, 1).unwrap();

        let page = doc.get_object(page_id).unwrap().as_dict().unwrap();
        let fonts = page
            .get(b"Resources")
            .unwrap()
            .as_dict()
            .unwrap()
            .get(b"Font")
            .unwrap()
            .as_dict()
            .unwrap();
        assert!(fonts.has(b"BpHelv"));
        assert!(fonts.has(b"F1"));
    }

    #[test]
    fn test_number_no_pages() {
        let mut doc = sample_document(1, "doc");
        let next = PageNumberer::default()
            .number_pages(&mut doc, &[], 3)
            .unwrap();
        assert_eq!(next, 3);
    }
}
