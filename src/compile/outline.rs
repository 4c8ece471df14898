//! Bookmark (outline) generation for compiled documents.
//!
//! One top-level bookmark is created per entry, pointing at the first page
//! of the index or of a source document.

use lopdf::{Dictionary, Document, Object, ObjectId};

use super::text::text_object;
use crate::error::PageError;

/// A bookmark title and the page it jumps to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutlineItem {
    /// Title shown in the viewer's bookmark pane.
    pub title: String,
    /// Destination page.
    pub page_id: ObjectId,
}

impl OutlineItem {
    /// Create an outline item.
    pub fn new(title: impl Into<String>, page_id: ObjectId) -> Self {
        Self {
            title: title.into(),
            page_id,
        }
    }
}

/// Builds flat PDF outlines.
#[derive(Debug, Clone, Default)]
pub struct OutlineBuilder;

impl OutlineBuilder {
    /// Create a new outline builder.
    pub fn new() -> Self {
        Self
    }

    /// Replace the document outline with `items`.
    ///
    /// Does nothing when `items` is empty.
    ///
    /// # Errors
    ///
    /// Returns an error if the catalog cannot be found.
    pub fn add_outline(&self, doc: &mut Document, items: &[OutlineItem]) -> Result<(), PageError> {
        if items.is_empty() {
            return Ok(());
        }

        let outline_id = doc.new_object_id();
        let item_ids: Vec<ObjectId> = items.iter().map(|_| doc.new_object_id()).collect();

        for (i, (item, &item_id)) in items.iter().zip(&item_ids).enumerate() {
            // [page /XYZ null null null] keeps the viewer's zoom.
            let dest = vec![
                Object::Reference(item.page_id),
                Object::Name(b"XYZ".to_vec()),
                Object::Null,
                Object::Null,
                Object::Null,
            ];

            let mut item_dict = Dictionary::new();
            item_dict.set("Title", text_object(&item.title));
            item_dict.set("Parent", Object::Reference(outline_id));
            item_dict.set("Dest", Object::Array(dest));
            if i > 0 {
                item_dict.set("Prev", Object::Reference(item_ids[i - 1]));
            }
            if let Some(&next) = item_ids.get(i + 1) {
                item_dict.set("Next", Object::Reference(next));
            }

            doc.objects.insert(item_id, Object::Dictionary(item_dict));
        }

        let mut outline_dict = Dictionary::new();
        outline_dict.set("Type", Object::Name(b"Outlines".to_vec()));
        outline_dict.set("Count", Object::Integer(item_ids.len() as i64));
        if let (Some(&first), Some(&last)) = (item_ids.first(), item_ids.last()) {
            outline_dict.set("First", Object::Reference(first));
            outline_dict.set("Last", Object::Reference(last));
        }
        doc.objects.insert(outline_id, Object::Dictionary(outline_dict));

        let catalog = doc
            .catalog_mut()
            .map_err(|e| PageError::invalid_tree(format!("failed to get catalog: {e}")))?;
        catalog.set("Outlines", Object::Reference(outline_id));
        catalog.set("PageMode", Object::Name(b"UseOutlines".to_vec()));

        Ok(())
    }

    /// Check if a document has an outline.
    pub fn has_outline(&self, doc: &Document) -> bool {
        doc.catalog().map(|c| c.has(b"Outlines")).unwrap_or(false)
    }

    /// Remove the outline from a document.
    pub fn remove_outline(&self, doc: &mut Document) {
        if let Ok(catalog) = doc.catalog_mut() {
            catalog.remove(b"Outlines");
            catalog.remove(b"PageMode");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pages::{self, testing::sample_document};

    fn outline_titles(doc: &Document) -> Vec<String> {
        let outline_id = doc
            .catalog()
            .unwrap()
            .get(b"Outlines")
            .unwrap()
            .as_reference()
            .unwrap();
        let outline = doc.get_object(outline_id).unwrap().as_dict().unwrap();

        let mut titles = Vec::new();
        let mut current = outline.get(b"First").and_then(Object::as_reference).ok();
        while let Some(id) = current {
            let item = doc.get_object(id).unwrap().as_dict().unwrap();
            if let Ok(Object::String(title, _)) = item.get(b"Title") {
                titles.push(String::from_utf8_lossy(title).into_owned());
            }
            current = item.get(b"Next").and_then(Object::as_reference).ok();
        }
        titles
    }

    #[test]
    fn test_add_outline() {
        let mut doc = sample_document(5, "doc");
        let ids = pages::page_ids(&doc);
        let builder = OutlineBuilder::new();

        builder
            .add_outline(
                &mut doc,
                &[
                    OutlineItem::new("INDEX", ids[0]),
                    OutlineItem::new("Technical", ids[1]),
                    OutlineItem::new("Financial", ids[3]),
                ],
            )
            .unwrap();

        assert!(builder.has_outline(&doc));
        assert_eq!(outline_titles(&doc), vec!["INDEX", "Technical", "Financial"]);
    }

    #[test]
    fn test_add_empty_outline() {
        let mut doc = sample_document(1, "doc");
        let builder = OutlineBuilder::new();

        builder.add_outline(&mut doc, &[]).unwrap();
        assert!(!builder.has_outline(&doc));
    }

    #[test]
    fn test_remove_outline() {
        let mut doc = sample_document(2, "doc");
        let ids = pages::page_ids(&doc);
        let builder = OutlineBuilder::new();

        builder
            .add_outline(&mut doc, &[OutlineItem::new("Only", ids[1])])
            .unwrap();
        builder.remove_outline(&mut doc);
        assert!(!builder.has_outline(&doc));
    }
}
