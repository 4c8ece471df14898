//! Removal of non-essential document structures.

use lopdf::{Document, ObjectId};

use crate::error::PageError;
use crate::pages;

/// Page entries removed with annotations.
pub const ANNOTATION_PAGE_KEYS: [&[u8]; 4] = [b"Annots", b"Tabs", b"Group", b"OC"];

/// Catalog entries removed with annotations.
pub const ANNOTATION_CATALOG_KEYS: [&[u8]; 1] = [b"OCProperties"];

/// Page entries removed by the structural pass.
pub const STRUCTURAL_PAGE_KEYS: [&[u8]; 4] = [b"StructParents", b"PieceInfo", b"Thumb", b"Metadata"];

/// Catalog entries removed by the structural pass.
pub const STRUCTURAL_CATALOG_KEYS: [&[u8]; 4] = [b"StructTreeRoot", b"MarkInfo", b"PieceInfo", b"SpiderInfo"];

/// Remove annotations and optional content from every page and the catalog.
///
/// Returns the number of entries removed.
pub fn strip_annotations(doc: &mut Document) -> Result<usize, PageError> {
    strip_entries(doc, &ANNOTATION_PAGE_KEYS, &ANNOTATION_CATALOG_KEYS)
}

/// Remove tagging, thumbnails and application data.
///
/// Returns the number of entries removed.
pub fn strip_structure(doc: &mut Document) -> Result<usize, PageError> {
    strip_entries(doc, &STRUCTURAL_PAGE_KEYS, &STRUCTURAL_CATALOG_KEYS)
}

fn strip_entries(doc: &mut Document, page_keys: &[&[u8]], catalog_keys: &[&[u8]]) -> Result<usize, PageError> {
    let mut removed = 0;

    let page_ids: Vec<ObjectId> = pages::page_ids(doc);
    for page_id in page_ids {
        let page = doc.get_object_mut(page_id)?.as_dict_mut()?;
        for key in page_keys {
            if page.remove(key).is_some() {
                removed += 1;
            }
        }
    }

    let catalog = doc.catalog_mut()?;
    for key in catalog_keys {
        if catalog.remove(key).is_some() {
            removed += 1;
        }
    }

    Ok(removed)
}

/// Drop objects no longer reachable from the trailer.
///
/// Returns the number of objects removed.
pub fn prune(doc: &mut Document) -> usize {
    let removed = doc.prune_objects().len();
    doc.delete_zero_length_streams();
    removed
}
