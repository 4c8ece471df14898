//! Page-level operations on loaded documents.
//!
//! This module handles page-level operations including:
//! - Creating an empty output document
//! - Page counting and effective page geometry
//! - Copying pages between documents
//! - Appending content streams and page resources
//!
//! Page attributes that PDF allows to be inherited from the page tree
//! (`MediaBox`, `CropBox`, `Resources`, `Rotate`) are materialized on every
//! copied page, so a copied page never depends on its source page tree.

use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream, dictionary};
use std::collections::BTreeMap;

use crate::error::PageError;

/// US Letter, used when a page carries no MediaBox at all.
pub const DEFAULT_PAGE_SIZE: (f32, f32) = (612.0, 792.0);

const INHERITABLE_KEYS: [&[u8]; 4] = [b"MediaBox", b"CropBox", b"Resources", b"Rotate"];

/// Page boxes rescaled together with the page content.
pub const PAGE_BOX_KEYS: [&[u8]; 5] = [b"MediaBox", b"CropBox", b"BleedBox", b"TrimBox", b"ArtBox"];

/// A page rectangle in default user space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageBox {
    /// Lower-left x.
    pub llx: f32,
    /// Lower-left y.
    pub lly: f32,
    /// Upper-right x.
    pub urx: f32,
    /// Upper-right y.
    pub ury: f32,
}

impl PageBox {
    /// Box spanning `(0, 0)` to `(width, height)`.
    pub fn from_size(width: f32, height: f32) -> Self {
        Self {
            llx: 0.0,
            lly: 0.0,
            urx: width,
            ury: height,
        }
    }

    /// Width of the box.
    pub fn width(&self) -> f32 {
        (self.urx - self.llx).abs()
    }

    /// Height of the box.
    pub fn height(&self) -> f32 {
        (self.ury - self.lly).abs()
    }

    fn from_object(obj: &Object) -> Option<Self> {
        let arr = obj.as_array().ok()?;
        if arr.len() != 4 {
            return None;
        }
        Some(Self {
            llx: as_number(&arr[0])?,
            lly: as_number(&arr[1])?,
            urx: as_number(&arr[2])?,
            ury: as_number(&arr[3])?,
        })
    }

    fn to_object(self) -> Object {
        Object::Array(vec![
            Object::Real(self.llx),
            Object::Real(self.lly),
            Object::Real(self.urx),
            Object::Real(self.ury),
        ])
    }
}

/// Numeric value of an Integer or Real object.
pub fn as_number(obj: &Object) -> Option<f32> {
    match obj {
        Object::Integer(i) => Some(*i as f32),
        Object::Real(r) => Some(*r),
        _ => None,
    }
}

/// Create an empty document with a catalog and an empty page tree.
pub fn new_document() -> Document {
    let mut doc = Document::with_version("1.7");

    let pages_id = doc.add_object(dictionary! {
        "Type" => "Pages",
        "Kids" => Vec::<Object>::new(),
        "Count" => 0,
    });

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });

    doc.trailer.set("Root", catalog_id);
    doc
}

/// Object id of the root `Pages` node.
pub fn pages_root(doc: &Document) -> Result<ObjectId, PageError> {
    let catalog = doc
        .catalog()
        .map_err(|e| PageError::invalid_tree(format!("failed to get catalog: {e}")))?;

    catalog
        .get(b"Pages")
        .and_then(|p| p.as_reference())
        .map_err(|e| PageError::invalid_tree(format!("failed to get pages reference: {e}")))
}

/// Page object ids in page order.
pub fn page_ids(doc: &Document) -> Vec<ObjectId> {
    doc.get_pages().into_values().collect()
}

/// Get the number of pages in a document.
pub fn page_count(doc: &Document) -> usize {
    doc.get_pages().len()
}

/// Look up `key` on the page, then up the `Parent` chain.
fn inherited_attribute<'a>(doc: &'a Document, page_id: ObjectId, key: &[u8]) -> Option<&'a Object> {
    let mut current = doc.get_object(page_id).ok()?.as_dict().ok()?;
    // Page trees are shallow; the bound guards against Parent cycles.
    for _ in 0..64 {
        if let Ok(value) = current.get(key) {
            return Some(value);
        }
        let parent = current.get(b"Parent").and_then(|p| p.as_reference()).ok()?;
        current = doc.get_object(parent).ok()?.as_dict().ok()?;
    }
    None
}

/// Effective MediaBox of a page, honouring inheritance.
///
/// Falls back to [`DEFAULT_PAGE_SIZE`] when no MediaBox is present.
pub fn page_box(doc: &Document, page_id: ObjectId) -> PageBox {
    inherited_attribute(doc, page_id, b"MediaBox")
        .and_then(|obj| match obj {
            Object::Reference(id) => doc.get_object(*id).ok().and_then(PageBox::from_object),
            other => PageBox::from_object(other),
        })
        .unwrap_or_else(|| PageBox::from_size(DEFAULT_PAGE_SIZE.0, DEFAULT_PAGE_SIZE.1))
}

/// Effective `(width, height)` of a page.
pub fn page_size(doc: &Document, page_id: ObjectId) -> (f32, f32) {
    let mediabox = page_box(doc, page_id);
    (mediabox.width(), mediabox.height())
}

/// Resolve a direct or referenced dictionary into an owned copy.
pub fn resolve_dict(doc: &Document, obj: &Object) -> Option<Dictionary> {
    match obj {
        Object::Dictionary(dict) => Some(dict.clone()),
        Object::Reference(id) => doc
            .get_object(*id)
            .ok()
            .and_then(|o| o.as_dict().ok())
            .cloned(),
        _ => None,
    }
}

fn page_dict_mut(doc: &mut Document, page_id: ObjectId) -> Result<&mut Dictionary, PageError> {
    Ok(doc.get_object_mut(page_id)?.as_dict_mut()?)
}

/// Copy the inherited attributes onto the page dictionary itself.
pub fn materialize_inherited(doc: &mut Document, page_id: ObjectId) -> Result<(), PageError> {
    let mut inherited = Vec::new();
    for key in INHERITABLE_KEYS {
        if let Some(value) = inherited_attribute(doc, page_id, key) {
            inherited.push((key, value.clone()));
        }
    }

    let page = page_dict_mut(doc, page_id)?;
    for (key, value) in inherited {
        if !page.has(key) {
            page.set(key.to_vec(), value);
        }
    }
    if !page.has(b"MediaBox") {
        page.set(
            "MediaBox",
            PageBox::from_size(DEFAULT_PAGE_SIZE.0, DEFAULT_PAGE_SIZE.1).to_object(),
        );
    }

    Ok(())
}

/// Copy pages from `source` into `dest`, appending them to the page tree.
///
/// Only objects reachable from the copied pages are transferred, under fresh
/// object ids. References to pages that are not part of the copy become null.
///
/// # Errors
///
/// Returns an error if an index is out of range or either page tree is invalid.
pub fn copy_pages(
    source: &Document,
    dest: &mut Document,
    page_indices: &[usize],
) -> Result<Vec<ObjectId>, PageError> {
    let source_pages = page_ids(source);
    for &index in page_indices {
        if index >= source_pages.len() {
            return Err(PageError::OutOfRange {
                index,
                count: source_pages.len(),
            });
        }
    }

    let dest_pages_id = pages_root(dest)?;

    // Pre-assign ids so annotations pointing back at their page resolve to the copy.
    let mut id_map = BTreeMap::new();
    let mut copied = Vec::with_capacity(page_indices.len());
    for &index in page_indices {
        let source_id = source_pages[index];
        let new_id = *id_map
            .entry(source_id)
            .or_insert_with(|| dest.new_object_id());
        copied.push((source_id, new_id));
    }

    let mut importer = Importer {
        source,
        id_map,
    };

    let mut new_page_ids = Vec::with_capacity(copied.len());
    for (source_id, new_id) in copied {
        if dest.objects.contains_key(&new_id) {
            // Same source page requested twice: give the repeat its own object.
            let duplicate = dest.get_object(new_id)?.clone();
            let dup_id = dest.add_object(duplicate);
            new_page_ids.push(dup_id);
            continue;
        }

        let mut page = flattened_page(source, source_id)?;
        page.remove(b"Parent");
        let mut page = importer.import_dict(dest, &page);
        page.set("Parent", dest_pages_id);
        dest.objects.insert(new_id, Object::Dictionary(page));
        new_page_ids.push(new_id);
    }

    append_kids(dest, dest_pages_id, &new_page_ids)?;
    Ok(new_page_ids)
}

/// Copy every page of `source` into `dest`.
pub fn copy_all_pages(source: &Document, dest: &mut Document) -> Result<Vec<ObjectId>, PageError> {
    let indices: Vec<usize> = (0..page_count(source)).collect();
    copy_pages(source, dest, &indices)
}

fn flattened_page(doc: &Document, page_id: ObjectId) -> Result<Dictionary, PageError> {
    let mut page = doc.get_object(page_id)?.as_dict()?.clone();
    for key in INHERITABLE_KEYS {
        if !page.has(key)
            && let Some(value) = inherited_attribute(doc, page_id, key)
        {
            page.set(key.to_vec(), value.clone());
        }
    }
    if !page.has(b"MediaBox") {
        page.set(
            "MediaBox",
            PageBox::from_size(DEFAULT_PAGE_SIZE.0, DEFAULT_PAGE_SIZE.1).to_object(),
        );
    }
    Ok(page)
}

/// Deep-copies objects from one document into another, remapping ids.
struct Importer<'a> {
    source: &'a Document,
    id_map: BTreeMap<ObjectId, ObjectId>,
}

impl Importer<'_> {
    fn import_object(&mut self, dest: &mut Document, obj: &Object) -> Object {
        match obj {
            Object::Reference(id) => self.import_reference(dest, *id),
            Object::Array(items) => Object::Array(
                items
                    .iter()
                    .map(|item| self.import_object(dest, item))
                    .collect(),
            ),
            Object::Dictionary(dict) => Object::Dictionary(self.import_dict(dest, dict)),
            Object::Stream(stream) => {
                let mut copy = stream.clone();
                copy.dict = self.import_dict(dest, &stream.dict);
                Object::Stream(copy)
            }
            other => other.clone(),
        }
    }

    fn import_dict(&mut self, dest: &mut Document, dict: &Dictionary) -> Dictionary {
        let mut copy = Dictionary::new();
        for (key, value) in dict.iter() {
            copy.set(key.clone(), self.import_object(dest, value));
        }
        copy
    }

    fn import_reference(&mut self, dest: &mut Document, id: ObjectId) -> Object {
        if let Some(new_id) = self.id_map.get(&id) {
            return Object::Reference(*new_id);
        }

        let Ok(source_obj) = self.source.get_object(id) else {
            return Object::Null;
        };

        if is_page_tree_node(source_obj) {
            return Object::Null;
        }

        let new_id = dest.new_object_id();
        self.id_map.insert(id, new_id);
        let imported = self.import_object(dest, source_obj);
        dest.objects.insert(new_id, imported);
        Object::Reference(new_id)
    }
}

fn is_page_tree_node(obj: &Object) -> bool {
    let Ok(dict) = obj.as_dict() else {
        return false;
    };
    matches!(
        dict.get(b"Type").and_then(|t| t.as_name()),
        Ok(b"Page") | Ok(b"Pages")
    )
}

/// Add pages to a document's root page tree node.
fn append_kids(doc: &mut Document, pages_id: ObjectId, page_ids: &[ObjectId]) -> Result<(), PageError> {
    let pages_dict = doc
        .get_object_mut(pages_id)
        .map_err(|e| PageError::invalid_tree(format!("failed to get pages object: {e}")))?;

    let Object::Dictionary(dict) = pages_dict else {
        return Err(PageError::invalid_tree("Pages object is not a dictionary"));
    };

    let kids = dict
        .get_mut(b"Kids")
        .map_err(|_| PageError::invalid_tree("Pages dictionary missing Kids array"))?;

    let Object::Array(kids_array) = kids else {
        return Err(PageError::invalid_tree("Kids is not an array"));
    };

    kids_array.extend(page_ids.iter().map(|&id| Object::Reference(id)));

    let current_count = dict.get(b"Count").and_then(|c| c.as_i64()).unwrap_or(0);
    dict.set("Count", Object::Integer(current_count + page_ids.len() as i64));

    Ok(())
}

/// Append a new page built from `page` to the root page tree.
///
/// `Type` and `Parent` are set on the dictionary.
pub fn push_page(doc: &mut Document, mut page: Dictionary) -> Result<ObjectId, PageError> {
    let pages_id = pages_root(doc)?;
    page.set("Type", "Page");
    page.set("Parent", pages_id);
    let page_id = doc.add_object(page);
    append_kids(doc, pages_id, &[page_id])?;
    Ok(page_id)
}

/// Encode content stream operations.
pub fn encode_operations(operations: Vec<Operation>) -> Result<Vec<u8>, PageError> {
    Content { operations }
        .encode()
        .map_err(|e| PageError::Content(e.to_string()))
}

/// The page's content streams as a flat list.
///
/// `Contents` may be a stream, an array of streams, or a reference to either.
fn content_references(doc: &Document, page_id: ObjectId) -> Result<Vec<Object>, PageError> {
    let page = doc.get_object(page_id)?.as_dict()?;
    Ok(match page.get(b"Contents") {
        Ok(Object::Array(items)) => items.clone(),
        Ok(Object::Reference(id)) => match doc.get_object(*id) {
            Ok(Object::Array(items)) => items.clone(),
            _ => vec![Object::Reference(*id)],
        },
        Ok(Object::Null) | Err(_) => Vec::new(),
        Ok(other) => vec![other.clone()],
    })
}

/// Append a content stream after the page's existing content.
pub fn append_content(doc: &mut Document, page_id: ObjectId, mut content: Vec<u8>) -> Result<(), PageError> {
    // Streams are concatenated without separators when the page is rendered.
    if !content.first().is_some_and(u8::is_ascii_whitespace) {
        content.insert(0, b'\n');
    }
    let stream_id = doc.add_object(Stream::new(Dictionary::new(), content));
    let mut contents = content_references(doc, page_id)?;
    contents.push(Object::Reference(stream_id));
    page_dict_mut(doc, page_id)?.set("Contents", Object::Array(contents));
    Ok(())
}

/// Surround the page's existing content with `before` and `after`.
///
/// Used to isolate the existing graphics state (`q` / `Q`) or to apply a
/// transformation to everything already drawn.
pub fn wrap_content(
    doc: &mut Document,
    page_id: ObjectId,
    mut before: Vec<u8>,
    after: Vec<u8>,
) -> Result<(), PageError> {
    if !before.ends_with(b"\n") {
        before.push(b'\n');
    }
    let before_id = doc.add_object(Stream::new(Dictionary::new(), before));
    let after_id = doc.add_object(Stream::new(Dictionary::new(), after));

    let mut contents = vec![Object::Reference(before_id)];
    contents.extend(content_references(doc, page_id)?);
    contents.push(Object::Reference(after_id));
    page_dict_mut(doc, page_id)?.set("Contents", Object::Array(contents));
    Ok(())
}

/// Draw `content` on top of the page, isolated from its existing graphics state.
pub fn overlay_content(doc: &mut Document, page_id: ObjectId, content: Vec<u8>) -> Result<(), PageError> {
    wrap_content(doc, page_id, b"q\n".to_vec(), b"\nQ\n".to_vec())?;
    append_content(doc, page_id, content)
}

/// Register a named resource (`Font`, `XObject`, `ExtGState`, ...) on a page.
///
/// The page's (possibly inherited or shared) resource dictionary is copied
/// onto the page before modification, so other pages are unaffected.
pub fn add_resource(
    doc: &mut Document,
    page_id: ObjectId,
    category: &str,
    name: &str,
    value: Object,
) -> Result<(), PageError> {
    let mut resources = inherited_attribute(doc, page_id, b"Resources")
        .and_then(|obj| resolve_dict(doc, obj))
        .unwrap_or_else(Dictionary::new);

    let mut entries = resources
        .get(category.as_bytes())
        .ok()
        .and_then(|obj| resolve_dict(doc, obj))
        .unwrap_or_else(Dictionary::new);
    entries.set(name, value);
    resources.set(category, Object::Dictionary(entries));

    page_dict_mut(doc, page_id)?.set("Resources", Object::Dictionary(resources));
    Ok(())
}

/// Scale a page's content and boxes uniformly by `factor` around the origin.
pub fn scale_page(doc: &mut Document, page_id: ObjectId, factor: f32) -> Result<(), PageError> {
    materialize_inherited(doc, page_id)?;

    let transform = encode_operations(vec![
        Operation::new("q", vec![]),
        Operation::new(
            "cm",
            vec![
                Object::Real(factor),
                Object::Integer(0),
                Object::Integer(0),
                Object::Real(factor),
                Object::Integer(0),
                Object::Integer(0),
            ],
        ),
    ])?;
    wrap_content(doc, page_id, transform, b"\nQ\n".to_vec())?;

    let mut boxes = Vec::new();
    {
        let page = doc.get_object(page_id)?.as_dict()?;
        for key in PAGE_BOX_KEYS {
            if let Some(found) = page.get(key).ok().and_then(|obj| match obj {
                Object::Reference(id) => doc.get_object(*id).ok().and_then(PageBox::from_object),
                other => PageBox::from_object(other),
            }) {
                boxes.push((key, found));
            }
        }
    }

    let page = page_dict_mut(doc, page_id)?;
    for (key, found) in boxes {
        let scaled = PageBox {
            llx: found.llx * factor,
            lly: found.lly * factor,
            urx: found.urx * factor,
            ury: found.ury * factor,
        };
        page.set(key.to_vec(), scaled.to_object());
    }

    Ok(())
}

#[cfg(test)]
pub(crate) mod testing {
    //! Programmatic fixtures shared by unit tests.

    use lopdf::{Dictionary, Document, Object, Stream, dictionary};

    /// Document with `pages` Letter pages, each showing `{label}-Page-{n}`.
    ///
    /// MediaBox and Resources live on the Pages node to exercise inheritance.
    pub fn sample_document(pages: usize, label: &str) -> Document {
        let mut doc = Document::with_version("1.5");

        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
        });

        let mut kids = Vec::new();
        for n in 1..=pages {
            let content = format!("BT /F1 12 Tf 72 700 Td ({label}-Page-{n}) Tj ET");
            let content_id = doc.add_object(Stream::new(Dictionary::new(), content.into_bytes()));
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
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
                "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
                "Resources" => dictionary! {
                    "Font" => dictionary! { "F1" => font_id },
                },
            }),
        );

        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        doc
    }

    /// Decoded content of a page as lossy UTF-8.
    pub fn page_text(doc: &Document, page_number: u32) -> String {
        let page_id = doc.get_pages()[&page_number];
        let content = doc.get_page_content(page_id).unwrap_or_default();
        String::from_utf8_lossy(&content).into_owned()
    }
}
