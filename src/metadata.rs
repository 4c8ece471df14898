//! Document information dictionary management.
//!
//! This module handles the Info dictionary of a document:
//! - Title, Author, Subject, Keywords
//! - Creator and Producer
//! - Creation and modification dates
//!
//! The compiler writes it; the compression engine strips it.

use chrono::{DateTime, Utc};
use lopdf::{Dictionary, Document, Object, ObjectId, StringFormat};

use crate::error::PageError;

/// Value written to `Creator` and `Producer`.
pub const PRODUCER: &str = "bidpack";

/// Descriptive Info entries removed when stripping metadata.
pub const DESCRIPTIVE_KEYS: [&str; 6] = [
    "Title", "Author", "Subject", "Keywords", "Producer", "Creator",
];

/// Timestamp Info entries, stripped only when configured.
pub const TIMESTAMP_KEYS: [&str; 2] = ["CreationDate", "ModDate"];

/// Descriptive document information.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocumentInfo {
    /// Document title.
    pub title: Option<String>,
    /// Document author.
    pub author: Option<String>,
    /// Document subject.
    pub subject: Option<String>,
    /// Keywords.
    pub keywords: Option<String>,
}

impl DocumentInfo {
    /// Create document information, treating blank values as absent.
    pub fn new(
        title: Option<String>,
        author: Option<String>,
        subject: Option<String>,
        keywords: Option<String>,
    ) -> Self {
        let non_blank = |value: Option<String>| value.filter(|s| !s.trim().is_empty());
        Self {
            title: non_blank(title),
            author: non_blank(author),
            subject: non_blank(subject),
            keywords: non_blank(keywords),
        }
    }

    /// Whether no field is set.
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.author.is_none() && self.subject.is_none() && self.keywords.is_none()
    }
}

/// Manager for the Info dictionary.
#[derive(Debug, Clone, Default)]
pub struct MetadataManager;

impl MetadataManager {
    /// Create a new metadata manager.
    pub fn new() -> Self {
        Self
    }

    /// Write `info` into the document's Info dictionary.
    ///
    /// Creator, Producer and both dates are always set; unset fields of
    /// `info` leave existing entries untouched.
    ///
    /// # Errors
    ///
    /// Returns an error if the Info dictionary cannot be created.
    pub fn set_info(&self, doc: &mut Document, info: &DocumentInfo) -> Result<(), PageError> {
        let info_id = info_dictionary_id(doc);
        let info_dict = doc.get_object_mut(info_id)?.as_dict_mut()?;

        let fields = [
            ("Title", &info.title),
            ("Author", &info.author),
            ("Subject", &info.subject),
            ("Keywords", &info.keywords),
        ];
        for (key, value) in fields {
            if let Some(value) = value {
                info_dict.set(key, literal(value));
            }
        }

        info_dict.set("Creator", literal(PRODUCER));
        info_dict.set("Producer", literal(PRODUCER));

        let date = format_pdf_date(Utc::now());
        info_dict.set("CreationDate", literal(&date));
        info_dict.set("ModDate", literal(&date));

        Ok(())
    }

    /// Read the descriptive fields of the Info dictionary.
    pub fn get_info(&self, doc: &Document) -> DocumentInfo {
        let Some(info_dict) = info_dictionary(doc) else {
            return DocumentInfo::default();
        };

        DocumentInfo {
            title: string_field(info_dict, b"Title"),
            author: string_field(info_dict, b"Author"),
            subject: string_field(info_dict, b"Subject"),
            keywords: string_field(info_dict, b"Keywords"),
        }
    }

    /// Remove descriptive entries (and dates when `timestamps` is set).
    ///
    /// # Returns
    ///
    /// The number of removed entries.
    pub fn strip_info(&self, doc: &mut Document, timestamps: bool) -> usize {
        let keys: Vec<&str> = if timestamps {
            DESCRIPTIVE_KEYS.iter().chain(TIMESTAMP_KEYS.iter()).copied().collect()
        } else {
            DESCRIPTIVE_KEYS.to_vec()
        };

        let info_ref = match doc.trailer.get(b"Info") {
            Ok(Object::Reference(id)) => Some(*id),
            Ok(Object::Dictionary(_)) => None,
            _ => return 0,
        };

        let info_dict = match info_ref {
            Some(id) => doc.get_object_mut(id).and_then(Object::as_dict_mut),
            None => doc.trailer.get_mut(b"Info").and_then(Object::as_dict_mut),
        };
        let Ok(info_dict) = info_dict else {
            return 0;
        };

        keys.into_iter()
            .filter(|key| info_dict.remove(key.as_bytes()).is_some())
            .count()
    }

    /// Remove the catalog's XMP `Metadata` stream.
    ///
    /// Returns whether an entry was removed; the stream itself is left for
    /// pruning.
    pub fn strip_xmp(&self, doc: &mut Document) -> Result<bool, PageError> {
        Ok(doc.catalog_mut()?.remove(b"Metadata").is_some())
    }

    /// Check if a document has an Info dictionary.
    pub fn has_info(&self, doc: &Document) -> bool {
        doc.trailer.has(b"Info")
    }
}

/// Id of the Info dictionary, creating an indirect one when absent.
fn info_dictionary_id(doc: &mut Document) -> ObjectId {
    if let Ok(id) = doc.trailer.get(b"Info").and_then(Object::as_reference)
        && doc.get_object(id).and_then(Object::as_dict).is_ok()
    {
        return id;
    }

    // Carry over a direct Info dictionary if there is one.
    let existing = match doc.trailer.get(b"Info") {
        Ok(Object::Dictionary(dict)) => dict.clone(),
        _ => Dictionary::new(),
    };
    let id = doc.add_object(existing);
    doc.trailer.set("Info", Object::Reference(id));
    id
}

fn info_dictionary(doc: &Document) -> Option<&Dictionary> {
    match doc.trailer.get(b"Info").ok()? {
        Object::Reference(id) => doc.get_object(*id).ok()?.as_dict().ok(),
        Object::Dictionary(dict) => Some(dict),
        _ => None,
    }
}

fn string_field(dict: &Dictionary, key: &[u8]) -> Option<String> {
    match dict.get(key).ok()? {
        Object::String(bytes, _) => String::from_utf8(bytes.clone()).ok(),
        _ => None,
    }
}

fn literal(value: &str) -> Object {
    Object::String(value.as_bytes().to_vec(), StringFormat::Literal)
}

/// Format a timestamp as a PDF date string (`D:YYYYMMDDHHmmSSZ`).
pub fn format_pdf_date(time: DateTime<Utc>) -> String {
    time.format("D:%Y%m%d%H%M%SZ").to_string()
}
