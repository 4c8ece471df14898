//! Compilation request types handed over by the API layer.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::config::StampPosition;
use crate::error::CompilationError;

/// A source file and its position in the compiled output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentDescriptor {
    /// Caller-side identifier, carried through for reporting.
    #[serde(default)]
    pub id: String,

    /// Name shown in the index and in bookmarks.
    pub display_name: String,

    /// Path of the source PDF.
    pub file_path: PathBuf,

    /// Sort key; lower values come first.
    #[serde(default)]
    pub order: i64,
}

impl DocumentDescriptor {
    /// Create a descriptor with an empty id.
    pub fn new(display_name: impl Into<String>, file_path: impl Into<PathBuf>, order: i64) -> Self {
        Self {
            id: String::new(),
            display_name: display_name.into(),
            file_path: file_path.into(),
            order,
        }
    }

    /// Set the caller-side identifier.
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }
}

fn default_opacity() -> f32 {
    0.8
}

/// Stamp image drawn on every content page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StampOptions {
    /// PNG or JPEG image file.
    pub image_path: PathBuf,

    /// Anchor position on the page.
    #[serde(default)]
    pub position: StampPosition,

    /// Opacity between 0 and 1.
    #[serde(default = "default_opacity")]
    pub opacity: f32,

    /// Extra scale applied after fitting the image into the stamp box.
    #[serde(default)]
    pub scale: Option<f32>,
}

impl StampOptions {
    /// Stamp at the default position and opacity.
    pub fn new(image_path: impl Into<PathBuf>) -> Self {
        Self {
            image_path: image_path.into(),
            position: StampPosition::default(),
            opacity: default_opacity(),
            scale: None,
        }
    }

    /// Set the anchor position.
    pub fn with_position(mut self, position: StampPosition) -> Self {
        self.position = position;
        self
    }

    /// Set the opacity.
    pub fn with_opacity(mut self, opacity: f32) -> Self {
        self.opacity = opacity;
        self
    }

    /// Set the extra scale factor.
    pub fn with_scale(mut self, scale: f32) -> Self {
        self.scale = Some(scale);
        self
    }

    /// Scale factor, defaulting to 1.
    pub fn effective_scale(&self) -> f32 {
        self.scale.unwrap_or(1.0)
    }
}

fn default_start_from() -> u32 {
    1
}

fn default_index_title() -> String {
    "INDEX".to_string()
}

/// Index generation and page numbering start.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexOptions {
    /// Prepend generated index pages.
    #[serde(default)]
    pub include_index: bool,

    /// Number of the first output page.
    #[serde(default = "default_start_from")]
    pub start_from: u32,

    /// Index heading.
    #[serde(default = "default_index_title")]
    pub title: String,
}

impl Default for IndexOptions {
    fn default() -> Self {
        Self {
            include_index: false,
            start_from: default_start_from(),
            title: default_index_title(),
        }
    }
}

impl IndexOptions {
    /// Options that include an index numbered from `start_from`.
    pub fn with_index(start_from: u32) -> Self {
        Self {
            include_index: true,
            start_from,
            ..Default::default()
        }
    }
}

/// Everything needed to compile one bid response into a single PDF.
///
/// # Examples
///
/// ```
/// use bidpack::compile::{CompilationRequest, DocumentDescriptor, IndexOptions};
///
/// let request = CompilationRequest::new("Technical Response", "out/technical.pdf")
///     .with_document(DocumentDescriptor::new("Proposal", "proposal.pdf", 1))
///     .with_index_options(IndexOptions::with_index(1))
///     .with_bid_number("BID-2024-001");
///
/// assert_eq!(request.documents.len(), 1);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompilationRequest {
    /// Name of the response, used as document title.
    pub response_name: String,

    /// Kind of response (technical, financial, ...), used as document subject.
    #[serde(default)]
    pub response_type: String,

    /// Free-form remarks; not rendered.
    #[serde(default)]
    pub remarks: Option<String>,

    /// Source documents.
    #[serde(default)]
    pub documents: Vec<DocumentDescriptor>,

    /// Stamp drawn on content pages.
    #[serde(default)]
    pub stamp_options: Option<StampOptions>,

    /// Index and numbering options.
    #[serde(default)]
    pub index_options: IndexOptions,

    /// Bid number printed above the index title.
    #[serde(default)]
    pub bid_number: Option<String>,

    /// Output file.
    pub output_path: PathBuf,

    /// Add an outline with one entry per document.
    #[serde(default)]
    pub bookmarks: bool,
}

impl CompilationRequest {
    /// Create a request without documents.
    pub fn new(response_name: impl Into<String>, output_path: impl Into<PathBuf>) -> Self {
        Self {
            response_name: response_name.into(),
            response_type: String::new(),
            remarks: None,
            documents: Vec::new(),
            stamp_options: None,
            index_options: IndexOptions::default(),
            bid_number: None,
            output_path: output_path.into(),
            bookmarks: false,
        }
    }

    /// Add a document.
    pub fn with_document(mut self, document: DocumentDescriptor) -> Self {
        self.documents.push(document);
        self
    }

    /// Set the response type.
    pub fn with_response_type(mut self, response_type: impl Into<String>) -> Self {
        self.response_type = response_type.into();
        self
    }

    /// Set the stamp.
    pub fn with_stamp(mut self, stamp: StampOptions) -> Self {
        self.stamp_options = Some(stamp);
        self
    }

    /// Set the index options.
    pub fn with_index_options(mut self, options: IndexOptions) -> Self {
        self.index_options = options;
        self
    }

    /// Set the bid number.
    pub fn with_bid_number(mut self, bid_number: impl Into<String>) -> Self {
        self.bid_number = Some(bid_number.into());
        self
    }

    /// Enable or disable bookmarks.
    pub fn with_bookmarks(mut self, bookmarks: bool) -> Self {
        self.bookmarks = bookmarks;
        self
    }

    /// Output path of the compiled PDF.
    pub fn output_path(&self) -> &Path {
        &self.output_path
    }

    /// Documents sorted by `order`, keeping input order for ties.
    pub fn sorted_documents(&self) -> Vec<DocumentDescriptor> {
        let mut documents = self.documents.clone();
        documents.sort_by_key(|d| d.order);
        documents
    }

    /// Bid number, if present and not blank.
    pub fn bid_number_label(&self) -> Option<&str> {
        self.bid_number
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    /// Check request-level constraints.
    ///
    /// # Errors
    ///
    /// Returns [`CompilationError::InvalidRequest`] if the output path is empty,
    /// `startFrom` is zero, or the stamp opacity or scale is out of range.
    pub fn validate(&self) -> Result<(), CompilationError> {
        if self.output_path.as_os_str().is_empty() {
            return Err(CompilationError::invalid_request("output path is empty"));
        }

        if self.index_options.start_from == 0 {
            return Err(CompilationError::invalid_request(
                "startFrom must be at least 1",
            ));
        }

        if let Some(stamp) = &self.stamp_options {
            if !(0.0..=1.0).contains(&stamp.opacity) {
                return Err(CompilationError::invalid_request(format!(
                    "stamp opacity {} is outside 0..=1",
                    stamp.opacity
                )));
            }
            if let Some(scale) = stamp.scale
                && !(scale > 0.0 && scale.is_finite())
            {
                return Err(CompilationError::invalid_request(format!(
                    "stamp scale {scale} must be positive"
                )));
            }
        }

        Ok(())
    }
}
