//! PDF reading and loading operations.
//!
//! This module provides PDF loading with:
//! - Asynchronous file reads with parsing on a blocking worker
//! - Page count verification
//! - Typed load failures (missing, corrupt, unreadable)
//!
//! # Examples
//!
//! ```no_run
//! use bidpack::io::reader::PdfReader;
//! use std::path::Path;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let reader = PdfReader::new();
//! let loaded = reader.load(Path::new("technical.pdf")).await?;
//! println!("{} pages", loaded.page_count);
//! # Ok(())
//! # }
//! ```

use lopdf::Document;
use std::path::{Path, PathBuf};
use tokio::task;

use crate::error::LoadError;

/// A loaded PDF document with metadata.
#[derive(Debug)]
pub struct LoadedPdf {
    /// The PDF document.
    pub document: Document,

    /// Path to the source file.
    pub path: PathBuf,

    /// Number of pages in the document.
    pub page_count: usize,

    /// File size in bytes.
    pub file_size: u64,
}

impl LoadedPdf {
    fn new(document: Document, path: PathBuf, file_size: u64) -> Self {
        let page_count = document.get_pages().len();

        Self {
            document,
            path,
            page_count,
            file_size,
        }
    }
}

/// Result of a load operation (success or failure).
pub type LoadResult = Result<LoadedPdf, LoadError>;

/// PDF reader with configurable loading behavior.
#[derive(Debug, Clone)]
pub struct PdfReader {
    /// Whether to reject documents without pages.
    verify: bool,
}

impl PdfReader {
    /// Create a new PDF reader with default settings.
    pub fn new() -> Self {
        Self { verify: true }
    }

    /// Create a reader that accepts documents without pages.
    pub fn without_verification() -> Self {
        Self { verify: false }
    }

    /// Load a single PDF document.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The file does not exist ([`LoadError::NotFound`])
    /// - The file cannot be read ([`LoadError::Io`])
    /// - The file is not a PDF, is encrypted, or has no pages ([`LoadError::Corrupt`])
    pub async fn load(&self, path: &Path) -> LoadResult {
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| LoadError::from_io(path, e))?;
        let file_size = bytes.len() as u64;

        let path_buf = path.to_path_buf();
        let reader = self.clone();
        let document = task::spawn_blocking(move || reader.parse(&path_buf, &bytes))
            .await
            .map_err(|e| LoadError::corrupt(path, format!("parser task failed: {e}")))??;

        Ok(LoadedPdf::new(document, path.to_path_buf(), file_size))
    }

    /// Parse PDF bytes that were read from `path`.
    ///
    /// Runs synchronously; call it from a blocking context for large inputs.
    pub fn parse(&self, path: &Path, bytes: &[u8]) -> Result<Document, LoadError> {
        let doc = Document::load_mem(bytes).map_err(|e| {
            let err_msg = e.to_string();
            if err_msg.contains("encrypt") || err_msg.contains("password") {
                LoadError::corrupt(path, "PDF is encrypted and cannot be processed")
            } else {
                LoadError::corrupt(path, err_msg)
            }
        })?;

        if self.verify && doc.get_pages().is_empty() {
            return Err(LoadError::corrupt(path, "PDF has no pages"));
        }

        Ok(doc)
    }

    /// Load multiple PDF documents one at a time in the order provided.
    ///
    /// # Returns
    ///
    /// One result per input path, in input order.
    pub async fn load_sequential(&self, paths: &[PathBuf]) -> Vec<LoadResult> {
        let mut results = Vec::with_capacity(paths.len());
        for path in paths {
            results.push(self.load(path).await);
        }
        results
    }
}

impl Default for PdfReader {
    fn default() -> Self {
        Self::new()
    }
}
