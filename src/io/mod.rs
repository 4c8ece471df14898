//! I/O operations for bidpack.
//!
//! This module handles all file I/O operations including:
//! - Loading PDF documents from disk
//! - Writing compiled, merged and compressed PDFs to disk
//! - Human-readable file size labels
//!
//! # Examples
//!
//! ```no_run
//! use bidpack::io::{PdfReader, PdfWriter, serialize_document};
//! use std::path::PathBuf;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let reader = PdfReader::new();
//! let mut loaded = reader.load(&PathBuf::from("input.pdf")).await?;
//!
//! let bytes = serialize_document(&mut loaded.document, true)?;
//! PdfWriter::new().write_bytes(bytes, &PathBuf::from("output.pdf")).await?;
//! # Ok(())
//! # }
//! ```

pub mod reader;
pub mod writer;

pub use reader::{LoadResult, LoadedPdf, PdfReader};
pub use writer::{PdfWriter, WriteOptions, WriteStatistics, serialize_document};

use crate::error::LoadError;
use std::path::Path;

/// Size of the file at `path` as `"{X.XX} MB"`.
///
/// # Errors
///
/// Returns [`LoadError::NotFound`] or [`LoadError::Io`] when the file cannot be inspected.
pub fn file_size_label(path: &Path) -> Result<String, LoadError> {
    let metadata = std::fs::metadata(path).map_err(|e| LoadError::from_io(path, e))?;
    Ok(format_megabytes(metadata.len()))
}

/// Format a byte count as megabytes with two decimals.
pub fn format_megabytes(bytes: u64) -> String {
    format!("{:.2} MB", bytes as f64 / (1024.0 * 1024.0))
}

/// Format file size as human-readable string.
pub fn format_file_size(size: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if size >= GB {
        format!("{:.2} GB", size as f64 / GB as f64)
    } else if size >= MB {
        format!("{:.2} MB", size as f64 / MB as f64)
    } else if size >= KB {
        format!("{:.2} KB", size as f64 / KB as f64)
    } else {
        format!("{size} bytes")
    }
}

/// Byte count in kilobytes.
pub fn kilobytes(bytes: u64) -> f64 {
    bytes as f64 / 1024.0
}
