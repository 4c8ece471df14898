//! PDF writing and saving operations.
//!
//! This module provides safe PDF writing with:
//! - Recursive creation of missing output directories
//! - Atomic writes (write to a temp file in the same directory, then rename)
//! - Stream compression before serialization
//! - Write statistics
//!
//! # Examples
//!
//! ```no_run
//! use bidpack::io::writer::{PdfWriter, serialize_document};
//! use lopdf::Document;
//! use std::path::Path;
//!
//! # async fn example(mut doc: Document) -> Result<(), Box<dyn std::error::Error>> {
//! let bytes = serialize_document(&mut doc, true)?;
//! let stats = PdfWriter::new()
//!     .write_bytes(bytes, Path::new("out/compiled.pdf"))
//!     .await?;
//! println!("wrote {}", stats.format_file_size());
//! # Ok(())
//! # }
//! ```

use lopdf::Document;
use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tokio::task;

use crate::error::WriteError;

/// Options for writing PDF files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct WriteOptions {
    /// Use atomic writes (write to temp file, then rename).
    pub atomic: bool,

    /// Compress uncompressed streams before writing documents.
    pub compress: bool,

    /// Buffer size for writing (in bytes).
    pub buffer_size: usize,
}

impl Default for WriteOptions {
    fn default() -> Self {
        Self {
            atomic: true,
            compress: true,
            buffer_size: 8192,
        }
    }
}

/// Statistics about a write operation.
#[derive(Debug, Clone)]
pub struct WriteStatistics {
    /// Size of the written file in bytes.
    pub file_size: u64,

    /// Path where the file was written.
    pub output_path: PathBuf,
}

impl WriteStatistics {
    /// Format file size as human-readable string.
    pub fn format_file_size(&self) -> String {
        super::format_file_size(self.file_size)
    }
}

/// PDF writer with configurable behavior.
#[derive(Debug, Clone, Default)]
pub struct PdfWriter {
    options: WriteOptions,
}

impl PdfWriter {
    /// Create a new PDF writer with default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a writer with custom options.
    pub fn with_options(options: WriteOptions) -> Self {
        Self { options }
    }

    /// Options this writer was built with.
    pub fn options(&self) -> &WriteOptions {
        &self.options
    }

    /// Save already serialized PDF bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The output directory cannot be created
    /// - The file cannot be written or renamed into place
    pub async fn write_bytes(
        &self,
        bytes: Vec<u8>,
        path: &Path,
    ) -> Result<WriteStatistics, WriteError> {
        let path_buf = path.to_path_buf();
        let options = self.options.clone();

        task::spawn_blocking(move || persist(&bytes, &path_buf, &options))
            .await
            .map_err(|e| WriteError::Task(e.to_string()))?
    }
}

/// Serialize a document into PDF bytes.
///
/// When `compress` is set, every stream that allows it is Flate-compressed first.
pub fn serialize_document(doc: &mut Document, compress: bool) -> lopdf::Result<Vec<u8>> {
    if compress {
        doc.compress();
    }

    let mut buffer = Vec::new();
    doc.save_to(&mut buffer)?;
    Ok(buffer)
}

/// Temp path next to `path`: `<file name>.tmp` in the same directory.
fn temp_path_for(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(OsString::from)
        .unwrap_or_else(|| OsString::from("output"));
    name.push(".tmp");
    path.with_file_name(name)
}

fn persist(bytes: &[u8], path: &Path, options: &WriteOptions) -> Result<WriteStatistics, WriteError> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent).map_err(|e| WriteError::CreateDirectory {
            path: parent.to_path_buf(),
            source: e,
        })?;
    }

    let write_path = if options.atomic {
        temp_path_for(path)
    } else {
        path.to_path_buf()
    };

    let result = write_file(bytes, &write_path, options.buffer_size).and_then(|()| {
        if options.atomic {
            std::fs::rename(&write_path, path).map_err(|e| WriteError::Write {
                path: path.to_path_buf(),
                source: e,
            })
        } else {
            Ok(())
        }
    });

    if result.is_err() && options.atomic {
        let _ = std::fs::remove_file(&write_path);
    }
    result?;

    Ok(WriteStatistics {
        file_size: bytes.len() as u64,
        output_path: path.to_path_buf(),
    })
}

fn write_file(bytes: &[u8], path: &Path, buffer_size: usize) -> Result<(), WriteError> {
    let file = File::create(path).map_err(|e| WriteError::CreateOutput {
        path: path.to_path_buf(),
        source: e,
    })?;

    let mut writer = BufWriter::with_capacity(buffer_size.max(1), file);
    let to_write_error = |e| WriteError::Write {
        path: path.to_path_buf(),
        source: e,
    };

    writer.write_all(bytes).map_err(to_write_error)?;
    writer.flush().map_err(to_write_error)?;
    writer.get_ref().sync_all().map_err(to_write_error)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pages::testing::sample_document;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_write_creates_missing_directories() {
        let temp_dir = TempDir::new().unwrap();
        let output_path = temp_dir.path().join("nested/deeper/output.pdf");
        let bytes = serialize_document(&mut sample_document(2, "doc"), true).unwrap();

        let stats = PdfWriter::new()
            .write_bytes(bytes, &output_path)
            .await
            .unwrap();

        assert!(output_path.exists());
        assert_eq!(stats.output_path, output_path);
        assert!(stats.file_size > 0);
        assert!(!temp_path_for(&output_path).exists());

        let reloaded = Document::load(&output_path).unwrap();
        assert_eq!(reloaded.get_pages().len(), 2);
    }

    #[tokio::test]
    async fn test_non_atomic_write() {
        let temp_dir = TempDir::new().unwrap();
        let output_path = temp_dir.path().join("output.pdf");
        let writer = PdfWriter::with_options(WriteOptions {
            atomic: false,
            ..WriteOptions::default()
        });

        let stats = writer.write_bytes(b"%PDF-".to_vec(), &output_path).await.unwrap();
        assert_eq!(stats.file_size, 5);
        assert!(output_path.exists());
    }

    #[tokio::test]
    async fn test_write_bytes_overwrites() {
        let temp_dir = TempDir::new().unwrap();
        let output_path = temp_dir.path().join("output.pdf");
        std::fs::write(&output_path, b"old contents that are longer").unwrap();

        let stats = PdfWriter::new()
            .write_bytes(b"new".to_vec(), &output_path)
            .await
            .unwrap();

        assert_eq!(stats.file_size, 3);
        assert_eq!(std::fs::read(&output_path).unwrap(), b"new");
    }

    #[test]
    fn test_serialize_without_compression_keeps_text_readable() {
        let bytes = serialize_document(&mut sample_document(1, "plain"), false).unwrap();
        let text = String::from_utf8_lossy(&bytes);
        assert!(text.starts_with("%PDF-"));
        assert!(text.contains("plain-Page-1"));
    }

    #[tokio::test]
    async fn test_write_into_file_parent_fails() {
        let temp_dir = TempDir::new().unwrap();
        let blocker = temp_dir.path().join("blocker");
        std::fs::write(&blocker, b"x").unwrap();

        let result = PdfWriter::new()
            .write_bytes(b"data".to_vec(), &blocker.join("out.pdf"))
            .await;
        assert!(matches!(result, Err(WriteError::CreateDirectory { .. })));
    }

    #[test]
    fn test_temp_path_for() {
        assert_eq!(
            temp_path_for(Path::new("/a/b/out.pdf")),
            PathBuf::from("/a/b/out.pdf.tmp")
        );
    }
}
