//! Concatenation of compiled submissions.
//!
//! Submissions are already numbered and stamped by the compiler, so the
//! merger only appends their pages in the order given.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tokio::task;

use crate::config::EngineConfig;
use crate::error::{MergeError, PageError};
use crate::io::{LoadedPdf, PdfReader, PdfWriter, format_file_size, serialize_document};
use crate::pages;

/// Statistics about a merge operation.
#[derive(Debug, Clone)]
pub struct MergeStatistics {
    /// Where the merged PDF was written.
    pub output_path: PathBuf,

    /// Number of submissions successfully merged.
    pub files_merged: usize,

    /// Total number of pages in the merged document.
    pub total_pages: usize,

    /// Inputs that were missing or unreadable.
    pub skipped: Vec<PathBuf>,

    /// Combined size of the merged inputs in bytes.
    pub input_size: u64,

    /// Size of the written file in bytes.
    pub file_size: u64,

    /// Total time taken for the merge.
    pub merge_time: Duration,
}

impl MergeStatistics {
    /// Format output size as human-readable string.
    pub fn format_file_size(&self) -> String {
        crate::io::format_file_size(self.file_size)
    }
}

/// Merges several PDFs into one, in array order.
#[derive(Debug, Clone, Default)]
pub struct Merger {
    /// Reader for loading submissions.
    reader: PdfReader,

    /// Writer for the merged output.
    writer: PdfWriter,
}

impl Merger {
    /// Create a merger with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a merger using the write options of `config`.
    pub fn with_config(config: &EngineConfig) -> Self {
        Self {
            reader: PdfReader::new(),
            writer: PdfWriter::with_options(config.write.clone()),
        }
    }

    /// Merge `paths` into `output_path` and return the output path.
    ///
    /// # Errors
    ///
    /// See [`Merger::merge_with_statistics`].
    ///
    /// # Examples
    ///
    /// ```no_run
    /// # use bidpack::merge::Merger;
    /// # use std::path::{Path, PathBuf};
    /// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
    /// let submissions = vec![
    ///     PathBuf::from("out/technical.pdf"),
    ///     PathBuf::from("out/financial.pdf"),
    /// ];
    /// let merged = Merger::new()
    ///     .merge_all(&submissions, Path::new("out/bid.pdf"))
    ///     .await?;
    /// println!("merged into {}", merged.display());
    /// # Ok(())
    /// # }
    /// ```
    pub async fn merge_all(&self, paths: &[PathBuf], output_path: &Path) -> Result<PathBuf, MergeError> {
        let stats = self.merge_with_statistics(paths, output_path).await?;
        Ok(stats.output_path)
    }

    /// Merge `paths` into `output_path` and describe the result.
    ///
    /// Missing or unreadable inputs are logged and skipped. No page numbers
    /// are added.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - No input could be loaded ([`MergeError::NoValidSubmissions`])
    /// - The pages cannot be assembled
    /// - The output cannot be written
    pub async fn merge_with_statistics(
        &self,
        paths: &[PathBuf],
        output_path: &Path,
    ) -> Result<MergeStatistics, MergeError> {
        let start = Instant::now();
        tracing::info!(
            inputs = paths.len(),
            output = %output_path.display(),
            "merging submissions"
        );

        let results = self.reader.load_sequential(paths).await;

        let mut loaded = Vec::with_capacity(results.len());
        let mut skipped = Vec::new();
        for (path, result) in paths.iter().zip(results) {
            match result {
                Ok(pdf) => loaded.push(pdf),
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "skipping submission");
                    skipped.push(path.clone());
                }
            }
        }

        if loaded.is_empty() {
            return Err(MergeError::NoValidSubmissions);
        }

        let files_merged = loaded.len();
        let input_size = loaded.iter().map(|pdf: &LoadedPdf| pdf.file_size).sum();
        let compress = self.writer.options().compress;
        let (bytes, total_pages) = task::spawn_blocking(move || concatenate(loaded, compress))
            .await
            .map_err(|e| MergeError::Task(e.to_string()))??;

        let write_stats = self.writer.write_bytes(bytes, output_path).await?;

        let stats = MergeStatistics {
            output_path: output_path.to_path_buf(),
            files_merged,
            total_pages,
            skipped,
            input_size,
            file_size: write_stats.file_size,
            merge_time: start.elapsed(),
        };

        tracing::info!(
            output = %stats.output_path.display(),
            files = stats.files_merged,
            pages = stats.total_pages,
            skipped = stats.skipped.len(),
            input_size = %format_file_size(stats.input_size),
            size = %stats.format_file_size(),
            "merged submissions"
        );

        Ok(stats)
    }
}

/// Append every page of `documents` into a fresh document and serialize it.
fn concatenate(documents: Vec<LoadedPdf>, compress: bool) -> Result<(Vec<u8>, usize), PageError> {
    let mut merged = pages::new_document();

    for loaded in &documents {
        let ids = pages::copy_all_pages(&loaded.document, &mut merged)?;
        tracing::debug!(
            path = %loaded.path.display(),
            pages = ids.len(),
            size = loaded.file_size,
            "appended submission"
        );
    }

    let total_pages = pages::page_count(&merged);
    let bytes = serialize_document(&mut merged, compress)?;
    Ok((bytes, total_pages))
}
