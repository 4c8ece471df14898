//! Compilation of bid response documents into one PDF.
//!
//! This module implements the compile pipeline: documents are loaded once,
//! stamped, copied in order after an optional generated index, numbered
//! consecutively, and persisted atomically.

use lopdf::Document;
use serde::Serialize;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tokio::task;

use super::index::IndexPageBuilder;
use super::numbering::PageNumberer;
use super::outline::{OutlineBuilder, OutlineItem};
use super::request::{CompilationRequest, DocumentDescriptor};
use super::stamp::StampOverlay;
use crate::config::EngineConfig;
use crate::error::{CompilationError, PageError};
use crate::io::{LoadedPdf, PdfReader, PdfWriter, serialize_document};
use crate::metadata::{DocumentInfo, MetadataManager};
use crate::pages;

/// A requested document that was left out of the output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SkippedDocument {
    /// Display name from the request.
    pub display_name: String,

    /// Path that failed to load.
    pub file_path: PathBuf,

    /// Why the document was skipped.
    pub reason: String,
}

/// Outcome of a successful compilation.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompilationReport {
    /// Where the compiled PDF was written.
    pub output_path: PathBuf,

    /// Total number of output pages, index included.
    pub total_pages: usize,

    /// Number of generated index pages (0 without index).
    pub index_pages: usize,

    /// Number of source documents in the output.
    pub documents_included: usize,

    /// Documents that could not be loaded.
    pub skipped: Vec<SkippedDocument>,

    /// Size of the written file in bytes.
    pub file_size: u64,

    /// Wall-clock time of the whole compilation.
    #[serde(skip)]
    pub elapsed: Duration,
}

/// What the blocking assembly step produced.
struct Assembled {
    bytes: Vec<u8>,
    total_pages: usize,
    index_pages: usize,
    documents_included: usize,
}

/// Compiles [`CompilationRequest`]s into single PDFs.
///
/// Cheap to clone; holds no mutable state, so clones may compile
/// independent requests concurrently.
#[derive(Debug, Clone, Default)]
pub struct Compiler {
    /// Reader for loading source documents.
    reader: PdfReader,

    /// Writer for the compiled output.
    writer: PdfWriter,

    /// Stamp image preparation.
    stamp: StampOverlay,

    /// Index page generation.
    index: IndexPageBuilder,

    /// Page number labels.
    numberer: PageNumberer,
}

impl Compiler {
    /// Create a compiler with the default layout.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a compiler using the layouts and write options of `config`.
    pub fn with_config(config: &EngineConfig) -> Self {
        Self {
            reader: PdfReader::new(),
            writer: PdfWriter::with_options(config.write.clone()),
            stamp: StampOverlay::new(config.stamp.clone()),
            index: IndexPageBuilder::new(config.index.clone(), config.numbering.clone()),
            numberer: PageNumberer::new(config.numbering.clone()),
        }
    }

    /// Compile a request and return the output path.
    ///
    /// # Errors
    ///
    /// See [`Compiler::compile_with_report`].
    ///
    /// # Examples
    ///
    /// ```no_run
    /// # use bidpack::compile::{Compiler, CompilationRequest, DocumentDescriptor};
    /// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
    /// let request = CompilationRequest::new("Technical Response", "out/technical.pdf")
    ///     .with_document(DocumentDescriptor::new("Proposal", "proposal.pdf", 1))
    ///     .with_document(DocumentDescriptor::new("Checklist", "checklist.pdf", 2));
    ///
    /// let output = Compiler::new().compile(&request).await?;
    /// println!("compiled into {}", output.display());
    /// # Ok(())
    /// # }
    /// ```
    pub async fn compile(&self, request: &CompilationRequest) -> Result<PathBuf, CompilationError> {
        let report = self.compile_with_report(request).await?;
        Ok(report.output_path)
    }

    /// Compile a request and describe the result.
    ///
    /// Documents that fail to load are logged, reported in
    /// [`CompilationReport::skipped`] and left out of both the index and the
    /// content.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The request is malformed ([`CompilationError::InvalidRequest`])
    /// - No document could be loaded ([`CompilationError::NoValidDocuments`])
    /// - The stamp image is unusable ([`CompilationError::Stamp`])
    /// - The output cannot be assembled or written
    pub async fn compile_with_report(
        &self,
        request: &CompilationRequest,
    ) -> Result<CompilationReport, CompilationError> {
        let start = Instant::now();
        request.validate()?;

        let documents = request.sorted_documents();
        tracing::info!(
            response = %request.response_name,
            documents = documents.len(),
            include_index = request.index_options.include_index,
            output = %request.output_path.display(),
            "compiling response"
        );

        let mut loaded = Vec::with_capacity(documents.len());
        let mut skipped = Vec::new();
        for descriptor in documents {
            match self.reader.load(&descriptor.file_path).await {
                Ok(pdf) => loaded.push((descriptor, pdf)),
                Err(e) => {
                    tracing::warn!(
                        document = %descriptor.display_name,
                        path = %descriptor.file_path.display(),
                        error = %e,
                        "skipping document"
                    );
                    skipped.push(SkippedDocument {
                        display_name: descriptor.display_name,
                        file_path: descriptor.file_path,
                        reason: e.to_string(),
                    });
                }
            }
        }

        if loaded.is_empty() {
            return Err(CompilationError::NoValidDocuments);
        }

        let compiler = self.clone();
        let owned_request = request.clone();
        let assembled = task::spawn_blocking(move || compiler.assemble(&owned_request, loaded))
            .await
            .map_err(|e| CompilationError::Task(e.to_string()))??;

        let stats = self
            .writer
            .write_bytes(assembled.bytes, &request.output_path)
            .await?;

        let report = CompilationReport {
            output_path: request.output_path.clone(),
            total_pages: assembled.total_pages,
            index_pages: assembled.index_pages,
            documents_included: assembled.documents_included,
            skipped,
            file_size: stats.file_size,
            elapsed: start.elapsed(),
        };

        tracing::info!(
            output = %report.output_path.display(),
            pages = report.total_pages,
            index_pages = report.index_pages,
            documents = report.documents_included,
            skipped = report.skipped.len(),
            size = %stats.format_file_size(),
            elapsed_ms = report.elapsed.as_millis() as u64,
            "compiled response"
        );

        Ok(report)
    }

    /// Build the output document and serialize it.
    fn assemble(
        &self,
        request: &CompilationRequest,
        loaded: Vec<(DocumentDescriptor, LoadedPdf)>,
    ) -> Result<Assembled, CompilationError> {
        let stamp = request
            .stamp_options
            .as_ref()
            .map(|options| self.stamp.prepare(options))
            .transpose()?;

        let mut output = pages::new_document();
        let mut outline = Vec::new();
        let options = &request.index_options;

        let index_pages = if options.include_index {
            let descriptors: Vec<DocumentDescriptor> =
                loaded.iter().map(|(d, _)| d.clone()).collect();
            let page_counts: Vec<usize> = loaded.iter().map(|(_, pdf)| pdf.page_count).collect();
            let bid_label = request
                .bid_number_label()
                .map(|bid| format!("Bid Number: {bid}"));

            let index = self.index.build(
                &descriptors,
                options,
                &page_counts,
                bid_label.as_deref(),
            )?;
            let ids = pages::copy_all_pages(&index.document, &mut output)?;
            if let Some(&first) = ids.first() {
                outline.push(OutlineItem::new(options.title.clone(), first));
            }
            index.page_count
        } else {
            0
        };

        let mut next_number = options.start_from + index_pages as u32;
        let documents_included = loaded.len();

        for (descriptor, pdf) in loaded {
            let LoadedPdf { mut document, .. } = pdf;

            if let Some(stamp) = &stamp {
                stamp.apply(&mut document)?;
            }

            let first_number = next_number;
            let ids = pages::copy_all_pages(&document, &mut output)?;
            next_number = self.numberer.number_pages(&mut output, &ids, next_number)?;

            if let Some(&first) = ids.first() {
                outline.push(OutlineItem::new(descriptor.display_name.clone(), first));
            }

            tracing::debug!(
                document = %descriptor.display_name,
                pages = ids.len(),
                first_page = first_number,
                "appended document"
            );
        }

        if request.bookmarks {
            OutlineBuilder::new().add_outline(&mut output, &outline)?;
        }

        self.set_metadata(&mut output, request)?;

        let total_pages = pages::page_count(&output);
        let bytes = serialize_document(&mut output, self.writer.options().compress)
            .map_err(PageError::from)?;

        Ok(Assembled {
            bytes,
            total_pages,
            index_pages,
            documents_included,
        })
    }

    fn set_metadata(&self, doc: &mut Document, request: &CompilationRequest) -> Result<(), PageError> {
        let info = DocumentInfo::new(
            Some(request.response_name.clone()),
            None,
            Some(request.response_type.clone()),
            request.bid_number_label().map(str::to_string),
        );
        MetadataManager::new().set_info(doc, &info)
    }
}
