//! Compression entry point.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tokio::task;

use crate::config::{CompressionConfig, CompressionTier, EngineConfig};
use crate::error::{CompressionError, LoadError};
use crate::io::{PdfReader, PdfWriter, WriteOptions, kilobytes};

use super::in_process::InProcessTool;
use super::planner::{CompressionSettings, plan_for_tier};
use super::raster::{CompressionMethod, GhostscriptTool, RasterTool, SourcePdf, ToolOutput};

/// Outcome of one compression call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompressionResult {
    /// Input size in kilobytes.
    #[serde(rename = "originalSizeKB")]
    pub original_size_kb: f64,

    /// Output size in kilobytes.
    #[serde(rename = "compressedSizeKB")]
    pub compressed_size_kb: f64,

    /// Size reduction in percent, rounded. Negative when the output grew.
    pub compression_ratio: i64,

    /// Where the output was written.
    pub compressed_file_path: PathBuf,

    /// Wall time in milliseconds.
    pub processing_time: u64,

    /// Backend that produced the output.
    pub method: CompressionMethod,

    /// Refinement passes after the first save.
    pub iterations: usize,

    /// Whether the output is at or below the planned target.
    pub target_reached: bool,
}

/// `round((original - compressed) / original * 100)`, or 0 for an empty original.
///
/// # Examples
///
/// ```
/// use bidpack::compress::compression_ratio;
///
/// assert_eq!(compression_ratio(1000.0, 250.0), 75);
/// assert_eq!(compression_ratio(100.0, 120.0), -20);
/// ```
pub fn compression_ratio(original_kb: f64, compressed_kb: f64) -> i64 {
    if original_kb <= 0.0 {
        return 0;
    }
    ((original_kb - compressed_kb) / original_kb * 100.0).round() as i64
}

/// Compresses PDFs with an external tool when present, in-process otherwise.
///
/// The backend is chosen once at construction. An external tool failure is
/// logged and the in-process backend runs instead.
#[derive(Debug, Clone)]
pub struct CompressionEngine {
    external: Option<Arc<dyn RasterTool>>,
    fallback: Arc<InProcessTool>,
    reader: PdfReader,
    writer: PdfWriter,
}

impl Default for CompressionEngine {
    fn default() -> Self {
        Self::new(&EngineConfig::default())
    }
}

impl CompressionEngine {
    /// Build an engine, probing for Ghostscript.
    pub fn new(config: &EngineConfig) -> Self {
        Self::detect(&config.compression, config.write.clone())
    }

    /// Look for the configured Ghostscript binary and build an engine.
    pub fn detect(config: &CompressionConfig, write: WriteOptions) -> Self {
        let external = GhostscriptTool::detect(&config.ghostscript_binary)
            .map(|tool| Arc::new(tool) as Arc<dyn RasterTool>);

        match &external {
            Some(tool) => tracing::info!(tool = tool.name(), "external compression tool available"),
            None => tracing::info!(
                binary = %config.ghostscript_binary,
                "external compression tool not found, using in-process compression"
            ),
        }

        Self {
            external,
            fallback: Arc::new(InProcessTool::new(config.clone())),
            reader: PdfReader::without_verification(),
            writer: PdfWriter::with_options(write),
        }
    }

    /// Build an engine that never spawns an external process.
    pub fn in_process_only(config: &EngineConfig) -> Self {
        Self {
            external: None,
            fallback: Arc::new(InProcessTool::new(config.compression.clone())),
            reader: PdfReader::without_verification(),
            writer: PdfWriter::with_options(config.write.clone()),
        }
    }

    /// Replace the external backend.
    pub fn with_tool(mut self, tool: Arc<dyn RasterTool>) -> Self {
        self.external = Some(tool);
        self
    }

    /// Method the engine tries first.
    pub fn preferred_method(&self) -> CompressionMethod {
        self.external
            .as_ref()
            .map_or(CompressionMethod::InProcess, |tool| tool.method())
    }

    /// Compress `input_path` into `output_path` at `tier`.
    ///
    /// The result is best-effort: reaching the planned target is reported in
    /// [`CompressionResult::target_reached`], not enforced.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The input is missing or unreadable ([`CompressionError::Unreadable`])
    /// - The input is not a PDF ([`CompressionError::InvalidDocument`])
    /// - The in-process backend cannot rewrite the document
    /// - The output cannot be written
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use bidpack::compress::CompressionEngine;
    /// use bidpack::config::{CompressionTier, EngineConfig};
    /// use std::path::Path;
    ///
    /// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
    /// let engine = CompressionEngine::new(&EngineConfig::default());
    /// let result = engine
    ///     .compress(Path::new("bid.pdf"), Path::new("bid-small.pdf"), CompressionTier::Recommended)
    ///     .await?;
    /// println!("{}% smaller via {}", result.compression_ratio, result.method);
    /// # Ok(())
    /// # }
    /// ```
    pub async fn compress(
        &self,
        input_path: &Path,
        output_path: &Path,
        tier: CompressionTier,
    ) -> Result<CompressionResult, CompressionError> {
        let start = Instant::now();

        let original = tokio::fs::read(input_path)
            .await
            .map_err(|e| LoadError::from_io(input_path, e))?;
        let original_size_kb = kilobytes(original.len() as u64);

        let settings = plan_for_tier(original_size_kb, tier);
        tracing::info!(
            input = %input_path.display(),
            size_kb = original_size_kb,
            target_kb = settings.target_size_kb,
            %tier,
            "compressing"
        );

        let reader = self.reader.clone();
        let external = self.external.clone();
        let fallback = Arc::clone(&self.fallback);
        let input = input_path.to_path_buf();
        let run_settings = settings.clone();
        let (output, method) = task::spawn_blocking(move || {
            let document = reader
                .parse(&input, &original)
                .map_err(|e| invalid_document(&input, e))?;
            let source = SourcePdf {
                path: input,
                bytes: original,
                document,
            };
            run_backends(external.as_deref(), &fallback, source, &run_settings, tier)
        })
        .await
        .map_err(|e| CompressionError::Task(e.to_string()))??;

        let write_stats = self.writer.write_bytes(output.bytes, output_path).await?;
        let compressed_size_kb = kilobytes(write_stats.file_size);

        let result = CompressionResult {
            original_size_kb,
            compressed_size_kb,
            compression_ratio: compression_ratio(original_size_kb, compressed_size_kb),
            compressed_file_path: output_path.to_path_buf(),
            processing_time: start.elapsed().as_millis() as u64,
            method,
            iterations: output.iterations,
            target_reached: compressed_size_kb <= settings.target_size_kb as f64,
        };

        tracing::info!(
            output = %result.compressed_file_path.display(),
            original_kb = result.original_size_kb,
            compressed_kb = result.compressed_size_kb,
            ratio = result.compression_ratio,
            method = %result.method,
            iterations = result.iterations,
            target_reached = result.target_reached,
            "compressed"
        );

        Ok(result)
    }
}

fn invalid_document(path: &Path, error: LoadError) -> CompressionError {
    CompressionError::InvalidDocument {
        path: path.to_path_buf(),
        details: match error {
            LoadError::Corrupt { details, .. } => details,
            other => other.to_string(),
        },
    }
}

/// Try the external backend, then fall back to the in-process one on a
/// recoverable failure.
///
/// The fallback takes ownership of the already parsed document.
fn run_backends(
    external: Option<&dyn RasterTool>,
    fallback: &InProcessTool,
    source: SourcePdf,
    settings: &CompressionSettings,
    tier: CompressionTier,
) -> Result<(ToolOutput, CompressionMethod), CompressionError> {
    if let Some(tool) = external {
        match tool.compress(&source, settings, tier) {
            Ok(output) => return Ok((output, tool.method())),
            Err(e) if e.is_recoverable() => {
                tracing::warn!(tool = tool.name(), error = %e, "external tool failed, falling back to in-process");
            }
            Err(e) => return Err(e),
        }
    }

    let output = fallback.compress_document(source.document, settings)?;
    Ok((output, fallback.method()))
}
