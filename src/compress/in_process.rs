//! In-process compression with lopdf.
//!
//! The first pass strips metadata and annotations, scales every page by the
//! planned factor, recompresses images and saves. While the result is still
//! above the target, the saved bytes are reloaded and rescaled with a
//! progressive factor, up to the configured iteration cap. The smallest
//! output seen is returned whether or not the target was reached.

use lopdf::Document;

use crate::config::{CompressionConfig, CompressionTier};
use crate::error::CompressionError;
use crate::io::{kilobytes, serialize_document};
use crate::metadata::MetadataManager;
use crate::pages;

use super::cleanup;
use super::images;
use super::planner::CompressionSettings;
use super::raster::{CompressionMethod, RasterTool, SourcePdf, ToolOutput};

/// Pure lopdf compression backend.
#[derive(Debug, Clone, Default)]
pub struct InProcessTool {
    config: CompressionConfig,
}

/// State of the convergence loop.
#[derive(Debug)]
struct Convergence {
    iteration: usize,
    last_bytes: Vec<u8>,
    last_kb: f64,
    best_bytes: Vec<u8>,
    best_kb: f64,
}

impl Convergence {
    fn new(bytes: Vec<u8>) -> Self {
        let kb = size_kb(&bytes);
        Self {
            iteration: 0,
            last_bytes: bytes.clone(),
            last_kb: kb,
            best_bytes: bytes,
            best_kb: kb,
        }
    }

    fn record(&mut self, bytes: Vec<u8>) {
        let kb = size_kb(&bytes);
        if kb < self.best_kb {
            self.best_kb = kb;
            self.best_bytes = bytes.clone();
        }
        self.last_kb = kb;
        self.last_bytes = bytes;
        self.iteration += 1;
    }
}

fn size_kb(bytes: &[u8]) -> f64 {
    kilobytes(bytes.len() as u64)
}

/// One refinement iteration.
#[derive(Debug)]
struct Step {
    bytes: Vec<u8>,
    scale: f32,
    aggressive: bool,
}

impl InProcessTool {
    /// Create a tool with the given loop tuning.
    pub fn new(config: CompressionConfig) -> Self {
        Self { config }
    }

    /// Loop tuning in use.
    pub fn config(&self) -> &CompressionConfig {
        &self.config
    }

    /// Compress a parsed document toward `settings.target_size_kb`.
    ///
    /// # Errors
    ///
    /// Returns [`CompressionError::Rewrite`] or [`CompressionError::Page`]
    /// when a pass cannot rewrite the document.
    pub fn compress_document(
        &self,
        mut doc: Document,
        settings: &CompressionSettings,
    ) -> Result<ToolOutput, CompressionError> {
        let first = self.first_pass(&mut doc, settings)?;
        let target_kb = settings.target_size_kb as f64;
        let mut state = Convergence::new(first);

        tracing::debug!(
            size_kb = state.last_kb,
            target_kb,
            "first in-process pass finished"
        );

        while state.last_kb > target_kb && state.iteration < self.config.max_iterations {
            let step = self.step(state.iteration, &state.last_bytes, state.last_kb, settings)?;
            state.record(step.bytes);
            tracing::debug!(
                iteration = state.iteration,
                scale = step.scale,
                aggressive = step.aggressive,
                size_kb = state.last_kb,
                best_kb = state.best_kb,
                "refinement pass finished"
            );
        }

        Ok(ToolOutput {
            bytes: state.best_bytes,
            iterations: state.iteration,
        })
    }

    /// Rescale the previous output progressively; when that does not shrink
    /// it below `last_kb`, rescale the result once more at the aggressive factor.
    fn step(
        &self,
        iteration: usize,
        last_bytes: &[u8],
        last_kb: f64,
        settings: &CompressionSettings,
    ) -> Result<Step, CompressionError> {
        let scale = self.config.progressive_scale(iteration);
        let strip = iteration >= self.config.structural_strip_after;

        let bytes = self.refine(last_bytes, scale, strip, settings)?;
        if size_kb(&bytes) < last_kb {
            return Ok(Step {
                bytes,
                scale,
                aggressive: false,
            });
        }

        let aggressive = self.config.aggressive_scale(iteration);
        tracing::debug!(iteration, scale = aggressive, "no improvement, rescaling aggressively");
        Ok(Step {
            bytes: self.refine(&bytes, aggressive, strip, settings)?,
            scale: aggressive,
            aggressive: true,
        })
    }

    fn first_pass(
        &self,
        doc: &mut Document,
        settings: &CompressionSettings,
    ) -> Result<Vec<u8>, CompressionError> {
        if settings.remove_metadata {
            let manager = MetadataManager::new();
            let removed = manager.strip_info(doc, self.config.strip_timestamps);
            let xmp = manager.strip_xmp(doc)?;
            tracing::trace!(removed, xmp, "stripped document information");
        }

        if settings.remove_annotations {
            let removed = cleanup::strip_annotations(doc)?;
            tracing::trace!(removed, "stripped annotations and optional content");
        }

        rewrite(doc, settings.page_scale, settings)
    }

    fn refine(
        &self,
        bytes: &[u8],
        scale: f32,
        strip_structure: bool,
        settings: &CompressionSettings,
    ) -> Result<Vec<u8>, CompressionError> {
        let mut doc = Document::load_mem(bytes)
            .map_err(|e| CompressionError::rewrite(format!("cannot reload intermediate output: {e}")))?;

        if strip_structure {
            cleanup::strip_structure(&mut doc)?;
        }

        rewrite(&mut doc, scale, settings)
    }
}

/// Scale pages and images by `scale`, drop orphans and serialize.
fn rewrite(doc: &mut Document, scale: f32, settings: &CompressionSettings) -> Result<Vec<u8>, CompressionError> {
    if scale < 1.0 {
        for page_id in pages::page_ids(doc) {
            pages::scale_page(doc, page_id, scale)?;
        }
    }

    images::recompress_images(doc, settings.image_quality, scale);
    cleanup::prune(doc);

    serialize_document(doc, settings.compress_streams).map_err(|e| CompressionError::rewrite(e.to_string()))
}

impl RasterTool for InProcessTool {
    fn name(&self) -> &str {
        "lopdf"
    }

    fn method(&self) -> CompressionMethod {
        CompressionMethod::InProcess
    }

    fn compress(
        &self,
        source: &SourcePdf,
        settings: &CompressionSettings,
        _tier: CompressionTier,
    ) -> Result<ToolOutput, CompressionError> {
        self.compress_document(source.document.clone(), settings)
    }
}
