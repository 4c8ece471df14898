//! Compression backends.
//!
//! A [`RasterTool`] turns the bytes of one PDF into smaller bytes. The engine
//! picks one implementation at construction: [`GhostscriptTool`] when the
//! binary answers `--version`, otherwise the in-process pipeline.

use lopdf::Document;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Command;

use crate::config::CompressionTier;
use crate::error::{CompressionError, ExternalToolError};

use super::planner::CompressionSettings;

/// Backend that produced a compression result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CompressionMethod {
    /// An external rasterizing tool (Ghostscript).
    ExternalTool,
    /// The in-process lopdf pipeline.
    InProcess,
}

impl CompressionMethod {
    /// Canonical string form.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ExternalTool => "external-tool",
            Self::InProcess => "in-process",
        }
    }
}

impl fmt::Display for CompressionMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Bytes produced by a backend.
#[derive(Debug, Clone)]
pub struct ToolOutput {
    /// Compressed PDF bytes.
    pub bytes: Vec<u8>,

    /// Refinement passes run after the first save (0 for single-shot tools).
    pub iterations: usize,
}

/// An input PDF that has already been read and parsed.
#[derive(Debug, Clone)]
pub struct SourcePdf {
    /// Path the bytes were read from.
    pub path: PathBuf,

    /// Raw file content.
    pub bytes: Vec<u8>,

    /// Parsed document.
    pub document: Document,
}

/// A compression backend.
///
/// Implementations are synchronous; the engine calls them from a blocking
/// worker.
pub trait RasterTool: Send + Sync + fmt::Debug {
    /// Short name used in logs.
    fn name(&self) -> &str;

    /// Method reported in results.
    fn method(&self) -> CompressionMethod;

    /// Compress `source`.
    fn compress(
        &self,
        source: &SourcePdf,
        settings: &CompressionSettings,
        tier: CompressionTier,
    ) -> Result<ToolOutput, CompressionError>;
}

/// Ghostscript `pdfwrite` preset for a tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GhostscriptPreset {
    /// Value for `-dPDFSETTINGS`.
    pub pdf_settings: &'static str,
    /// Image resolution in dpi.
    pub resolution: u32,
}

impl GhostscriptPreset {
    /// Preset for `tier`.
    pub fn for_tier(tier: CompressionTier) -> Self {
        match tier {
            CompressionTier::Light => Self {
                pdf_settings: "/printer",
                resolution: 200,
            },
            CompressionTier::Recommended => Self {
                pdf_settings: "/ebook",
                resolution: 150,
            },
            CompressionTier::Extreme => Self {
                pdf_settings: "/screen",
                resolution: 72,
            },
        }
    }
}

/// Ghostscript-backed compression.
#[derive(Debug, Clone)]
pub struct GhostscriptTool {
    binary: String,
}

impl GhostscriptTool {
    /// Wrap `binary` without checking that it exists.
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    /// Return a tool for `binary` when `binary --version` succeeds.
    ///
    /// Spawns a process on every call; the engine checks once when it is built.
    pub fn detect(binary: &str) -> Option<Self> {
        let available = Command::new(binary)
            .arg("--version")
            .output()
            .map(|output| output.status.success())
            .unwrap_or(false);

        tracing::debug!(binary, available, "checked external compression tool");
        available.then(|| Self::new(binary))
    }

    /// Binary this tool invokes.
    pub fn binary(&self) -> &str {
        &self.binary
    }

    /// Command-line arguments for one invocation.
    pub fn arguments(tier: CompressionTier, input: &Path, output: &Path) -> Vec<String> {
        let preset = GhostscriptPreset::for_tier(tier);
        let resolution = preset.resolution;

        vec![
            "-sDEVICE=pdfwrite".to_string(),
            "-dCompatibilityLevel=1.4".to_string(),
            format!("-dPDFSETTINGS={}", preset.pdf_settings),
            "-dNOPAUSE".to_string(),
            "-dQUIET".to_string(),
            "-dBATCH".to_string(),
            format!("-dColorImageResolution={resolution}"),
            format!("-dGrayImageResolution={resolution}"),
            format!("-dMonoImageResolution={resolution}"),
            format!("-sOutputFile={}", output.display()),
            input.display().to_string(),
        ]
    }

    fn run(&self, input: &Path, tier: CompressionTier) -> Result<Vec<u8>, ExternalToolError> {
        let output_file = tempfile::Builder::new()
            .prefix("bidpack-gs-")
            .suffix(".pdf")
            .tempfile()
            .map_err(ExternalToolError::TempFile)?;

        let args = Self::arguments(tier, input, output_file.path());
        tracing::debug!(binary = %self.binary, ?args, "running external compression tool");

        let output = Command::new(&self.binary)
            .args(&args)
            .output()
            .map_err(|source| ExternalToolError::Spawn {
                tool: self.binary.clone(),
                source,
            })?;

        if !output.status.success() {
            return Err(ExternalToolError::Failed {
                tool: self.binary.clone(),
                code: output
                    .status
                    .code()
                    .map_or_else(|| "unknown".to_string(), |c| c.to_string()),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let bytes = std::fs::read(output_file.path()).map_err(ExternalToolError::TempFile)?;
        if bytes.is_empty() {
            return Err(ExternalToolError::NoOutput {
                tool: self.binary.clone(),
            });
        }

        Ok(bytes)
    }
}

impl RasterTool for GhostscriptTool {
    fn name(&self) -> &str {
        &self.binary
    }

    fn method(&self) -> CompressionMethod {
        CompressionMethod::ExternalTool
    }

    fn compress(
        &self,
        source: &SourcePdf,
        _settings: &CompressionSettings,
        tier: CompressionTier,
    ) -> Result<ToolOutput, CompressionError> {
        let bytes = self.run(&source.path, tier)?;
        Ok(ToolOutput {
            bytes,
            iterations: 0,
        })
    }
}
