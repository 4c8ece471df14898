//! Configuration module for bidpack.
//!
//! Layout constants and engine tuning live here, grouped per component, so a
//! deployment can override them from a JSON file while tests and callers use
//! the defaults. It handles:
//! - Parsing of stamp positions and compression tiers
//! - Layout constants for stamps, page numbers and index pages
//! - Compression loop tuning and external tool selection
//! - Validation of the combined configuration

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::{fmt, path::Path, str::FromStr};

use crate::io::WriteOptions;

/// Anchor position of a stamp on the page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", from = "String")]
pub enum StampPosition {
    /// Lower left corner (default).
    #[default]
    BottomLeft,
    /// Upper right corner.
    TopRight,
    /// Upper left corner.
    TopLeft,
    /// Centered on the page.
    Center,
    /// Lower right corner. Also used for unrecognized position strings.
    BottomRight,
}

impl StampPosition {
    /// Parse a position leniently.
    ///
    /// Unknown values map to [`StampPosition::BottomRight`].
    pub fn parse_lenient(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "bottom-left" => Self::BottomLeft,
            "top-right" => Self::TopRight,
            "top-left" => Self::TopLeft,
            "center" => Self::Center,
            "bottom-right" => Self::BottomRight,
            other => {
                tracing::warn!(position = other, "unknown stamp position, using bottom-right");
                Self::BottomRight
            }
        }
    }

    /// Canonical string form.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BottomLeft => "bottom-left",
            Self::TopRight => "top-right",
            Self::TopLeft => "top-left",
            Self::Center => "center",
            Self::BottomRight => "bottom-right",
        }
    }
}

impl From<String> for StampPosition {
    fn from(s: String) -> Self {
        Self::parse_lenient(&s)
    }
}

impl From<&str> for StampPosition {
    fn from(s: &str) -> Self {
        Self::parse_lenient(s)
    }
}

impl fmt::Display for StampPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Named compression tier requested by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CompressionTier {
    /// Mild compression, keeps more quality.
    Light,
    /// Balanced trade-off between size and quality.
    #[default]
    Recommended,
    /// Smallest output, lowest quality.
    Extreme,
}

impl CompressionTier {
    /// Canonical string form.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Light => "light",
            Self::Recommended => "recommended",
            Self::Extreme => "extreme",
        }
    }
}

impl FromStr for CompressionTier {
    type Err = anyhow::Error;

    /// Parse a tier from "light", "recommended" or "extreme" (case-insensitive).
    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "light" => Ok(Self::Light),
            "recommended" => Ok(Self::Recommended),
            "extreme" => Ok(Self::Extreme),
            _ => bail!(
                "Invalid compression tier: {s}. Must be one of: light, recommended, extreme"
            ),
        }
    }
}

impl fmt::Display for CompressionTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stamp placement constants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct StampLayout {
    /// Distance from the page edges, in points.
    pub margin: f32,
    /// The longer side of the stamp is fitted into a square of this size.
    pub box_size: f32,
}

impl Default for StampLayout {
    fn default() -> Self {
        Self {
            margin: 20.0,
            box_size: 100.0,
        }
    }
}

/// Page number label constants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct NumberingLayout {
    /// Font size of the label.
    pub font_size: f32,
    /// Baseline of the label measured from the bottom edge.
    pub baseline: f32,
}

impl Default for NumberingLayout {
    fn default() -> Self {
        Self {
            font_size: 10.0,
            baseline: 20.0,
        }
    }
}

/// Index page geometry and typography.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct IndexLayout {
    /// Page width (A4 portrait by default).
    pub page_width: f32,
    /// Page height.
    pub page_height: f32,
    /// Distance from the top edge to the first baseline.
    pub top_margin: f32,
    /// A new index page starts once the cursor drops below this line.
    pub bottom_limit: f32,
    /// Left and right margins.
    pub side_margin: f32,
    /// Vertical advance between entries.
    pub line_height: f32,
    /// Font size of entries.
    pub font_size: f32,
    /// Font size of the title line.
    pub title_font_size: f32,
    /// Font size of the bid number line.
    pub bid_font_size: f32,
    /// Display names longer than this are truncated with "...".
    pub max_name_length: usize,
}

impl Default for IndexLayout {
    fn default() -> Self {
        Self {
            page_width: 595.28,
            page_height: 841.89,
            top_margin: 50.0,
            bottom_limit: 100.0,
            side_margin: 50.0,
            line_height: 25.0,
            font_size: 12.0,
            title_font_size: 18.0,
            bid_font_size: 14.0,
            max_name_length: 50,
        }
    }
}

/// Compression loop tuning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CompressionConfig {
    /// Upper bound on convergence iterations.
    pub max_iterations: usize,
    /// Rescale factor per iteration, clamped to the last entry.
    pub progressive_scales: Vec<f32>,
    /// Structural entries are stripped once the iteration exceeds this value.
    pub structural_strip_after: usize,
    /// Also drop CreationDate/ModDate when stripping metadata.
    pub strip_timestamps: bool,
    /// Ghostscript binary looked up at engine construction.
    pub ghostscript_binary: String,
}

impl Default for CompressionConfig {
    fn default() -> Self {
        Self {
            max_iterations: 8,
            progressive_scales: vec![0.9, 0.8, 0.7, 0.6, 0.5, 0.4, 0.35, 0.3],
            structural_strip_after: 2,
            strip_timestamps: true,
            ghostscript_binary: default_ghostscript_binary().to_string(),
        }
    }
}

impl CompressionConfig {
    /// Progressive rescale factor for a zero-based iteration.
    pub fn progressive_scale(&self, iteration: usize) -> f32 {
        let idx = iteration.min(self.progressive_scales.len().saturating_sub(1));
        self.progressive_scales.get(idx).copied().unwrap_or(0.3)
    }

    /// Rescale factor used after an iteration that did not shrink the output.
    pub fn aggressive_scale(&self, iteration: usize) -> f32 {
        (0.7 - iteration as f32 * 0.05).max(0.1)
    }
}

fn default_ghostscript_binary() -> &'static str {
    if cfg!(windows) { "gswin64c" } else { "gs" }
}

/// Complete engine configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EngineConfig {
    /// Stamp placement.
    pub stamp: StampLayout,
    /// Page number label.
    pub numbering: NumberingLayout,
    /// Index pages.
    pub index: IndexLayout,
    /// Compression loop.
    pub compression: CompressionConfig,
    /// Output persistence.
    pub write: WriteOptions,
}

impl EngineConfig {
    /// Load and validate a configuration from a JSON file.
    ///
    /// Missing fields fall back to their defaults.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: Self = serde_json::from_str(&raw)
            .with_context(|| format!("Invalid config file: {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - A size or margin is negative or zero where it must be positive
    /// - The index page has no room for entries
    /// - The compression loop has no iterations or invalid scale factors
    pub fn validate(&self) -> Result<()> {
        if self.stamp.margin < 0.0 {
            bail!("Stamp margin must not be negative");
        }

        if self.stamp.box_size <= 0.0 {
            bail!("Stamp box size must be positive");
        }

        if self.numbering.font_size <= 0.0 {
            bail!("Page number font size must be positive");
        }

        let index = &self.index;
        if index.page_width <= 2.0 * index.side_margin {
            bail!("Index page width leaves no room between the side margins");
        }

        if index.page_height - index.top_margin <= index.bottom_limit {
            bail!("Index page height leaves no room for entries");
        }

        if index.line_height <= 0.0 || index.font_size <= 0.0 {
            bail!("Index line height and font size must be positive");
        }

        if index.max_name_length < 4 {
            bail!("Index name length must be at least 4 characters");
        }

        let compression = &self.compression;
        if compression.max_iterations == 0 {
            bail!("Compression needs at least one iteration");
        }

        if compression.progressive_scales.is_empty() {
            bail!("Compression needs at least one progressive scale factor");
        }

        if let Some(bad) = compression
            .progressive_scales
            .iter()
            .find(|s| !(**s > 0.0 && **s <= 1.0))
        {
            bail!("Invalid progressive scale factor: {bad}. Must be in (0, 1]");
        }

        if compression.ghostscript_binary.trim().is_empty() {
            bail!("Ghostscript binary name cannot be empty");
        }

        Ok(())
    }
}
