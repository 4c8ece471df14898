//! Size-targeted PDF compression.
//!
//! [`CompressionEngine::compress`] plans settings from the input size,
//! runs Ghostscript when it is installed and falls back to an in-process
//! lopdf pipeline otherwise (or when Ghostscript fails). Results are
//! best-effort; the target size is not guaranteed.

pub mod cleanup;
pub mod engine;
pub mod images;
pub mod in_process;
pub mod planner;
pub mod raster;

pub use engine::{CompressionEngine, CompressionResult, compression_ratio};
pub use in_process::InProcessTool;
pub use planner::{CompressionSettings, plan, plan_for_tier};
pub use raster::{CompressionMethod, GhostscriptTool, RasterTool, SourcePdf, ToolOutput};
