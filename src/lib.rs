//! bidpack - Compile, index, stamp, merge and compress bid submission PDFs.
//!
//! This library turns the parts of a bid response into one deliverable:
//!
//! - Ordered compilation of source PDFs into a single document
//! - Generated index pages with dot leaders and page references
//! - Consecutive page numbers and an optional seal/signature stamp
//! - Merging of compiled submissions
//! - Size-targeted compression via Ghostscript or an in-process fallback
//!
//! The library never installs a `tracing` subscriber; callers decide where
//! logs go.
//!
//! # Examples
//!
//! ## Compile a response
//!
//! ```no_run
//! use bidpack::compile::{CompilationRequest, Compiler, DocumentDescriptor, IndexOptions};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let request = CompilationRequest::new("Technical Response", "out/technical.pdf")
//!     .with_document(DocumentDescriptor::new("Company Profile", "profile.pdf", 1))
//!     .with_document(DocumentDescriptor::new("Method Statement", "method.pdf", 2))
//!     .with_index_options(IndexOptions::with_index(1))
//!     .with_bid_number("RFQ-2024-017");
//!
//! let output = Compiler::new().compile(&request).await?;
//! println!("compiled {}", output.display());
//! # Ok(())
//! # }
//! ```
//!
//! ## Compress to a size budget
//!
//! ```no_run
//! use bidpack::compress::CompressionEngine;
//! use bidpack::config::{CompressionTier, EngineConfig};
//! use std::path::Path;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let engine = CompressionEngine::new(&EngineConfig::default());
//! let result = engine
//!     .compress(Path::new("out/bid.pdf"), Path::new("out/bid-small.pdf"), CompressionTier::Extreme)
//!     .await?;
//! println!("{} KB -> {} KB", result.original_size_kb, result.compressed_size_kb);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod compile;
pub mod compress;
pub mod config;
pub mod error;
pub mod io;
pub mod merge;
pub mod metadata;
pub mod pages;

// Re-export commonly used types
pub use compile::{CompilationReport, CompilationRequest, Compiler, DocumentDescriptor};
pub use compress::{CompressionEngine, CompressionResult, CompressionSettings};
pub use config::{CompressionTier, EngineConfig, StampPosition};
pub use error::{
    CompilationError, CompressionError, ExternalToolError, LoadError, MergeError, PageError, StampError,
    WriteError,
};
pub use io::file_size_label;
pub use merge::{MergeStatistics, Merger};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name.
pub const NAME: &str = env!("CARGO_PKG_NAME");
