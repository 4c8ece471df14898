//! Compilation of bid response documents.
//!
//! This module turns a [`CompilationRequest`] into one PDF:
//! - Stamping every content page with a seal or signature image
//! - Generating index pages with dot leaders and page references
//! - Numbering every output page consecutively
//! - Optional bookmarks and document information
//!
//! # Examples
//!
//! ```no_run
//! use bidpack::compile::{Compiler, CompilationRequest, DocumentDescriptor, IndexOptions, StampOptions};
//! use bidpack::config::StampPosition;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let request = CompilationRequest::new("Financial Response", "out/financial.pdf")
//!     .with_document(DocumentDescriptor::new("Price Schedule", "prices.pdf", 1))
//!     .with_document(DocumentDescriptor::new("Bank Guarantee", "guarantee.pdf", 2))
//!     .with_index_options(IndexOptions::with_index(1))
//!     .with_stamp(StampOptions::new("seal.png").with_position(StampPosition::TopRight));
//!
//! let report = Compiler::new().compile_with_report(&request).await?;
//! println!("{} pages, {} skipped", report.total_pages, report.skipped.len());
//! # Ok(())
//! # }
//! ```

pub mod compiler;
pub mod index;
pub mod numbering;
pub mod outline;
pub mod request;
pub mod stamp;
pub mod text;

pub use compiler::{CompilationReport, Compiler, SkippedDocument};
pub use index::{IndexDocument, IndexEntry, IndexPageBuilder};
pub use numbering::PageNumberer;
pub use outline::{OutlineBuilder, OutlineItem};
pub use request::{CompilationRequest, DocumentDescriptor, IndexOptions, StampOptions};
pub use stamp::{PreparedStamp, StampOverlay};
