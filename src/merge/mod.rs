//! Merging of compiled submissions.
//!
//! This module combines several already-compiled PDFs (for example the
//! technical and financial responses of one bid) into a single file.

pub mod merger;

pub use merger::{MergeStatistics, Merger};
