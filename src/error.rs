//! Error types for bidpack.
//!
//! Every public operation has its own error enum so callers can tell a
//! per-document problem (usually skipped) from a whole-operation failure.
//!
//! # Error Categories
//!
//! - **Load errors**: missing, unreadable or corrupted source files
//! - **Stamp errors**: the stamp image cannot be used
//! - **Page errors**: the page tree of a document cannot be manipulated
//! - **Write errors**: the output cannot be persisted
//! - **Operation errors**: compile, merge and compression failures

use std::io;
use std::path::PathBuf;

/// A source document could not be loaded.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    /// The file does not exist.
    #[error("file not found: {}", path.display())]
    NotFound {
        /// Path to the missing file.
        path: PathBuf,
    },

    /// The file exists but is not a usable PDF.
    #[error("corrupt PDF: {}\n  Details: {details}", path.display())]
    Corrupt {
        /// Path to the corrupted file.
        path: PathBuf,
        /// Details about the corruption.
        details: String,
    },

    /// The file could not be read.
    #[error("cannot read file: {}\n  Reason: {source}", path.display())]
    Io {
        /// Path to the unreadable file.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },
}

impl LoadError {
    /// Create a NotFound error.
    pub fn not_found(path: impl Into<PathBuf>) -> Self {
        Self::NotFound { path: path.into() }
    }

    /// Create a Corrupt error.
    pub fn corrupt(path: impl Into<PathBuf>, details: impl Into<String>) -> Self {
        Self::Corrupt {
            path: path.into(),
            details: details.into(),
        }
    }

    /// Map an I/O error on `path`, turning `NotFound` into [`LoadError::NotFound`].
    pub fn from_io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        let path = path.into();
        if source.kind() == io::ErrorKind::NotFound {
            Self::NotFound { path }
        } else {
            Self::Io { path, source }
        }
    }

    /// Path of the document that failed to load.
    pub fn path(&self) -> &PathBuf {
        match self {
            Self::NotFound { path } | Self::Corrupt { path, .. } | Self::Io { path, .. } => path,
        }
    }
}

/// The stamp image could not be prepared or drawn.
#[derive(Debug, thiserror::Error)]
pub enum StampError {
    /// The image file could not be read.
    #[error("cannot read stamp image: {}\n  Reason: {source}", path.display())]
    Unreadable {
        /// Path to the image.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// The image format is not supported or the data is invalid.
    #[error("unsupported stamp image: {}\n  Reason: {reason}", path.display())]
    UnsupportedImage {
        /// Path to the image.
        path: PathBuf,
        /// Decoder message.
        reason: String,
    },

    /// The stamp options are out of range.
    #[error("invalid stamp options: {0}")]
    InvalidOptions(String),

    /// Drawing onto a page failed.
    #[error("failed to draw stamp: {0}")]
    Page(#[from] PageError),
}

/// A page tree or page dictionary could not be read or modified.
#[derive(Debug, thiserror::Error)]
pub enum PageError {
    /// Low-level PDF object error.
    #[error("PDF object error: {0}")]
    Pdf(#[from] lopdf::Error),

    /// The document has no usable page tree.
    #[error("invalid page tree: {0}")]
    InvalidPageTree(String),

    /// A requested page index does not exist.
    #[error("page {index} out of range (document has {count} page(s))")]
    OutOfRange {
        /// Zero-based page index requested.
        index: usize,
        /// Number of pages in the document.
        count: usize,
    },

    /// A content stream could not be encoded.
    #[error("failed to encode content stream: {0}")]
    Content(String),
}

impl PageError {
    /// Create an InvalidPageTree error.
    pub fn invalid_tree(reason: impl Into<String>) -> Self {
        Self::InvalidPageTree(reason.into())
    }
}

/// The output file could not be written.
#[derive(Debug, thiserror::Error)]
pub enum WriteError {
    /// The output directory could not be created.
    #[error("failed to create output directory: {}\n  Reason: {source}", path.display())]
    CreateDirectory {
        /// Directory that could not be created.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// The output file could not be created.
    #[error("failed to create output file: {}\n  Reason: {source}", path.display())]
    CreateOutput {
        /// Path where output should be created.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// Writing or renaming the output failed.
    #[error("failed to write output file: {}\n  Reason: {source}", path.display())]
    Write {
        /// Path being written to.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// The background write task panicked or was cancelled.
    #[error("write task failed: {0}")]
    Task(String),
}

/// A compile request failed as a whole.
#[derive(Debug, thiserror::Error)]
pub enum CompilationError {
    /// None of the requested documents could be loaded.
    #[error("no valid documents")]
    NoValidDocuments,

    /// The stamp could not be applied.
    #[error(transparent)]
    Stamp(#[from] StampError),

    /// Assembling pages into the output failed.
    #[error("failed to assemble output: {0}")]
    Assembly(#[from] PageError),

    /// The request itself is malformed.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Persisting the output failed.
    #[error(transparent)]
    Write(#[from] WriteError),

    /// A background task panicked or was cancelled.
    #[error("compilation task failed: {0}")]
    Task(String),
}

impl CompilationError {
    /// Create an InvalidRequest error.
    pub fn invalid_request(reason: impl Into<String>) -> Self {
        Self::InvalidRequest(reason.into())
    }
}

/// A merge of compiled submissions failed as a whole.
#[derive(Debug, thiserror::Error)]
pub enum MergeError {
    /// None of the submissions could be loaded.
    #[error("no valid submissions")]
    NoValidSubmissions,

    /// Assembling pages into the output failed.
    #[error("failed to assemble output: {0}")]
    Assembly(#[from] PageError),

    /// Persisting the output failed.
    #[error(transparent)]
    Write(#[from] WriteError),

    /// A background task panicked or was cancelled.
    #[error("merge task failed: {0}")]
    Task(String),
}

/// The external rasterizing tool could not produce output.
///
/// Always recoverable: the engine falls back to in-process compression.
#[derive(Debug, thiserror::Error)]
pub enum ExternalToolError {
    /// The tool is not installed on this host.
    #[error("{tool} is not available")]
    NotAvailable {
        /// Binary name.
        tool: String,
    },

    /// The process could not be spawned.
    #[error("failed to execute {tool}: {source}")]
    Spawn {
        /// Binary name.
        tool: String,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// The process exited unsuccessfully.
    #[error("{tool} failed (exit code {code}): {stderr}")]
    Failed {
        /// Binary name.
        tool: String,
        /// Exit code, or "unknown" when killed by a signal.
        code: String,
        /// Trimmed standard error.
        stderr: String,
    },

    /// The process succeeded but left no usable output.
    #[error("{tool} produced no output")]
    NoOutput {
        /// Binary name.
        tool: String,
    },

    /// Temporary files for the invocation could not be managed.
    #[error("temporary file error: {0}")]
    TempFile(#[source] io::Error),
}

/// A compression request failed as a whole.
#[derive(Debug, thiserror::Error)]
pub enum CompressionError {
    /// The input file could not be read.
    #[error(transparent)]
    Unreadable(#[from] LoadError),

    /// The input is not a parseable PDF.
    #[error("input is not a valid PDF: {}\n  Details: {details}", path.display())]
    InvalidDocument {
        /// Input path.
        path: PathBuf,
        /// Parser message.
        details: String,
    },

    /// The external tool failed and no fallback was possible.
    #[error(transparent)]
    ExternalTool(#[from] ExternalToolError),

    /// The in-process pipeline failed to rewrite the document.
    #[error("in-process compression failed: {0}")]
    Rewrite(String),

    /// Page manipulation failed.
    #[error("failed to rescale pages: {0}")]
    Page(#[from] PageError),

    /// Persisting the output failed.
    #[error(transparent)]
    Write(#[from] WriteError),

    /// A background task panicked or was cancelled.
    #[error("compression task failed: {0}")]
    Task(String),
}

impl CompressionError {
    /// Create a Rewrite error.
    pub fn rewrite(reason: impl Into<String>) -> Self {
        Self::Rewrite(reason.into())
    }

    /// Check if the error only concerns the external tool.
    ///
    /// Returns true when the in-process fallback can still succeed.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::ExternalTool(_))
    }
}
