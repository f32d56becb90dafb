//! Error types for content sources.

use std::path::PathBuf;

/// Error from content source operations.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// A cached file could not be read.
    #[error("failed to read {}", .path.display())]
    Io {
        /// File that failed.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// A cached file is not valid JSON for the expected shape.
    #[error("invalid JSON in {}", .path.display())]
    Json {
        /// File that failed.
        path: PathBuf,
        /// Underlying parse error.
        #[source]
        source: serde_json::Error,
    },

    /// Repository discovery pattern is invalid.
    #[error("invalid repository pattern")]
    Pattern(#[from] glob::PatternError),

    /// Repository discovery could not read a directory entry.
    #[error("repository discovery failed")]
    Glob(#[from] glob::GlobError),

    /// A document slug would escape the repository directory.
    #[error("invalid document slug {slug:?} in {namespace}")]
    InvalidSlug {
        /// Repository namespace.
        namespace: String,
        /// Offending slug.
        slug: String,
    },

    /// The document body is not available.
    #[error("document {namespace}/{slug} not found")]
    NotFound {
        /// Repository namespace.
        namespace: String,
        /// Document slug.
        slug: String,
    },

    /// Source backend is unavailable.
    #[error("source unavailable: {0}")]
    Unavailable(String),
}

impl SourceError {
    /// True if the error only means a single document body is missing.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}
