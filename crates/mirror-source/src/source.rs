//! Content source trait.

use crate::error::SourceError;
use crate::types::{DocDetail, DocSummary, Repository, TocEntry};

/// Records of one repository: its declared hierarchy and its full document
/// list.
///
/// Documents present in `docs` but not referenced by any `toc` entry are
/// unlisted drafts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RepoRecords {
    /// Table-of-contents entries in source order.
    pub toc: Vec<TocEntry>,
    /// Every document of the repository.
    pub docs: Vec<DocSummary>,
}

/// Read access to the hosted document corpus.
///
/// Implementations are shared between the planning thread and render workers,
/// so they must be `Send + Sync`.
pub trait ContentSource: Send + Sync {
    /// List the repositories to mirror, in a stable order.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`] if the listing cannot be obtained.
    fn list_repos(&self) -> Result<Vec<Repository>, SourceError>;

    /// List one repository's table of contents and document list.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`] if either list cannot be obtained.
    fn list_records(&self, namespace: &str) -> Result<RepoRecords, SourceError>;

    /// Fetch one document's full payload.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::NotFound`] if the body is unavailable, or
    /// another variant if it cannot be read.
    fn fetch_document_body(&self, namespace: &str, slug: &str) -> Result<DocDetail, SourceError>;
}
