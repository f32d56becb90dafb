//! Content source backed by the crawler's local JSON cache.
//!
//! Directory layout:
//! ```text
//! {meta}/
//! +-- {user}/
//!     +-- {repo}/
//!         +-- repo.json          # repository summary
//!         +-- toc.json           # table of contents
//!         +-- docs.json          # full document list
//!         +-- docs/
//!             +-- {slug}.json    # document payload
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;

use crate::error::SourceError;
use crate::source::{ContentSource, RepoRecords};
use crate::types::{DocDetail, DocSummary, Repository, TocEntry};

/// [`ContentSource`] reading the cached repository files under a metadata
/// directory.
#[derive(Debug)]
pub struct MetaDirSource {
    meta_dir: PathBuf,
}

impl MetaDirSource {
    /// Create a source reading from `meta_dir`.
    #[must_use]
    pub fn new(meta_dir: PathBuf) -> Self {
        Self { meta_dir }
    }

    fn repo_dir(&self, namespace: &str) -> PathBuf {
        self.meta_dir.join(namespace)
    }
}

/// Read and deserialize a JSON file.
fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, SourceError> {
    let content = fs::read_to_string(path).map_err(|source| SourceError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&content).map_err(|source| SourceError::Json {
        path: path.to_path_buf(),
        source,
    })
}

/// Slugs become file names; reject anything that could leave `docs/`.
fn is_safe_slug(slug: &str) -> bool {
    !slug.is_empty()
        && slug != "."
        && slug != ".."
        && !slug.contains(['/', '\\'])
}

impl ContentSource for MetaDirSource {
    fn list_repos(&self) -> Result<Vec<Repository>, SourceError> {
        let root = glob::Pattern::escape(&self.meta_dir.to_string_lossy());
        let pattern = format!("{root}/*/*/repo.json");

        let mut repos = Vec::new();
        for path in glob::glob(&pattern)? {
            let path = path?;
            let repo: Repository = read_json(&path)?;
            if repo.is_book() {
                repos.push(repo);
            } else {
                tracing::debug!(namespace = %repo.namespace, kind = %repo.kind, "skipping non-document repository");
            }
        }

        tracing::info!(count = repos.len(), meta_dir = %self.meta_dir.display(), "listed repositories");
        Ok(repos)
    }

    fn list_records(&self, namespace: &str) -> Result<RepoRecords, SourceError> {
        let dir = self.repo_dir(namespace);
        let toc: Vec<TocEntry> = read_json(&dir.join("toc.json"))?;
        let docs: Vec<DocSummary> = read_json(&dir.join("docs.json"))?;
        Ok(RepoRecords { toc, docs })
    }

    fn fetch_document_body(&self, namespace: &str, slug: &str) -> Result<DocDetail, SourceError> {
        if !is_safe_slug(slug) {
            return Err(SourceError::InvalidSlug {
                namespace: namespace.to_owned(),
                slug: slug.to_owned(),
            });
        }

        let path = self.repo_dir(namespace).join("docs").join(format!("{slug}.json"));
        match read_json(&path) {
            Err(SourceError::Io { source, .. }) if source.kind() == std::io::ErrorKind::NotFound => {
                Err(SourceError::NotFound {
                    namespace: namespace.to_owned(),
                    slug: slug.to_owned(),
                })
            }
            other => other,
        }
    }
}
