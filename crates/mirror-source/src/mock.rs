//! Mock content source for testing.
//!
//! Provides [`MockSource`] so engine tests can script repository contents
//! and change them between build cycles.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::RwLock;

use crate::error::SourceError;
use crate::source::{ContentSource, RepoRecords};
use crate::types::{DocDetail, DocSummary, Repository, TocEntry};

/// In-memory content source.
///
/// Repositories are listed in namespace order. Records and document bodies can
/// be replaced at any time through `&self` methods, which lets a test mutate
/// the source between two builds against the same output.
///
/// # Example
///
/// ```ignore
/// use mirror_source::{MockSource, Repository, TocEntry, TocKind, DocSummary};
///
/// let source = MockSource::new().with_repo(
///     Repository::book("team/handbook", "Handbook"),
///     vec![TocEntry::new(TocKind::Doc, "u1", "", "Intro", "intro")],
///     vec![DocSummary::new(1, "intro", "Intro", "t0")],
/// );
/// ```
#[derive(Debug, Default)]
pub struct MockSource {
    repos: RwLock<BTreeMap<String, (Repository, RepoRecords)>>,
    details: RwLock<HashMap<(String, String), DocDetail>>,
    failing_records: RwLock<HashSet<String>>,
    failing_bodies: RwLock<HashSet<(String, String)>>,
}

impl MockSource {
    /// Create an empty source.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a repository with its table of contents and document list.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    #[must_use]
    pub fn with_repo(self, repo: Repository, toc: Vec<TocEntry>, docs: Vec<DocSummary>) -> Self {
        self.set_repo(repo, toc, docs);
        self
    }

    /// Add a document body.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    #[must_use]
    pub fn with_detail(self, namespace: &str, detail: DocDetail) -> Self {
        self.set_detail(namespace, detail);
        self
    }

    /// Make `list_records` fail for `namespace`.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    #[must_use]
    pub fn with_failing_records(self, namespace: &str) -> Self {
        self.failing_records
            .write()
            .unwrap()
            .insert(namespace.to_owned());
        self
    }

    /// Make `fetch_document_body` fail for one document.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    #[must_use]
    pub fn with_failing_body(self, namespace: &str, slug: &str) -> Self {
        self.failing_bodies
            .write()
            .unwrap()
            .insert((namespace.to_owned(), slug.to_owned()));
        self
    }

    /// Replace (or add) a repository's records.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    pub fn set_repo(&self, repo: Repository, toc: Vec<TocEntry>, docs: Vec<DocSummary>) {
        self.repos
            .write()
            .unwrap()
            .insert(repo.namespace.clone(), (repo, RepoRecords { toc, docs }));
    }

    /// Replace (or add) a document body.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    pub fn set_detail(&self, namespace: &str, detail: DocDetail) {
        self.details
            .write()
            .unwrap()
            .insert((namespace.to_owned(), detail.slug.clone()), detail);
    }
}

impl ContentSource for MockSource {
    fn list_repos(&self) -> Result<Vec<Repository>, SourceError> {
        Ok(self
            .repos
            .read()
            .unwrap()
            .values()
            .filter(|(repo, _)| repo.is_book())
            .map(|(repo, _)| repo.clone())
            .collect())
    }

    fn list_records(&self, namespace: &str) -> Result<RepoRecords, SourceError> {
        if self.failing_records.read().unwrap().contains(namespace) {
            return Err(SourceError::Unavailable(format!(
                "records for {namespace} unavailable"
            )));
        }
        self.repos
            .read()
            .unwrap()
            .get(namespace)
            .map(|(_, records)| records.clone())
            .ok_or_else(|| SourceError::Unavailable(format!("unknown repository {namespace}")))
    }

    fn fetch_document_body(&self, namespace: &str, slug: &str) -> Result<DocDetail, SourceError> {
        let key = (namespace.to_owned(), slug.to_owned());
        if self.failing_bodies.read().unwrap().contains(&key) {
            return Err(SourceError::Unavailable(format!(
                "body for {namespace}/{slug} unavailable"
            )));
        }
        self.details
            .read()
            .unwrap()
            .get(&key)
            .cloned()
            .ok_or_else(|| SourceError::NotFound {
                namespace: namespace.to_owned(),
                slug: slug.to_owned(),
            })
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::types::TocKind;

    fn detail(slug: &str, body: &str) -> DocDetail {
        DocDetail {
            slug: slug.to_owned(),
            body: Some(body.to_owned()),
            ..DocDetail::default()
        }
    }

    #[test]
    fn test_mock_source_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<MockSource>();
    }

    #[test]
    fn test_list_repos_sorted_books_only() {
        let mut design = Repository::book("team/board", "Board");
        design.kind = "Design".to_owned();
        let source = MockSource::new()
            .with_repo(Repository::book("team/zeta", "Zeta"), vec![], vec![])
            .with_repo(design, vec![], vec![])
            .with_repo(Repository::book("team/alpha", "Alpha"), vec![], vec![]);

        let names: Vec<String> = source
            .list_repos()
            .unwrap()
            .into_iter()
            .map(|r| r.name)
            .collect();

        assert_eq!(names, vec!["Alpha".to_owned(), "Zeta".to_owned()]);
    }

    #[test]
    fn test_set_repo_replaces_records() {
        let repo = Repository::book("team/handbook", "Handbook");
        let source = MockSource::new().with_repo(repo.clone(), vec![], vec![]);

        source.set_repo(
            repo,
            vec![TocEntry::new(TocKind::Doc, "u1", "", "Intro", "intro")],
            vec![],
        );

        assert_eq!(source.list_records("team/handbook").unwrap().toc.len(), 1);
    }

    #[test]
    fn test_fetch_document_body() {
        let source = MockSource::new().with_detail("team/handbook", detail("intro", "# Hi"));

        let fetched = source.fetch_document_body("team/handbook", "intro").unwrap();

        assert_eq!(fetched.body.as_deref(), Some("# Hi"));
        assert!(
            source
                .fetch_document_body("team/handbook", "other")
                .unwrap_err()
                .is_not_found()
        );
    }

    #[test]
    fn test_failing_records_and_bodies() {
        let source = MockSource::new()
            .with_repo(Repository::book("team/handbook", "Handbook"), vec![], vec![])
            .with_detail("team/handbook", detail("intro", "x"))
            .with_failing_records("team/handbook")
            .with_failing_body("team/handbook", "intro");

        assert!(source.list_records("team/handbook").is_err());
        let err = source.fetch_document_body("team/handbook", "intro").unwrap_err();
        assert!(!err.is_not_found());
    }
}
