//! Hosted service record types.
//!
//! Field names follow the service's JSON so the cached files deserialize
//! directly. Only the fields the build engine reads are declared; everything
//! else in the payload is ignored.

use serde::{Deserialize, Serialize};

/// Repository (knowledge base) summary.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Repository {
    /// Repository type ("Book" for document repositories).
    #[serde(rename = "type")]
    pub kind: String,
    /// Namespace (`<user>/<repo>`), the stable repository identity.
    pub namespace: String,
    /// Display name.
    pub name: String,
    /// Repository slug.
    #[serde(default)]
    pub slug: String,
}

impl Repository {
    /// Create a document repository.
    #[must_use]
    pub fn book(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        let namespace = namespace.into();
        let slug = namespace.rsplit('/').next().unwrap_or_default().to_owned();
        Self {
            kind: "Book".to_owned(),
            namespace,
            name: name.into(),
            slug,
        }
    }

    /// True for document repositories; other types are not mirrored.
    #[must_use]
    pub fn is_book(&self) -> bool {
        self.kind == "Book"
    }
}

/// Table-of-contents entry type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TocKind {
    /// Folder-like heading.
    Title,
    /// Published document.
    Doc,
    /// External link.
    Link,
    /// Placeholder for a document that was never created.
    UncreatedDoc,
    /// Repository metadata entry; carries no content.
    Meta,
    /// Any type this engine does not know about.
    #[serde(other)]
    Unknown,
}

/// One entry of a repository's table of contents.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct TocEntry {
    /// Entry type.
    #[serde(rename = "type")]
    pub kind: TocKind,
    /// Display title.
    #[serde(default)]
    pub title: String,
    /// Entry identity.
    pub uuid: String,
    /// Parent entry identity; empty or absent for top-level entries.
    #[serde(default)]
    pub parent_uuid: Option<String>,
    /// Document slug for documents, target URL for links.
    #[serde(default)]
    pub url: Option<String>,
}

impl TocEntry {
    /// Create an entry.
    #[must_use]
    pub fn new(kind: TocKind, uuid: &str, parent_uuid: &str, title: &str, url: &str) -> Self {
        Self {
            kind,
            title: title.to_owned(),
            uuid: uuid.to_owned(),
            parent_uuid: (!parent_uuid.is_empty()).then(|| parent_uuid.to_owned()),
            url: (!url.is_empty()).then(|| url.to_owned()),
        }
    }

    /// Parent identity, with empty strings normalized to `None`.
    #[must_use]
    pub fn parent(&self) -> Option<&str> {
        self.parent_uuid.as_deref().filter(|p| !p.is_empty())
    }

    /// Slug for documents, target URL for links, empty otherwise.
    #[must_use]
    pub fn url(&self) -> &str {
        self.url.as_deref().unwrap_or_default()
    }
}

/// Document entry from a repository's full document list.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct DocSummary {
    /// Numeric document id, stable across renames.
    pub id: u64,
    /// Document slug, unique within the repository.
    pub slug: String,
    /// Display title.
    #[serde(default)]
    pub title: String,
    /// Last publish time.
    #[serde(default)]
    pub published_at: Option<String>,
    /// Last content edit time (fallback for never-published drafts).
    #[serde(default)]
    pub content_updated_at: Option<String>,
}

impl DocSummary {
    /// Create a published document summary.
    #[must_use]
    pub fn new(id: u64, slug: &str, title: &str, published_at: &str) -> Self {
        Self {
            id,
            slug: slug.to_owned(),
            title: title.to_owned(),
            published_at: Some(published_at.to_owned()),
            content_updated_at: None,
        }
    }

    /// Revision tag used for change detection.
    ///
    /// Prefers the publish time, falls back to the content edit time, and
    /// finally to an empty tag for documents that carry neither.
    #[must_use]
    pub fn revision_tag(&self) -> &str {
        self.published_at
            .as_deref()
            .or(self.content_updated_at.as_deref())
            .unwrap_or_default()
    }
}

/// Full document payload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct DocDetail {
    /// Numeric document id.
    pub id: u64,
    /// Document slug.
    pub slug: String,
    /// Display title.
    #[serde(default)]
    pub title: String,
    /// Body format ("markdown", "lake", "lakesheet", ...).
    #[serde(default)]
    pub format: String,
    /// Markdown body.
    #[serde(default)]
    pub body: Option<String>,
    /// Rich-text body, used when `body` is empty.
    #[serde(default)]
    pub body_lake: Option<String>,
    /// JSON-encoded sheet data for `lakesheet` documents.
    #[serde(default)]
    pub body_sheet: Option<String>,
    /// Last publish time.
    #[serde(default)]
    pub published_at: Option<String>,
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_parse_toc_entry() {
        let json = r#"{
            "type": "DOC",
            "title": "Intro",
            "uuid": "u1",
            "parent_uuid": "",
            "url": "intro",
            "level": 0,
            "child_uuid": ""
        }"#;
        let entry: TocEntry = serde_json::from_str(json).unwrap();

        assert_eq!(entry.kind, TocKind::Doc);
        assert_eq!(entry.title, "Intro");
        assert_eq!(entry.parent(), None);
        assert_eq!(entry.url(), "intro");
    }

    #[test]
    fn test_parse_toc_entry_null_fields() {
        let json = r#"{"type": "TITLE", "title": "Group", "uuid": "u2", "parent_uuid": null, "url": null}"#;
        let entry: TocEntry = serde_json::from_str(json).unwrap();

        assert_eq!(entry.kind, TocKind::Title);
        assert_eq!(entry.parent(), None);
        assert_eq!(entry.url(), "");
    }

    #[test]
    fn test_parse_toc_kinds() {
        for (raw, kind) in [
            ("LINK", TocKind::Link),
            ("UNCREATED_DOC", TocKind::UncreatedDoc),
            ("META", TocKind::Meta),
            ("SOMETHING_NEW", TocKind::Unknown),
        ] {
            let json = format!(r#"{{"type": "{raw}", "uuid": "u"}}"#);
            let entry: TocEntry = serde_json::from_str(&json).unwrap();
            assert_eq!(entry.kind, kind, "{raw}");
        }
    }

    #[test]
    fn test_toc_entry_new_normalizes_empty() {
        let entry = TocEntry::new(TocKind::Title, "u1", "", "Group", "");

        assert_eq!(entry.parent_uuid, None);
        assert_eq!(entry.url, None);
    }

    #[test]
    fn test_parse_doc_summary_ignores_extra_fields() {
        let json = r#"{
            "id": 42,
            "slug": "intro",
            "title": "Intro",
            "published_at": "2024-01-01T00:00:00.000Z",
            "word_count": 120,
            "book": {"id": 1}
        }"#;
        let doc: DocSummary = serde_json::from_str(json).unwrap();

        assert_eq!(doc.id, 42);
        assert_eq!(doc.revision_tag(), "2024-01-01T00:00:00.000Z");
    }

    #[test]
    fn test_revision_tag_fallbacks() {
        let mut doc = DocSummary::new(1, "a", "A", "t0");
        doc.published_at = None;
        assert_eq!(doc.revision_tag(), "");

        doc.content_updated_at = Some("t1".to_owned());
        assert_eq!(doc.revision_tag(), "t1");
    }

    #[test]
    fn test_repository_book() {
        let repo = Repository::book("team/handbook", "Handbook");

        assert!(repo.is_book());
        assert_eq!(repo.slug, "handbook");
    }

    #[test]
    fn test_parse_repository_type() {
        let json = r#"{"type": "Design", "namespace": "team/board", "name": "Board"}"#;
        let repo: Repository = serde_json::from_str(json).unwrap();

        assert!(!repo.is_book());
    }
}
