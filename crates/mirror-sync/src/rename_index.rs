//! Move detection across cycles.

use std::collections::BTreeMap;

use crate::tree::{NodeKind, Tree};

/// Document identity (`namespace/slug`) to last output path (with `.md`).
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RenameIndex {
    paths: BTreeMap<String, String>,
}

impl RenameIndex {
    /// Create an index from a persisted mapping.
    #[must_use]
    pub fn new(paths: BTreeMap<String, String>) -> Self {
        Self { paths }
    }

    /// Build the index of the current tree (listed and draft documents).
    ///
    /// A document listed more than once is indexed at its first node in
    /// pre-order, the same node [`Tree::lookup`] resolves to.
    #[must_use]
    pub fn from_tree(tree: &Tree) -> Self {
        let mut paths = BTreeMap::new();
        for node in tree
            .iter()
            .filter(|node| matches!(node.record.kind, NodeKind::Doc | NodeKind::DraftDoc))
        {
            paths
                .entry(node.record.doc_key())
                .or_insert_with(|| node.output_path());
        }
        Self { paths }
    }

    /// Point the document indexed at `new_path` back to `old_path`, so the
    /// move is detected again next cycle.
    pub fn revert_move(&mut self, new_path: &str, old_path: &str) {
        if let Some(path) = self.paths.values_mut().find(|path| *path == new_path) {
            old_path.clone_into(path);
        }
    }

    /// Old output path of a document that now lives at `new_path`.
    ///
    /// Returns `None` if the document is unknown or has not moved.
    #[must_use]
    pub fn detect_move(&self, key: &str, new_path: &str) -> Option<&str> {
        self.paths
            .get(key)
            .map(String::as_str)
            .filter(|old| *old != new_path)
    }

    /// Last known path for a document.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.paths.get(key).map(String::as_str)
    }

    /// Number of indexed documents.
    #[must_use]
    pub fn len(&self) -> usize {
        self.paths.len()
    }

    /// True if no documents are indexed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// Underlying mapping.
    #[must_use]
    pub fn paths(&self) -> &BTreeMap<String, String> {
        &self.paths
    }
}
