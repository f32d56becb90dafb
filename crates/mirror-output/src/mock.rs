//! Mock output store for testing.
//!
//! Provides [`MockOutput`] for unit testing without filesystem access.

use std::collections::{BTreeMap, HashSet};
use std::sync::RwLock;

use crate::store::{Entry, OutputError, OutputErrorKind, OutputStore, join_path};

const BACKEND: &str = "Mock";

#[derive(Debug, Clone)]
enum Node {
    File(Vec<u8>),
    Dir,
}

/// In-memory output store.
///
/// Directories are tracked explicitly, so an empty directory can exist and
/// `write_file` creates missing ancestors the same way [`crate::FsOutput`]
/// does. Individual paths can be configured to fail, which lets tests exercise
/// isolated task failures and unreadable output areas.
///
/// # Example
///
/// ```ignore
/// use mirror_output::{MockOutput, OutputStore};
///
/// let output = MockOutput::new()
///     .with_file("handbook/intro.md", "# Intro")
///     .with_failing_path("handbook/locked.md");
///
/// assert!(output.exists("handbook"));
/// assert!(output.write_file("handbook/locked.md", b"x").is_err());
/// ```
#[derive(Debug, Default)]
pub struct MockOutput {
    nodes: RwLock<BTreeMap<String, Node>>,
    failing: RwLock<HashSet<String>>,
    unlistable: RwLock<HashSet<String>>,
}

impl MockOutput {
    /// Create a new empty mock output.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a file (and its ancestor directories).
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    #[must_use]
    pub fn with_file(self, path: &str, content: impl Into<String>) -> Self {
        let mut nodes = self.nodes.write().unwrap();
        insert_ancestors(&mut nodes, path);
        nodes.insert(path.to_owned(), Node::File(content.into().into_bytes()));
        drop(nodes);
        self
    }

    /// Add a directory (and its ancestors).
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    #[must_use]
    pub fn with_dir(self, path: &str) -> Self {
        let mut nodes = self.nodes.write().unwrap();
        insert_ancestors(&mut nodes, path);
        nodes.insert(path.to_owned(), Node::Dir);
        drop(nodes);
        self
    }

    /// Make every mutating operation on `path` fail with permission denied.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    #[must_use]
    pub fn with_failing_path(self, path: &str) -> Self {
        self.failing.write().unwrap().insert(path.to_owned());
        self
    }

    /// Make `list_dir` on `path` fail.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    #[must_use]
    pub fn with_unlistable_dir(self, path: &str) -> Self {
        self.unlistable.write().unwrap().insert(path.to_owned());
        self
    }

    /// Read back a file's content as UTF-8.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    #[must_use]
    pub fn read(&self, path: &str) -> Option<String> {
        match self.nodes.read().unwrap().get(path) {
            Some(Node::File(bytes)) => Some(String::from_utf8_lossy(bytes).into_owned()),
            _ => None,
        }
    }

    /// All file paths currently stored, sorted.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    #[must_use]
    pub fn files(&self) -> Vec<String> {
        self.nodes
            .read()
            .unwrap()
            .iter()
            .filter(|(_, node)| matches!(node, Node::File(_)))
            .map(|(path, _)| path.clone())
            .collect()
    }

    /// All directory paths currently stored, sorted.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    #[must_use]
    pub fn dirs(&self) -> Vec<String> {
        self.nodes
            .read()
            .unwrap()
            .iter()
            .filter(|(_, node)| matches!(node, Node::Dir))
            .map(|(path, _)| path.clone())
            .collect()
    }

    fn check_failing(&self, path: &str) -> Result<(), OutputError> {
        if self.failing.read().unwrap().contains(path) {
            return Err(OutputError::new(OutputErrorKind::PermissionDenied)
                .with_path(path)
                .with_backend(BACKEND));
        }
        Ok(())
    }
}

/// Insert every ancestor directory of `path` (excluding the root).
fn insert_ancestors(nodes: &mut BTreeMap<String, Node>, path: &str) {
    let mut current = String::new();
    let segments: Vec<&str> = path.split('/').collect();
    for segment in &segments[..segments.len().saturating_sub(1)] {
        current = join_path(&current, segment);
        nodes.entry(current.clone()).or_insert(Node::Dir);
    }
}

/// True if `candidate` is a direct child of `parent`.
fn is_direct_child(parent: &str, candidate: &str) -> bool {
    let rest = if parent.is_empty() {
        candidate
    } else {
        match candidate
            .strip_prefix(parent)
            .and_then(|r| r.strip_prefix('/'))
        {
            Some(rest) => rest,
            None => return false,
        }
    };
    !rest.is_empty() && !rest.contains('/')
}

impl OutputStore for MockOutput {
    fn create_dir(&self, path: &str) -> Result<(), OutputError> {
        self.check_failing(path)?;
        let mut nodes = self.nodes.write().unwrap();
        insert_ancestors(&mut nodes, path);
        nodes.entry(path.to_owned()).or_insert(Node::Dir);
        Ok(())
    }

    fn write_file(&self, path: &str, content: &[u8]) -> Result<(), OutputError> {
        self.check_failing(path)?;
        let mut nodes = self.nodes.write().unwrap();
        insert_ancestors(&mut nodes, path);
        nodes.insert(path.to_owned(), Node::File(content.to_vec()));
        Ok(())
    }

    fn delete(&self, path: &str) -> Result<(), OutputError> {
        self.check_failing(path)?;
        let mut nodes = self.nodes.write().unwrap();
        let is_dir = match nodes.get(path) {
            None => return Err(OutputError::not_found(path).with_backend(BACKEND)),
            Some(node) => matches!(node, Node::Dir),
        };
        if is_dir && nodes.keys().any(|k| is_direct_child(path, k)) {
            return Err(OutputError::new(OutputErrorKind::NotEmpty)
                .with_path(path)
                .with_backend(BACKEND));
        }
        nodes.remove(path);
        Ok(())
    }

    fn exists(&self, path: &str) -> bool {
        path.is_empty() || self.nodes.read().unwrap().contains_key(path)
    }

    fn list_dir(&self, path: &str) -> Result<Vec<Entry>, OutputError> {
        if self.unlistable.read().unwrap().contains(path) {
            return Err(OutputError::new(OutputErrorKind::PermissionDenied)
                .with_path(path)
                .with_backend(BACKEND));
        }
        let nodes = self.nodes.read().unwrap();
        if !path.is_empty() && !matches!(nodes.get(path), Some(Node::Dir)) {
            return Err(OutputError::not_found(path).with_backend(BACKEND));
        }

        // BTreeMap iteration keeps the result sorted by full path, which is
        // sorted by name within one directory.
        Ok(nodes
            .iter()
            .filter(|(key, _)| is_direct_child(path, key))
            .map(|(key, node)| Entry {
                name: key.rsplit('/').next().unwrap_or(key).to_owned(),
                is_dir: matches!(node, Node::Dir),
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn assert_send_sync<T: Send + Sync>() {}

    #[test]
    fn test_mock_output_is_send_sync() {
        assert_send_sync::<MockOutput>();
    }

    #[test]
    fn test_with_file_creates_ancestors() {
        let output = MockOutput::new().with_file("a/b/c.md", "x");

        assert_eq!(output.dirs(), vec!["a".to_owned(), "a/b".to_owned()]);
        assert_eq!(output.files(), vec!["a/b/c.md".to_owned()]);
        assert_eq!(output.read("a/b/c.md"), Some("x".to_owned()));
    }

    #[test]
    fn test_list_dir_direct_children_only() {
        let output = MockOutput::new()
            .with_file("a/b/c.md", "x")
            .with_file("a/d.md", "y")
            .with_file("top.md", "z");

        assert_eq!(
            output.list_dir("a").unwrap(),
            vec![Entry::dir("b"), Entry::file("d.md")]
        );
        assert_eq!(
            output.list_dir("").unwrap(),
            vec![Entry::dir("a"), Entry::file("top.md")]
        );
    }

    #[test]
    fn test_list_dir_sibling_prefix_not_child() {
        let output = MockOutput::new()
            .with_file("ab/x.md", "x")
            .with_dir("a");

        assert!(output.list_dir("a").unwrap().is_empty());
    }

    #[test]
    fn test_delete_non_empty_dir_fails() {
        let output = MockOutput::new().with_file("a/b.md", "x");

        let err = output.delete("a").unwrap_err();

        assert_eq!(err.kind, OutputErrorKind::NotEmpty);
    }

    #[test]
    fn test_delete_then_dir_empty() {
        let output = MockOutput::new().with_file("a/b.md", "x");

        output.delete("a/b.md").unwrap();
        output.delete("a").unwrap();

        assert!(output.files().is_empty());
        assert!(output.dirs().is_empty());
    }

    #[test]
    fn test_delete_missing_is_not_found() {
        let output = MockOutput::new();

        assert!(output.delete("nope.md").unwrap_err().is_not_found());
    }

    #[test]
    fn test_failing_path() {
        let output = MockOutput::new().with_failing_path("locked.md");

        let err = output.write_file("locked.md", b"x").unwrap_err();

        assert_eq!(err.kind, OutputErrorKind::PermissionDenied);
        assert!(!output.exists("locked.md"));
    }

    #[test]
    fn test_unlistable_dir() {
        let output = MockOutput::new().with_unlistable_dir("");

        assert!(output.list_dir("").is_err());
    }
}
