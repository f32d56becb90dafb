//! Tree walk that turns a tree into build tasks.
//!
//! The walk is single-threaded and owns everything it accumulates: the
//! expected output set, the tags of this cycle and the new rename index.
//! Workers later only see the resulting [`Task`] list.

use std::collections::{BTreeSet, HashSet};

use mirror_output::OutputStore;

use crate::change_cache::{CacheKey, CacheUpdate, ChangeCache};
use crate::rename_index::RenameIndex;
use crate::tree::{NodeId, NodeKind, Tree, TreeNode};

/// Content of a write task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Content {
    /// Fixed text (link target, empty placeholder).
    Static(String),
    /// Produced by the renderer inside the task.
    Render,
}

/// One unit of work for the scheduler. No two tasks of a plan share a path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Task {
    /// Create a missing container directory.
    CreateDir {
        /// Output-relative directory.
        path: String,
    },
    /// Write a file node.
    WriteFile {
        /// Output-relative file path.
        path: String,
        /// Node being written.
        node: NodeId,
        /// What to write.
        content: Content,
        /// Cache entry to revert if the task fails.
        cache_key: Option<CacheKey>,
    },
    /// Remove the stale path of a moved document.
    Delete {
        /// Output-relative file path.
        path: String,
        /// New path of the moved document. The delete runs after that write
        /// and is dropped if the write failed.
        moved_to: Option<String>,
    },
}

impl Task {
    /// Output path the task operates on.
    #[must_use]
    pub fn path(&self) -> &str {
        match self {
            Self::CreateDir { path } | Self::WriteFile { path, .. } | Self::Delete { path, .. } => {
                path
            }
        }
    }

    /// Short verb for listings.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::CreateDir { .. } => "mkdir",
            Self::WriteFile {
                content: Content::Render,
                ..
            } => "render",
            Self::WriteFile { .. } => "write",
            Self::Delete { .. } => "delete",
        }
    }
}

/// Paths the current tree accounts for.
///
/// `dirs` holds every container directory and every ancestor directory of an
/// expected file, so anything in the output area that is in neither set is an
/// orphan.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ExpectedPaths {
    files: BTreeSet<String>,
    dirs: BTreeSet<String>,
}

impl ExpectedPaths {
    /// Compute the expected set of a tree.
    #[must_use]
    pub fn from_tree(tree: &Tree) -> Self {
        let mut expected = Self::default();
        for node in tree.iter() {
            match node.record.kind {
                NodeKind::Root | NodeKind::Container => expected.add_dir(&node.file_path),
                NodeKind::ContainerMeta => {}
                _ => expected.add_file(&node.output_path()),
            }
        }
        expected
    }

    /// Add a directory and its ancestors.
    pub fn add_dir(&mut self, path: &str) {
        if !path.is_empty() && self.dirs.insert(path.to_owned()) {
            self.add_ancestors(path);
        }
    }

    /// Add a file and its ancestor directories.
    pub fn add_file(&mut self, path: &str) {
        self.files.insert(path.to_owned());
        self.add_ancestors(path);
    }

    fn add_ancestors(&mut self, path: &str) {
        let mut current = path;
        while let Some((parent, _)) = current.rsplit_once('/') {
            if !self.dirs.insert(parent.to_owned()) {
                break;
            }
            current = parent;
        }
    }

    /// True if `path` is an expected file.
    #[must_use]
    pub fn contains_file(&self, path: &str) -> bool {
        self.files.contains(path)
    }

    /// True if `path` is an expected directory.
    #[must_use]
    pub fn contains_dir(&self, path: &str) -> bool {
        self.dirs.contains(path)
    }

    /// True if `path` is expected as either a file or a directory.
    #[must_use]
    pub fn contains(&self, path: &str) -> bool {
        self.contains_file(path) || self.contains_dir(path)
    }

    /// Expected files, sorted.
    #[must_use]
    pub fn files(&self) -> &BTreeSet<String> {
        &self.files
    }

    /// Expected directories, sorted.
    #[must_use]
    pub fn dirs(&self) -> &BTreeSet<String> {
        &self.dirs
    }
}

/// Everything one cycle intends to do.
#[derive(Debug, Default)]
pub struct BuildPlan {
    /// Tasks for the scheduler, in walk order.
    pub tasks: Vec<Task>,
    /// Paths the current tree accounts for.
    pub expected: ExpectedPaths,
    /// Tags observed in this cycle.
    pub cache_update: CacheUpdate,
    /// Rename index of the current tree.
    pub rename_index: RenameIndex,
    /// File nodes whose render was skipped by the change cache.
    pub skipped: usize,
}

impl BuildPlan {
    /// Number of write tasks.
    #[must_use]
    pub fn writes(&self) -> usize {
        self.tasks
            .iter()
            .filter(|t| matches!(t, Task::WriteFile { .. }))
            .count()
    }

    /// Number of delete tasks.
    #[must_use]
    pub fn deletes(&self) -> usize {
        self.tasks
            .iter()
            .filter(|t| matches!(t, Task::Delete { .. }))
            .count()
    }
}

/// Walk `tree` and plan the tasks of this cycle.
///
/// `output` is only queried for existence; nothing is modified.
#[must_use]
pub fn plan(
    tree: &Tree,
    cache: &ChangeCache,
    previous: &RenameIndex,
    output: &dyn OutputStore,
) -> BuildPlan {
    let mut planner = Planner {
        cache,
        previous,
        current: RenameIndex::from_tree(tree),
        output,
        expected: ExpectedPaths::from_tree(tree),
        tasks: Vec::new(),
        update: CacheUpdate::new(),
        deleted: HashSet::new(),
        skipped: 0,
    };

    for node in tree.iter() {
        match node.record.kind {
            NodeKind::Root => planner.update.touch(&node.record.namespace),
            NodeKind::Container => planner.container(node),
            NodeKind::Link => planner.static_file(node, &node.record.slug),
            NodeKind::UncreatedDoc => planner.static_file(node, ""),
            NodeKind::Doc | NodeKind::DraftDoc => planner.document(node),
            NodeKind::ContainerMeta => {}
        }
    }

    tracing::info!(
        tasks = planner.tasks.len(),
        skipped = planner.skipped,
        "planned build"
    );

    BuildPlan {
        tasks: planner.tasks,
        expected: planner.expected,
        cache_update: planner.update,
        rename_index: planner.current,
        skipped: planner.skipped,
    }
}

struct Planner<'a> {
    cache: &'a ChangeCache,
    previous: &'a RenameIndex,
    current: RenameIndex,
    output: &'a dyn OutputStore,
    expected: ExpectedPaths,
    tasks: Vec<Task>,
    update: CacheUpdate,
    deleted: HashSet<String>,
    skipped: usize,
}

impl Planner<'_> {
    fn container(&mut self, node: &TreeNode) {
        if !self.output.exists(&node.file_path) {
            self.tasks.push(Task::CreateDir {
                path: node.file_path.clone(),
            });
        }
    }

    fn static_file(&mut self, node: &TreeNode, content: &str) {
        let path = node.output_path();
        let key = CacheKey::new(&node.record.namespace, &node.record.identity);
        self.update.record(&key, content);

        if self
            .cache
            .should_render(&key, content, self.output.exists(&path))
        {
            self.tasks.push(Task::WriteFile {
                path,
                node: node.id,
                content: Content::Static(content.to_owned()),
                cache_key: Some(key),
            });
        } else {
            tracing::debug!(path = %path, "unchanged, skipping");
            self.skipped += 1;
        }
    }

    fn document(&mut self, node: &TreeNode) {
        let path = node.output_path();
        let doc_key = node.record.doc_key();
        let previous = self.previous;

        // Only the node a document is indexed at can have moved; later
        // listings of the same document are plain copies.
        let moved = if self.current.get(&doc_key) == Some(path.as_str()) {
            previous.detect_move(&doc_key, &path)
        } else {
            None
        };

        if let Some(old) = moved {
            tracing::info!(from = old, to = %path, "document moved");
            if self.expected.contains(old) {
                tracing::debug!(path = old, "old path is claimed by another node, not deleting");
            } else if self.deleted.insert(old.to_owned()) {
                self.tasks.push(Task::Delete {
                    path: old.to_owned(),
                    moved_to: Some(path.clone()),
                });
            }
        }

        let Some(doc) = &node.record.doc else {
            tracing::warn!(
                namespace = %node.record.namespace,
                slug = %node.record.slug,
                "no document summary, skipping render"
            );
            return;
        };

        let key = CacheKey::new(&node.record.namespace, doc.id.to_string());
        self.update.record(&key, &doc.tag);

        let render = moved.is_some()
            || self
                .cache
                .should_render(&key, &doc.tag, self.output.exists(&path));
        if render {
            self.tasks.push(Task::WriteFile {
                path,
                node: node.id,
                content: Content::Render,
                cache_key: Some(key),
            });
        } else {
            if self.cache.is_omitted(&key) {
                self.update.omit(&key);
            }
            tracing::debug!(path = %path, "unchanged, skipping");
            self.skipped += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::{BTreeMap, HashMap};

    use mirror_output::MockOutput;
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::change_cache::{OmittedSet, RevisionTable};
    use crate::tree::{ContainerRecords, DocRef, Record, TreeBuilder, TreeOptions};

    fn record(kind: NodeKind, identity: &str, parent: &str, title: &str, slug: &str) -> Record {
        Record {
            identity: identity.to_owned(),
            parent: (!parent.is_empty()).then(|| parent.to_owned()),
            kind,
            title: title.to_owned(),
            slug: slug.to_owned(),
            namespace: "ns".to_owned(),
            doc: None,
        }
    }

    fn doc(identity: &str, parent: &str, title: &str, id: u64, tag: &str) -> Record {
        Record {
            doc: Some(DocRef {
                id,
                tag: tag.to_owned(),
            }),
            ..record(NodeKind::Doc, identity, parent, title, identity)
        }
    }

    fn tree(entries: Vec<Record>) -> Tree {
        TreeBuilder::new(TreeOptions::default())
            .build(vec![ContainerRecords {
                root: record(NodeKind::Root, "ns", "", "C", "ns"),
                entries,
                unlisted: Vec::new(),
            }])
            .unwrap()
    }

    fn cache(entries: &[(&str, &str)]) -> ChangeCache {
        let table: RevisionTable = entries
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        ChangeCache::new(HashMap::from([("ns".to_owned(), table)]))
    }

    fn paths(plan: &BuildPlan) -> Vec<(&'static str, &str)> {
        plan.tasks.iter().map(|t| (t.label(), t.path())).collect()
    }

    #[test]
    fn test_expected_paths_include_ancestors() {
        let tree = tree(vec![
            doc("a", "", "A", 10, "t0"),
            doc("b", "a", "B", 11, "t0"),
            record(NodeKind::Container, "g", "", "G", ""),
        ]);

        let expected = ExpectedPaths::from_tree(&tree);

        assert_eq!(
            expected.files().iter().collect::<Vec<_>>(),
            vec!["C/A.md", "C/A/B.md"]
        );
        assert_eq!(
            expected.dirs().iter().collect::<Vec<_>>(),
            vec!["C", "C/A", "C/G"]
        );
    }

    #[test]
    fn test_plan_first_run_renders_everything() {
        let tree = tree(vec![
            doc("a", "", "A", 10, "t0"),
            doc("b", "a", "B", 11, "t0"),
        ]);

        let plan = plan(
            &tree,
            &ChangeCache::default(),
            &RenameIndex::default(),
            &MockOutput::new(),
        );

        assert_eq!(paths(&plan), vec![("render", "C/A.md"), ("render", "C/A/B.md")]);
        assert_eq!(plan.deletes(), 0);
        assert_eq!(
            plan.cache_update.get(&CacheKey::new("ns", "10")),
            Some("t0")
        );
    }

    #[test]
    fn test_plan_unchanged_existing_is_skipped() {
        let tree = tree(vec![doc("a", "", "A", 10, "t0")]);
        let output = MockOutput::new().with_file("C/A.md", "x");

        let plan = plan(
            &tree,
            &cache(&[("10", "t0")]),
            &RenameIndex::from_tree(&tree),
            &output,
        );

        assert!(plan.tasks.is_empty());
        assert_eq!(plan.skipped, 1);
    }

    #[test]
    fn test_plan_changed_tag_renders() {
        let tree = tree(vec![doc("a", "", "A", 10, "t1")]);
        let output = MockOutput::new().with_file("C/A.md", "x");

        let plan = plan(&tree, &cache(&[("10", "t0")]), &RenameIndex::default(), &output);

        assert_eq!(paths(&plan), vec![("render", "C/A.md")]);
    }

    #[test]
    fn test_plan_move_deletes_old_and_forces_render() {
        let tree = tree(vec![doc("a", "", "A", 10, "t0"), doc("b", "", "B", 11, "t0")]);
        let output = MockOutput::new()
            .with_file("C/A.md", "x")
            .with_file("C/A/B.md", "y");
        let previous = RenameIndex::new(BTreeMap::from([
            ("ns/a".to_owned(), "C/A.md".to_owned()),
            ("ns/b".to_owned(), "C/A/B.md".to_owned()),
        ]));

        let plan = plan(
            &tree,
            &cache(&[("10", "t0"), ("11", "t0")]),
            &previous,
            &output,
        );

        assert_eq!(paths(&plan), vec![("delete", "C/A/B.md"), ("render", "C/B.md")]);
        assert_eq!(
            plan.tasks[0],
            Task::Delete {
                path: "C/A/B.md".to_owned(),
                moved_to: Some("C/B.md".to_owned()),
            }
        );
        assert_eq!(plan.rename_index.get("ns/b"), Some("C/B.md"));
    }

    #[test]
    fn test_plan_move_onto_claimed_path_skips_delete() {
        let tree = tree(vec![doc("x", "", "A", 1, "t0"), doc("y", "", "B", 2, "t0")]);
        let output = MockOutput::new()
            .with_file("C/A.md", "x")
            .with_file("C/B.md", "y");
        let previous = RenameIndex::new(BTreeMap::from([
            ("ns/x".to_owned(), "C/B.md".to_owned()),
            ("ns/y".to_owned(), "C/A.md".to_owned()),
        ]));

        let plan = plan(&tree, &cache(&[("1", "t0"), ("2", "t0")]), &previous, &output);

        assert_eq!(paths(&plan), vec![("render", "C/A.md"), ("render", "C/B.md")]);
        assert_eq!(plan.deletes(), 0);
    }

    #[test]
    fn test_plan_duplicate_listing_is_not_a_move() {
        let mut again = doc("u2", "", "Again", 10, "t0");
        again.slug = "u1".to_owned();
        let tree = tree(vec![doc("u1", "", "A", 10, "t0"), again]);
        let output = MockOutput::new()
            .with_file("C/A.md", "x")
            .with_file("C/Again.md", "x");

        let plan = plan(
            &tree,
            &cache(&[("10", "t0")]),
            &RenameIndex::from_tree(&tree),
            &output,
        );

        assert!(plan.tasks.is_empty());
        assert_eq!(plan.rename_index.get("ns/u1"), Some("C/A.md"));
    }

    #[test]
    fn test_plan_omitted_document_stays_skipped() {
        let tree = tree(vec![doc("a", "", "A", 10, "t0")]);
        let cache = cache(&[("10", "t0")]).with_omitted(HashMap::from([(
            "ns".to_owned(),
            OmittedSet::from(["10".to_owned()]),
        )]));

        let plan = plan(&tree, &cache, &RenameIndex::from_tree(&tree), &MockOutput::new());

        assert!(plan.tasks.is_empty());
        assert!(plan.cache_update.is_omitted(&CacheKey::new("ns", "10")));
    }

    #[test]
    fn test_plan_static_nodes() {
        let tree = tree(vec![
            record(NodeKind::Link, "l", "", "Site", "https://example.com"),
            record(NodeKind::UncreatedDoc, "u", "", "Later", ""),
        ]);

        let plan = plan(
            &tree,
            &ChangeCache::default(),
            &RenameIndex::default(),
            &MockOutput::new(),
        );

        assert_eq!(
            plan.tasks,
            vec![
                Task::WriteFile {
                    path: "C/Site.md".to_owned(),
                    node: 1,
                    content: Content::Static("https://example.com".to_owned()),
                    cache_key: Some(CacheKey::new("ns", "l")),
                },
                Task::WriteFile {
                    path: "C/Later.md".to_owned(),
                    node: 2,
                    content: Content::Static(String::new()),
                    cache_key: Some(CacheKey::new("ns", "u")),
                },
            ]
        );
    }

    #[test]
    fn test_plan_static_nodes_unchanged() {
        let tree = tree(vec![record(
            NodeKind::Link,
            "l",
            "",
            "Site",
            "https://example.com",
        )]);
        let output = MockOutput::new().with_file("C/Site.md", "https://example.com");

        let plan = plan(
            &tree,
            &cache(&[("l", "https://example.com")]),
            &RenameIndex::default(),
            &output,
        );

        assert!(plan.tasks.is_empty());
    }

    #[test]
    fn test_plan_creates_missing_containers_only() {
        let tree = tree(vec![
            record(NodeKind::Container, "g", "", "G", ""),
            record(NodeKind::Container, "h", "", "H", ""),
        ]);
        let output = MockOutput::new().with_dir("C/G");

        let plan = plan(
            &tree,
            &ChangeCache::default(),
            &RenameIndex::default(),
            &output,
        );

        assert_eq!(paths(&plan), vec![("mkdir", "C/H")]);
    }

    #[test]
    fn test_plan_doc_without_summary_stays_expected() {
        let tree = tree(vec![record(NodeKind::Doc, "a", "", "A", "a")]);

        let plan = plan(
            &tree,
            &ChangeCache::default(),
            &RenameIndex::default(),
            &MockOutput::new(),
        );

        assert!(plan.tasks.is_empty());
        assert!(plan.expected.contains_file("C/A.md"));
    }

    #[test]
    fn test_plan_touches_every_namespace() {
        let tree = tree(Vec::new());

        let plan = plan(
            &tree,
            &ChangeCache::default(),
            &RenameIndex::default(),
            &MockOutput::new(),
        );

        assert!(plan.cache_update.tables().contains_key("ns"));
    }
}
