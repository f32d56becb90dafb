//! Document tree assembly.
//!
//! Flat parent-pointer records from every repository are assembled into one
//! ordered, rooted tree with a unique `file_path` per node.
//!
//! # Architecture
//!
//! Nodes are stored in a flat `Vec<TreeNode>` with parent/children
//! relationships tracked by indices. Children keep source order, and node ids
//! follow pre-order traversal, which is also the order paths are assigned in.
//! A secondary index maps `namespace/slug` to document nodes for link
//! resolution.

use std::collections::{HashMap, HashSet};

use mirror_source::{DocSummary, RepoRecords, Repository, TocEntry, TocKind};

use crate::error::SourceReadError;
use crate::path::PathAssigner;

/// Index of a node in a [`Tree`].
pub type NodeId = usize;

/// Node type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    /// Repository root.
    Root,
    /// Folder-like heading; becomes a directory.
    Container,
    /// Listed document.
    Doc,
    /// Document not referenced by the table of contents.
    DraftDoc,
    /// Placeholder for a document that was never created.
    UncreatedDoc,
    /// External link.
    Link,
    /// Repository metadata entry; dropped before assembly.
    ContainerMeta,
}

impl NodeKind {
    /// Map a table-of-contents type. Unknown types have no node kind.
    #[must_use]
    pub fn from_toc(kind: TocKind) -> Option<Self> {
        match kind {
            TocKind::Title => Some(Self::Container),
            TocKind::Doc => Some(Self::Doc),
            TocKind::Link => Some(Self::Link),
            TocKind::UncreatedDoc => Some(Self::UncreatedDoc),
            TocKind::Meta => Some(Self::ContainerMeta),
            TocKind::Unknown => None,
        }
    }

    /// True for nodes written to `<file_path>.md`.
    #[must_use]
    pub fn writes_file(self) -> bool {
        matches!(
            self,
            Self::Doc | Self::DraftDoc | Self::UncreatedDoc | Self::Link
        )
    }

    /// True for nodes addressable by `namespace/slug`.
    #[must_use]
    pub fn is_document(self) -> bool {
        matches!(self, Self::Doc | Self::DraftDoc | Self::UncreatedDoc)
    }
}

/// Revision information of a document node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocRef {
    /// Numeric document id.
    pub id: u64,
    /// Revision tag for change detection.
    pub tag: String,
}

/// One source record, immutable once read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    /// Stable identity within the repository.
    pub identity: String,
    /// Parent identity; `None` attaches to the repository root.
    pub parent: Option<String>,
    /// Node type.
    pub kind: NodeKind,
    /// Display title.
    pub title: String,
    /// Document slug, or the target URL for links.
    pub slug: String,
    /// Repository namespace.
    pub namespace: String,
    /// Revision of the backing document, if known.
    pub doc: Option<DocRef>,
}

impl Record {
    /// Build a record from a table-of-contents entry.
    ///
    /// Returns `None` for entry types this engine does not handle.
    #[must_use]
    pub fn from_toc(entry: &TocEntry, namespace: &str) -> Option<Self> {
        Some(Self {
            identity: entry.uuid.clone(),
            parent: entry.parent().map(str::to_owned),
            kind: NodeKind::from_toc(entry.kind)?,
            title: entry.title.clone(),
            slug: entry.url().to_owned(),
            namespace: namespace.to_owned(),
            doc: None,
        })
    }

    /// Build an unlisted draft record from a document summary.
    #[must_use]
    pub fn draft(doc: &DocSummary, namespace: &str) -> Self {
        Self {
            identity: doc.id.to_string(),
            parent: None,
            kind: NodeKind::DraftDoc,
            title: doc.title.clone(),
            slug: doc.slug.clone(),
            namespace: namespace.to_owned(),
            doc: Some(DocRef {
                id: doc.id,
                tag: doc.revision_tag().to_owned(),
            }),
        }
    }

    /// Identity-index key (`namespace/slug`).
    #[must_use]
    pub fn doc_key(&self) -> String {
        format!("{}/{}", self.namespace, self.slug)
    }
}

/// Records of one repository, ready for assembly.
#[derive(Debug, Clone)]
pub struct ContainerRecords {
    /// Repository root record.
    pub root: Record,
    /// Listed entries in source order.
    pub entries: Vec<Record>,
    /// Documents not referenced by any listed entry.
    pub unlisted: Vec<Record>,
}

impl ContainerRecords {
    /// Convert one repository's source records.
    ///
    /// `root_title` overrides the repository name as the root directory name.
    /// Listed documents are matched to their summaries by slug; documents no
    /// listed entry refers to become unlisted drafts.
    #[must_use]
    pub fn from_source(repo: &Repository, records: &RepoRecords, root_title: Option<&str>) -> Self {
        let namespace = repo.namespace.as_str();
        let root = Record {
            identity: repo.namespace.clone(),
            parent: None,
            kind: NodeKind::Root,
            title: root_title.unwrap_or(&repo.name).to_owned(),
            slug: repo.namespace.clone(),
            namespace: namespace.to_owned(),
            doc: None,
        };

        let summaries: HashMap<&str, &DocSummary> = records
            .docs
            .iter()
            .map(|doc| (doc.slug.as_str(), doc))
            .collect();

        let mut entries = Vec::with_capacity(records.toc.len());
        for entry in &records.toc {
            let Some(mut record) = Record::from_toc(entry, namespace) else {
                tracing::warn!(namespace, uuid = %entry.uuid, "dropping entry of unknown type");
                continue;
            };
            if record.kind == NodeKind::Doc {
                record.doc = summaries.get(record.slug.as_str()).map(|doc| DocRef {
                    id: doc.id,
                    tag: doc.revision_tag().to_owned(),
                });
            }
            entries.push(record);
        }

        let listed: HashSet<&str> = records.toc.iter().map(TocEntry::url).collect();
        let unlisted = records
            .docs
            .iter()
            .filter(|doc| !listed.contains(doc.slug.as_str()))
            .map(|doc| Record::draft(doc, namespace))
            .collect();

        Self {
            root,
            entries,
            unlisted,
        }
    }
}

/// A record placed in the tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeNode {
    /// Node id within the tree.
    pub id: NodeId,
    /// Source record.
    pub record: Record,
    /// Unique relative path without extension ("" for a passthrough root).
    pub file_path: String,
}

impl TreeNode {
    /// Path of this node in the output area: `<file_path>.md` for file nodes,
    /// `file_path` for directories.
    #[must_use]
    pub fn output_path(&self) -> String {
        if self.record.kind.writes_file() {
            format!("{}.md", self.file_path)
        } else {
            self.file_path.clone()
        }
    }
}

/// Assembled document tree.
#[derive(Debug, Default)]
pub struct Tree {
    nodes: Vec<TreeNode>,
    children: Vec<Vec<NodeId>>,
    parents: Vec<Option<NodeId>>,
    roots: Vec<NodeId>,
    docs: HashMap<String, NodeId>,
}

impl Tree {
    /// Number of nodes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// True if the tree has no nodes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Get a node by id.
    #[must_use]
    pub fn node(&self, id: NodeId) -> Option<&TreeNode> {
        self.nodes.get(id)
    }

    /// Children of a node in source order.
    #[must_use]
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.children
            .get(id)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Parent of a node, `None` for roots.
    #[must_use]
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.parents.get(id).copied().flatten()
    }

    /// Repository roots in source order.
    #[must_use]
    pub fn roots(&self) -> &[NodeId] {
        &self.roots
    }

    /// All nodes in pre-order (parents before children, children in source
    /// order).
    pub fn iter(&self) -> impl Iterator<Item = &TreeNode> {
        self.nodes.iter()
    }

    /// Look up a document node by namespace and slug.
    #[must_use]
    pub fn lookup(&self, namespace: &str, slug: &str) -> Option<&TreeNode> {
        self.docs
            .get(&format!("{namespace}/{slug}"))
            .map(|&id| &self.nodes[id])
    }
}

/// Tree assembly options.
#[derive(Debug, Clone)]
pub struct TreeOptions {
    /// Keep unlisted documents under a synthetic container.
    pub keep_drafts: bool,
    /// Map the single root to the output root.
    pub root_passthrough: bool,
    /// Title of the synthetic container holding unlisted documents.
    pub uncategorized_title: String,
}

impl Default for TreeOptions {
    fn default() -> Self {
        Self {
            keep_drafts: false,
            root_passthrough: false,
            uncategorized_title: "_Uncategorized".to_owned(),
        }
    }
}

/// Builds a [`Tree`] from per-repository records.
pub struct TreeBuilder {
    options: TreeOptions,
    paths: PathAssigner,
    tree: Tree,
}

impl TreeBuilder {
    /// Create a builder.
    #[must_use]
    pub fn new(options: TreeOptions) -> Self {
        let paths = PathAssigner::new(options.root_passthrough);
        Self {
            options,
            paths,
            tree: Tree::default(),
        }
    }

    /// Assemble all repositories into one tree.
    ///
    /// # Errors
    ///
    /// Returns [`SourceReadError::Cycle`] if parent pointers loop, or
    /// [`SourceReadError::AmbiguousRoot`] for root passthrough with more than
    /// one repository.
    pub fn build(mut self, containers: Vec<ContainerRecords>) -> Result<Tree, SourceReadError> {
        if self.options.root_passthrough && containers.len() > 1 {
            return Err(SourceReadError::AmbiguousRoot {
                count: containers.len(),
            });
        }

        for container in containers {
            self.add_container(container)?;
        }

        tracing::debug!(nodes = self.tree.len(), "assembled tree");
        Ok(self.tree)
    }

    fn add_container(&mut self, container: ContainerRecords) -> Result<(), SourceReadError> {
        let ContainerRecords {
            root,
            entries,
            unlisted,
        } = container;
        let namespace = root.namespace.clone();
        let root_identity = root.identity.clone();
        let root_id = self.add_node(root, None);

        let entries = dedup_entries(entries, &namespace);
        let children = attach_order(&entries, &root_identity, &namespace)?;

        // Explicit stack; children pushed reversed so they pop in source order.
        let mut stack: Vec<(usize, NodeId)> = children
            .get(&root_identity)
            .into_iter()
            .flatten()
            .rev()
            .map(|&entry| (entry, root_id))
            .collect();
        let mut entries: Vec<Option<Record>> = entries.into_iter().map(Some).collect();

        while let Some((entry, parent_id)) = stack.pop() {
            let Some(record) = entries[entry].take() else {
                continue;
            };
            let identity = record.identity.clone();
            let node_id = self.add_node(record, Some(parent_id));
            if let Some(grandchildren) = children.get(&identity) {
                stack.extend(grandchildren.iter().rev().map(|&c| (c, node_id)));
            }
        }

        if self.options.keep_drafts && !unlisted.is_empty() {
            let bucket = Record {
                identity: format!("{root_identity}_uncategorized"),
                parent: Some(root_identity),
                kind: NodeKind::Container,
                title: self.options.uncategorized_title.clone(),
                slug: String::new(),
                namespace: namespace.clone(),
                doc: None,
            };
            let bucket_id = self.add_node(bucket, Some(root_id));
            for draft in unlisted {
                self.add_node(draft, Some(bucket_id));
            }
        } else if !unlisted.is_empty() {
            tracing::debug!(
                namespace = %namespace,
                count = unlisted.len(),
                "omitting unlisted documents"
            );
        }

        Ok(())
    }

    fn add_node(&mut self, record: Record, parent: Option<NodeId>) -> NodeId {
        let id = self.tree.nodes.len();
        let file_path = match parent {
            Some(parent_id) => {
                let parent = &self.tree.nodes[parent_id];
                self.paths.assign(
                    &parent.file_path,
                    &parent.record.identity,
                    record.kind,
                    &record.title,
                )
            }
            None => self.paths.assign("", "", record.kind, &record.title),
        };

        if record.kind.is_document() {
            self.tree.docs.entry(record.doc_key()).or_insert(id);
        }

        self.tree.nodes.push(TreeNode {
            id,
            record,
            file_path,
        });
        self.tree.children.push(Vec::new());
        self.tree.parents.push(parent);
        match parent {
            Some(parent_id) => self.tree.children[parent_id].push(id),
            None => self.tree.roots.push(id),
        }
        id
    }
}

/// Drop metadata entries and duplicate identities (first wins).
fn dedup_entries(entries: Vec<Record>, namespace: &str) -> Vec<Record> {
    let mut seen = HashSet::new();
    entries
        .into_iter()
        .filter(|record| record.kind != NodeKind::ContainerMeta)
        .filter(|record| {
            let fresh = seen.insert(record.identity.clone());
            if !fresh {
                tracing::warn!(namespace, identity = %record.identity, "dropping duplicate entry");
            }
            fresh
        })
        .collect()
}

/// Group entries by parent identity, keeping only entries reachable from the
/// root.
///
/// Unreachable entries whose parent chain loops are a cycle error; those whose
/// chain ends at an unknown parent are dropped with a warning.
fn attach_order(
    entries: &[Record],
    root_identity: &str,
    namespace: &str,
) -> Result<HashMap<String, Vec<usize>>, SourceReadError> {
    let parent_of = |record: &Record| -> String {
        record
            .parent
            .clone()
            .unwrap_or_else(|| root_identity.to_owned())
    };

    let mut children: HashMap<String, Vec<usize>> = HashMap::new();
    for (i, record) in entries.iter().enumerate() {
        children.entry(parent_of(record)).or_default().push(i);
    }

    let mut reachable = vec![false; entries.len()];
    let mut pending: Vec<&str> = vec![root_identity];
    while let Some(identity) = pending.pop() {
        for &child in children.get(identity).into_iter().flatten() {
            if !reachable[child] {
                reachable[child] = true;
                pending.push(&entries[child].identity);
            }
        }
    }

    let index: HashMap<&str, usize> = entries
        .iter()
        .enumerate()
        .map(|(i, r)| (r.identity.as_str(), i))
        .collect();

    for start in (0..entries.len()).filter(|&i| !reachable[i]) {
        let mut visited = HashSet::new();
        let mut current = start;
        loop {
            if !visited.insert(current) {
                return Err(SourceReadError::Cycle {
                    namespace: namespace.to_owned(),
                    identity: entries[current].identity.clone(),
                });
            }
            let parent = parent_of(&entries[current]);
            match index.get(parent.as_str()) {
                Some(&next) => current = next,
                None => {
                    tracing::warn!(
                        namespace,
                        identity = %entries[start].identity,
                        parent = %parent,
                        "dropping entry with unknown parent"
                    );
                    break;
                }
            }
        }
    }

    for list in children.values_mut() {
        list.retain(|&i| reachable[i]);
    }
    Ok(children)
}
