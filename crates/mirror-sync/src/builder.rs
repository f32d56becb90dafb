//! Build cycle orchestration.
//!
//! One cycle: read source records, assemble the tree, plan tasks against the
//! previous state, run them, reconcile the output area and finally commit the
//! new state. State is committed only when every phase up to reconciliation
//! succeeded; isolated task failures revert their own cache entries so the
//! next cycle retries them.

use std::sync::Arc;

use mirror_output::{OutputError, OutputStore, join_path};
use mirror_source::ContentSource;

use crate::change_cache::ChangeCache;
use crate::error::{BuildError, ReconcileError, SourceReadError};
use crate::path::RESERVED_NAMES;
use crate::plan::{BuildPlan, plan};
use crate::reconcile::{Orphan, find_orphans, reconcile};
use crate::render::Renderer;
use crate::scheduler::{Scheduler, TaskFailure};
use crate::state::StateStore;
use crate::tree::{ContainerRecords, Tree, TreeBuilder, TreeOptions};

/// Repository directory value that maps the root to the output root.
pub const ROOT_PASSTHROUGH: &str = ".";

/// Build cycle configuration.
#[derive(Debug, Clone)]
pub struct BuildConfig {
    /// Worker pool size.
    pub concurrency: usize,
    /// Keep unlisted documents under the uncategorized container.
    pub keep_drafts: bool,
    /// Root directory name override; [`ROOT_PASSTHROUGH`] writes straight
    /// into the output root.
    pub repo_dir: Option<String>,
    /// Title of the container holding unlisted documents.
    pub uncategorized_title: String,
    /// Empty the output area (except reserved areas) before building.
    pub clean: bool,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            concurrency: 10,
            keep_drafts: false,
            repo_dir: None,
            uncategorized_title: TreeOptions::default().uncategorized_title,
            clean: false,
        }
    }
}

/// Summary of one build cycle.
#[derive(Debug, Default)]
pub struct BuildReport {
    /// Repositories mirrored.
    pub repositories: usize,
    /// Tasks scheduled.
    pub scheduled: usize,
    /// Directories and files created.
    pub created: usize,
    /// Files replaced.
    pub updated: usize,
    /// Moved documents and orphans removed.
    pub deleted: usize,
    /// File nodes left untouched (unchanged or skipped by the renderer).
    pub skipped: usize,
    /// Isolated task and removal failures.
    pub failures: Vec<TaskFailure>,
    /// Reconciliation could not scan the output area.
    pub reconcile_error: Option<ReconcileError>,
    /// True if the new state was persisted.
    pub committed: bool,
}

/// Result of a dry run: the plan and the orphans reconciliation would remove.
#[derive(Debug, Default)]
pub struct DryRun {
    /// Planned tasks and expected paths.
    pub plan: BuildPlan,
    /// Orphans in the current output area.
    pub orphans: Vec<Orphan>,
}

/// Everything planned for a cycle.
struct Prepared {
    tree: Tree,
    cache: ChangeCache,
    plan: BuildPlan,
}

/// Mirrors a content source into an output store.
pub struct MirrorBuilder {
    source: Arc<dyn ContentSource>,
    output: Arc<dyn OutputStore>,
    renderer: Arc<dyn Renderer>,
    state: StateStore,
    config: BuildConfig,
}

impl MirrorBuilder {
    /// Create a builder.
    ///
    /// # Arguments
    ///
    /// * `source` - Where repositories and documents are read from
    /// * `output` - The output area
    /// * `renderer` - Converts document nodes into text
    /// * `state` - Persisted change cache and rename index
    /// * `config` - Build configuration
    #[must_use]
    pub fn new(
        source: Arc<dyn ContentSource>,
        output: Arc<dyn OutputStore>,
        renderer: Arc<dyn Renderer>,
        state: StateStore,
        config: BuildConfig,
    ) -> Self {
        Self {
            source,
            output,
            renderer,
            state,
            config,
        }
    }

    /// Read every repository and assemble the tree.
    ///
    /// # Errors
    ///
    /// Returns [`SourceReadError`] if the source cannot be read or its
    /// records cannot form a tree.
    pub fn load_tree(&self) -> Result<Tree, SourceReadError> {
        let repos = self.source.list_repos()?;

        let (root_title, root_passthrough) = match self.config.repo_dir.as_deref() {
            Some(ROOT_PASSTHROUGH) => (None, true),
            other => (other, false),
        };

        let mut containers = Vec::with_capacity(repos.len());
        for repo in &repos {
            let records = self.source.list_records(&repo.namespace)?;
            tracing::debug!(
                namespace = %repo.namespace,
                entries = records.toc.len(),
                docs = records.docs.len(),
                "read repository records"
            );
            containers.push(ContainerRecords::from_source(repo, &records, root_title));
        }

        let options = TreeOptions {
            keep_drafts: self.config.keep_drafts,
            root_passthrough,
            uncategorized_title: self.config.uncategorized_title.clone(),
        };
        TreeBuilder::new(options).build(containers)
    }

    /// Read the tree, or `None` if the source has no repositories.
    fn load_nonempty_tree(&self) -> Result<Option<Tree>, SourceReadError> {
        let tree = self.load_tree()?;
        if tree.roots().is_empty() {
            tracing::warn!("no repositories found, nothing to build");
            return Ok(None);
        }
        Ok(Some(tree))
    }

    /// Load state and plan the cycle against the current output area.
    fn prepare(&self, tree: Tree) -> Result<Prepared, BuildError> {
        let namespaces: Vec<&str> = tree
            .roots()
            .iter()
            .filter_map(|&id| tree.node(id))
            .map(|node| node.record.namespace.as_str())
            .collect();
        let cache = self.state.load_change_cache(&namespaces)?;
        let previous = self.state.load_rename_index()?;

        let plan = plan(&tree, &cache, &previous, self.output.as_ref());
        Ok(Prepared { tree, cache, plan })
    }

    /// Plan the cycle without touching the output area or the state.
    ///
    /// # Errors
    ///
    /// Returns [`BuildError`] if the source, the state or the output area
    /// cannot be read.
    pub fn dry_run(&self) -> Result<DryRun, BuildError> {
        let Some(tree) = self.load_nonempty_tree()? else {
            return Ok(DryRun::default());
        };
        let prepared = self.prepare(tree)?;
        let orphans = find_orphans(self.output.as_ref(), &prepared.plan.expected)?;
        Ok(DryRun {
            plan: prepared.plan,
            orphans,
        })
    }

    /// Run one full build cycle.
    ///
    /// A reconciliation failure is reported in
    /// [`BuildReport::reconcile_error`]; task results are kept but the state
    /// is not committed.
    ///
    /// # Errors
    ///
    /// Returns [`BuildError`] for failures that abort the cycle before or
    /// after the tasks ran.
    pub fn run(&self) -> Result<BuildReport, BuildError> {
        tracing::info!("starting build");

        let Some(tree) = self.load_nonempty_tree()? else {
            return Ok(BuildReport::default());
        };

        // The source is fully read before anything is removed; planning then
        // sees the cleaned output area.
        if self.config.clean {
            self.clean()?;
        }

        let Prepared {
            tree,
            cache,
            mut plan,
        } = self.prepare(tree)?;

        let scheduled = Scheduler::new(self.config.concurrency).run(
            &plan.tasks,
            &tree,
            self.output.as_ref(),
            self.renderer.as_ref(),
        )?;

        for key in &scheduled.omitted {
            plan.cache_update.omit(key);
        }
        for failure in &scheduled.failures {
            if let Some(key) = &failure.cache_key {
                plan.cache_update.revert(&cache, key);
            }
        }
        // A moved document whose new output failed keeps its old file until
        // a later cycle completes the move.
        for held in &scheduled.held {
            plan.expected.add_file(&held.path);
            plan.rename_index.revert_move(&held.moved_to, &held.path);
        }

        let mut report = BuildReport {
            repositories: tree.roots().len(),
            scheduled: plan.tasks.len(),
            created: scheduled.created,
            updated: scheduled.updated,
            deleted: scheduled.deleted,
            skipped: scheduled.skipped + plan.skipped,
            failures: scheduled.failures,
            reconcile_error: None,
            committed: false,
        };

        match reconcile(self.output.as_ref(), &plan.expected) {
            Ok(reconciled) => {
                report.deleted += reconciled.deleted();
                report.failures.extend(reconciled.failures);
            }
            Err(e) => {
                tracing::error!(error = %e, "reconciliation failed, state not committed");
                report.reconcile_error = Some(e);
                return Ok(report);
            }
        }

        self.state.commit(&plan.cache_update, &plan.rename_index)?;
        report.committed = true;

        tracing::info!(
            created = report.created,
            updated = report.updated,
            deleted = report.deleted,
            skipped = report.skipped,
            failed = report.failures.len(),
            "build completed"
        );
        Ok(report)
    }

    /// Remove everything in the output area except the reserved areas.
    fn clean(&self) -> Result<(), BuildError> {
        let output = self.output.as_ref();
        let entries = match output.list_dir("") {
            Ok(entries) => entries,
            Err(e) if e.is_not_found() => return Ok(()),
            Err(e) => return Err(BuildError::Clean(e)),
        };

        for entry in entries {
            if RESERVED_NAMES.contains(&entry.name.as_str()) {
                continue;
            }
            remove_tree(output, &entry.name, entry.is_dir).map_err(BuildError::Clean)?;
            tracing::info!(path = %entry.name, "cleaned");
        }
        Ok(())
    }
}

/// Remove a file, or a directory and everything below it.
fn remove_tree(output: &dyn OutputStore, path: &str, is_dir: bool) -> Result<(), OutputError> {
    if is_dir {
        for child in output.list_dir(path)? {
            remove_tree(output, &join_path(path, &child.name), child.is_dir)?;
        }
    }
    output.delete(path)
}
