//! Incremental mirroring engine.
//!
//! This crate turns the repositories of a [`ContentSource`] into a directory
//! tree of Markdown files in an [`OutputStore`], touching only what changed
//! since the previous cycle:
//! - [`TreeBuilder`]: flat records to an ordered tree with unique paths
//! - [`plan`]: tree plus previous state to a list of [`Task`]s
//! - [`Scheduler`]: runs tasks on a bounded worker pool
//! - [`reconcile`]: removes everything the tree no longer accounts for
//! - [`StateStore`]: persists the change cache and the rename index
//!
//! [`MirrorBuilder`] drives one full cycle.
//!
//! # Quick Start
//!
//! ```no_run
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use std::path::PathBuf;
//! use std::sync::Arc;
//! use mirror_output::FsOutput;
//! use mirror_source::MetaDirSource;
//! use mirror_sync::{BuildConfig, MirrorBuilder, Rendered, Renderer, RenderError, StateStore, Tree, TreeNode};
//!
//! struct TitleOnly;
//!
//! impl Renderer for TitleOnly {
//!     fn render(&self, node: &TreeNode, _tree: &Tree) -> Result<Rendered, RenderError> {
//!         Ok(Rendered::Content(format!("# {}\n", node.record.title)))
//!     }
//! }
//!
//! let output = PathBuf::from("docs");
//! let builder = MirrorBuilder::new(
//!     Arc::new(MetaDirSource::new(output.join(".meta"))),
//!     Arc::new(FsOutput::new(output.clone())),
//!     Arc::new(TitleOnly),
//!     StateStore::new(output.join(".meta")),
//!     BuildConfig::default(),
//! );
//! let report = builder.run()?;
//! println!("{} created", report.created);
//! # Ok(())
//! # }
//! ```
//!
//! [`ContentSource`]: mirror_source::ContentSource
//! [`OutputStore`]: mirror_output::OutputStore

mod builder;
mod change_cache;
mod error;
mod path;
mod plan;
mod reconcile;
mod render;
mod rename_index;
mod scheduler;
mod state;
mod tree;

pub use builder::{BuildConfig, BuildReport, DryRun, MirrorBuilder, ROOT_PASSTHROUGH};
pub use change_cache::{CacheKey, CacheUpdate, ChangeCache, OmittedSet, RevisionTable};
pub use error::{
    BuildError, ReconcileError, RenderError, SourceReadError, StateError, TaskError,
};
pub use path::{PathAssigner, RESERVED_NAMES, sanitize_title};
pub use plan::{BuildPlan, Content, ExpectedPaths, Task, plan};
pub use reconcile::{Orphan, ReconcileReport, find_orphans, reconcile};
pub use render::{Rendered, Renderer};
pub use rename_index::RenameIndex;
pub use scheduler::{HeldDelete, Outcome, ScheduleReport, Scheduler, TaskFailure};
pub use state::StateStore;
pub use tree::{
    ContainerRecords, DocRef, NodeId, NodeKind, Record, Tree, TreeBuilder, TreeNode, TreeOptions,
};
