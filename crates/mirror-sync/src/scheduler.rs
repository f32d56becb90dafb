//! Bounded-concurrency task runner.
//!
//! Tasks run on a dedicated rayon pool sized by configuration. A failing task
//! never stops the others: every outcome is collected and partitioned into
//! successes and failures once the pool drains.
//!
//! Deletes of moved documents run in a second round, after every write. A
//! delete whose new path failed to write is held back, so the document keeps
//! its old output.

use std::collections::HashSet;

use rayon::prelude::*;

use mirror_output::OutputStore;

use crate::change_cache::CacheKey;
use crate::error::{BuildError, TaskError};
use crate::plan::{Content, Task};
use crate::render::{Rendered, Renderer};
use crate::tree::Tree;

/// What a successful task did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Created a directory or a new file.
    Created,
    /// Replaced an existing file.
    Updated,
    /// Removed a stale path.
    Deleted,
    /// The renderer produced nothing; `removed` is true if a file written by
    /// an earlier cycle was deleted.
    Omitted {
        /// An existing file was removed.
        removed: bool,
    },
    /// Completed without touching the output.
    Skipped,
}

/// A task that failed.
#[derive(Debug)]
pub struct TaskFailure {
    /// Output path of the task.
    pub path: String,
    /// Cache entry to revert.
    pub cache_key: Option<CacheKey>,
    /// What went wrong.
    pub error: TaskError,
}

/// A move delete that was not run because the write at the new path failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeldDelete {
    /// Old path, left in place.
    pub path: String,
    /// New path whose write failed.
    pub moved_to: String,
}

/// Aggregated result of one scheduler run.
#[derive(Debug, Default)]
pub struct ScheduleReport {
    /// Directories and files created.
    pub created: usize,
    /// Files replaced.
    pub updated: usize,
    /// Stale paths removed.
    pub deleted: usize,
    /// Tasks that completed without writing.
    pub skipped: usize,
    /// Cache keys whose render produced no output.
    pub omitted: Vec<CacheKey>,
    /// Move deletes held back by a failed write.
    pub held: Vec<HeldDelete>,
    /// Failed tasks.
    pub failures: Vec<TaskFailure>,
}

impl ScheduleReport {
    fn count(&mut self, done: Done) {
        match done.outcome {
            Outcome::Created => self.created += 1,
            Outcome::Updated => self.updated += 1,
            Outcome::Deleted => self.deleted += 1,
            Outcome::Omitted { removed } => {
                if removed {
                    self.deleted += 1;
                } else {
                    self.skipped += 1;
                }
                self.omitted.extend(done.cache_key);
            }
            Outcome::Skipped => self.skipped += 1,
        }
    }
}

/// A finished task.
struct Done {
    outcome: Outcome,
    cache_key: Option<CacheKey>,
}

/// Runs build tasks on a bounded worker pool.
#[derive(Debug, Clone, Copy)]
pub struct Scheduler {
    concurrency: usize,
}

impl Scheduler {
    /// Create a scheduler with `concurrency` workers (at least one).
    #[must_use]
    pub fn new(concurrency: usize) -> Self {
        Self {
            concurrency: concurrency.max(1),
        }
    }

    /// Run all tasks and wait for them to finish.
    ///
    /// # Errors
    ///
    /// Returns [`BuildError::Pool`] if the worker pool cannot be created.
    /// Individual task failures are reported in [`ScheduleReport::failures`].
    pub fn run(
        &self,
        tasks: &[Task],
        tree: &Tree,
        output: &dyn OutputStore,
        renderer: &dyn Renderer,
    ) -> Result<ScheduleReport, BuildError> {
        if tasks.is_empty() {
            return Ok(ScheduleReport::default());
        }

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.concurrency)
            .build()?;
        let run_all = |batch: &[&Task]| -> Vec<Result<Done, TaskFailure>> {
            pool.install(|| {
                batch
                    .par_iter()
                    .map(|task| run_one(task, tree, output, renderer))
                    .collect()
            })
        };

        let (deletes, writes): (Vec<&Task>, Vec<&Task>) = tasks
            .iter()
            .partition(|task| matches!(task, Task::Delete { .. }));
        let mut results = run_all(&writes);

        let failed: HashSet<String> = results
            .iter()
            .filter_map(|result| result.as_ref().err())
            .map(|failure| failure.path.clone())
            .collect();
        let (deletes, held) = hold_back(deletes, &failed);

        results.extend(run_all(&deletes));

        let mut report = partition_results(results);
        report.held = held;
        Ok(report)
    }
}

fn run_one(
    task: &Task,
    tree: &Tree,
    output: &dyn OutputStore,
    renderer: &dyn Renderer,
) -> Result<Done, TaskFailure> {
    let cache_key = match task {
        Task::WriteFile { cache_key, .. } => cache_key.clone(),
        _ => None,
    };
    match execute(task, tree, output, renderer) {
        Ok(outcome) => Ok(Done { outcome, cache_key }),
        Err(error) => {
            tracing::warn!(path = task.path(), error = %error, "task failed");
            Err(TaskFailure {
                path: task.path().to_owned(),
                cache_key,
                error,
            })
        }
    }
}

/// Drop the move deletes whose new path failed to write.
fn hold_back<'a>(
    deletes: Vec<&'a Task>,
    failed: &HashSet<String>,
) -> (Vec<&'a Task>, Vec<HeldDelete>) {
    let mut held = Vec::new();
    let deletes = deletes
        .into_iter()
        .filter(|task| match task {
            Task::Delete {
                path,
                moved_to: Some(new),
            } if failed.contains(new) => {
                tracing::warn!(path = %path, moved_to = %new, "move failed, keeping old path");
                held.push(HeldDelete {
                    path: path.clone(),
                    moved_to: new.clone(),
                });
                false
            }
            _ => true,
        })
        .collect();
    (deletes, held)
}

fn execute(
    task: &Task,
    tree: &Tree,
    output: &dyn OutputStore,
    renderer: &dyn Renderer,
) -> Result<Outcome, TaskError> {
    match task {
        Task::CreateDir { path } => {
            output.create_dir(path)?;
            tracing::info!(path = %path, "created directory");
            Ok(Outcome::Created)
        }
        Task::Delete { path, .. } => Ok(if remove_stale(output, path)? {
            Outcome::Deleted
        } else {
            Outcome::Skipped
        }),
        Task::WriteFile {
            path,
            node,
            content,
            ..
        } => {
            let text = match content {
                Content::Static(text) => text.clone(),
                Content::Render => {
                    let Some(node) = tree.node(*node) else {
                        return Ok(Outcome::Skipped);
                    };
                    match renderer.render(node, tree)? {
                        Rendered::Content(text) => text,
                        Rendered::Skip => {
                            let removed = remove_stale(output, path)?;
                            tracing::debug!(path = %path, removed, "renderer skipped document");
                            return Ok(Outcome::Omitted { removed });
                        }
                    }
                }
            };

            let existed = output.exists(path);
            output.write_file(path, text.as_bytes())?;
            tracing::info!(path = %path, "wrote document");
            Ok(if existed {
                Outcome::Updated
            } else {
                Outcome::Created
            })
        }
    }
}

/// Delete a file if present. Returns true if something was removed.
fn remove_stale(output: &dyn OutputStore, path: &str) -> Result<bool, TaskError> {
    match output.delete(path) {
        Ok(()) => {
            tracing::info!(path = %path, "removed stale output");
            Ok(true)
        }
        Err(e) if e.is_not_found() => Ok(false),
        Err(e) => Err(e.into()),
    }
}

/// Partition results into counts and failures.
fn partition_results(results: Vec<Result<Done, TaskFailure>>) -> ScheduleReport {
    let mut report = ScheduleReport::default();
    for result in results {
        match result {
            Ok(done) => report.count(done),
            Err(failure) => report.failures.push(failure),
        }
    }
    report
}
