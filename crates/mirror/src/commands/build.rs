//! `mirror build` command implementation.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Args;
use mirror_config::{CliSettings, Config};
use mirror_output::{FsOutput, OutputStore};
use mirror_render::MarkdownRenderer;
use mirror_source::{ContentSource, MetaDirSource};
use mirror_sync::{BuildConfig, BuildReport, DryRun, MirrorBuilder, StateStore};

use crate::error::CliError;
use crate::output::Output;

/// Arguments for the build command.
#[derive(Args)]
pub(crate) struct BuildArgs {
    /// Output directory (overrides config; metadata is read from <DIR>/.meta).
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Root directory name for the repository; "." writes into the output root.
    #[arg(long)]
    repo: Option<String>,

    /// Empty the output directory (except .meta and assets) before building.
    #[arg(long)]
    clean: bool,

    /// Keep documents that are not listed in the table of contents.
    #[arg(long)]
    keep_drafts: bool,

    /// Number of concurrent tasks (overrides config).
    #[arg(short = 'c', long)]
    concurrency: Option<usize>,

    /// URL of the hosted service (overrides config).
    #[arg(long)]
    host: Option<String>,

    /// Path to configuration file (default: auto-discover mirror.toml).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Show what would change without writing anything.
    #[arg(long)]
    dry_run: bool,

    /// Exit with an error if any task fails.
    #[arg(long)]
    strict: bool,

    /// Enable verbose output.
    #[arg(short, long)]
    pub(crate) verbose: bool,
}

impl BuildArgs {
    /// Execute the build command.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid, the build aborts,
    /// reconciliation fails, or (with `--strict`) any task fails.
    pub(crate) fn execute(self) -> Result<(), CliError> {
        let output = Output::new();

        let cli_settings = CliSettings {
            host: self.host.clone(),
            output_dir: self.output_dir.clone(),
            repo_dir: self.repo.clone(),
            clean: self.clean.then_some(true),
            keep_drafts: self.keep_drafts.then_some(true),
            concurrency: self.concurrency,
        };
        let config = Config::load(self.config.as_deref(), Some(&cli_settings))?;

        let out_dir = &config.output_resolved.dir;
        let meta_dir = config.output_resolved.meta_dir();
        output.info(&format!("Output: {}", out_dir.display()));

        let source: Arc<dyn ContentSource> = Arc::new(MetaDirSource::new(meta_dir.clone()));
        let store: Arc<dyn OutputStore> = Arc::new(FsOutput::new(out_dir.clone()));
        let renderer = Arc::new(MarkdownRenderer::new(
            Arc::clone(&source),
            &config.source.host,
        ));

        let build_config = BuildConfig {
            concurrency: config.build.concurrency,
            keep_drafts: config.build.keep_drafts,
            repo_dir: config.output_resolved.repo_dir.clone(),
            uncategorized_title: config.build.uncategorized_title.clone(),
            clean: config.output_resolved.clean,
        };
        let builder = MirrorBuilder::new(
            source,
            store,
            renderer,
            StateStore::new(meta_dir),
            build_config,
        );

        if self.dry_run {
            if config.output_resolved.clean {
                output.warning("--clean is ignored in dry-run mode");
            }
            let dry = builder.dry_run()?;
            print_dry_run(&output, &dry);
            return Ok(());
        }

        let report = builder.run()?;
        print_report(&output, &report);
        check_report(report, self.strict)
    }
}

fn print_dry_run(output: &Output, dry: &DryRun) {
    output.heading("Dry run - no changes will be made");

    for task in &dry.plan.tasks {
        output.action(task.label(), task.path());
    }
    for orphan in &dry.orphans {
        output.action(if orphan.is_dir { "rmdir" } else { "remove" }, &orphan.path);
    }

    output.info(&format!(
        "\n{} write(s), {} move delete(s), {} orphan(s), {} unchanged",
        dry.plan.writes(),
        dry.plan.deletes(),
        dry.orphans.len(),
        dry.plan.skipped
    ));
}

fn print_report(output: &Output, report: &BuildReport) {
    for failure in &report.failures {
        output.warning(&format!("Failed: {}: {}", failure.path, failure.error));
    }

    let summary = format!(
        "{} created, {} updated, {} deleted, {} skipped, {} failed",
        report.created,
        report.updated,
        report.deleted,
        report.skipped,
        report.failures.len()
    );
    output.summary(
        &summary,
        report.failures.is_empty() && report.reconcile_error.is_none(),
    );
}

/// Turn a finished build into the command result.
///
/// Reconciliation failures are always errors; task failures only with
/// `strict`.
fn check_report(report: BuildReport, strict: bool) -> Result<(), CliError> {
    if let Some(err) = report.reconcile_error {
        return Err(err.into());
    }
    if strict && !report.failures.is_empty() {
        return Err(CliError::TasksFailed {
            count: report.failures.len(),
        });
    }
    Ok(())
}
