//! CLI error types.

use mirror_config::ConfigError;
use mirror_sync::{BuildError, ReconcileError};

/// CLI error type.
#[derive(Debug, thiserror::Error)]
pub(crate) enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Build(#[from] BuildError),

    #[error("output reconciliation failed, build state was not saved")]
    Reconcile(#[from] ReconcileError),

    #[error("{count} task(s) failed")]
    TasksFailed { count: usize },
}
