//! Error types for the build engine.

use std::path::PathBuf;

use mirror_output::OutputError;
use mirror_source::SourceError;

/// The source records cannot be turned into a tree.
///
/// Always fatal: raised before any task is scheduled and nothing is persisted.
#[derive(Debug, thiserror::Error)]
pub enum SourceReadError {
    /// Listing repositories or records failed.
    #[error("failed to read source records")]
    Source(#[from] SourceError),

    /// Parent pointers loop back on themselves.
    #[error("parent pointers of {namespace} form a cycle at {identity}")]
    Cycle {
        /// Repository namespace.
        namespace: String,
        /// Identity of an entry on the cycle.
        identity: String,
    },

    /// Root passthrough was requested with more than one repository.
    #[error("root passthrough needs exactly one repository, found {count}")]
    AmbiguousRoot {
        /// Number of repositories found.
        count: usize,
    },
}

/// Persisted change cache or rename index cannot be read or written.
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    /// State file could not be read.
    #[error("failed to read state file {}", .path.display())]
    Read {
        /// State file.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// State file is not valid JSON.
    #[error("corrupt state file {}", .path.display())]
    Parse {
        /// State file.
        path: PathBuf,
        /// Underlying parse error.
        #[source]
        source: serde_json::Error,
    },

    /// State file could not be replaced.
    #[error("failed to write state file {}", .path.display())]
    Write {
        /// State file.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// State could not be serialized.
    #[error("failed to serialize state")]
    Serialize(#[from] serde_json::Error),
}

/// Document rendering failed.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    /// The document body could not be fetched.
    #[error("failed to fetch document body")]
    Source(#[from] SourceError),

    /// The document payload could not be converted.
    #[error("cannot render {slug}: {message}")]
    Format {
        /// Document slug.
        slug: String,
        /// What went wrong.
        message: String,
    },
}

/// A single task failed. Isolated: other tasks keep running.
#[derive(Debug, thiserror::Error)]
pub enum TaskError {
    /// Filesystem operation failed.
    #[error(transparent)]
    Output(#[from] OutputError),

    /// Renderer failed.
    #[error(transparent)]
    Render(#[from] RenderError),
}

/// The output area cannot be enumerated during reconciliation.
#[derive(Debug, thiserror::Error)]
#[error("failed to scan output directory {path:?}")]
pub struct ReconcileError {
    /// Output-relative directory that failed ("" for the root).
    pub path: String,
    /// Underlying output error.
    #[source]
    pub source: OutputError,
}

/// Fatal error for a whole build cycle.
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    /// Source records unreadable or malformed.
    #[error(transparent)]
    Source(#[from] SourceReadError),

    /// Persisted state unreadable or not writable.
    #[error(transparent)]
    State(#[from] StateError),

    /// Clean mode could not empty the output area.
    #[error("failed to clean output directory")]
    Clean(#[source] OutputError),

    /// Clean mode could not enumerate the output area.
    #[error(transparent)]
    Scan(#[from] ReconcileError),

    /// The worker pool could not be created.
    #[error("failed to create worker pool")]
    Pool(#[from] rayon::ThreadPoolBuildError),
}
