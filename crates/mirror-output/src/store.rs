//! Output store trait and error types.
//!
//! Provides the [`OutputStore`] trait used by the build engine for every
//! physical operation on the output area, along with [`OutputError`] for
//! unified error handling across backends.

use std::path::PathBuf;

/// A directory entry returned by [`OutputStore::list_dir`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Entry {
    /// Entry name (a single path segment).
    pub name: String,
    /// True if the entry is a directory.
    pub is_dir: bool,
}

impl Entry {
    /// Create a file entry.
    #[must_use]
    pub fn file(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            is_dir: false,
        }
    }

    /// Create a directory entry.
    #[must_use]
    pub fn dir(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            is_dir: true,
        }
    }
}

/// Semantic error categories.
#[derive(Debug, PartialEq, Eq)]
#[non_exhaustive]
pub enum OutputErrorKind {
    /// Path does not exist.
    NotFound,
    /// Permission denied.
    PermissionDenied,
    /// A directory could not be removed because it still has entries.
    NotEmpty,
    /// Path escapes the output root or is otherwise malformed.
    InvalidPath,
    /// Other/unknown error category.
    Other,
}

/// Output error with semantic kind and backend-specific source.
#[derive(Debug)]
pub struct OutputError {
    /// Semantic error category.
    pub kind: OutputErrorKind,
    /// Path context (if applicable).
    pub path: Option<PathBuf>,
    /// Backend identifier (e.g., "Fs", "Mock").
    pub backend: Option<&'static str>,
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl OutputError {
    /// Create a new output error.
    #[must_use]
    pub fn new(kind: OutputErrorKind) -> Self {
        Self {
            kind,
            path: None,
            backend: None,
            source: None,
        }
    }

    /// Attach path context.
    #[must_use]
    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Attach backend identifier.
    #[must_use]
    pub fn with_backend(mut self, backend: &'static str) -> Self {
        self.backend = Some(backend);
        self
    }

    /// Attach the underlying error source.
    #[must_use]
    pub fn with_source(mut self, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Create a not found error with path.
    #[must_use]
    pub fn not_found(path: impl Into<PathBuf>) -> Self {
        Self::new(OutputErrorKind::NotFound).with_path(path)
    }

    /// Create an output error from an I/O error.
    #[must_use]
    pub fn io(err: std::io::Error, path: Option<PathBuf>) -> Self {
        let kind = match err.kind() {
            std::io::ErrorKind::NotFound => OutputErrorKind::NotFound,
            std::io::ErrorKind::PermissionDenied => OutputErrorKind::PermissionDenied,
            std::io::ErrorKind::DirectoryNotEmpty => OutputErrorKind::NotEmpty,
            _ => OutputErrorKind::Other,
        };
        let mut error = Self::new(kind).with_source(err);
        if let Some(p) = path {
            error = error.with_path(p);
        }
        error
    }

    /// True if this error means the target was already absent.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        self.kind == OutputErrorKind::NotFound
    }
}

impl std::fmt::Display for OutputError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Format: "[Backend] Kind: message (path: foo/bar.md)"
        if let Some(backend) = self.backend {
            write!(f, "[{backend}] ")?;
        }

        let kind_str = match self.kind {
            OutputErrorKind::NotFound => "Not found",
            OutputErrorKind::PermissionDenied => "Permission denied",
            OutputErrorKind::NotEmpty => "Directory not empty",
            OutputErrorKind::InvalidPath => "Invalid path",
            OutputErrorKind::Other => "Error",
        };

        write!(f, "{kind_str}")?;

        if let Some(source) = &self.source {
            write!(f, ": {source}")?;
        }

        if let Some(path) = &self.path {
            write!(f, " (path: {})", path.display())?;
        }

        Ok(())
    }
}

impl std::error::Error for OutputError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|s| s.as_ref() as &(dyn std::error::Error + 'static))
    }
}

/// Join a relative output path and a child segment.
///
/// The empty string is the output root, so joining onto it yields the
/// segment unchanged.
#[must_use]
pub fn join_path(parent: &str, name: &str) -> String {
    if parent.is_empty() {
        name.to_owned()
    } else {
        format!("{parent}/{name}")
    }
}

/// The physical operations the build engine performs on its output area.
///
/// Implementations must be safe to call from many worker threads at once. The
/// engine guarantees that concurrent calls never target the same path.
pub trait OutputStore: Send + Sync {
    /// Create a directory and any missing ancestors.
    ///
    /// # Errors
    ///
    /// Returns [`OutputError`] if the directory cannot be created.
    fn create_dir(&self, path: &str) -> Result<(), OutputError>;

    /// Write a file, creating missing parent directories and replacing any
    /// existing content.
    ///
    /// # Errors
    ///
    /// Returns [`OutputError`] if the file cannot be written.
    fn write_file(&self, path: &str, content: &[u8]) -> Result<(), OutputError>;

    /// Delete a file or an empty directory.
    ///
    /// # Errors
    ///
    /// Returns [`OutputError`] with [`OutputErrorKind::NotFound`] if nothing
    /// exists at `path`, [`OutputErrorKind::NotEmpty`] for a directory that
    /// still has entries, or another kind if removal fails.
    fn delete(&self, path: &str) -> Result<(), OutputError>;

    /// Check whether anything exists at `path`.
    ///
    /// Returns `false` on errors (treats errors as "doesn't exist").
    fn exists(&self, path: &str) -> bool;

    /// List the direct entries of a directory, sorted by name.
    ///
    /// # Errors
    ///
    /// Returns [`OutputError`] if the directory cannot be enumerated.
    fn list_dir(&self, path: &str) -> Result<Vec<Entry>, OutputError>;
}
