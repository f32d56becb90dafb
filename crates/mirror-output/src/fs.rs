//! Filesystem-backed output store.

use std::fs;
use std::path::{Component, Path, PathBuf};

use crate::store::{Entry, OutputError, OutputErrorKind, OutputStore};

/// Backend identifier for error messages.
const BACKEND: &str = "Fs";

/// [`OutputStore`] rooted at a directory on disk.
///
/// Relative output paths are joined onto the root. Paths containing `..`
/// components or absolute paths are rejected so the engine can never touch
/// anything outside the output area.
#[derive(Debug)]
pub struct FsOutput {
    root: PathBuf,
}

impl FsOutput {
    /// Create a store rooted at `root`.
    ///
    /// The directory does not need to exist yet; it is created on the first
    /// write.
    #[must_use]
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    /// Root directory of this store.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a relative output path to a native path under the root.
    fn resolve(&self, path: &str) -> Result<PathBuf, OutputError> {
        let relative = Path::new(path);
        let escapes = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));

        if escapes {
            return Err(OutputError::new(OutputErrorKind::InvalidPath)
                .with_path(relative)
                .with_backend(BACKEND));
        }
        Ok(self.root.join(relative))
    }

    fn io_error(err: std::io::Error, path: &str) -> OutputError {
        OutputError::io(err, Some(PathBuf::from(path))).with_backend(BACKEND)
    }
}

impl OutputStore for FsOutput {
    fn create_dir(&self, path: &str) -> Result<(), OutputError> {
        let native = self.resolve(path)?;
        fs::create_dir_all(&native).map_err(|e| Self::io_error(e, path))
    }

    fn write_file(&self, path: &str, content: &[u8]) -> Result<(), OutputError> {
        let native = self.resolve(path)?;
        if let Some(parent) = native.parent() {
            fs::create_dir_all(parent).map_err(|e| Self::io_error(e, path))?;
        }
        fs::write(&native, content).map_err(|e| Self::io_error(e, path))
    }

    fn delete(&self, path: &str) -> Result<(), OutputError> {
        let native = self.resolve(path)?;
        if path.is_empty() {
            return Err(OutputError::new(OutputErrorKind::InvalidPath)
                .with_path(native)
                .with_backend(BACKEND));
        }

        let metadata = fs::symlink_metadata(&native).map_err(|e| Self::io_error(e, path))?;
        let result = if metadata.is_dir() {
            fs::remove_dir(&native)
        } else {
            fs::remove_file(&native)
        };
        result.map_err(|e| Self::io_error(e, path))?;

        tracing::debug!(path, "removed from output");
        Ok(())
    }

    fn exists(&self, path: &str) -> bool {
        self.resolve(path)
            .is_ok_and(|native| fs::symlink_metadata(native).is_ok())
    }

    fn list_dir(&self, path: &str) -> Result<Vec<Entry>, OutputError> {
        let native = self.resolve(path)?;
        let entries = fs::read_dir(&native).map_err(|e| Self::io_error(e, path))?;

        let mut listed = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| Self::io_error(e, path))?;
            let is_dir = entry.file_type().is_ok_and(|t| t.is_dir());
            listed.push(Entry {
                name: entry.file_name().to_string_lossy().into_owned(),
                is_dir,
            });
        }
        listed.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(listed)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn assert_send_sync<T: Send + Sync>() {}

    #[test]
    fn test_fs_output_is_send_sync() {
        assert_send_sync::<FsOutput>();
    }

    #[test]
    fn test_write_file_creates_parents() {
        let tmp = tempfile::tempdir().unwrap();
        let output = FsOutput::new(tmp.path().join("out"));

        output.write_file("a/b/c.md", b"hello").unwrap();

        let written = fs::read_to_string(tmp.path().join("out/a/b/c.md")).unwrap();
        assert_eq!(written, "hello");
    }

    #[test]
    fn test_write_file_overwrites() {
        let tmp = tempfile::tempdir().unwrap();
        let output = FsOutput::new(tmp.path().to_path_buf());

        output.write_file("doc.md", b"first").unwrap();
        output.write_file("doc.md", b"second").unwrap();

        assert_eq!(fs::read_to_string(tmp.path().join("doc.md")).unwrap(), "second");
    }

    #[test]
    fn test_create_dir_and_exists() {
        let tmp = tempfile::tempdir().unwrap();
        let output = FsOutput::new(tmp.path().to_path_buf());

        assert!(!output.exists("a/b"));
        output.create_dir("a/b").unwrap();
        assert!(output.exists("a/b"));
        assert!(output.exists("a"));
    }

    #[test]
    fn test_delete_file() {
        let tmp = tempfile::tempdir().unwrap();
        let output = FsOutput::new(tmp.path().to_path_buf());
        output.write_file("doc.md", b"x").unwrap();

        output.delete("doc.md").unwrap();

        assert!(!output.exists("doc.md"));
    }

    #[test]
    fn test_delete_missing_is_not_found() {
        let tmp = tempfile::tempdir().unwrap();
        let output = FsOutput::new(tmp.path().to_path_buf());

        let err = output.delete("missing.md").unwrap_err();

        assert!(err.is_not_found());
        assert_eq!(err.backend, Some("Fs"));
    }

    #[test]
    fn test_delete_non_empty_dir_fails() {
        let tmp = tempfile::tempdir().unwrap();
        let output = FsOutput::new(tmp.path().to_path_buf());
        output.write_file("dir/doc.md", b"x").unwrap();

        let err = output.delete("dir").unwrap_err();

        assert_eq!(err.kind, OutputErrorKind::NotEmpty);
        assert!(output.exists("dir/doc.md"));
    }

    #[test]
    fn test_delete_empty_dir() {
        let tmp = tempfile::tempdir().unwrap();
        let output = FsOutput::new(tmp.path().to_path_buf());
        output.create_dir("dir").unwrap();

        output.delete("dir").unwrap();

        assert!(!output.exists("dir"));
    }

    #[test]
    fn test_delete_root_rejected() {
        let tmp = tempfile::tempdir().unwrap();
        let output = FsOutput::new(tmp.path().to_path_buf());

        let err = output.delete("").unwrap_err();

        assert_eq!(err.kind, OutputErrorKind::InvalidPath);
        assert!(tmp.path().exists());
    }

    #[test]
    fn test_list_dir_sorted_with_kinds() {
        let tmp = tempfile::tempdir().unwrap();
        let output = FsOutput::new(tmp.path().to_path_buf());
        output.write_file("b.md", b"x").unwrap();
        output.create_dir("a").unwrap();
        output.write_file("c/d.md", b"x").unwrap();

        let entries = output.list_dir("").unwrap();

        assert_eq!(
            entries,
            vec![Entry::dir("a"), Entry::file("b.md"), Entry::dir("c")]
        );
    }

    #[test]
    fn test_list_dir_missing_fails() {
        let tmp = tempfile::tempdir().unwrap();
        let output = FsOutput::new(tmp.path().join("nope"));

        assert!(output.list_dir("").unwrap_err().is_not_found());
    }

    #[test]
    fn test_rejects_path_traversal() {
        let tmp = tempfile::tempdir().unwrap();
        let output = FsOutput::new(tmp.path().join("out"));

        let err = output.write_file("../escape.md", b"x").unwrap_err();

        assert_eq!(err.kind, OutputErrorKind::InvalidPath);
        assert!(!tmp.path().join("escape.md").exists());
        assert!(!output.exists("../escape.md"));
    }

    #[test]
    fn test_rejects_absolute_path() {
        let tmp = tempfile::tempdir().unwrap();
        let output = FsOutput::new(tmp.path().to_path_buf());

        let err = output.create_dir("/etc/x").unwrap_err();

        assert_eq!(err.kind, OutputErrorKind::InvalidPath);
    }
}
