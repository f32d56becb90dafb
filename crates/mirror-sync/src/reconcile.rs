//! Orphan removal by live scan of the output area.
//!
//! After all tasks finish, everything in the output area that the current
//! tree does not account for is removed: files outright, directories once
//! their contents are gone. The reserved metadata and shared-assets areas at
//! the top level are never scanned.

use mirror_output::{OutputErrorKind, OutputStore, join_path};

use crate::error::{ReconcileError, TaskError};
use crate::path::RESERVED_NAMES;
use crate::plan::ExpectedPaths;
use crate::scheduler::TaskFailure;

/// A path reconciliation would remove.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Orphan {
    /// Output-relative path.
    pub path: String,
    /// True for directories.
    pub is_dir: bool,
}

/// Result of a reconciliation pass.
#[derive(Debug, Default)]
pub struct ReconcileReport {
    /// Orphaned files removed.
    pub deleted_files: usize,
    /// Emptied directories removed.
    pub deleted_dirs: usize,
    /// Removals that failed.
    pub failures: Vec<TaskFailure>,
}

impl ReconcileReport {
    /// Total paths removed.
    #[must_use]
    pub fn deleted(&self) -> usize {
        self.deleted_files + self.deleted_dirs
    }
}

/// List the orphans of the output area, deepest first.
///
/// A directory is listed only if every entry below it is an orphan too, so the
/// list is exactly what [`reconcile`] removes when no removal fails.
///
/// # Errors
///
/// Returns [`ReconcileError`] if a directory cannot be enumerated.
pub fn find_orphans(
    output: &dyn OutputStore,
    expected: &ExpectedPaths,
) -> Result<Vec<Orphan>, ReconcileError> {
    let mut orphans = Vec::new();
    scan(output, expected, "", &mut orphans)?;
    Ok(orphans)
}

/// Scan `dir`, pushing orphans in post-order. Returns true if every entry of
/// `dir` is an orphan.
fn scan(
    output: &dyn OutputStore,
    expected: &ExpectedPaths,
    dir: &str,
    orphans: &mut Vec<Orphan>,
) -> Result<bool, ReconcileError> {
    let entries = match output.list_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.is_not_found() => return Ok(true),
        Err(source) => {
            return Err(ReconcileError {
                path: dir.to_owned(),
                source,
            });
        }
    };

    let mut all_orphans = true;
    for entry in entries {
        if dir.is_empty() && RESERVED_NAMES.contains(&entry.name.as_str()) {
            all_orphans = false;
            continue;
        }

        let path = join_path(dir, &entry.name);
        if entry.is_dir {
            let emptied = scan(output, expected, &path, orphans)?;
            if emptied && !expected.contains_dir(&path) {
                orphans.push(Orphan { path, is_dir: true });
            } else {
                all_orphans = false;
            }
        } else if expected.contains_file(&path) {
            all_orphans = false;
        } else {
            orphans.push(Orphan {
                path,
                is_dir: false,
            });
        }
    }
    Ok(all_orphans)
}

/// Remove every orphan of the output area.
///
/// Individual removal failures are collected; a directory that is not empty
/// after its contents were processed is kept.
///
/// # Errors
///
/// Returns [`ReconcileError`] if a directory cannot be enumerated. Nothing is
/// removed in that case.
pub fn reconcile(
    output: &dyn OutputStore,
    expected: &ExpectedPaths,
) -> Result<ReconcileReport, ReconcileError> {
    let orphans = find_orphans(output, expected)?;
    let mut report = ReconcileReport::default();

    for orphan in orphans {
        match output.delete(&orphan.path) {
            Ok(()) => {
                tracing::info!(path = %orphan.path, "removed orphan");
                if orphan.is_dir {
                    report.deleted_dirs += 1;
                } else {
                    report.deleted_files += 1;
                }
            }
            Err(e) if e.is_not_found() => {}
            Err(e) if e.kind == OutputErrorKind::NotEmpty => {
                tracing::debug!(path = %orphan.path, "directory not empty, keeping");
            }
            Err(e) => {
                tracing::warn!(path = %orphan.path, error = %e, "failed to remove orphan");
                report.failures.push(TaskFailure {
                    path: orphan.path,
                    cache_key: None,
                    error: TaskError::Output(e),
                });
            }
        }
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use mirror_output::MockOutput;
    use pretty_assertions::assert_eq;

    use super::*;

    fn expected(files: &[&str], dirs: &[&str]) -> ExpectedPaths {
        let mut expected = ExpectedPaths::default();
        for file in files {
            expected.add_file(file);
        }
        for dir in dirs {
            expected.add_dir(dir);
        }
        expected
    }

    fn orphan(path: &str, is_dir: bool) -> Orphan {
        Orphan {
            path: path.to_owned(),
            is_dir,
        }
    }

    #[test]
    fn test_find_orphans_deepest_first() {
        let output = MockOutput::new()
            .with_file("C/A.md", "x")
            .with_file("C/Old/Deep/X.md", "x")
            .with_file("Gone/Y.md", "y");

        let orphans = find_orphans(&output, &expected(&["C/A.md"], &[])).unwrap();

        assert_eq!(
            orphans,
            vec![
                orphan("C/Old/Deep/X.md", false),
                orphan("C/Old/Deep", true),
                orphan("C/Old", true),
                orphan("Gone/Y.md", false),
                orphan("Gone", true),
            ]
        );
    }

    #[test]
    fn test_find_orphans_keeps_expected_empty_dir() {
        let output = MockOutput::new().with_dir("C/G");

        let orphans = find_orphans(&output, &expected(&[], &["C/G"])).unwrap();

        assert!(orphans.is_empty());
    }

    #[test]
    fn test_find_orphans_skips_reserved_areas() {
        let output = MockOutput::new()
            .with_file(".meta/docs-filepath.json", "{}")
            .with_file("assets/logo.png", "png")
            .with_file("stray.md", "x");

        let orphans = find_orphans(&output, &ExpectedPaths::default()).unwrap();

        assert_eq!(orphans, vec![orphan("stray.md", false)]);
    }

    #[test]
    fn test_find_orphans_reserved_names_nested_are_scanned() {
        let output = MockOutput::new().with_file("C/assets/x.md", "x");

        let orphans = find_orphans(&output, &expected(&[], &["C"])).unwrap();

        assert_eq!(
            orphans,
            vec![orphan("C/assets/x.md", false), orphan("C/assets", true)]
        );
    }

    #[test]
    fn test_find_orphans_missing_root_is_empty() {
        let orphans = find_orphans(&MockOutput::new(), &ExpectedPaths::default()).unwrap();

        assert!(orphans.is_empty());
    }

    #[test]
    fn test_reconcile_removes_orphans() {
        let output = MockOutput::new()
            .with_file("C/A.md", "x")
            .with_file("C/B.md", "y")
            .with_file("C/Old/X.md", "z");

        let report = reconcile(&output, &expected(&["C/A.md"], &[])).unwrap();

        assert_eq!(report.deleted_files, 2);
        assert_eq!(report.deleted_dirs, 1);
        assert_eq!(output.files(), vec!["C/A.md".to_owned()]);
        assert_eq!(output.dirs(), vec!["C".to_owned()]);
    }

    #[test]
    fn test_reconcile_never_touches_reserved_areas() {
        let output = MockOutput::new()
            .with_file(".meta/team/handbook/toc.json", "[]")
            .with_file("assets/img.png", "png");

        let report = reconcile(&output, &ExpectedPaths::default()).unwrap();

        assert_eq!(report.deleted(), 0);
        assert_eq!(output.files().len(), 2);
    }

    #[test]
    fn test_reconcile_failed_file_keeps_parent() {
        let output = MockOutput::new()
            .with_file("Old/X.md", "x")
            .with_failing_path("Old/X.md");

        let report = reconcile(&output, &ExpectedPaths::default()).unwrap();

        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].path, "Old/X.md");
        assert!(output.exists("Old"));
    }

    #[test]
    fn test_reconcile_scan_failure_is_fatal() {
        let output = MockOutput::new()
            .with_file("C/A.md", "x")
            .with_unlistable_dir("C");

        let err = reconcile(&output, &ExpectedPaths::default()).unwrap_err();

        assert_eq!(err.path, "C");
        assert!(output.exists("C/A.md"));
    }
}
