//! Persisted build state.
//!
//! [`StateStore`] keeps the change cache and the rename index as JSON files in
//! the metadata directory, next to the crawler's repository cache:
//!
//! ```text
//! {meta}/
//! +-- docs-filepath.json              # namespace/slug -> output path
//! +-- {user}/
//!     +-- {repo}/
//!         +-- docs-published-at.json  # cache key -> revision tag
//!         +-- docs-omitted.json       # cache keys rendered without output
//! ```
//!
//! Missing files load as empty state (first run). Every file is replaced
//! atomically: content goes to a temporary file in the same directory, which
//! is then renamed over the target, so an interrupted commit leaves either the
//! old or the new file.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::change_cache::{CacheUpdate, ChangeCache, OmittedSet, RevisionTable};
use crate::error::StateError;
use crate::rename_index::RenameIndex;

const REVISIONS_FILE: &str = "docs-published-at.json";
const OMITTED_FILE: &str = "docs-omitted.json";
const RENAME_INDEX_FILE: &str = "docs-filepath.json";

/// Reads and commits build state under a metadata directory.
#[derive(Debug)]
pub struct StateStore {
    meta_dir: PathBuf,
}

impl StateStore {
    /// Create a store rooted at `meta_dir`.
    #[must_use]
    pub fn new(meta_dir: PathBuf) -> Self {
        Self { meta_dir }
    }

    fn revisions_path(&self, namespace: &str) -> PathBuf {
        self.meta_dir.join(namespace).join(REVISIONS_FILE)
    }

    fn omitted_path(&self, namespace: &str) -> PathBuf {
        self.meta_dir.join(namespace).join(OMITTED_FILE)
    }

    fn rename_index_path(&self) -> PathBuf {
        self.meta_dir.join(RENAME_INDEX_FILE)
    }

    /// Load the change cache for the given namespaces.
    pub fn load_change_cache(&self, namespaces: &[&str]) -> Result<ChangeCache, StateError> {
        let mut tables = HashMap::with_capacity(namespaces.len());
        let mut omitted = HashMap::with_capacity(namespaces.len());
        for &namespace in namespaces {
            let table: RevisionTable = read_or_default(&self.revisions_path(namespace))?;
            tables.insert(namespace.to_owned(), table);
            let set: OmittedSet = read_or_default(&self.omitted_path(namespace))?;
            omitted.insert(namespace.to_owned(), set);
        }
        Ok(ChangeCache::new(tables).with_omitted(omitted))
    }

    /// Load the rename index.
    pub fn load_rename_index(&self) -> Result<RenameIndex, StateError> {
        let paths: BTreeMap<String, String> = read_or_default(&self.rename_index_path())?;
        Ok(RenameIndex::new(paths))
    }

    /// Persist the tags of this cycle and the new rename index.
    pub fn commit(&self, update: &CacheUpdate, index: &RenameIndex) -> Result<(), StateError> {
        for (namespace, table) in update.tables() {
            write_json_atomic(&self.revisions_path(namespace), table)?;
            let omitted = update.omitted(namespace).cloned().unwrap_or_default();
            write_json_atomic(&self.omitted_path(namespace), &omitted)?;
        }
        write_json_atomic(&self.rename_index_path(), index.paths())?;

        tracing::info!(
            namespaces = update.tables().len(),
            documents = index.len(),
            meta_dir = %self.meta_dir.display(),
            "committed build state"
        );
        Ok(())
    }
}

fn read_or_default<T: DeserializeOwned + Default>(path: &Path) -> Result<T, StateError> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!(path = %path.display(), "no previous state");
            return Ok(T::default());
        }
        Err(source) => {
            return Err(StateError::Read {
                path: path.to_path_buf(),
                source,
            });
        }
    };
    serde_json::from_str(&content).map_err(|source| StateError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

fn write_json_atomic<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), StateError> {
    let json = serde_json::to_vec_pretty(value)?;
    write_atomic(path, &json)
}

/// Write `content` to a temporary file next to `path`, then rename it over
/// `path`.
fn write_atomic(path: &Path, content: &[u8]) -> Result<(), StateError> {
    let write_error = |source| StateError::Write {
        path: path.to_path_buf(),
        source,
    };
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(dir).map_err(write_error)?;

    let mut temp = tempfile::NamedTempFile::new_in(dir).map_err(write_error)?;
    temp.write_all(content).map_err(write_error)?;
    temp.as_file().sync_all().map_err(write_error)?;
    temp.persist(path).map_err(|e| write_error(e.error))?;
    Ok(())
}
