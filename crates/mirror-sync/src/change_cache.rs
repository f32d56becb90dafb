//! Render-skip decisions based on revision tags.
//!
//! [`ChangeCache`] holds the tags recorded by the last successful cycle and is
//! never mutated during a build. The tags seen in the current cycle are
//! accumulated in a separate [`CacheUpdate`] that is committed together with
//! the rest of the state.
//!
//! Documents the renderer chose not to write have no output file. Their keys
//! are kept in a per-namespace omitted set, which stands in for the missing
//! file as long as the tag does not change.

use std::collections::{BTreeMap, BTreeSet, HashMap};

/// Revision table of one namespace: cache key to last rendered tag.
pub type RevisionTable = BTreeMap<String, String>;

/// Cache keys of one namespace whose render produced no output.
pub type OmittedSet = BTreeSet<String>;

/// Identifies one cache entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    /// Repository namespace.
    pub namespace: String,
    /// Document id, or the entry uuid for links and placeholders.
    pub key: String,
}

impl CacheKey {
    /// Create a cache key.
    #[must_use]
    pub fn new(namespace: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            key: key.into(),
        }
    }
}

/// Revision tags from the previous successful cycle.
#[derive(Debug, Default)]
pub struct ChangeCache {
    previous: HashMap<String, RevisionTable>,
    omitted: HashMap<String, OmittedSet>,
}

impl ChangeCache {
    /// Create a cache from per-namespace tables.
    #[must_use]
    pub fn new(previous: HashMap<String, RevisionTable>) -> Self {
        Self {
            previous,
            omitted: HashMap::new(),
        }
    }

    /// Set the per-namespace omitted sets.
    #[must_use]
    pub fn with_omitted(mut self, omitted: HashMap<String, OmittedSet>) -> Self {
        self.omitted = omitted;
        self
    }

    /// True if the last render of `key` produced no output.
    #[must_use]
    pub fn is_omitted(&self, key: &CacheKey) -> bool {
        self.omitted
            .get(&key.namespace)
            .is_some_and(|set| set.contains(&key.key))
    }

    /// Previously rendered tag for a key.
    #[must_use]
    pub fn previous(&self, key: &CacheKey) -> Option<&str> {
        self.previous
            .get(&key.namespace)
            .and_then(|table| table.get(&key.key))
            .map(String::as_str)
    }

    /// Decide whether a node must be rendered again.
    ///
    /// Rendering is skipped only when the cached tag equals `remote_tag` and
    /// the output file still exists, or the last render at this tag was
    /// omitted.
    #[must_use]
    pub fn should_render(&self, key: &CacheKey, remote_tag: &str, output_exists: bool) -> bool {
        let unchanged = self.previous(key) == Some(remote_tag);
        !(unchanged && (output_exists || self.is_omitted(key)))
    }
}

/// Tags observed in the current cycle.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CacheUpdate {
    tables: BTreeMap<String, RevisionTable>,
    omitted: BTreeMap<String, OmittedSet>,
}

impl CacheUpdate {
    /// Create an empty update.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the tag rendered (or confirmed) for a key.
    pub fn record(&mut self, key: &CacheKey, tag: &str) {
        self.tables
            .entry(key.namespace.clone())
            .or_default()
            .insert(key.key.clone(), tag.to_owned());
    }

    /// Mark a key whose render produced no output.
    pub fn omit(&mut self, key: &CacheKey) {
        self.omitted
            .entry(key.namespace.clone())
            .or_default()
            .insert(key.key.clone());
    }

    /// Restore a key to its previous tag and omitted flag after its task
    /// failed, or drop it if it had no tag, so the next cycle tries again.
    pub fn revert(&mut self, cache: &ChangeCache, key: &CacheKey) {
        let table = self.tables.entry(key.namespace.clone()).or_default();
        match cache.previous(key) {
            Some(tag) => {
                table.insert(key.key.clone(), tag.to_owned());
            }
            None => {
                table.remove(&key.key);
            }
        }

        let omitted = self.omitted.entry(key.namespace.clone()).or_default();
        if cache.is_omitted(key) {
            omitted.insert(key.key.clone());
        } else {
            omitted.remove(&key.key);
        }
    }

    /// Make sure a namespace has a table even if it has no entries, so its
    /// persisted files are replaced.
    pub fn touch(&mut self, namespace: &str) {
        self.tables.entry(namespace.to_owned()).or_default();
        self.omitted.entry(namespace.to_owned()).or_default();
    }

    /// Tag recorded for a key in this cycle.
    #[must_use]
    pub fn get(&self, key: &CacheKey) -> Option<&str> {
        self.tables
            .get(&key.namespace)
            .and_then(|table| table.get(&key.key))
            .map(String::as_str)
    }

    /// True if `key` was marked omitted in this cycle.
    #[must_use]
    pub fn is_omitted(&self, key: &CacheKey) -> bool {
        self.omitted
            .get(&key.namespace)
            .is_some_and(|set| set.contains(&key.key))
    }

    /// Per-namespace tables, in namespace order.
    #[must_use]
    pub fn tables(&self) -> &BTreeMap<String, RevisionTable> {
        &self.tables
    }

    /// Omitted set of a namespace.
    #[must_use]
    pub fn omitted(&self, namespace: &str) -> Option<&OmittedSet> {
        self.omitted.get(namespace)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn cache_with(namespace: &str, key: &str, tag: &str) -> ChangeCache {
        let mut table = RevisionTable::new();
        table.insert(key.to_owned(), tag.to_owned());
        ChangeCache::new(HashMap::from([(namespace.to_owned(), table)]))
    }

    #[test]
    fn test_should_render_unknown_key() {
        let cache = ChangeCache::default();

        assert!(cache.should_render(&CacheKey::new("ns", "1"), "t0", true));
    }

    #[test]
    fn test_should_render_skips_unchanged_existing() {
        let cache = cache_with("ns", "1", "t0");

        assert!(!cache.should_render(&CacheKey::new("ns", "1"), "t0", true));
    }

    #[test]
    fn test_should_render_changed_tag() {
        let cache = cache_with("ns", "1", "t0");

        assert!(cache.should_render(&CacheKey::new("ns", "1"), "t1", true));
    }

    #[test]
    fn test_should_render_missing_output() {
        let cache = cache_with("ns", "1", "t0");

        assert!(cache.should_render(&CacheKey::new("ns", "1"), "t0", false));
    }

    #[test]
    fn test_should_render_is_per_namespace() {
        let cache = cache_with("ns", "1", "t0");

        assert!(cache.should_render(&CacheKey::new("other", "1"), "t0", true));
    }

    #[test]
    fn test_should_render_omitted_unchanged() {
        let cache = cache_with("ns", "1", "t0").with_omitted(HashMap::from([(
            "ns".to_owned(),
            OmittedSet::from(["1".to_owned()]),
        )]));

        assert!(!cache.should_render(&CacheKey::new("ns", "1"), "t0", false));
        assert!(cache.should_render(&CacheKey::new("ns", "1"), "t1", false));
    }

    #[test]
    fn test_revert_restores_omitted_flag() {
        let cache = cache_with("ns", "1", "t0").with_omitted(HashMap::from([(
            "ns".to_owned(),
            OmittedSet::from(["1".to_owned()]),
        )]));
        let key = CacheKey::new("ns", "1");
        let mut update = CacheUpdate::new();
        update.record(&key, "t1");

        update.revert(&cache, &key);

        assert_eq!(update.get(&key), Some("t0"));
        assert!(update.is_omitted(&key));
    }

    #[test]
    fn test_revert_clears_new_omitted_flag() {
        let cache = cache_with("ns", "1", "t0");
        let key = CacheKey::new("ns", "1");
        let mut update = CacheUpdate::new();
        update.record(&key, "t1");
        update.omit(&key);

        update.revert(&cache, &key);

        assert!(!update.is_omitted(&key));
    }

    #[test]
    fn test_revert_restores_previous_tag() {
        let cache = cache_with("ns", "1", "t0");
        let key = CacheKey::new("ns", "1");
        let mut update = CacheUpdate::new();
        update.record(&key, "t1");

        update.revert(&cache, &key);

        assert_eq!(update.get(&key), Some("t0"));
    }

    #[test]
    fn test_revert_removes_new_key() {
        let cache = ChangeCache::default();
        let key = CacheKey::new("ns", "1");
        let mut update = CacheUpdate::new();
        update.record(&key, "t1");

        update.revert(&cache, &key);

        assert_eq!(update.get(&key), None);
        assert!(update.tables().contains_key("ns"));
    }

    #[test]
    fn test_touch_creates_empty_table() {
        let mut update = CacheUpdate::new();

        update.touch("ns");

        assert_eq!(update.tables().get("ns"), Some(&RevisionTable::new()));
        assert_eq!(update.omitted("ns"), Some(&OmittedSet::new()));
    }
}
