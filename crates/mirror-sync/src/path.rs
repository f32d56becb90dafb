//! Title sanitizing and collision-free path assignment.

use std::collections::{HashMap, HashSet};

use mirror_output::join_path;

use crate::tree::NodeKind;

/// Top-level names owned by the engine; never assigned to a node.
pub const RESERVED_NAMES: [&str; 2] = [".meta", "assets"];

/// Maximum length of one path segment, in characters.
const MAX_SEGMENT_CHARS: usize = 100;

/// Replacement for characters that cannot appear in file names.
const REPLACEMENT: char = '_';

fn is_illegal(c: char) -> bool {
    matches!(c, '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*') || c.is_control()
}

fn is_reserved_device(name: &str) -> bool {
    let upper = name.to_ascii_uppercase();
    match upper.as_str() {
        "CON" | "PRN" | "AUX" | "NUL" => true,
        _ => {
            let bytes = upper.as_bytes();
            bytes.len() == 4
                && (upper.starts_with("COM") || upper.starts_with("LPT"))
                && (b'1'..=b'9').contains(&bytes[3])
        }
    }
}

/// Turn a display title into a single safe path segment.
///
/// Illegal characters become `_` (runs collapse into one), empty and
/// dot-only names become `_`, Windows device names get a trailing `_`, and
/// the result is capped at 100 characters.
#[must_use]
pub fn sanitize_title(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut in_illegal_run = false;
    for c in raw.chars() {
        if is_illegal(c) {
            if !in_illegal_run {
                out.push(REPLACEMENT);
            }
            in_illegal_run = true;
        } else {
            out.push(c);
            in_illegal_run = false;
        }
    }

    if out.is_empty() || out == "." || out == ".." {
        return REPLACEMENT.to_string();
    }
    if is_reserved_device(&out) {
        out.push(REPLACEMENT);
    }
    if out.chars().count() > MAX_SEGMENT_CHARS {
        out = out.chars().take(MAX_SEGMENT_CHARS).collect();
    }
    out
}

/// Assigns each node a unique relative path.
///
/// Collisions are counted per `(parent identity, kind, sanitized title)`: the
/// first occurrence keeps the bare title and later ones get `_1`, `_2`, ...
/// in call order. Every full path handed out is also claimed, so a candidate
/// already taken by a node of another kind (or by a file's `.md` name) keeps
/// incrementing until a free path is found.
#[derive(Debug)]
pub struct PathAssigner {
    root_passthrough: bool,
    counters: HashMap<(String, NodeKind, String), usize>,
    claimed: HashSet<String>,
}

impl PathAssigner {
    /// Create an assigner.
    ///
    /// With `root_passthrough`, root nodes map to the empty path so their
    /// children land directly in the output root.
    #[must_use]
    pub fn new(root_passthrough: bool) -> Self {
        Self {
            root_passthrough,
            counters: HashMap::new(),
            claimed: RESERVED_NAMES.iter().map(|&n| n.to_owned()).collect(),
        }
    }

    /// Assign the path of a node titled `raw_title` under `parent_path`.
    ///
    /// The returned path has no extension; file nodes are written to
    /// `<path>.md`.
    pub fn assign(
        &mut self,
        parent_path: &str,
        parent_identity: &str,
        kind: NodeKind,
        raw_title: &str,
    ) -> String {
        if kind == NodeKind::Root && self.root_passthrough {
            return String::new();
        }

        let title = sanitize_title(raw_title);
        let key = (parent_identity.to_owned(), kind, title.clone());
        let mut count = self.counters.get(&key).copied().unwrap_or(0);

        loop {
            let segment = if count == 0 {
                title.clone()
            } else {
                format!("{title}_{count}")
            };
            count += 1;

            let path = join_path(parent_path, &segment);
            if self.claim(&path, kind) {
                self.counters.insert(key, count);
                return path;
            }
            tracing::debug!(path = %path, "path already taken, trying next suffix");
        }
    }

    fn claim(&mut self, path: &str, kind: NodeKind) -> bool {
        let file_name = kind.writes_file().then(|| format!("{path}.md"));
        if self.claimed.contains(path) || file_name.as_ref().is_some_and(|f| self.claimed.contains(f))
        {
            return false;
        }
        self.claimed.insert(path.to_owned());
        if let Some(file_name) = file_name {
            self.claimed.insert(file_name);
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_sanitize_plain_title() {
        assert_eq!(sanitize_title("Getting Started"), "Getting Started");
    }

    #[test]
    fn test_sanitize_replaces_illegal_runs() {
        assert_eq!(sanitize_title("a/b"), "a_b");
        assert_eq!(sanitize_title("what?*<now>"), "what_now_");
        assert_eq!(sanitize_title("tab\there"), "tab_here");
    }

    #[test]
    fn test_sanitize_keeps_existing_underscores() {
        assert_eq!(sanitize_title("a__b"), "a__b");
    }

    #[test]
    fn test_sanitize_empty_and_dots() {
        assert_eq!(sanitize_title(""), "_");
        assert_eq!(sanitize_title("."), "_");
        assert_eq!(sanitize_title(".."), "_");
        assert_eq!(sanitize_title("/"), "_");
    }

    #[test]
    fn test_sanitize_device_names() {
        assert_eq!(sanitize_title("con"), "con_");
        assert_eq!(sanitize_title("LPT3"), "LPT3_");
        assert_eq!(sanitize_title("COM0"), "COM0");
        assert_eq!(sanitize_title("console"), "console");
    }

    #[test]
    fn test_sanitize_truncates_by_chars() {
        let long = "文".repeat(150);

        let sanitized = sanitize_title(&long);

        assert_eq!(sanitized.chars().count(), 100);
    }

    #[test]
    fn test_assign_nested() {
        let mut paths = PathAssigner::new(false);

        let root = paths.assign("", "", NodeKind::Root, "Handbook");
        let doc = paths.assign(&root, "team/handbook", NodeKind::Doc, "Intro");

        assert_eq!(root, "Handbook");
        assert_eq!(doc, "Handbook/Intro");
    }

    #[test]
    fn test_assign_dedup_same_kind_in_order() {
        let mut paths = PathAssigner::new(false);

        let first = paths.assign("p", "P", NodeKind::Doc, "X");
        let other = paths.assign("p", "P", NodeKind::Doc, "Y");
        let second = paths.assign("p", "P", NodeKind::Doc, "X");
        let third = paths.assign("p", "P", NodeKind::Doc, "X");

        assert_eq!(first, "p/X");
        assert_eq!(other, "p/Y");
        assert_eq!(second, "p/X_1");
        assert_eq!(third, "p/X_2");
    }

    #[test]
    fn test_assign_dedup_uses_sanitized_title() {
        let mut paths = PathAssigner::new(false);

        let first = paths.assign("p", "P", NodeKind::Doc, "a/b");
        let second = paths.assign("p", "P", NodeKind::Doc, "a:b");

        assert_eq!(first, "p/a_b");
        assert_eq!(second, "p/a_b_1");
    }

    #[test]
    fn test_assign_counters_are_per_parent() {
        let mut paths = PathAssigner::new(false);

        let a = paths.assign("p", "P", NodeKind::Doc, "X");
        let b = paths.assign("q", "Q", NodeKind::Doc, "X");

        assert_eq!(a, "p/X");
        assert_eq!(b, "q/X");
    }

    #[test]
    fn test_assign_cross_kind_conflict_gets_suffix() {
        let mut paths = PathAssigner::new(false);

        let container = paths.assign("p", "P", NodeKind::Container, "X");
        let doc = paths.assign("p", "P", NodeKind::Doc, "X");

        assert_eq!(container, "p/X");
        assert_eq!(doc, "p/X_1");
    }

    #[test]
    fn test_assign_file_name_conflict_gets_suffix() {
        let mut paths = PathAssigner::new(false);

        let container = paths.assign("p", "P", NodeKind::Container, "X.md");
        let doc = paths.assign("p", "P", NodeKind::Doc, "X");

        assert_eq!(container, "p/X.md");
        assert_eq!(doc, "p/X_1");
    }

    #[test]
    fn test_assign_root_passthrough() {
        let mut paths = PathAssigner::new(true);

        let root = paths.assign("", "", NodeKind::Root, "Handbook");
        let doc = paths.assign(&root, "team/handbook", NodeKind::Doc, "Intro");

        assert_eq!(root, "");
        assert_eq!(doc, "Intro");
    }

    #[test]
    fn test_assign_avoids_reserved_names() {
        let mut paths = PathAssigner::new(true);

        let assets = paths.assign("", "team/handbook", NodeKind::Container, "assets");
        let meta = paths.assign("", "team/handbook", NodeKind::Doc, ".meta");

        assert_eq!(assets, "assets_1");
        assert_eq!(meta, ".meta_1");
    }

    #[test]
    fn test_assign_reserved_names_only_at_top_level() {
        let mut paths = PathAssigner::new(false);

        let nested = paths.assign("Handbook", "team/handbook", NodeKind::Container, "assets");

        assert_eq!(nested, "Handbook/assets");
    }
}
