//! Link rewriting between mirrored documents.

use std::sync::LazyLock;

use regex::{Captures, Regex};

use mirror_sync::{Tree, TreeNode};

/// Markdown inline link target: `](url)` or `](url "title")`.
static LINK_TARGET_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"\]\(([^)\s]+)((?:\s+"[^"]*")?)\)"#).unwrap());

/// Query parameter that switches the hosted viewer into embed mode.
const EMBED_VIEW: &str = "view=doc_embed";

/// Compute a relative path from one output file to another.
///
/// Both arguments are output-relative file paths. The last segment of `from`
/// is the current file; the base directory is everything before it.
///
/// # Examples
///
/// ```
/// use mirror_render::relative_path;
///
/// assert_eq!(relative_path("C/A/B.md", "C/A.md"), "../A.md");
/// assert_eq!(relative_path("C/A.md", "C/A/B.md"), "A/B.md");
/// ```
#[must_use]
pub fn relative_path(from: &str, to: &str) -> String {
    let from_segs: Vec<&str> = from.split('/').filter(|s| !s.is_empty()).collect();
    let to_segs: Vec<&str> = to.split('/').filter(|s| !s.is_empty()).collect();

    let from_dir = &from_segs[..from_segs.len().saturating_sub(1)];
    let common = from_dir
        .iter()
        .zip(&to_segs)
        .take_while(|(a, b)| a == b)
        .count();

    let ups = "../".repeat(from_dir.len() - common);
    format!("{ups}{}", to_segs[common..].join("/"))
}

/// Rewrites links to documents of the hosted corpus into relative paths.
#[derive(Debug, Clone)]
pub struct LinkRewriter {
    host: String,
}

impl LinkRewriter {
    /// Create a rewriter for documents published under `host`.
    #[must_use]
    pub fn new(host: &str) -> Self {
        Self {
            host: host.trim_end_matches('/').to_owned(),
        }
    }

    /// True if `url` points at a document page of the host.
    fn is_doc_link(&self, url: &str) -> bool {
        let Some(rest) = url.strip_prefix(&self.host) else {
            return false;
        };
        rest.starts_with('/') && !rest.starts_with("/attachments/")
    }

    /// Split a document URL into namespace and slug.
    fn doc_key<'u>(&self, url: &'u str) -> Option<(&'u str, &'u str)> {
        let path = url.get(self.host.len()..)?;
        let path = path.split(['?', '#']).next().unwrap_or(path);
        let (namespace, slug) = path.trim_matches('/').rsplit_once('/')?;
        namespace.contains('/').then_some((namespace, slug))
    }

    /// Rewrite every corpus link in `markdown` relative to `node`.
    ///
    /// Links that do not resolve to a node of `tree` are kept (minus the
    /// embed parameter) and reported.
    #[must_use]
    pub fn rewrite(&self, markdown: &str, node: &TreeNode, tree: &Tree) -> String {
        let from = node.output_path();
        LINK_TARGET_RE
            .replace_all(markdown, |caps: &Captures<'_>| {
                let url = &caps[1];
                if !self.is_doc_link(url) {
                    return caps[0].to_owned();
                }

                let url = url.replace(EMBED_VIEW, "");
                let target = self
                    .doc_key(&url)
                    .and_then(|(namespace, slug)| tree.lookup(namespace, slug));
                let resolved = match target {
                    Some(target) => relative_path(&from, &target.output_path()),
                    None => {
                        tracing::warn!(url = %url, document = %from, "link target not found");
                        url
                    }
                };
                format!("]({resolved}{})", &caps[2])
            })
            .into_owned()
    }
}
