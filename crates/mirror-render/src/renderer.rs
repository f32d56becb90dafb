//! [`MarkdownRenderer`]: document bodies to Markdown files with frontmatter.

use std::sync::Arc;

use serde::Serialize;

use mirror_source::{ContentSource, DocDetail};
use mirror_sync::{RenderError, Rendered, Renderer, Tree, TreeNode};

use crate::html::clean_html;
use crate::links::LinkRewriter;
use crate::sheet::sheet_to_markdown;

/// Documents with children and less body text than this are directory
/// placeholders and are not written.
const DIRECTORY_DOC_MIN_CHARS: usize = 50;

const SHEET_FORMAT: &str = "lakesheet";

#[derive(Serialize)]
struct Frontmatter<'a> {
    title: &'a str,
    url: String,
}

/// Renders document nodes by fetching their bodies from a content source.
pub struct MarkdownRenderer {
    source: Arc<dyn ContentSource>,
    host: String,
    links: LinkRewriter,
}

impl MarkdownRenderer {
    /// Create a renderer.
    ///
    /// `host` is the canonical URL prefix of the hosted service, used for
    /// frontmatter URLs and to recognize links between documents.
    #[must_use]
    pub fn new(source: Arc<dyn ContentSource>, host: &str) -> Self {
        let links = LinkRewriter::new(host);
        Self {
            source,
            host: host.trim_end_matches('/').to_owned(),
            links,
        }
    }

    fn frontmatter(&self, node: &TreeNode) -> Result<String, RenderError> {
        let record = &node.record;
        let yaml = serde_yaml::to_string(&Frontmatter {
            title: &record.title,
            url: format!("{}/{}/{}", self.host, record.namespace, record.slug),
        })
        .map_err(|e| RenderError::Format {
            slug: record.slug.clone(),
            message: e.to_string(),
        })?;
        Ok(format!("---\n{yaml}---\n\n"))
    }
}

/// Markdown body of a document: sheets become tables, everything else uses
/// the Markdown body with the lake body as fallback.
fn body_markdown(detail: &DocDetail, slug: &str) -> Result<String, RenderError> {
    if detail.format == SHEET_FORMAT
        && let Some(sheet) = &detail.body_sheet
    {
        return sheet_to_markdown(sheet).map_err(|e| RenderError::Format {
            slug: slug.to_owned(),
            message: format!("invalid sheet data: {e}"),
        });
    }

    let body = detail
        .body
        .as_deref()
        .filter(|b| !b.is_empty())
        .or(detail.body_lake.as_deref())
        .unwrap_or_default();
    Ok(body.to_owned())
}

impl Renderer for MarkdownRenderer {
    fn render(&self, node: &TreeNode, tree: &Tree) -> Result<Rendered, RenderError> {
        let record = &node.record;
        let detail = match self
            .source
            .fetch_document_body(&record.namespace, &record.slug)
        {
            Ok(detail) => detail,
            Err(e) if e.is_not_found() => {
                tracing::warn!(
                    namespace = %record.namespace,
                    slug = %record.slug,
                    "document body not found, skipping"
                );
                return Ok(Rendered::Skip);
            }
            Err(e) => return Err(e.into()),
        };

        let body = body_markdown(&detail, &record.slug)?;
        if body.is_empty() {
            tracing::warn!(
                slug = %record.slug,
                format = %detail.format,
                "document has no content"
            );
        }

        let body = clean_html(&body);
        let body = self.links.rewrite(&body, node, tree);
        let body = body.trim();

        let children = tree.children(node.id).len();
        if children > 0 && body.chars().count() < DIRECTORY_DOC_MIN_CHARS {
            tracing::info!(
                title = %record.title,
                children,
                "skipping directory document"
            );
            return Ok(Rendered::Skip);
        }

        let mut content = self.frontmatter(node)?;
        if !body.is_empty() {
            content.push_str(body);
            content.push('\n');
        }
        Ok(Rendered::Content(content))
    }
}
