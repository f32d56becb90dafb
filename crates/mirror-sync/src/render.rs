//! Renderer seam.

use crate::error::RenderError;
use crate::tree::{Tree, TreeNode};

/// Result of rendering one document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rendered {
    /// Text to write at the node's output path.
    Content(String),
    /// Nothing to write; the task completes without touching the output.
    Skip,
}

/// Converts a document node into output text.
///
/// Called from worker threads inside write tasks. The tree doubles as the
/// identity index for resolving links between documents.
pub trait Renderer: Send + Sync {
    /// Render `node`.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError`] if the document cannot be rendered. The failure
    /// is isolated to this node.
    fn render(&self, node: &TreeNode, tree: &Tree) -> Result<Rendered, RenderError>;
}
