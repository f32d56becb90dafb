//! Markdown rendering for mirrored documents.
//!
//! [`MarkdownRenderer`] plugs into the mirror engine's `Renderer` seam. For
//! each document it fetches the body from the content source and produces a
//! Markdown file:
//!
//! ```text
//! ---
//! title: Setup
//! url: https://www.yuque.com/team/handbook/setup
//! ---
//!
//! Body, with links to other mirrored documents rewritten to ../Intro.md
//! ```
//!
//! Spreadsheet documents are converted to Markdown tables. Inline `<br>` tags
//! become newlines and `<font>` wrappers are removed.

mod html;
mod links;
mod renderer;
mod sheet;

pub use html::clean_html;
pub use links::{LinkRewriter, relative_path};
pub use renderer::MarkdownRenderer;
pub use sheet::sheet_to_markdown;
