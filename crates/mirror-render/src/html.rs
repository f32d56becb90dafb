//! Cleanup of inline HTML left in exported Markdown.

use std::sync::LazyLock;

use regex::Regex;

/// Line break tags: `<br>`, `<br/>`, `<br />`.
static BR_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)<br\s*/?>").unwrap());

/// Font wrappers, including the escaped `\<font>` form.
static FONT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)\\?<font[^>]*>(.*?)</font>").unwrap());

/// Turn line break tags into newlines and unwrap `<font>` elements.
#[must_use]
pub fn clean_html(markdown: &str) -> String {
    let text = BR_RE.replace_all(markdown, "\n");
    FONT_RE.replace_all(&text, "$1").into_owned()
}
