//! Terminal reporting for the `mirror` binary.
//!
//! Everything goes to stderr so the mirror itself can be piped or redirected
//! without progress noise.

use std::error::Error;

use console::{Style, Term};

/// Verbs that remove something from the output area.
const REMOVAL_VERBS: &[&str] = &["delete", "remove", "rmdir"];

/// Styled stderr writer.
pub(crate) struct Output {
    term: Term,
    ok: Style,
    warn: Style,
    fail: Style,
    heading: Style,
}

impl Output {
    pub(crate) fn new() -> Self {
        Self {
            term: Term::stderr(),
            ok: Style::new().green(),
            warn: Style::new().yellow(),
            fail: Style::new().red(),
            heading: Style::new().cyan().bold(),
        }
    }

    fn line(&self, text: &str) {
        let _ = self.term.write_line(text);
    }

    /// Plain message.
    pub(crate) fn info(&self, msg: &str) {
        self.line(msg);
    }

    /// Yellow message.
    pub(crate) fn warning(&self, msg: &str) {
        self.line(&self.warn.apply_to(msg).to_string());
    }

    /// Bold section heading.
    pub(crate) fn heading(&self, msg: &str) {
        self.line(&self.heading.apply_to(msg).to_string());
    }

    /// One planned change: a right-aligned verb, red for removals and green
    /// otherwise, followed by the output path.
    pub(crate) fn action(&self, verb: &str, path: &str) {
        let style = if REMOVAL_VERBS.contains(&verb) {
            &self.fail
        } else {
            &self.ok
        };
        self.line(&format!("{} {path}", style.apply_to(format!("{verb:>8}"))));
    }

    /// Final build summary, green when the cycle finished cleanly.
    pub(crate) fn summary(&self, msg: &str, clean: bool) {
        let style = if clean { &self.ok } else { &self.warn };
        self.line(&style.apply_to(msg).to_string());
    }

    /// An error followed by its cause chain.
    pub(crate) fn error_chain(&self, err: &dyn Error) {
        self.line(&self.fail.apply_to(format!("Error: {err}")).to_string());
        let mut source = err.source();
        while let Some(cause) = source {
            self.line(&self.fail.apply_to(format!("  caused by: {cause}")).to_string());
            source = cause.source();
        }
    }
}
