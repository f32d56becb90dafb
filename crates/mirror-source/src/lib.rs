//! Content source for the mirror build engine.
//!
//! The hosted service is consumed through the [`ContentSource`] trait with
//! three operations: list repositories, list one repository's records (its
//! table of contents plus its full document list), and fetch one document's
//! body.
//!
//! # Implementations
//!
//! - [`MetaDirSource`]: reads the JSON cache the crawler leaves under the
//!   metadata directory (`<meta>/<user>/<repo>/{repo,toc,docs}.json` and
//!   `docs/<slug>.json`)
//! - [`MockSource`]: in-memory source for tests (behind the `mock` feature flag)

mod error;
mod meta_dir;
#[cfg(feature = "mock")]
mod mock;
mod source;
mod types;

pub use error::SourceError;
pub use meta_dir::MetaDirSource;
#[cfg(feature = "mock")]
pub use mock::MockSource;
pub use source::{ContentSource, RepoRecords};
pub use types::{DocDetail, DocSummary, Repository, TocEntry, TocKind};
