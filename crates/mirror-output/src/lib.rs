//! Output area abstraction for the mirror build engine.
//!
//! The build engine touches the output directory only through the
//! [`OutputStore`] trait, which exposes five primitives: `create_dir`,
//! `write_file`, `delete`, `exists` and `list_dir`. Keeping the surface this
//! small lets the engine run against:
//!
//! - [`FsOutput`] for a real directory on disk
//! - [`MockOutput`] for in-memory tests (behind the `mock` feature flag)
//!
//! # Path Convention
//!
//! All paths are **relative output paths** with `/` separators:
//! - `""` - the output root
//! - `"handbook"` - a top-level directory
//! - `"handbook/intro.md"` - a rendered document
//!
//! # Example
//!
//! ```ignore
//! use std::path::PathBuf;
//! use mirror_output::{FsOutput, OutputStore};
//!
//! let output = FsOutput::new(PathBuf::from("storage"));
//! output.write_file("handbook/intro.md", b"# Intro\n")?;
//! for entry in output.list_dir("handbook")? {
//!     println!("{} (dir: {})", entry.name, entry.is_dir);
//! }
//! ```

mod fs;
#[cfg(feature = "mock")]
mod mock;
mod store;

pub use fs::FsOutput;
#[cfg(feature = "mock")]
pub use mock::MockOutput;
pub use store::{Entry, OutputError, OutputErrorKind, OutputStore, join_path};
