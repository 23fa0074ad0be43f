#![deny(missing_docs)]
//! Configurable templatization engine: detects content that varies between
//! instantiations of a project (names, descriptions, versions, URLs,
//! copyright text) and rewrites it in place as named placeholder tokens.
//!
//! The entry points a surrounding CLI consumes are [`config::load_config`]
//! and [`converter::convert`]. Everything else — the four structural
//! processors, the skip-region detector, and the placeholder-format helper
//! — is an implementation detail of those two calls, exposed publicly so a
//! caller can build custom tooling (e.g. a dry-run reporter, which this
//! crate also ships in [`report`]) on top of the same primitives.

/// Converter pipeline: file discovery, processor dispatch, conflict
/// resolution, and the in-place rewriter.
pub mod converter;
/// Config schema, loading/validation, and file-to-Pattern resolution.
pub mod config;
/// Crate-wide error and diagnostic types.
pub mod error;
/// YAML frontmatter extraction for the Markdown processor.
pub mod frontmatter;
/// Core data types: `Context`, `Pattern`, `Config`, `Candidate`.
pub mod model;
/// Markdown AST parsing.
pub mod parse;
/// Placeholder token formatting and recognition.
pub mod placeholder;
/// The four structural processors (JSON, Markdown, HTML, JSX/TSX).
pub mod processors;
/// Dry-run reporter: renders a planned conversion without writing files.
pub mod report;
/// Skip-region detection, shared across all four processors.
pub mod skip_region;

pub use config::{Config, load_config};
pub use converter::{CancellationToken, ConvertOptions, ConvertReport, convert};
pub use error::ConfigError;
pub use model::{Candidate, Context, Pattern};
pub use placeholder::PlaceholderStyle;
