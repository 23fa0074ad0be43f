//! Core data types: [`Context`], [`Pattern`], [`Config`], [`Candidate`].
//!
//! `Context` is a closed sum type rather than the raw MIME-like string the
//! config file spells it as — dispatch to a processor is a `match`, not a
//! string comparison sprinkled through the pipeline.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The dispatch tag on a [`Pattern`], selecting both the processor and the
/// structural refinement within it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Context {
    /// `application/json`
    Json,
    /// `text/markdown` (aliased with `#paragraph`).
    Markdown,
    /// `text/markdown#heading`
    MarkdownHeading,
    /// `text/markdown#paragraph`
    MarkdownParagraph,
    /// `text/html`
    Html,
    /// `text/html#attribute`
    HtmlAttribute,
    /// `text/jsx`
    Jsx,
    /// `text/jsx#text`
    JsxText,
    /// `text/jsx#attribute`
    JsxAttribute,
    /// `text/plain` — recognized by the config loader but matched by no
    /// processor in this implementation (no structural selector applies to
    /// unstructured text); a Pattern with this context contributes zero
    /// candidates.
    PlainText,
}

impl Context {
    /// Parse the wire string form used in the config file.
    pub fn parse(s: &str) -> Option<Context> {
        Some(match s {
            "application/json" => Context::Json,
            "text/markdown" => Context::Markdown,
            "text/markdown#heading" => Context::MarkdownHeading,
            "text/markdown#paragraph" => Context::MarkdownParagraph,
            "text/html" => Context::Html,
            "text/html#attribute" => Context::HtmlAttribute,
            "text/jsx" => Context::Jsx,
            "text/jsx#text" => Context::JsxText,
            "text/jsx#attribute" => Context::JsxAttribute,
            "text/plain" => Context::PlainText,
            _ => return None,
        })
    }

    /// Render back to the wire string form, for diagnostics.
    pub fn as_str(self) -> &'static str {
        match self {
            Context::Json => "application/json",
            Context::Markdown => "text/markdown",
            Context::MarkdownHeading => "text/markdown#heading",
            Context::MarkdownParagraph => "text/markdown#paragraph",
            Context::Html => "text/html",
            Context::HtmlAttribute => "text/html#attribute",
            Context::Jsx => "text/jsx",
            Context::JsxText => "text/jsx#text",
            Context::JsxAttribute => "text/jsx#attribute",
            Context::PlainText => "text/plain",
        }
    }

    /// Whether this context is handled by the JSON processor.
    pub fn is_json(self) -> bool {
        matches!(self, Context::Json)
    }

    /// Whether this context is handled by the Markdown processor.
    /// `Markdown` and `MarkdownParagraph` are treated as aliases (both
    /// select paragraph detection when `selector` is `p`, `h1`..`h6` when
    /// heading-shaped, etc).
    pub fn is_markdown(self) -> bool {
        matches!(
            self,
            Context::Markdown | Context::MarkdownHeading | Context::MarkdownParagraph
        )
    }

    /// Whether this context is handled by the HTML processor.
    pub fn is_html(self) -> bool {
        matches!(self, Context::Html | Context::HtmlAttribute)
    }

    /// Whether this context is handled by the JSX/TSX processor.
    pub fn is_jsx(self) -> bool {
        matches!(self, Context::Jsx | Context::JsxText | Context::JsxAttribute)
    }
}

impl fmt::Display for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A validated placeholder identifier, `[A-Z][A-Z0-9_]*`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct PlaceholderName(String);

impl PlaceholderName {
    /// Validate and construct a placeholder name.
    pub fn new(s: impl Into<String>) -> Result<Self, String> {
        let s = s.into();
        if crate::placeholder::is_valid_identifier(&s) {
            Ok(PlaceholderName(s))
        } else {
            Err(format!(
                "placeholder `{s}` does not match [A-Z][A-Z0-9_]*"
            ))
        }
    }

    /// Borrow the identifier text.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PlaceholderName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for PlaceholderName {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        PlaceholderName::new(s).map_err(serde::de::Error::custom)
    }
}

/// A single detection rule.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawPattern {
    /// MIME-like dispatch tag, validated and converted to [`Context`] by the
    /// config loader.
    pub context: String,
    /// CSS selector / JSONPath / literal tag, interpreted per `context`.
    #[serde(default)]
    pub selector: Option<String>,
    /// Dotted path, used by `frontmatter.<path>` selectors. Kept distinct
    /// from `selector` in the wire format, though both end up
    /// feeding the same processor dispatch.
    #[serde(default)]
    pub path: Option<String>,
    /// Attribute name, for `text/html#attribute` and `text/jsx#attribute`.
    #[serde(default)]
    pub attribute: Option<String>,
    /// Placeholder identifier to emit.
    pub placeholder: PlaceholderName,
    /// Whether more than one candidate may be accepted for this Pattern in
    /// a single file. Defaults to `true`.
    #[serde(default = "default_true")]
    pub allow_multiple: bool,
}

fn default_true() -> bool {
    true
}

/// A validated [`RawPattern`], with `context` resolved to a [`Context`] and
/// the selector/path unified into the single field each processor reads.
#[derive(Debug, Clone)]
pub struct Pattern {
    /// Resolved dispatch context.
    pub context: Context,
    /// Selector/path/heading-tag text, whichever the context calls for.
    /// JSONPath for `Json`, dotted path under `frontmatter.` or a literal
    /// tag for Markdown, CSS selector for HTML, element tag selector for
    /// JSX.
    pub selector: String,
    /// Attribute name (HTML/JSX attribute contexts only).
    pub attribute: Option<String>,
    /// Placeholder to emit on a match.
    pub placeholder: PlaceholderName,
    /// At most one candidate per file when `false`.
    pub allow_multiple: bool,
    /// Position of this Pattern within its rule list — earlier wins ties.
    pub rule_order: usize,
}

/// Provenance detail retained on a [`Candidate`] for diagnostics and dry-run
/// output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Provenance {
    /// JSONPath node path that produced the candidate, e.g. `$.name`.
    Json { node_path: String },
    /// Markdown selector, e.g. `h1` or `frontmatter.title`.
    Markdown { selector: String },
    /// HTML CSS selector and, for attribute candidates, the attribute name.
    Html {
        selector: String,
        attribute: Option<String>,
    },
    /// JSX element tag selector.
    Jsx { selector: String },
}

/// A proposed textual substitution, prior to conflict resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    /// Placeholder to substitute in.
    pub placeholder: PlaceholderName,
    /// The exact text that will be replaced.
    pub original_text: String,
    /// Start byte offset into the unmodified source (inclusive).
    pub start: usize,
    /// End byte offset into the unmodified source (exclusive).
    pub end: usize,
    /// Context that produced this candidate.
    pub context: Context,
    /// Index of the producing Pattern within the file's resolved rule list.
    pub rule_order: usize,
    /// Processor-specific provenance, for diagnostics.
    pub provenance: Provenance,
}

impl Candidate {
    /// The half-open byte span `[start, end)`.
    pub fn span(&self) -> std::ops::Range<usize> {
        self.start..self.end
    }

    /// Do this candidate's span and `other`'s overlap?
    pub fn overlaps(&self, other: &Candidate) -> bool {
        self.start < other.end && other.start < self.end
    }
}

/// Why a detected match did not survive to become an accepted [`Candidate`],
/// for the dry-run reporter's per-reason totals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterReason {
    /// `originalText` already contained a recognized placeholder token.
    ExistingPlaceholder,
    /// The span fell inside an open skip region.
    SkipRegion,
    /// The Pattern has `allowMultiple: false` and already contributed one candidate.
    AllowMultipleExceeded,
    /// The span overlapped an already-accepted candidate from an earlier Pattern.
    Overlap,
}

impl fmt::Display for FilterReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            FilterReason::ExistingPlaceholder => "existing-placeholder",
            FilterReason::SkipRegion => "skip-region",
            FilterReason::AllowMultipleExceeded => "allow-multiple-exceeded",
            FilterReason::Overlap => "overlap",
        })
    }
}
