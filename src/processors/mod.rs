//! The four structural processors.
//!
//! Each processor is a pure function of `(source text, Pattern list) ->
//! (Candidate list, SelectorInvalid list, FilterReason list)` — no shared
//! state, no I/O, and no mutation of the source text itself. The third
//! list records why a detected match was discarded before becoming a
//! Candidate, for the dry-run reporter's per-reason totals.

/// JSON/JSONC processor.
pub mod json;
/// Markdown processor (headings, frontmatter, code, links, images, paragraphs).
pub mod markdown;
/// HTML processor (element text and attribute values via CSS selectors).
pub mod html;
/// JSX/TSX processor (string literals in JSX text and attributes).
pub mod jsx;
