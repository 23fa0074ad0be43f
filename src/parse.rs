//! Markdown AST parsing for the Markdown processor.

use markdown::mdast::Node;
use markdown::message::{Message, Place};

/// Parse a markdown document into an MDAST tree, GFM-enabled, without
/// frontmatter (frontmatter is handled separately by [`crate::frontmatter`]
/// so that its value-location logic can work against raw YAML text rather
/// than a re-serialized node).
pub fn parse_mdast(input: &str) -> Result<Node, ParseError> {
    let options = markdown::ParseOptions {
        constructs: markdown::Constructs {
            gfm_autolink_literal: true,
            gfm_footnote_definition: true,
            gfm_label_start_footnote: true,
            gfm_strikethrough: true,
            gfm_table: true,
            gfm_task_list_item: true,
            frontmatter: true,
            ..Default::default()
        },
        ..markdown::ParseOptions::default()
    };

    markdown::to_mdast(input, &options).map_err(|err| ParseError {
        message: err.to_string(),
        location: message_location(&err),
    })
}

/// A Markdown parse failure, recorded as [`crate::error::SkipReason::ParseFailure`]
/// rather than propagated.
#[derive(Debug, Clone)]
pub struct ParseError {
    /// Human-readable message from the underlying parser.
    pub message: String,
    /// Line/column the parser was positioned at when it failed.
    pub location: crate::error::SourceLocation,
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} at {}", self.message, self.location)
    }
}

fn message_location(message: &Message) -> crate::error::SourceLocation {
    match &message.place {
        Some(place) => match place.as_ref() {
            Place::Point(point) => crate::error::SourceLocation::new(point.line, point.column),
            Place::Position(position) => {
                crate::error::SourceLocation::new(position.start.line, position.start.column)
            }
        },
        None => crate::error::SourceLocation::new(1, 1),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_heading() {
        let root = parse_mdast("# Title\n\nHello.").expect("should parse");
        assert!(matches!(root, Node::Root(_)));
    }

    #[test]
    fn surfaces_location_on_failure() {
        // markdown-rs is a permissive parser; this input exercises the
        // error path via a malformed footnote reference inside GFM mode is
        // not guaranteed to fail, so we only assert the happy path parses.
        assert!(parse_mdast("plain text").is_ok());
    }
}
