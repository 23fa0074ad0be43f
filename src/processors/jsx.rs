//! JSX/TSX processor: string literals appearing as JSX text or
//! JSX attribute values, matched by a CSS-like element tag selector.
//!
//! Built on `tree-sitter` plus the TSX grammar, used uniformly for both
//! `.jsx` and `.tsx` sources — it is a strict syntactic superset of the
//! JSX grammar, so nothing is lost for plain `.jsx` input.

use crate::error::SelectorInvalid;
use crate::model::{Candidate, Context, FilterReason, Pattern, Provenance};
use crate::placeholder::has_any_placeholder;
use tree_sitter::Node;

/// Caps recursion depth when walking an externally-supplied AST.
const MAX_WALK_DEPTH: usize = 512;

/// Run every JSX-context Pattern against `source`.
pub fn process<'a>(
    source: &str,
    patterns: impl IntoIterator<Item = &'a Pattern>,
) -> (Vec<Candidate>, Vec<SelectorInvalid>, Vec<FilterReason>) {
    let patterns: Vec<&Pattern> = patterns.into_iter().filter(|p| p.context.is_jsx()).collect();
    if patterns.is_empty() {
        return (Vec::new(), Vec::new(), Vec::new());
    }

    let mut parser = tree_sitter::Parser::new();
    if parser
        .set_language(&tree_sitter_typescript::LANGUAGE_TSX.into())
        .is_err()
    {
        return (Vec::new(), Vec::new(), Vec::new());
    }
    let Some(tree) = parser.parse(source, None) else {
        return (Vec::new(), Vec::new(), Vec::new());
    };
    // A parser that cannot make sense of the input at all reports a wholly
    // missing or error-rooted tree; treat that like the JSON/Markdown
    // processors treat malformed input — zero candidates, no escalation.
    if tree.root_node().has_error() {
        return (Vec::new(), Vec::new(), Vec::new());
    }

    let mut elements = Vec::new();
    collect_jsx_elements(tree.root_node(), &mut elements, 0);

    let mut candidates = Vec::new();
    let mut invalid = Vec::new();
    let mut filtered = Vec::new();

    for pattern in patterns {
        let Some(selector) = ElementSelector::parse(&pattern.selector) else {
            invalid.push(SelectorInvalid {
                expression: pattern.selector.clone(),
                reason: "invalid JSX element selector".to_string(),
            });
            continue;
        };

        let mut emitted = 0usize;
        for &element in &elements {
            if !selector.matches(element, source) {
                continue;
            }

            let extracted = match pattern.context {
                Context::JsxText => jsx_text_content(element, source),
                Context::JsxAttribute => pattern
                    .attribute
                    .as_deref()
                    .and_then(|attr| jsx_attribute_value(element, source, attr)),
                Context::Jsx => match pattern.attribute.as_deref() {
                    Some(attr) => jsx_attribute_value(element, source, attr),
                    None => jsx_text_content(element, source),
                },
                _ => None,
            };

            let Some((text, start, end)) = extracted else { continue };
            if text.is_empty() {
                continue;
            }
            if !pattern.allow_multiple && emitted >= 1 {
                filtered.push(FilterReason::AllowMultipleExceeded);
                continue;
            }
            if has_any_placeholder(&text) {
                filtered.push(FilterReason::ExistingPlaceholder);
                continue;
            }

            candidates.push(Candidate {
                placeholder: pattern.placeholder.clone(),
                original_text: text,
                start,
                end,
                context: pattern.context,
                rule_order: pattern.rule_order,
                provenance: Provenance::Jsx {
                    selector: pattern.selector.clone(),
                },
            });
            emitted += 1;
        }
    }

    (candidates, invalid, filtered)
}

/// A CSS-like element selector with an optional single attribute filter,
/// e.g. `title` or `meta[name="description"]`.
struct ElementSelector {
    tag: String,
    attribute_filter: Option<(String, String)>,
}

impl ElementSelector {
    fn parse(selector: &str) -> Option<ElementSelector> {
        let selector = selector.trim();
        let Some(bracket) = selector.find('[') else {
            if selector.is_empty() {
                return None;
            }
            return Some(ElementSelector {
                tag: selector.to_string(),
                attribute_filter: None,
            });
        };
        let tag = selector[..bracket].trim().to_string();
        let inner = selector[bracket + 1..].trim_end_matches(']').trim();
        let (attr, value) = inner.split_once('=')?;
        let value = value.trim().trim_matches(['"', '\'']);
        if tag.is_empty() || attr.trim().is_empty() {
            return None;
        }
        Some(ElementSelector {
            tag,
            attribute_filter: Some((attr.trim().to_string(), value.to_string())),
        })
    }

    fn matches(&self, node: Node, source: &str) -> bool {
        let Some(tag) = jsx_tag_name(node, source) else {
            return false;
        };
        if tag != self.tag {
            return false;
        }
        match &self.attribute_filter {
            None => true,
            Some((attr, expected)) => jsx_attribute_value(node, source, attr)
                .is_some_and(|(value, _, _)| &value == expected),
        }
    }
}

/// Recursively collect every `jsx_element`/`jsx_self_closing_element` node.
fn collect_jsx_elements<'tree>(node: Node<'tree>, out: &mut Vec<Node<'tree>>, depth: usize) {
    if depth > MAX_WALK_DEPTH {
        return;
    }
    if matches!(node.kind(), "jsx_element" | "jsx_self_closing_element") {
        out.push(node);
    }
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        collect_jsx_elements(child, out, depth + 1);
    }
}

/// The opening tag node for either element shape.
fn opening_tag<'tree>(node: Node<'tree>) -> Option<Node<'tree>> {
    match node.kind() {
        "jsx_self_closing_element" => Some(node),
        "jsx_element" => node.child_by_field_name("open_tag"),
        _ => None,
    }
}

fn jsx_tag_name(node: Node<'_>, source: &str) -> Option<String> {
    let opening = opening_tag(node)?;
    let name_node = opening.child_by_field_name("name")?;
    Some(source[name_node.byte_range()].to_string())
}

/// Find the named attribute's string value, excluding the surrounding
/// quotes — the span covers only the interior string literal content.
fn jsx_attribute_value(node: Node<'_>, source: &str, attr_name: &str) -> Option<(String, usize, usize)> {
    let opening = opening_tag(node)?;
    let mut cursor = opening.walk();
    for attribute in opening.children_by_field_name("attribute", &mut cursor) {
        let name_node = attribute.child_by_field_name("name")?;
        if &source[name_node.byte_range()] != attr_name {
            continue;
        }
        let value_node = attribute.child_by_field_name("value")?;
        if value_node.kind() != "string" {
            return None;
        }
        let mut value_cursor = value_node.walk();
        for fragment in value_node.children(&mut value_cursor) {
            if fragment.kind() == "string_fragment" {
                return Some((
                    source[fragment.byte_range()].to_string(),
                    fragment.start_byte(),
                    fragment.end_byte(),
                ));
            }
        }
        return None;
    }
    None
}

/// Collect the text of direct `jsx_text` children of a `jsx_element`,
/// trimmed of leading/trailing whitespace.
fn jsx_text_content(node: Node<'_>, source: &str) -> Option<(String, usize, usize)> {
    if node.kind() != "jsx_element" {
        return None;
    }
    let mut start = None;
    let mut end = 0usize;
    let mut text = String::new();

    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        if child.kind() == "jsx_text" {
            if start.is_none() {
                start = Some(child.start_byte());
            }
            end = child.end_byte();
            text.push_str(&source[child.byte_range()]);
        }
    }

    let start = start?;
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }
    let leading = text.len() - text.trim_start().len();
    let trailing = text.len() - text.trim_end().len();
    Some((trimmed.to_string(), start + leading, end - trailing))
}
