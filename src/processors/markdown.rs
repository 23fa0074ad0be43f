//! Markdown processor: headings, frontmatter, fenced/inline
//! code, links, images, and paragraphs, all reported against the original,
//! unmodified source.

use crate::error::SelectorInvalid;
use crate::frontmatter::{extract_frontmatter, resolve_dotted_path};
use crate::model::{Candidate, FilterReason, Pattern, Provenance};
use crate::parse;
use crate::placeholder::has_any_placeholder;
use markdown::mdast::Node;
use markdown::unist::Position;

/// Run every Markdown-context Pattern against `source`. A Markdown parse
/// failure yields zero AST-selector candidates for the whole file rather
/// than an error (frontmatter-selector candidates, parsed independently,
/// are unaffected).
pub fn process<'a>(
    source: &str,
    patterns: impl IntoIterator<Item = &'a Pattern>,
) -> (Vec<Candidate>, Vec<SelectorInvalid>, Vec<FilterReason>) {
    let patterns: Vec<&Pattern> = patterns.into_iter().collect();
    let frontmatter_patterns: Vec<&&Pattern> = patterns
        .iter()
        .filter(|p| p.selector.starts_with("frontmatter."))
        .collect();
    let ast_patterns: Vec<&&Pattern> = patterns
        .iter()
        .filter(|p| !p.selector.starts_with("frontmatter."))
        .collect();

    let mut candidates = Vec::new();
    let mut invalid = Vec::new();
    let mut filtered = Vec::new();

    for pattern in &frontmatter_patterns {
        match process_frontmatter(source, pattern) {
            Ok(Some(candidate)) => candidates.push(candidate),
            Ok(None) => {}
            Err(FrontmatterOutcome::ExistingPlaceholder) => {
                filtered.push(FilterReason::ExistingPlaceholder)
            }
            Err(FrontmatterOutcome::Invalid(reason)) => invalid.push(SelectorInvalid {
                expression: pattern.selector.clone(),
                reason,
            }),
        }
    }

    if ast_patterns.is_empty() {
        return (candidates, invalid, filtered);
    }

    let root = match parse::parse_mdast(source) {
        Ok(root) => root,
        Err(_) => return (candidates, invalid, filtered),
    };

    let mut nodes = Vec::new();
    collect_nodes(&root, &mut nodes);

    for pattern in ast_patterns {
        let selector = SelectorKind::parse(&pattern.selector);
        let Some(selector) = selector else {
            invalid.push(SelectorInvalid {
                expression: pattern.selector.clone(),
                reason: "unrecognized markdown selector".to_string(),
            });
            continue;
        };

        let mut emitted = 0usize;
        for node in &nodes {
            let Some((text, start, end)) = selector.extract(node, source) else {
                continue;
            };
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
                provenance: Provenance::Markdown {
                    selector: pattern.selector.clone(),
                },
            });
            emitted += 1;
        }
    }

    (candidates, invalid, filtered)
}

/// Outcome of a failed frontmatter lookup, distinguishing a filtered match
/// from a genuinely invalid selector expression.
enum FrontmatterOutcome {
    ExistingPlaceholder,
    Invalid(String),
}

fn process_frontmatter(source: &str, pattern: &Pattern) -> Result<Option<Candidate>, FrontmatterOutcome> {
    let path = pattern
        .selector
        .strip_prefix("frontmatter.")
        .ok_or_else(|| FrontmatterOutcome::Invalid("expected frontmatter.<path> selector".to_string()))?;

    let extraction =
        extract_frontmatter(source).map_err(|e| FrontmatterOutcome::Invalid(e.to_string()))?;
    let Some(value) = resolve_dotted_path(&extraction.value, path) else {
        return Ok(None);
    };
    if value.is_empty() {
        return Ok(None);
    }

    let block = &source[extraction.block_range.clone()];
    let Some((rel_start, rel_end)) = locate_frontmatter_value(block, path, value) else {
        return Ok(None);
    };
    let start = extraction.block_range.start + rel_start;
    let end = extraction.block_range.start + rel_end;
    let text = value.to_string();

    if has_any_placeholder(&text) {
        return Err(FrontmatterOutcome::ExistingPlaceholder);
    }

    Ok(Some(Candidate {
        placeholder: pattern.placeholder.clone(),
        original_text: text,
        start,
        end,
        context: pattern.context,
        rule_order: pattern.rule_order,
        provenance: Provenance::Markdown {
            selector: pattern.selector.clone(),
        },
    }))
}

/// Locate `key: "value"` (quoted form, tried first) or `key: value` (bare
/// form) for the final path segment within the YAML block,
fn locate_frontmatter_value(block: &str, path: &str, value: &str) -> Option<(usize, usize)> {
    let key = path.rsplit('.').next().unwrap_or(path);

    let quoted_needle = format!("{key}: \"{value}\"");
    if let Some(pos) = block.find(&quoted_needle) {
        let value_start = pos + key.len() + 3; // `key: "`
        return Some((value_start, value_start + value.len()));
    }

    let single_quoted_needle = format!("{key}: '{value}'");
    if let Some(pos) = block.find(&single_quoted_needle) {
        let value_start = pos + key.len() + 3;
        return Some((value_start, value_start + value.len()));
    }

    let bare_needle = format!("{key}: {value}");
    if let Some(pos) = block.find(&bare_needle) {
        let value_start = pos + key.len() + 2; // `key: `
        return Some((value_start, value_start + value.len()));
    }

    None
}

/// Flatten the MDAST tree into a pre-order node list, for selectors that
/// scan "every node of kind X" without needing a visitor trait.
fn collect_nodes<'a>(node: &'a Node, out: &mut Vec<&'a Node>) {
    out.push(node);
    if let Some(children) = node.children() {
        for child in children {
            collect_nodes(child, out);
        }
    }
}

enum SelectorKind {
    Heading(Vec<u8>),
    Code,
    InlineCode,
    Link,
    Image,
    Paragraph,
}

impl SelectorKind {
    fn parse(selector: &str) -> Option<SelectorKind> {
        match selector {
            "code" => Some(SelectorKind::Code),
            "inline-code" => Some(SelectorKind::InlineCode),
            "link" => Some(SelectorKind::Link),
            "image" => Some(SelectorKind::Image),
            "p" => Some(SelectorKind::Paragraph),
            _ => {
                let levels: Option<Vec<u8>> = selector
                    .split(',')
                    .map(|part| {
                        let part = part.trim();
                        part.strip_prefix('h')
                            .and_then(|n| n.parse::<u8>().ok())
                            .filter(|n| (1..=6).contains(n))
                    })
                    .collect();
                levels.filter(|l| !l.is_empty()).map(SelectorKind::Heading)
            }
        }
    }

    fn extract(&self, node: &Node, source: &str) -> Option<(String, usize, usize)> {
        match self {
            SelectorKind::Heading(levels) => {
                let Node::Heading(heading) = node else {
                    return None;
                };
                if !levels.contains(&heading.depth) {
                    return None;
                }
                let first = heading.children.first()?;
                let last = heading.children.last()?;
                let start = position_start(first.position())?;
                let end = position_end(last.position())?;
                Some((source[start..end].to_string(), start, end))
            }
            SelectorKind::Code => {
                let Node::Code(code) = node else {
                    return None;
                };
                let pos = code.position.as_ref()?;
                let (start, end) = inner_code_fence_span(source, pos)?;
                Some((source[start..end].to_string(), start, end))
            }
            SelectorKind::InlineCode => {
                let Node::InlineCode(inline) = node else {
                    return None;
                };
                let pos = inline.position.as_ref()?;
                let slice = &source[pos.start.offset..pos.end.offset];
                let ticks = slice.bytes().take_while(|&b| b == b'`').count();
                if ticks == 0 || slice.len() < ticks * 2 {
                    return None;
                }
                let start = pos.start.offset + ticks;
                let end = pos.end.offset - ticks;
                if start >= end {
                    return None;
                }
                Some((source[start..end].to_string(), start, end))
            }
            SelectorKind::Link => {
                let Node::Link(link) = node else {
                    return None;
                };
                if !link.url.starts_with("http") {
                    return None;
                }
                let pos = link.position.as_ref()?;
                let slice = &source[pos.start.offset..pos.end.offset];
                let rel = slice.find(link.url.as_str())?;
                let start = pos.start.offset + rel;
                let end = start + link.url.len();
                Some((link.url.clone(), start, end))
            }
            SelectorKind::Image => {
                let Node::Image(image) = node else {
                    return None;
                };
                let allowed = image.url.starts_with("http")
                    || image.url.starts_with("/")
                    || image.url.starts_with("./")
                    || image.url.starts_with("../");
                if !allowed {
                    return None;
                }
                let pos = image.position.as_ref()?;
                let slice = &source[pos.start.offset..pos.end.offset];
                let rel = slice.find(image.url.as_str())?;
                let start = pos.start.offset + rel;
                let end = start + image.url.len();
                Some((image.url.clone(), start, end))
            }
            SelectorKind::Paragraph => {
                let Node::Paragraph(paragraph) = node else {
                    return None;
                };
                let pos = paragraph.position.as_ref()?;
                let slice = &source[pos.start.offset..pos.end.offset];
                let trimmed = slice.trim();
                if trimmed.is_empty() {
                    return None;
                }
                let leading = slice.len() - slice.trim_start().len();
                let start = pos.start.offset + leading;
                let end = start + trimmed.len();
                Some((trimmed.to_string(), start, end))
            }
        }
    }
}

fn position_start(position: Option<&Position>) -> Option<usize> {
    position.map(|p| p.start.offset)
}

fn position_end(position: Option<&Position>) -> Option<usize> {
    position.map(|p| p.end.offset)
}

/// Given a fenced code block's full position span (including the fence
/// lines), return the byte range of its inner content only.
fn inner_code_fence_span(source: &str, pos: &Position) -> Option<(usize, usize)> {
    let block = &source[pos.start.offset..pos.end.offset];
    let first_newline = block.find('\n')?;
    let content_start = pos.start.offset + first_newline + 1;

    // The closing fence is the block's last line; trim it and any trailing
    // newline that precedes it.
    let last_line_start = block.rfind('\n').map(|i| i + 1).unwrap_or(0);
    let mut content_end = pos.start.offset + last_line_start;
    if content_end > content_start && source.as_bytes()[content_end - 1] == b'\n' {
        content_end -= 1;
    }
    if content_end < content_start {
        content_end = content_start;
    }
    Some((content_start, content_end))
}
