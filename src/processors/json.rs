//! JSON/JSONC processor.
//!
//! Parses the comment-stripped source into a generic [`serde_json::Value`]
//! tree, evaluates each Pattern's JSONPath against it, and locates the
//! resulting string values back in the *original* (un-stripped) source by
//! literal search for their JSON-quoted form.

use crate::error::SelectorInvalid;
use crate::model::{Candidate, FilterReason, Pattern, Provenance};
use crate::placeholder::has_any_placeholder;
use serde_json::Value;

/// Run every JSON-context Pattern against `source`, returning every
/// surviving candidate. Malformed JSON yields zero candidates for the
/// whole file rather than an error — the file is left unchanged instead
/// of aborting the batch.
pub fn process<'a>(
    source: &str,
    patterns: impl IntoIterator<Item = &'a Pattern>,
) -> (Vec<Candidate>, Vec<SelectorInvalid>, Vec<FilterReason>) {
    let stripped = strip_jsonc_comments(source);
    let root: Value = match serde_json::from_str(&stripped) {
        Ok(v) => v,
        Err(_) => return (Vec::new(), Vec::new(), Vec::new()),
    };

    let mut candidates = Vec::new();
    let mut invalid = Vec::new();
    let mut filtered = Vec::new();

    for pattern in patterns {
        let Some(expr) = parse_json_path(&pattern.selector) else {
            invalid.push(SelectorInvalid {
                expression: pattern.selector.clone(),
                reason: "not a valid JSONPath expression".to_string(),
            });
            continue;
        };

        let mut matches = Vec::new();
        evaluate(&root, &expr, "$".to_string(), &mut matches);

        let mut emitted = 0usize;
        for (node_path, text) in matches {
            if text.is_empty() {
                continue;
            }
            if !pattern.allow_multiple && emitted >= 1 {
                filtered.push(FilterReason::AllowMultipleExceeded);
                continue;
            }
            let Some((start, end)) = locate_quoted_value(source, &text) else {
                continue;
            };
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
                provenance: Provenance::Json { node_path },
            });
            emitted += 1;
        }
    }

    (candidates, invalid, filtered)
}

/// Locate the interior span of the first occurrence of `value`'s
/// JSON-quoted form in `source`. Returns the byte range excluding the
/// surrounding quote characters.
fn locate_quoted_value(source: &str, value: &str) -> Option<(usize, usize)> {
    let quoted = serde_json::to_string(value).ok()?;
    let pos = source.find(&quoted)?;
    // quoted form is `"...contents..."`; interior excludes both quote bytes.
    Some((pos + 1, pos + quoted.len() - 1))
}

/// One step of a parsed JSONPath expression.
#[derive(Debug, Clone)]
enum PathStep {
    /// `.key`
    Key(String),
    /// `.*` or `[*]`
    Wildcard,
    /// `[N]`
    Index(usize),
}

/// Parse a small JSONPath subset: `$.x.y`, array indexing `[n]`, and
/// wildcards (`[*]`, `.*`). Returns `None` for anything outside that
/// grammar; the Pattern that produced it is then silently skipped rather
/// than aborting the file.
fn parse_json_path(expr: &str) -> Option<Vec<PathStep>> {
    let rest = expr.strip_prefix('$')?;
    let mut steps = Vec::new();
    let chars: Vec<char> = rest.chars().collect();
    let mut i = 0;

    while i < chars.len() {
        match chars[i] {
            '.' => {
                i += 1;
                if i < chars.len() && chars[i] == '*' {
                    steps.push(PathStep::Wildcard);
                    i += 1;
                    continue;
                }
                let start = i;
                while i < chars.len() && chars[i] != '.' && chars[i] != '[' {
                    i += 1;
                }
                if start == i {
                    return None;
                }
                let key: String = chars[start..i].iter().collect();
                steps.push(PathStep::Key(key));
            }
            '[' => {
                i += 1;
                let start = i;
                while i < chars.len() && chars[i] != ']' {
                    i += 1;
                }
                if i >= chars.len() {
                    return None;
                }
                let inner: String = chars[start..i].iter().collect();
                i += 1; // skip ']'
                if inner == "*" {
                    steps.push(PathStep::Wildcard);
                } else {
                    let idx: usize = inner.parse().ok()?;
                    steps.push(PathStep::Index(idx));
                }
            }
            _ => return None,
        }
    }

    Some(steps)
}

/// Walk `value` by the remaining path steps, pushing `(node_path, string)`
/// for every leaf that resolves to a non-empty string.
fn evaluate(value: &Value, steps: &[PathStep], node_path: String, out: &mut Vec<(String, String)>) {
    let Some((step, rest)) = steps.split_first() else {
        if let Value::String(s) = value
            && !s.is_empty()
        {
            out.push((node_path, s.clone()));
        }
        return;
    };

    match step {
        PathStep::Key(key) => {
            if let Some(child) = value.as_object().and_then(|o| o.get(key)) {
                evaluate(child, rest, format!("{node_path}.{key}"), out);
            }
        }
        PathStep::Index(idx) => {
            if let Some(child) = value.as_array().and_then(|a| a.get(*idx)) {
                evaluate(child, rest, format!("{node_path}[{idx}]"), out);
            }
        }
        PathStep::Wildcard => match value {
            Value::Array(items) => {
                for (idx, item) in items.iter().enumerate() {
                    evaluate(item, rest, format!("{node_path}[{idx}]"), out);
                }
            }
            Value::Object(map) => {
                for (key, item) in map {
                    evaluate(item, rest, format!("{node_path}.{key}"), out);
                }
            }
            _ => {}
        },
    }
}

/// Strip `//` line comments and `/* */` block comments that lie outside
/// string literals, leaving all non-comment bytes (including whitespace) in
/// place so offsets into the stripped text still land on the same
/// characters as the original — byte-for-byte, minus the comment bytes
/// themselves, which are blanked with spaces rather than removed so the
/// stripped text is never used for offset math — only the original source
/// text is, when locating a matched value's span.
pub fn strip_jsonc_comments(source: &str) -> String {
    // Operates on raw bytes rather than chars: every byte that isn't part of
    // a comment marker is copied verbatim (including multi-byte UTF-8
    // continuation bytes), and comment bytes are blanked with single-byte
    // ASCII space/newline, so the buffer stays valid UTF-8 throughout.
    let bytes = source.as_bytes();
    let mut out: Vec<u8> = Vec::with_capacity(source.len());
    let mut i = 0;
    let mut in_string = false;
    let mut escaped = false;

    while i < bytes.len() {
        let b = bytes[i];

        if in_string {
            out.push(b);
            if escaped {
                escaped = false;
            } else if b == b'\\' {
                escaped = true;
            } else if b == b'"' {
                in_string = false;
            }
            i += 1;
            continue;
        }

        if b == b'"' {
            in_string = true;
            out.push(b);
            i += 1;
            continue;
        }

        if b == b'/' && bytes.get(i + 1) == Some(&b'/') {
            while i < bytes.len() && bytes[i] != b'\n' {
                out.push(b' ');
                i += 1;
            }
            continue;
        }

        if b == b'/' && bytes.get(i + 1) == Some(&b'*') {
            out.push(b' ');
            out.push(b' ');
            i += 2;
            while i + 1 < bytes.len() && !(bytes[i] == b'*' && bytes[i + 1] == b'/') {
                out.push(if bytes[i] == b'\n' { b'\n' } else { b' ' });
                i += 1;
            }
            if i + 1 < bytes.len() {
                out.push(b' ');
                out.push(b' ');
                i += 2;
            } else {
                i = bytes.len();
            }
            continue;
        }

        out.push(b);
        i += 1;
    }

    String::from_utf8(out).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Context, PlaceholderName};

    fn pattern(selector: &str, placeholder: &str, allow_multiple: bool) -> Pattern {
        Pattern {
            context: Context::Json,
            selector: selector.to_string(),
            attribute: None,
            placeholder: PlaceholderName::new(placeholder).unwrap(),
            allow_multiple,
            rule_order: 0,
        }
    }

    #[test]
    fn scenario_json_name_field() {
        let source = r#"{"name": "acme-widget", "version": "0.1.0"}"#;
        let patterns = vec![pattern("$.name", "PACKAGE_NAME", false)];
        let (candidates, invalid, _) = process(source, &patterns);
        assert!(invalid.is_empty());
        assert_eq!(candidates.len(), 1);
        let c = &candidates[0];
        assert_eq!(c.original_text, "acme-widget");
        assert_eq!(&source[c.start..c.end], "acme-widget");
    }

    #[test]
    fn existing_placeholder_is_discarded() {
        let source = r#"{"name": "⦃PACKAGE_NAME⦄"}"#;
        let patterns = vec![pattern("$.name", "PACKAGE_NAME", false)];
        let (candidates, _, _) = process(source, &patterns);
        assert!(candidates.is_empty());
    }

    #[test]
    fn malformed_json_yields_zero_candidates() {
        let source = "{not json";
        let patterns = vec![pattern("$.name", "PACKAGE_NAME", false)];
        let (candidates, invalid, _) = process(source, &patterns);
        assert!(candidates.is_empty());
        assert!(invalid.is_empty());
    }

    #[test]
    fn invalid_jsonpath_is_skipped_per_pattern() {
        let source = r#"{"name": "acme"}"#;
        let patterns = vec![pattern("not-a-path", "X", false)];
        let (candidates, invalid, _) = process(source, &patterns);
        assert!(candidates.is_empty());
        assert_eq!(invalid.len(), 1);
    }

    #[test]
    fn wildcard_matches_every_array_element() {
        let source = r#"{"authors": ["Ada", "Grace"]}"#;
        let patterns = vec![pattern("$.authors[*]", "AUTHOR", true)];
        let (candidates, _, _) = process(source, &patterns);
        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[0].original_text, "Ada");
        assert_eq!(candidates[1].original_text, "Grace");
    }

    #[test]
    fn allow_multiple_false_caps_at_one() {
        let source = r#"{"authors": ["Ada", "Grace"]}"#;
        let patterns = vec![pattern("$.authors[*]", "AUTHOR", false)];
        let (candidates, _, _) = process(source, &patterns);
        assert_eq!(candidates.len(), 1);
    }

    #[test]
    fn jsonc_comments_are_stripped_before_parsing() {
        let source = "{\n  // the package name\n  \"name\": \"acme\" /* trailing */\n}";
        let patterns = vec![pattern("$.name", "PACKAGE_NAME", false)];
        let (candidates, _, _) = process(source, &patterns);
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].original_text, "acme");
    }

    #[test]
    fn comment_markers_inside_strings_are_preserved() {
        let stripped = strip_jsonc_comments(r#"{"url": "http://example.com"}"#);
        let value: Value = serde_json::from_str(&stripped).unwrap();
        assert_eq!(value["url"], "http://example.com");
    }
}
