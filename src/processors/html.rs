//! HTML processor: element text content and attribute values,
//! matched by CSS selector.
//!
//! Built on `lol_html`'s streaming rewriter rather than a retained DOM.
//! A single rewrite pass handles every HTML-context Pattern for a file at
//! once, aggregating selector/handler pairs up front instead of
//! reparsing per pattern.

use crate::error::SelectorInvalid;
use crate::model::{Candidate, Context, FilterReason, Pattern, Provenance};
use crate::placeholder::has_any_placeholder;
use lol_html::{HtmlRewriter, Settings, element, text};
use std::cell::RefCell;

/// Accumulates the text content of successive occurrences of one matched
/// element selector, keyed to this Pattern alone.
#[derive(Default)]
struct TextAccumulator {
    current: RefCell<Option<(usize, usize, String)>>,
    results: RefCell<Vec<(usize, usize, String)>>,
}

/// Accumulates attribute values of successive matched elements.
#[derive(Default)]
struct AttributeAccumulator {
    results: RefCell<Vec<String>>,
}

/// Run every HTML-context Pattern against `source` in a single rewrite pass.
pub fn process<'a>(
    source: &str,
    patterns: impl IntoIterator<Item = &'a Pattern>,
) -> (Vec<Candidate>, Vec<SelectorInvalid>, Vec<FilterReason>) {
    let patterns: Vec<&Pattern> = patterns
        .into_iter()
        .filter(|p| matches!(p.context, Context::Html | Context::HtmlAttribute))
        .collect();
    if patterns.is_empty() {
        return (Vec::new(), Vec::new(), Vec::new());
    }

    let mut invalid = Vec::new();
    let text_states: Vec<Option<TextAccumulator>> = patterns
        .iter()
        .map(|p| (p.context == Context::Html).then(TextAccumulator::default))
        .collect();
    let attr_states: Vec<Option<AttributeAccumulator>> = patterns
        .iter()
        .map(|p| (p.context == Context::HtmlAttribute).then(AttributeAccumulator::default))
        .collect();

    let mut handlers = Vec::new();

    for (idx, pattern) in patterns.iter().enumerate() {
        if pattern.selector.parse::<lol_html::Selector>().is_err() {
            invalid.push(SelectorInvalid {
                expression: pattern.selector.clone(),
                reason: "invalid CSS selector".to_string(),
            });
            continue;
        }

        match pattern.context {
            Context::Html => {
                let state = text_states[idx].as_ref().unwrap();
                handlers.push(element!(pattern.selector.as_str(), move |el| {
                    *state.current.borrow_mut() = Some((usize::MAX, 0, String::new()));
                    el.on_end_tag(move |_end| {
                        if let Some((start, end, text)) = state.current.borrow_mut().take()
                            && start != usize::MAX
                        {
                            state.results.borrow_mut().push((start, end, text));
                        }
                        Ok(())
                    })?;
                    Ok(())
                }));
                handlers.push(text!(pattern.selector.as_str(), move |t| {
                    let loc = t.source_location().bytes();
                    let mut current = state.current.borrow_mut();
                    if let Some((start, end, text)) = current.as_mut() {
                        if *start == usize::MAX {
                            *start = loc.start;
                        }
                        *end = loc.end;
                        text.push_str(t.as_str());
                    }
                    Ok(())
                }));
            }
            Context::HtmlAttribute => {
                let Some(attribute) = pattern.attribute.clone() else {
                    invalid.push(SelectorInvalid {
                        expression: pattern.selector.clone(),
                        reason: "`text/html#attribute` pattern requires an `attribute` field"
                            .to_string(),
                    });
                    continue;
                };
                let state = attr_states[idx].as_ref().unwrap();
                handlers.push(element!(pattern.selector.as_str(), move |el| {
                    if let Some(value) = el.get_attribute(&attribute) {
                        state.results.borrow_mut().push(value);
                    }
                    Ok(())
                }));
            }
            _ => {}
        }
    }

    let settings = Settings {
        element_content_handlers: handlers,
        ..Settings::new()
    };
    let mut rewriter = HtmlRewriter::new(settings, |_chunk: &[u8]| {});
    if rewriter.write(source.as_bytes()).is_err() || rewriter.end().is_err() {
        return (Vec::new(), invalid, Vec::new());
    }
    drop(rewriter);

    let mut candidates = Vec::new();
    let mut filtered = Vec::new();

    for (idx, pattern) in patterns.iter().enumerate() {
        match pattern.context {
            Context::Html => {
                let Some(state) = &text_states[idx] else { continue };
                let mut emitted = 0usize;
                for (start, end, raw_text) in state.results.borrow().iter() {
                    let trimmed = raw_text.trim();
                    if trimmed.is_empty() {
                        continue;
                    }
                    if !pattern.allow_multiple && emitted >= 1 {
                        filtered.push(FilterReason::AllowMultipleExceeded);
                        continue;
                    }
                    if has_any_placeholder(trimmed) {
                        filtered.push(FilterReason::ExistingPlaceholder);
                        continue;
                    }
                    let leading = raw_text.len() - raw_text.trim_start().len();
                    let trailing = raw_text.len() - raw_text.trim_end().len();
                    let span_start = start + leading;
                    let span_end = end.saturating_sub(trailing);
                    if span_start >= span_end || span_end > source.len() {
                        continue;
                    }
                    candidates.push(Candidate {
                        placeholder: pattern.placeholder.clone(),
                        original_text: trimmed.to_string(),
                        start: span_start,
                        end: span_end,
                        context: pattern.context,
                        rule_order: pattern.rule_order,
                        provenance: Provenance::Html {
                            selector: pattern.selector.clone(),
                            attribute: None,
                        },
                    });
                    emitted += 1;
                }
            }
            Context::HtmlAttribute => {
                let Some(state) = &attr_states[idx] else { continue };
                let attribute = pattern.attribute.clone().unwrap_or_default();
                let mut emitted = 0usize;
                // Each pattern searches the whole file from the start: an
                // earlier pattern's match position must not shadow a later
                // pattern's match that occurs earlier in the source.
                let mut attribute_search_cursor = 0usize;
                for value in state.results.borrow().iter() {
                    if value.is_empty() {
                        continue;
                    }
                    if !pattern.allow_multiple && emitted >= 1 {
                        filtered.push(FilterReason::AllowMultipleExceeded);
                        continue;
                    }
                    if has_any_placeholder(value) {
                        filtered.push(FilterReason::ExistingPlaceholder);
                        continue;
                    }
                    let Some((start, end)) =
                        locate_attribute_value(source, &attribute, value, attribute_search_cursor)
                    else {
                        continue;
                    };
                    attribute_search_cursor = end;
                    candidates.push(Candidate {
                        placeholder: pattern.placeholder.clone(),
                        original_text: value.clone(),
                        start,
                        end,
                        context: pattern.context,
                        rule_order: pattern.rule_order,
                        provenance: Provenance::Html {
                            selector: pattern.selector.clone(),
                            attribute: Some(attribute.clone()),
                        },
                    });
                    emitted += 1;
                }
            }
            _ => {}
        }
    }

    (candidates, invalid, filtered)
}

/// Locate the interior span of `attr="value"` (or the single-quoted form),
/// searching forward from `from` so repeated identical values resolve to
/// successive occurrences rather than always the first.
fn locate_attribute_value(source: &str, attr: &str, value: &str, from: usize) -> Option<(usize, usize)> {
    let from = from.min(source.len());
    let haystack = &source[from..];
    let double = format!("{attr}=\"{value}\"");
    let single = format!("{attr}='{value}'");

    let double_pos = haystack.find(&double);
    let single_pos = haystack.find(&single);

    match (double_pos, single_pos) {
        (Some(d), Some(s)) if s < d => {
            let start = from + s + attr.len() + 2;
            Some((start, start + value.len()))
        }
        (Some(d), _) => {
            let start = from + d + attr.len() + 2;
            Some((start, start + value.len()))
        }
        (None, Some(s)) => {
            let start = from + s + attr.len() + 2;
            Some((start, start + value.len()))
        }
        (None, None) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::PlaceholderName;

    fn pattern(context: Context, selector: &str, attribute: Option<&str>, placeholder: &str) -> Pattern {
        Pattern {
            context,
            selector: selector.to_string(),
            attribute: attribute.map(str::to_string),
            placeholder: PlaceholderName::new(placeholder).unwrap(),
            allow_multiple: true,
            rule_order: 0,
        }
    }

    #[test]
    fn scenario_html_attribute() {
        let source = r#"<meta name="description" content="Acme widget demo">"#;
        let patterns = vec![pattern(
            Context::HtmlAttribute,
            "meta[name=description]",
            Some("content"),
            "PROJECT_DESCRIPTION",
        )];
        let (candidates, invalid, _) = process(source, &patterns);
        assert!(invalid.is_empty());
        assert_eq!(candidates.len(), 1);
        let c = &candidates[0];
        assert_eq!(&source[c.start..c.end], "Acme widget demo");
    }

    #[test]
    fn element_text_content() {
        let source = "<h1>Acme Widget</h1><p>Hello</p>";
        let patterns = vec![pattern(Context::Html, "h1", None, "PROJECT_TITLE")];
        let (candidates, _, _) = process(source, &patterns);
        assert_eq!(candidates.len(), 1);
        let c = &candidates[0];
        assert_eq!(&source[c.start..c.end], "Acme Widget");
    }

    #[test]
    fn element_text_is_trimmed() {
        let source = "<h1>\n  Acme Widget  \n</h1>";
        let patterns = vec![pattern(Context::Html, "h1", None, "PROJECT_TITLE")];
        let (candidates, _, _) = process(source, &patterns);
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].original_text, "Acme Widget");
    }

    #[test]
    fn multiple_matches_respect_allow_multiple_false() {
        let source = "<li>One</li><li>Two</li>";
        let mut pattern = pattern(Context::Html, "li", None, "ITEM");
        pattern.allow_multiple = false;
        let (candidates, _, _) = process(source, std::iter::once(&pattern));
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].original_text, "One");
    }

    #[test]
    fn existing_placeholder_suppresses() {
        let source = "<h1>\u{2983}PROJECT_TITLE\u{2984}</h1>";
        let patterns = vec![pattern(Context::Html, "h1", None, "PROJECT_TITLE")];
        let (candidates, _, _) = process(source, &patterns);
        assert!(candidates.is_empty());
    }

    #[test]
    fn invalid_css_selector_is_reported() {
        let source = "<h1>Acme</h1>";
        let patterns = vec![pattern(Context::Html, "[[[", None, "X")];
        let (candidates, invalid, _) = process(source, &patterns);
        assert!(candidates.is_empty());
        assert_eq!(invalid.len(), 1);
    }

    #[test]
    fn repeated_attribute_values_resolve_to_distinct_spans() {
        let source = r#"<a href="x" data-k="dup">a</a><a href="y" data-k="dup">b</a>"#;
        let patterns = vec![pattern(Context::HtmlAttribute, "a", Some("data-k"), "K")];
        let (candidates, _, _) = process(source, &patterns);
        assert_eq!(candidates.len(), 2);
        assert_ne!(candidates[0].start, candidates[1].start);
    }

    #[test]
    fn each_attribute_pattern_scans_the_whole_file_independently() {
        let source = r#"<meta name="a" content="late"><meta name="b" content="early">"#;
        let patterns = vec![
            pattern(Context::HtmlAttribute, r#"meta[name="a"]"#, Some("content"), "LATE"),
            pattern(Context::HtmlAttribute, r#"meta[name="b"]"#, Some("content"), "EARLY"),
        ];
        let (candidates, _, _) = process(source, &patterns);
        assert_eq!(candidates.len(), 2);
        let early = candidates.iter().find(|c| c.placeholder.as_str() == "EARLY").unwrap();
        assert_eq!(&source[early.start..early.end], "early");
    }
}
