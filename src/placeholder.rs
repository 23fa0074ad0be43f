//! Placeholder token formatting and recognition.
//!
//! Centralizes all placeholder emission and detection in one place so that
//! processors never carry their own ad hoc regexes for the four delimiter
//! styles.

/// The four delimiter styles a placeholder identifier can be wrapped in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlaceholderStyle {
    /// `⦃NAME⦄`, the default emission style.
    #[default]
    Unicode,
    /// `{{NAME}}`.
    Mustache,
    /// `$NAME$`.
    Dollar,
    /// `%NAME%`.
    Percent,
}

impl PlaceholderStyle {
    fn delimiters(self) -> (&'static str, &'static str) {
        match self {
            PlaceholderStyle::Unicode => ("\u{2983}", "\u{2984}"),
            PlaceholderStyle::Mustache => ("{{", "}}"),
            PlaceholderStyle::Dollar => ("$", "$"),
            PlaceholderStyle::Percent => ("%", "%"),
        }
    }

    /// All styles, in a fixed order, for scanning text that might contain any of them.
    const ALL: [PlaceholderStyle; 4] = [
        PlaceholderStyle::Unicode,
        PlaceholderStyle::Mustache,
        PlaceholderStyle::Dollar,
        PlaceholderStyle::Percent,
    ];
}

/// Format `identifier` as a placeholder token in the given style.
///
/// Does not validate `identifier` against the placeholder grammar; callers
/// construct identifiers through [`crate::model::PlaceholderName`], which
/// enforces `[A-Z][A-Z0-9_]*` at construction time.
pub fn format(identifier: &str, style: PlaceholderStyle) -> String {
    let (open, close) = style.delimiters();
    format!("{open}{identifier}{close}")
}

/// Does `text` contain any recognized placeholder token, in any of the four
/// delimiter styles? Interior whitespace around the identifier is permitted
/// (`{{ NAME }}` is recognized),
pub fn has_any_placeholder(text: &str) -> bool {
    PlaceholderStyle::ALL
        .iter()
        .any(|&style| iter_placeholders(text, style).next().is_some())
}

/// Iterate over every occurrence of a placeholder token in `text`, in the
/// requested delimiter style. Yields `(identifier, byte_span)` pairs.
pub fn iter_placeholders(text: &str, style: PlaceholderStyle) -> PlaceholderIter<'_> {
    PlaceholderIter {
        text,
        style,
        cursor: 0,
    }
}

/// Iterator produced by [`iter_placeholders`].
pub struct PlaceholderIter<'a> {
    text: &'a str,
    style: PlaceholderStyle,
    cursor: usize,
}

impl<'a> Iterator for PlaceholderIter<'a> {
    type Item = (String, std::ops::Range<usize>);

    fn next(&mut self) -> Option<Self::Item> {
        let (open, close) = self.style.delimiters();
        loop {
            let rest = &self.text[self.cursor..];
            let open_rel = rest.find(open)?;
            let after_open = self.cursor + open_rel + open.len();

            // For same-character delimiters ($...$, %...%) the identifier
            // must not itself contain the delimiter character, which the
            // identifier grammar already guarantees, but closing search
            // must not re-consume the opening delimiter.
            let tail = &self.text[after_open..];
            let Some(close_rel) = tail.find(close) else {
                self.cursor = self.text.len();
                return None;
            };
            let close_start = after_open + close_rel;
            let candidate = &self.text[after_open..close_start];
            let trimmed = candidate.trim();

            self.cursor = close_start + close.len();

            if is_valid_identifier(trimmed) {
                return Some((trimmed.to_string(), (self.cursor - close.len() - candidate.len() - open.len())..self.cursor));
            }
            // Not a valid identifier inside these delimiters: keep scanning
            // from just past this open delimiter, not past the close, in
            // case of nested/adjacent false starts.
        }
    }
}

/// Identifier grammar: `[A-Z][A-Z0-9_]*`.
pub fn is_valid_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) if first.is_ascii_uppercase() => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_')
}
