//! Skip-region detection, parameterized over the comment syntax pair a file
//! kind uses for the `@template-skip` / `@end-template-skip` markers.
//!
//! A single component serves every processor.

/// The open/close marker pair for one file kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommentSyntax {
    /// Literal open marker, e.g. `// @template-skip`.
    pub open: &'static str,
    /// Literal close marker, e.g. `// @end-template-skip`.
    pub close: &'static str,
}

impl CommentSyntax {
    /// `// @template-skip` / `// @end-template-skip` — JSON, JSONC, JSX/TSX.
    pub const C_FAMILY: CommentSyntax = CommentSyntax {
        open: "// @template-skip",
        close: "// @end-template-skip",
    };

    /// `<!-- @template-skip -->` / `<!-- @end-template-skip -->` — HTML, Markdown.
    pub const HTML_FAMILY: CommentSyntax = CommentSyntax {
        open: "<!-- @template-skip -->",
        close: "<!-- @end-template-skip -->",
    };
}

/// Is the half-open span `[start, end)` inside an open skip region of
/// `source`, under the given comment syntax?
///
/// The detector is stateless: it inspects the span's own line for a
/// same-line open marker, then scans backward line by line. It is
/// "open-biased" — if the nearest preceding marker is an open marker with
/// no intervening close, the span is skipped.
pub fn is_in_skip_region(source: &str, start: usize, end: usize, syntax: CommentSyntax) -> bool {
    let line_start = source[..start].rfind('\n').map(|i| i + 1).unwrap_or(0);
    let line_end = source[end..]
        .find('\n')
        .map(|i| end + i)
        .unwrap_or(source.len());
    let same_line = &source[line_start..line_end];

    // An open marker anywhere on the candidate's own line suppresses
    // replacement, whether it precedes or trails the candidate text.
    if same_line.contains(syntax.open) {
        return true;
    }

    scan_backward_for_open(&source[..line_start], syntax)
}

fn scan_backward_for_open(preceding: &str, syntax: CommentSyntax) -> bool {
    for line in preceding.lines().rev() {
        let last_open = line.rfind(syntax.open);
        let last_close = line.rfind(syntax.close);
        match (last_open, last_close) {
            (Some(o), Some(c)) => return o > c,
            (Some(_), None) => return true,
            (None, Some(_)) => return false,
            (None, None) => continue,
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_markers_is_not_skipped() {
        let src = "# Keep me\n# Also keep me\n";
        let start = src.find("Also").unwrap();
        assert!(!is_in_skip_region(src, start, start + 4, CommentSyntax::HTML_FAMILY));
    }

    #[test]
    fn open_without_close_skips() {
        let src = "<!-- @template-skip -->\n# Keep me\n";
        let start = src.find("Keep").unwrap();
        assert!(is_in_skip_region(src, start, start + 4, CommentSyntax::HTML_FAMILY));
    }

    #[test]
    fn closed_region_does_not_skip_content_after() {
        let src = "<!-- @template-skip -->\n# Keep me\n<!-- @end-template-skip -->\n# Rewrite me";
        let start = src.find("Rewrite").unwrap();
        assert!(!is_in_skip_region(src, start, start + 7, CommentSyntax::HTML_FAMILY));
    }

    #[test]
    fn content_inside_closed_region_is_skipped() {
        let src = "<!-- @template-skip -->\n# Keep me\n<!-- @end-template-skip -->\n# Rewrite me";
        let start = src.find("Keep").unwrap();
        assert!(is_in_skip_region(src, start, start + 4, CommentSyntax::HTML_FAMILY));
    }

    #[test]
    fn same_line_open_marker_suppresses() {
        let src = "value // @template-skip\n";
        assert!(is_in_skip_region(src, 0, 5, CommentSyntax::C_FAMILY));
    }

    #[test]
    fn c_family_markers() {
        let src = "// @template-skip\nconst a = 1;\n// @end-template-skip\nconst b = 2;";
        let a_start = src.find("const a").unwrap();
        let b_start = src.find("const b").unwrap();
        assert!(is_in_skip_region(src, a_start, a_start + 7, CommentSyntax::C_FAMILY));
        assert!(!is_in_skip_region(src, b_start, b_start + 7, CommentSyntax::C_FAMILY));
    }
}
