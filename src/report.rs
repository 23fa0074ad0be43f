//! Dry-run reporter: renders the planned set of replacements
//! per file without requiring the caller to re-walk [`crate::converter::ConvertReport`]
//! by hand.
//!
//! Ordering matches the pipeline's file visit order (lexicographic by
//! relative path), so the rendered text is reproducible across runs given
//! the same source tree and config.

use crate::converter::ConvertReport;
use crate::model::FilterReason;
use std::fmt::Write as _;

/// Preview width for `originalText` in the rendered summary, in characters.
/// Longer text is truncated with a trailing ellipsis.
const PREVIEW_WIDTH: usize = 40;

/// Render a human-readable summary of a conversion run: per file, the
/// placeholder name and a truncated preview of each accepted candidate's
/// original text, followed by totals (files visited/changed, candidates
/// accepted/filtered, and a per-reason filter breakdown).
pub fn render(report: &ConvertReport) -> String {
    let mut out = String::new();

    for result in &report.file_results {
        if result.accepted.is_empty() {
            continue;
        }
        let _ = writeln!(out, "{}", result.path.display());
        for candidate in &result.accepted {
            let _ = writeln!(
                out,
                "  {} <- {}",
                candidate.placeholder,
                preview(&candidate.original_text)
            );
        }
    }

    if !report.files_skipped.is_empty() {
        let _ = writeln!(out, "\nskipped:");
        for skipped in &report.files_skipped {
            let _ = writeln!(out, "  {}: {}", skipped.path.display(), skipped.reason);
        }
    }

    let _ = writeln!(out, "\n{}", summary_line(report));

    let filter_counts = per_reason_counts(report);
    if !filter_counts.is_empty() {
        let _ = writeln!(out, "filtered by reason:");
        for (reason, count) in filter_counts {
            let _ = writeln!(out, "  {reason}: {count}");
        }
    }

    out
}

fn summary_line(report: &ConvertReport) -> String {
    format!(
        "{} files visited, {} changed, {} candidates accepted, {} filtered",
        report.files_visited,
        report.files_changed(),
        report.total_accepted(),
        report.total_filtered(),
    )
}

/// Per-reason filter totals, in a fixed, deterministic iteration order.
fn per_reason_counts(report: &ConvertReport) -> Vec<(FilterReason, usize)> {
    const ORDER: [FilterReason; 4] = [
        FilterReason::ExistingPlaceholder,
        FilterReason::SkipRegion,
        FilterReason::AllowMultipleExceeded,
        FilterReason::Overlap,
    ];
    ORDER
        .into_iter()
        .map(|reason| {
            let count = report
                .file_results
                .iter()
                .flat_map(|r| &r.filtered)
                .filter(|&&r| r == reason)
                .count();
            (reason, count)
        })
        .filter(|(_, count)| *count > 0)
        .collect()
}

/// Truncate `text` to [`PREVIEW_WIDTH`] characters, appending an ellipsis
/// when truncated. Operates on chars, not bytes, so multi-byte UTF-8 text
/// is never split mid-codepoint.
fn preview(text: &str) -> String {
    let char_count = text.chars().count();
    if char_count <= PREVIEW_WIDTH {
        return text.to_string();
    }
    let truncated: String = text.chars().take(PREVIEW_WIDTH).collect();
    format!("{truncated}…")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::converter::FileResult;
    use crate::model::{Candidate, Context, PlaceholderName, Provenance};
    use std::path::PathBuf;

    fn candidate(placeholder: &str, original_text: &str) -> Candidate {
        Candidate {
            placeholder: PlaceholderName::new(placeholder).unwrap(),
            original_text: original_text.to_string(),
            start: 0,
            end: original_text.len(),
            context: Context::Json,
            rule_order: 0,
            provenance: Provenance::Json { node_path: "$.name".to_string() },
        }
    }

    #[test]
    fn renders_accepted_candidates_and_totals() {
        let report = ConvertReport {
            files_visited: 1,
            files_skipped: Vec::new(),
            file_results: vec![FileResult {
                path: PathBuf::from("package.json"),
                accepted: vec![candidate("PACKAGE_NAME", "acme-widget")],
                filtered: Vec::new(),
            }],
        };
        let rendered = render(&report);
        assert!(rendered.contains("package.json"));
        assert!(rendered.contains("PACKAGE_NAME <- acme-widget"));
        assert!(rendered.contains("1 files visited, 1 changed, 1 candidates accepted, 0 filtered"));
    }

    #[test]
    fn truncates_long_preview_text() {
        let long_text = "x".repeat(60);
        let rendered = preview(&long_text);
        assert_eq!(rendered.chars().count(), PREVIEW_WIDTH + 1);
        assert!(rendered.ends_with('…'));
    }

    #[test]
    fn short_preview_text_is_unmodified() {
        assert_eq!(preview("short"), "short");
    }

    #[test]
    fn counts_filtered_reasons_by_category() {
        let report = ConvertReport {
            files_visited: 1,
            files_skipped: Vec::new(),
            file_results: vec![FileResult {
                path: PathBuf::from("a.json"),
                accepted: Vec::new(),
                filtered: vec![FilterReason::ExistingPlaceholder, FilterReason::SkipRegion, FilterReason::SkipRegion],
            }],
        };
        let rendered = render(&report);
        assert!(rendered.contains("existing-placeholder: 1"));
        assert!(rendered.contains("skip-region: 2"));
    }

    #[test]
    fn empty_report_still_prints_totals() {
        let report = ConvertReport::default();
        let rendered = render(&report);
        assert!(rendered.contains("0 files visited, 0 changed, 0 candidates accepted, 0 filtered"));
    }
}
