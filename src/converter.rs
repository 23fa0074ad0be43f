//! Converter pipeline: the per-file fold/dispatch/rewrite
//! algorithm, run across a source tree's matched files.
//!
//! File-level work units are independent — each call to [`process_file`]
//! opens its own source string and holds no state shared with any other
//! file — so the `rayon`-backed parallel branch below is safe by
//! construction.

use crate::config::{Config, discover_files, patterns_for_file};
use crate::error::{SelectorInvalid, SkipReason};
use crate::model::{Candidate, Context, FilterReason, Pattern};
use crate::placeholder::{self, PlaceholderStyle, has_any_placeholder};
use crate::processors::{html, json, jsx, markdown};
use crate::skip_region::{CommentSyntax, is_in_skip_region};
use rayon::prelude::*;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Cooperative cancellation signal, checked between files and (within a
/// file) before each processor dispatch.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    /// Create a token in the not-cancelled state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Already-running file processing completes;
    /// no further files are started.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Has cancellation been requested?
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Options accepted by [`convert`].
#[derive(Debug, Clone)]
pub struct ConvertOptions {
    /// Compute the Report but do not write any file.
    pub dry_run: bool,
    /// Delimiter style used when emitting new placeholder tokens.
    pub placeholder_style: PlaceholderStyle,
    /// Process distinct files concurrently with `rayon`. Defaults to
    /// `true`; per-file processing is always internally sequential.
    pub parallel: bool,
    /// Optional cooperative cancellation signal.
    pub cancellation: Option<CancellationToken>,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        ConvertOptions {
            dry_run: false,
            placeholder_style: PlaceholderStyle::default(),
            parallel: true,
            cancellation: None,
        }
    }
}

/// A file that was skipped rather than converted, with its cause.
#[derive(Debug, Clone)]
pub struct SkippedFile {
    /// Path relative to `sourceRoot`.
    pub path: PathBuf,
    /// Why the file was skipped.
    pub reason: SkipReason,
}

/// Per-file outcome of a successful (possibly no-op) conversion pass.
#[derive(Debug, Clone, Default)]
pub struct FileResult {
    /// Path relative to `sourceRoot`.
    pub path: PathBuf,
    /// Every Candidate that survived conflict resolution and was (or, in
    /// dry-run mode, would have been) spliced into the output.
    pub accepted: Vec<Candidate>,
    /// Every Candidate that was detected but discarded, with the reason,
    /// for the dry-run reporter's per-reason totals.
    pub filtered: Vec<FilterReason>,
}

/// The result of one `convert` run.
#[derive(Debug, Default)]
pub struct ConvertReport {
    /// Number of files actually opened and processed (successfully or not).
    pub files_visited: usize,
    /// Files that could not be processed, with cause.
    pub files_skipped: Vec<SkippedFile>,
    /// Per-file results, in the pipeline's deterministic visit order
    /// (lexicographic by relative path), independent of completion order.
    pub file_results: Vec<FileResult>,
}

impl ConvertReport {
    /// Total accepted Candidates across every file.
    pub fn total_accepted(&self) -> usize {
        self.file_results.iter().map(|r| r.accepted.len()).sum()
    }

    /// Total filtered (detected-but-discarded) Candidates across every file.
    pub fn total_filtered(&self) -> usize {
        self.file_results.iter().map(|r| r.filtered.len()).sum()
    }

    /// How many files actually changed (at least one accepted Candidate).
    pub fn files_changed(&self) -> usize {
        self.file_results.iter().filter(|r| !r.accepted.is_empty()).count()
    }
}

enum FileOutcome {
    Processed(FileResult),
    Skipped(SkipReason),
    Cancelled,
}

/// Run the full conversion pipeline over every file under `source_root`
/// matched by `config`'s rules.
pub fn convert(source_root: &Path, config: &Config, options: ConvertOptions) -> ConvertReport {
    let files = match discover_files(source_root, config) {
        Ok(files) => files,
        Err(err) => {
            log::warn!("file discovery failed under {}: {err}", source_root.display());
            Vec::new()
        }
    };

    let visit = |rel_path: &PathBuf| -> (PathBuf, FileOutcome) {
        if options
            .cancellation
            .as_ref()
            .is_some_and(CancellationToken::is_cancelled)
        {
            return (rel_path.clone(), FileOutcome::Cancelled);
        }
        let outcome = process_file(source_root, rel_path, config, &options);
        (rel_path.clone(), outcome)
    };

    let outcomes: Vec<(PathBuf, FileOutcome)> = if options.parallel {
        files.par_iter().map(visit).collect()
    } else {
        files.iter().map(visit).collect()
    };

    let mut report = ConvertReport::default();
    for (path, outcome) in outcomes {
        match outcome {
            FileOutcome::Cancelled => {
                log::info!("conversion cancelled before visiting {}", path.display());
            }
            FileOutcome::Skipped(reason) => {
                log::warn!("skipping {}: {reason}", path.display());
                report.files_visited += 1;
                report.files_skipped.push(SkippedFile { path, reason });
            }
            FileOutcome::Processed(result) => {
                report.files_visited += 1;
                report.file_results.push(result);
            }
        }
    }

    log::info!(
        "conversion complete: {} files visited, {} skipped, {} changed",
        report.files_visited,
        report.files_skipped.len(),
        report.files_changed(),
    );

    report
}

fn process_file(
    source_root: &Path,
    rel_path: &Path,
    config: &Config,
    options: &ConvertOptions,
) -> FileOutcome {
    let full_path = source_root.join(rel_path);

    let bytes = match std::fs::read(&full_path) {
        Ok(bytes) => bytes,
        Err(err) => return FileOutcome::Skipped(SkipReason::FileRead(err.to_string())),
    };
    let source = match String::from_utf8(bytes) {
        Ok(source) => source,
        Err(_) => return FileOutcome::Skipped(SkipReason::EncodingError),
    };

    // Re-number `rule_order` over the file's fully resolved Pattern list
    // (exact path + basename + extension-glob keys concatenated) rather
    // than trusting the per-rule-key numbering the config loader assigns;
    // conflict resolution below needs one globally ordered, uniquely keyed
    // list per file so ties resolve by ascending pattern index.
    let patterns: Vec<Pattern> = patterns_for_file(rel_path, config)
        .into_iter()
        .enumerate()
        .map(|(rule_order, pattern)| Pattern {
            rule_order,
            ..pattern.clone()
        })
        .collect();

    if patterns.is_empty() {
        return FileOutcome::Processed(FileResult {
            path: rel_path.to_path_buf(),
            ..Default::default()
        });
    }

    let mut candidates = Vec::new();
    let mut filtered = Vec::new();

    dispatch(&source, &patterns, rel_path, Context::is_json, json::process, &mut candidates, &mut filtered);
    dispatch(&source, &patterns, rel_path, Context::is_markdown, markdown::process, &mut candidates, &mut filtered);
    dispatch(&source, &patterns, rel_path, Context::is_html, html::process, &mut candidates, &mut filtered);
    dispatch(&source, &patterns, rel_path, Context::is_jsx, jsx::process, &mut candidates, &mut filtered);

    if candidates.is_empty() {
        return FileOutcome::Processed(FileResult {
            path: rel_path.to_path_buf(),
            filtered,
            ..Default::default()
        });
    }

    // Step 5: stable-sort by (start asc, end desc, rule_order asc).
    candidates.sort_by(|a, b| {
        a.start
            .cmp(&b.start)
            .then(b.end.cmp(&a.end))
            .then(a.rule_order.cmp(&b.rule_order))
    });

    let patterns_by_order: HashMap<usize, &Pattern> =
        patterns.iter().map(|p| (p.rule_order, p)).collect();
    let mut emitted_per_pattern: HashMap<usize, usize> = HashMap::new();
    let mut accepted: Vec<Candidate> = Vec::new();

    // Steps 6-7: conflict resolution plus the belt-and-braces re-check of
    // filters the processors already applied.
    for candidate in candidates {
        let syntax = context_skip_syntax(candidate.context);
        if is_in_skip_region(&source, candidate.start, candidate.end, syntax) {
            filtered.push(FilterReason::SkipRegion);
            continue;
        }
        if has_any_placeholder(&candidate.original_text) {
            filtered.push(FilterReason::ExistingPlaceholder);
            continue;
        }
        let Some(&pattern) = patterns_by_order.get(&candidate.rule_order) else {
            continue;
        };
        let emitted = emitted_per_pattern.entry(candidate.rule_order).or_insert(0);
        if !pattern.allow_multiple && *emitted >= 1 {
            filtered.push(FilterReason::AllowMultipleExceeded);
            continue;
        }
        if accepted.iter().any(|a| a.overlaps(&candidate)) {
            filtered.push(FilterReason::Overlap);
            continue;
        }
        *emitted += 1;
        accepted.push(candidate);
    }

    if accepted.is_empty() {
        return FileOutcome::Processed(FileResult {
            path: rel_path.to_path_buf(),
            filtered,
            ..Default::default()
        });
    }

    // Step 8: splice in strictly descending start order so earlier offsets
    // stay valid for every subsequent replacement.
    let mut rewritten = source.clone();
    let mut splice_order = accepted.clone();
    splice_order.sort_by(|a, b| b.start.cmp(&a.start));
    for candidate in &splice_order {
        let token = placeholder::format(candidate.placeholder.as_str(), options.placeholder_style);
        rewritten.replace_range(candidate.start..candidate.end, &token);
    }

    // Step 9.
    if !options.dry_run && rewritten != source {
        if let Err(err) = write_atomically(&full_path, rewritten.as_bytes()) {
            return FileOutcome::Skipped(SkipReason::FileWrite(err.to_string()));
        }
    }

    FileOutcome::Processed(FileResult {
        path: rel_path.to_path_buf(),
        accepted,
        filtered,
    })
}

/// Dispatch the subset of `patterns` matching `select` to `processor`,
/// extending `candidates`/`filtered` and logging any reported
/// [`SelectorInvalid`]. `select` is one of [`Context::is_json`],
/// [`Context::is_markdown`], [`Context::is_html`], [`Context::is_jsx`].
fn dispatch<'a, F>(
    source: &str,
    patterns: &'a [Pattern],
    rel_path: &Path,
    select: fn(Context) -> bool,
    processor: F,
    candidates: &mut Vec<Candidate>,
    filtered: &mut Vec<FilterReason>,
) where
    F: FnOnce(&str, Vec<&'a Pattern>) -> (Vec<Candidate>, Vec<SelectorInvalid>, Vec<FilterReason>),
{
    let matching: Vec<&Pattern> = patterns.iter().filter(|p| select(p.context)).collect();
    if matching.is_empty() {
        return;
    }
    let (new_candidates, invalid, new_filtered) = processor(source, matching);
    for reason in &invalid {
        log::warn!("{}: {reason}", rel_path.display());
    }
    candidates.extend(new_candidates);
    filtered.extend(new_filtered);
}

/// The skip-region comment syntax a Context's source files are written in.
fn context_skip_syntax(context: Context) -> CommentSyntax {
    if context.is_markdown() || context.is_html() {
        CommentSyntax::HTML_FAMILY
    } else {
        CommentSyntax::C_FAMILY
    }
}

/// Write `contents` to `path` via a temporary sibling file followed by a
/// rename, so a reader never observes a partially written file.
fn write_atomically(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("file");
    let tmp_path = path.with_file_name(format!("{file_name}.templatize-tmp-{}", std::process::id()));
    std::fs::write(&tmp_path, contents)?;
    std::fs::rename(&tmp_path, path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::PlaceholderName;

    fn pattern(context: Context, selector: &str, placeholder: &str, allow_multiple: bool, rule_order: usize) -> Pattern {
        Pattern {
            context,
            selector: selector.to_string(),
            attribute: None,
            placeholder: PlaceholderName::new(placeholder).unwrap(),
            allow_multiple,
            rule_order,
        }
    }

    #[test]
    fn context_skip_syntax_maps_families_correctly() {
        assert_eq!(context_skip_syntax(Context::Json), CommentSyntax::C_FAMILY);
        assert_eq!(context_skip_syntax(Context::Jsx), CommentSyntax::C_FAMILY);
        assert_eq!(context_skip_syntax(Context::JsxAttribute), CommentSyntax::C_FAMILY);
        assert_eq!(context_skip_syntax(Context::Html), CommentSyntax::HTML_FAMILY);
        assert_eq!(context_skip_syntax(Context::Markdown), CommentSyntax::HTML_FAMILY);
    }

    #[test]
    fn conflict_resolution_prefers_earlier_rule_order_on_overlap() {
        let a = Candidate {
            placeholder: PlaceholderName::new("A").unwrap(),
            original_text: "x".to_string(),
            start: 0,
            end: 5,
            context: Context::Json,
            rule_order: 0,
            provenance: crate::model::Provenance::Json { node_path: "$.a".to_string() },
        };
        let b = Candidate {
            placeholder: PlaceholderName::new("B").unwrap(),
            original_text: "y".to_string(),
            start: 2,
            end: 7,
            context: Context::Json,
            rule_order: 1,
            provenance: crate::model::Provenance::Json { node_path: "$.b".to_string() },
        };
        assert!(a.overlaps(&b));

        let _patterns = [
            pattern(Context::Json, "$.a", "A", true, 0),
            pattern(Context::Json, "$.b", "B", true, 1),
        ];
        // With (start asc, end desc, rule_order asc) ordering `a` sorts
        // first and is accepted; `b` overlaps it and is rejected.
        let mut candidates = vec![b.clone(), a.clone()];
        candidates.sort_by(|x, y| {
            x.start.cmp(&y.start).then(y.end.cmp(&x.end)).then(x.rule_order.cmp(&y.rule_order))
        });
        assert_eq!(candidates[0].rule_order, 0);
    }
}
