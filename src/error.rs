use thiserror::Error;

/// Source location information for diagnostics, mirrored from the Markdown
/// parser's own line/column positions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLocation {
    /// Line number (1-indexed).
    pub line: usize,
    /// Column number (1-indexed).
    pub column: usize,
}

impl SourceLocation {
    /// Create a new source location.
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

impl std::fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// Fatal errors that abort the whole conversion run.
///
/// Per the config-driven-only design, there is no fallback path: a missing
/// or invalid config is always fatal.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// No config file found at the expected path.
    #[error("no templatize config found at {path}")]
    Missing {
        /// Path that was probed.
        path: String,
    },
    /// The config file exists but failed to parse or validate.
    #[error("invalid templatize config at {key_path}: {reason}")]
    Invalid {
        /// Dotted key path to the offending field, e.g. `rules.*.jsx.0.placeholder`.
        key_path: String,
        /// Human-readable reason.
        reason: String,
    },
    /// The config file could not be read from disk.
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
}

/// The reason a single file was skipped during conversion. Never fatal.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// The file could not be read (permissions, not found mid-walk, etc.)
    #[error("read error: {0}")]
    FileRead(String),
    /// The rewritten file could not be written back to disk.
    #[error("write error: {0}")]
    FileWrite(String),
    /// The file's structural parser rejected the input.
    #[error("parse error: {0}")]
    ParseFailure(String),
    /// The file was not valid UTF-8.
    #[error("not valid UTF-8")]
    EncodingError,
}

/// Raised once per Pattern per file when its selector/path expression is
/// syntactically invalid. Never fatal — the Pattern simply contributes no
/// candidates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectorInvalid {
    /// The selector or JSONPath text that failed to parse.
    pub expression: String,
    /// Why it was rejected.
    pub reason: String,
}

impl std::fmt::Display for SelectorInvalid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "invalid selector `{}`: {}", self.expression, self.reason)
    }
}
