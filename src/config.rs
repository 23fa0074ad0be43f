//! Config schema, loading, validation, and file-to-Pattern resolution.
//!
//! Absent or invalid config is always a fatal [`ConfigError`] — there is no
//! coercion-with-fallback path.

use crate::error::ConfigError;
use crate::model::{Context, Pattern, RawPattern};
use indexmap::IndexMap;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Conventional config file name, resolved relative to a project's source root.
pub const CONFIG_FILE_NAME: &str = ".templatize.json";

/// The raw, still-`String`-context wire format of the config file.
#[derive(Debug, Deserialize)]
struct RawConfig {
    version: String,
    #[serde(default)]
    auto_detect: bool,
    rules: IndexMap<String, Vec<RawPattern>>,
}

/// The validated, immutable templatization config.
#[derive(Debug, Clone)]
pub struct Config {
    /// Config schema version; must be `"1.0"`.
    pub version: String,
    /// Whether processors may offer inferred candidates beyond the explicit
    /// rules. This implementation is config-driven only, so `auto_detect`
    /// is retained for schema fidelity but never consulted by a processor.
    pub auto_detect: bool,
    /// File-selector key (literal path, literal basename, or `*.ext` glob)
    /// to its ordered Pattern list, in declaration order.
    pub rules: IndexMap<String, Vec<Pattern>>,
}

/// Load and validate the config file under `source_root`.
pub fn load_config(source_root: &Path) -> Result<Config, ConfigError> {
    let path = source_root.join(CONFIG_FILE_NAME);
    if !path.exists() {
        return Err(ConfigError::Missing {
            path: path.display().to_string(),
        });
    }
    let text = std::fs::read_to_string(&path)?;
    parse_config(&text)
}

/// Parse and validate config text directly (used by tests and by callers
/// that already have the file contents in memory).
pub fn parse_config(text: &str) -> Result<Config, ConfigError> {
    let raw: RawConfig = serde_json::from_str(text).map_err(|err| ConfigError::Invalid {
        key_path: "<root>".to_string(),
        reason: err.to_string(),
    })?;

    if raw.version != "1.0" {
        return Err(ConfigError::Invalid {
            key_path: "version".to_string(),
            reason: format!("expected \"1.0\", got \"{}\"", raw.version),
        });
    }

    let mut rules = IndexMap::new();
    for (file_selector, raw_patterns) in raw.rules {
        let mut patterns = Vec::with_capacity(raw_patterns.len());
        for (index, raw_pattern) in raw_patterns.into_iter().enumerate() {
            let key_path = format!("rules.{file_selector}.{index}");
            patterns.push(validate_pattern(raw_pattern, index, &key_path)?);
        }
        rules.insert(file_selector, patterns);
    }

    Ok(Config {
        version: raw.version,
        auto_detect: raw.auto_detect,
        rules,
    })
}

fn validate_pattern(
    raw: RawPattern,
    rule_order: usize,
    key_path: &str,
) -> Result<Pattern, ConfigError> {
    let context = Context::parse(&raw.context).ok_or_else(|| ConfigError::Invalid {
        key_path: format!("{key_path}.context"),
        reason: format!("unrecognized context `{}`", raw.context),
    })?;

    let selector = raw
        .selector
        .or(raw.path)
        .ok_or_else(|| ConfigError::Invalid {
            key_path: format!("{key_path}.selector"),
            reason: "pattern requires a `selector` or `path`".to_string(),
        })?;

    if matches!(context, Context::HtmlAttribute | Context::JsxAttribute) && raw.attribute.is_none()
    {
        return Err(ConfigError::Invalid {
            key_path: format!("{key_path}.attribute"),
            reason: format!("context `{context}` requires an `attribute` field"),
        });
    }

    Ok(Pattern {
        context,
        selector,
        attribute: raw.attribute,
        placeholder: raw.placeholder,
        allow_multiple: raw.allow_multiple,
        rule_order,
    })
}

/// Resolve the ordered Pattern list applicable to `rel_path`:
/// exact relative path, then exact basename, then extension glob, each
/// matching key's patterns concatenated in that order; a Pattern already
/// seen (by rule_order within the same originating key) is not duplicated,
/// but distinct keys each contribute their own list in full.
pub fn patterns_for_file<'a>(rel_path: &Path, config: &'a Config) -> Vec<&'a Pattern> {
    let mut out = Vec::new();
    let mut seen_keys = std::collections::HashSet::new();

    let rel_str = rel_path.to_string_lossy();
    let basename = rel_path.file_name().map(|n| n.to_string_lossy());
    let extension_glob = rel_path
        .extension()
        .map(|ext| format!("*.{}", ext.to_string_lossy()));

    let candidate_keys: Vec<String> = [
        Some(rel_str.to_string()),
        basename.as_ref().map(|b| b.to_string()),
        extension_glob,
    ]
    .into_iter()
    .flatten()
    .collect();

    for key in candidate_keys {
        if !seen_keys.insert(key.clone()) {
            continue;
        }
        if let Some(patterns) = config.rules.get(&key) {
            out.extend(patterns.iter());
        }
    }

    out
}

/// Convenience: is `rel_path` selected by any rule in `config` at all?
pub fn is_file_selected(rel_path: &Path, config: &Config) -> bool {
    !patterns_for_file(rel_path, config).is_empty()
}

/// Enumerate every concrete relative path under `source_root` that matches
/// at least one rule key, in deterministic lexicographic order so repeated
/// runs visit files in the same sequence.
pub fn discover_files(source_root: &Path, config: &Config) -> std::io::Result<Vec<PathBuf>> {
    let mut matches = Vec::new();
    walk(source_root, source_root, config, &mut matches)?;
    matches.sort();
    matches.dedup();
    Ok(matches)
}

fn walk(
    root: &Path,
    dir: &Path,
    config: &Config,
    out: &mut Vec<PathBuf>,
) -> std::io::Result<()> {
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        let file_type = entry.file_type()?;
        if file_type.is_dir() {
            walk(root, &path, config, out)?;
        } else if file_type.is_file() {
            let rel = path
                .strip_prefix(root)
                .unwrap_or(&path)
                .to_path_buf();
            if rel == Path::new(CONFIG_FILE_NAME) {
                continue;
            }
            if is_file_selected(&rel, config) {
                out.push(rel);
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_config() -> &'static str {
        r#"{
            "version": "1.0",
            "autoDetect": false,
            "rules": {
                "package.json": [
                    {"context": "application/json", "path": "$.name", "placeholder": "PACKAGE_NAME", "allowMultiple": false}
                ],
                "*.jsx": [
                    {"context": "text/jsx", "selector": "title", "placeholder": "PROJECT_TITLE"}
                ]
            }
        }"#
    }

    #[test]
    fn parses_valid_config() {
        let config = parse_config(sample_config()).unwrap();
        assert_eq!(config.version, "1.0");
        assert!(!config.auto_detect);
        assert_eq!(config.rules.len(), 2);
    }

    #[test]
    fn rejects_wrong_version() {
        let text = r#"{"version": "2.0", "autoDetect": false, "rules": {}}"#;
        let err = parse_config(text).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { .. }));
    }

    #[test]
    fn rejects_unrecognized_context() {
        let text = r#"{"version": "1.0", "autoDetect": false, "rules": {
            "a.txt": [{"context": "application/xml", "selector": "x", "placeholder": "X"}]
        }}"#;
        let err = parse_config(text).unwrap_err();
        match err {
            ConfigError::Invalid { key_path, .. } => assert!(key_path.ends_with("context")),
            _ => panic!("expected Invalid"),
        }
    }

    #[test]
    fn rejects_bad_placeholder_identifier() {
        let text = r#"{"version": "1.0", "autoDetect": false, "rules": {
            "a.txt": [{"context": "text/plain", "selector": "x", "placeholder": "lowercase"}]
        }}"#;
        assert!(parse_config(text).is_err());
    }

    #[test]
    fn html_attribute_requires_attribute_field() {
        let text = r#"{"version": "1.0", "autoDetect": false, "rules": {
            "a.html": [{"context": "text/html#attribute", "selector": "meta", "placeholder": "X"}]
        }}"#;
        let err = parse_config(text).unwrap_err();
        match err {
            ConfigError::Invalid { key_path, .. } => assert!(key_path.ends_with("attribute")),
            _ => panic!("expected Invalid"),
        }
    }

    #[test]
    fn patterns_for_file_matches_exact_path_then_basename_then_glob() {
        let text = r#"{"version": "1.0", "autoDetect": false, "rules": {
            "src/index.html": [{"context": "text/html", "selector": "h1", "placeholder": "A"}],
            "index.html": [{"context": "text/html", "selector": "h2", "placeholder": "B"}],
            "*.html": [{"context": "text/html", "selector": "h3", "placeholder": "C"}]
        }}"#;
        let config = parse_config(text).unwrap();
        let patterns = patterns_for_file(Path::new("src/index.html"), &config);
        assert_eq!(patterns.len(), 3);
        assert_eq!(patterns[0].placeholder.as_str(), "A");
        assert_eq!(patterns[1].placeholder.as_str(), "B");
        assert_eq!(patterns[2].placeholder.as_str(), "C");
    }

    #[test]
    fn patterns_for_file_empty_for_unselected_file() {
        let config = parse_config(sample_config()).unwrap();
        assert!(patterns_for_file(Path::new("README.md"), &config).is_empty());
    }
}
