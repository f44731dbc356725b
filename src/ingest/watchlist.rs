// src/ingest/watchlist.rs
//! Watch keywords loaded from a side file (TOML `keywords = [...]` or a JSON array).
use std::fs;
use std::path::Path;

use crate::error::{ConfigError, ConfigResult};

/// Load keywords from an explicit path. Format follows the extension, with
/// the other format tried as a fallback.
pub fn load_keywords_from(path: &Path) -> ConfigResult<Vec<String>> {
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let ext = path
        .extension()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();
    parse_keywords(&content, ext.as_str()).ok_or_else(|| ConfigError::Parse {
        path: path.to_path_buf(),
        message: "expected `keywords = [..]` (TOML) or a JSON array of strings".to_string(),
    })
}

fn parse_keywords(s: &str, hint_ext: &str) -> Option<Vec<String>> {
    if hint_ext == "json" {
        parse_json(s).or_else(|| parse_toml(s))
    } else {
        parse_toml(s).or_else(|| parse_json(s))
    }
}

fn parse_toml(s: &str) -> Option<Vec<String>> {
    #[derive(serde::Deserialize)]
    struct TomlKeywords {
        keywords: Vec<String>,
    }
    let v: TomlKeywords = toml::from_str(s).ok()?;
    Some(clean_keywords(v.keywords))
}

fn parse_json(s: &str) -> Option<Vec<String>> {
    let v: Vec<String> = serde_json::from_str(s).ok()?;
    Some(clean_keywords(v))
}

/// Trim, drop empties and remove case-insensitive duplicates. First spelling
/// and first position win.
pub fn clean_keywords(items: Vec<String>) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    let mut out = Vec::with_capacity(items.len());
    for it in items {
        let t = it.trim();
        if !t.is_empty() && seen.insert(t.to_lowercase()) {
            out.push(t.to_string());
        }
    }
    out
}
