// src/ingest/mod.rs
pub mod clock;
pub mod cycle;
pub mod extract;
pub mod fetcher;
pub mod registry;
pub mod scheduler;
pub mod store;
pub mod types;
pub mod watchlist;

pub use cycle::{Collector, CycleResult};
pub use registry::SourceRegistry;
pub use types::{Article, FeedSource};

use once_cell::sync::OnceCell;
use regex::Regex;

/// Normalize feed text: decode HTML entities, strip tags, fold typographic
/// quotes to ASCII, collapse whitespace and trim.
pub fn normalize_text(s: &str) -> String {
    // 1) HTML entity decode (descriptions are often double-escaped HTML)
    let mut out = html_escape::decode_html_entities(s).to_string();

    // 2) Strip HTML tags
    static RE_TAGS: OnceCell<Regex> = OnceCell::new();
    let re_tags = RE_TAGS.get_or_init(|| Regex::new(r"(?is)</?[^>]+>").expect("tag regex"));
    out = re_tags.replace_all(&out, " ").to_string();

    // 3) “ ” ‘ ’ « » to ASCII quotes
    out = out
        .replace(['\u{201C}', '\u{201D}', '\u{00AB}', '\u{00BB}'], "\"")
        .replace(['\u{2018}', '\u{2019}'], "'");

    // 4) Collapse whitespace (\s covers NBSP)
    static RE_WS: OnceCell<Regex> = OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| Regex::new(r"\s+").expect("whitespace regex"));
    re_ws.replace_all(&out, " ").trim().to_string()
}

/// Character-capped copy for log lines.
pub(crate) fn preview(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        return s.to_string();
    }
    let mut out: String = s.chars().take(max_chars).collect();
    out.push('…');
    out
}
