// src/ingest/extract.rs
//! RSS 2.0 / RSS 1.0 (RDF) / Atom 1.0 extraction into [`Article`] records.
//!
//! Parsing is lenient: entries lacking a title or link are still emitted with
//! empty strings, and a document that cannot be parsed at all yields zero
//! articles plus a warning instead of an error.

use chrono::{DateTime, TimeZone, Utc};
use metrics::histogram;
use once_cell::sync::Lazy;
use quick_xml::de::from_str;
use regex::{Captures, Regex};
use serde::Deserialize;
use sha2::{Digest, Sha256};
use std::collections::BTreeSet;
use std::sync::Arc;
use time::format_description::well_known::{Rfc2822, Rfc3339};
use time::OffsetDateTime;

use crate::error::ExtractError;
use crate::ingest::clock::Clock;
use crate::ingest::types::{Article, FeedSource};
use crate::ingest::{normalize_text, preview};
use crate::sentiment::{NeutralClassifier, SentimentClassifier};

const WORDS_PER_MINUTE: usize = 200;

pub trait Extractor: Send + Sync {
    /// Never fails: malformed input produces an empty list.
    fn extract(&self, source: &FeedSource, raw: &[u8]) -> Vec<Article>;
}

// ---- RSS 2.0 ----

#[derive(Debug, Deserialize)]
struct Rss {
    channel: Channel,
}

#[derive(Debug, Deserialize)]
struct Channel {
    #[serde(rename = "item", default)]
    items: Vec<RssItem>,
}

#[derive(Debug, Deserialize)]
struct RssItem {
    title: Option<String>,
    link: Option<String>,
    #[serde(rename = "pubDate")]
    pub_date: Option<String>,
    description: Option<String>,
}

// ---- RSS 1.0 (RDF) ----

/// Items are siblings of `<channel>` under `<rdf:RDF>`.
#[derive(Debug, Deserialize)]
struct Rdf {
    #[serde(rename = "item", default)]
    items: Vec<RdfItem>,
}

#[derive(Debug, Deserialize)]
struct RdfItem {
    title: Option<String>,
    link: Option<String>,
    description: Option<String>,
    #[serde(rename = "dc:date", alias = "date")]
    date: Option<String>,
}

// ---- Atom 1.0 ----

#[derive(Debug, Deserialize)]
struct AtomFeed {
    #[serde(rename = "entry", default)]
    entries: Vec<AtomEntry>,
}

#[derive(Debug, Deserialize)]
struct AtomEntry {
    title: Option<AtomText>,
    #[serde(rename = "link", default)]
    links: Vec<AtomLink>,
    summary: Option<AtomText>,
    content: Option<AtomText>,
    published: Option<String>,
    updated: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AtomText {
    #[serde(rename = "$text", default)]
    value: String,
}

#[derive(Debug, Deserialize)]
struct AtomLink {
    #[serde(rename = "@href", default)]
    href: String,
    #[serde(rename = "@rel")]
    rel: Option<String>,
}

impl AtomEntry {
    /// `rel="alternate"` (or no rel) wins; otherwise the first link.
    fn best_link(&self) -> Option<&str> {
        self.links
            .iter()
            .find(|l| matches!(l.rel.as_deref(), None | Some("alternate")))
            .or_else(|| self.links.first())
            .map(|l| l.href.as_str())
    }
}

/// Format-neutral entry before normalization.
struct RawEntry {
    title: String,
    link: String,
    body: String,
    published_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FeedFormat {
    Rss,
    Rdf,
    Atom,
}

fn sniff_format(xml: &str) -> Option<FeedFormat> {
    let lower = xml.to_ascii_lowercase();
    if lower.contains("<rdf:rdf") {
        Some(FeedFormat::Rdf)
    } else if lower.contains("<rss") || lower.contains("<channel") {
        Some(FeedFormat::Rss)
    } else if lower.contains("<feed") {
        Some(FeedFormat::Atom)
    } else {
        None
    }
}

/// The default extractor for RSS and Atom documents.
pub struct FeedExtractor {
    clock: Arc<dyn Clock>,
    classifier: Arc<dyn SentimentClassifier>,
}

impl FeedExtractor {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            classifier: Arc::new(NeutralClassifier),
        }
    }

    pub fn with_classifier(mut self, classifier: Arc<dyn SentimentClassifier>) -> Self {
        self.classifier = classifier;
        self
    }

    /// Strict variant of [`Extractor::extract`] that reports why nothing was produced.
    pub fn try_extract(&self, source: &FeedSource, raw: &[u8]) -> Result<Vec<Article>, ExtractError> {
        let text = String::from_utf8_lossy(raw);
        let text = text.trim_start_matches('\u{feff}').trim();
        if text.is_empty() {
            return Err(ExtractError::Empty);
        }

        let xml = scrub_html_entities_for_xml(text);
        let entries = match sniff_format(&xml) {
            Some(FeedFormat::Rss) => parse_rss(&xml)?,
            Some(FeedFormat::Rdf) => parse_rdf(&xml)?,
            Some(FeedFormat::Atom) => parse_atom(&xml)?,
            None => return Err(ExtractError::UnknownFormat),
        };

        let saved_at = self.clock.now();
        Ok(entries
            .into_iter()
            .enumerate()
            .map(|(index, e)| self.build_article(source, index, e, saved_at))
            .collect())
    }

    fn build_article(
        &self,
        source: &FeedSource,
        index: usize,
        entry: RawEntry,
        saved_at: DateTime<Utc>,
    ) -> Article {
        let title = normalize_text(&entry.title);
        let content = normalize_text(&entry.body);
        let link = entry.link.trim().to_string();
        let sentiment = self.classifier.classify(&format!("{title} {content}"));

        Article {
            id: article_id(&source.name, &link, &title, index),
            reading_time_minutes: reading_time_minutes(&content),
            title,
            link,
            content,
            published_at: entry.published_at,
            source: source.name.clone(),
            category: source.category.clone(),
            sentiment,
            keywords: BTreeSet::new(),
            is_favorite: false,
            saved_at,
        }
    }
}

impl Extractor for FeedExtractor {
    fn extract(&self, source: &FeedSource, raw: &[u8]) -> Vec<Article> {
        let t0 = std::time::Instant::now();
        let out = match self.try_extract(source, raw) {
            Ok(articles) => articles,
            Err(e) => {
                tracing::warn!(
                    target: "ingest",
                    source = %source.name,
                    error = %e,
                    head = %preview(&String::from_utf8_lossy(raw), 80),
                    "feed not extractable, skipping"
                );
                Vec::new()
            }
        };
        histogram!("worker_parse_ms").record(t0.elapsed().as_secs_f64() * 1_000.0);
        out
    }
}

fn parse_rss(xml: &str) -> Result<Vec<RawEntry>, ExtractError> {
    let rss: Rss = from_str(xml).map_err(|e| ExtractError::Xml(e.to_string()))?;
    Ok(rss
        .channel
        .items
        .into_iter()
        .map(|it| RawEntry {
            title: it.title.unwrap_or_default(),
            link: it.link.unwrap_or_default(),
            body: it.description.unwrap_or_default(),
            published_at: it.pub_date.as_deref().and_then(parse_rfc2822),
        })
        .collect())
}

fn parse_rdf(xml: &str) -> Result<Vec<RawEntry>, ExtractError> {
    let rdf: Rdf = from_str(xml).map_err(|e| ExtractError::Xml(e.to_string()))?;
    Ok(rdf
        .items
        .into_iter()
        .map(|it| RawEntry {
            title: it.title.unwrap_or_default(),
            link: it.link.unwrap_or_default(),
            body: it.description.unwrap_or_default(),
            published_at: it.date.as_deref().and_then(parse_rfc3339),
        })
        .collect())
}

fn parse_atom(xml: &str) -> Result<Vec<RawEntry>, ExtractError> {
    let feed: AtomFeed = from_str(xml).map_err(|e| ExtractError::Xml(e.to_string()))?;
    Ok(feed
        .entries
        .into_iter()
        .map(|e| {
            let link = e.best_link().unwrap_or_default().to_string();
            let published_at = e
                .published
                .as_deref()
                .or(e.updated.as_deref())
                .and_then(parse_rfc3339);
            // summary is the short form; fall back to the full content
            let body = e
                .summary
                .map(|t| t.value)
                .filter(|s| !s.trim().is_empty())
                .or(e.content.map(|t| t.value))
                .unwrap_or_default();
            RawEntry {
                title: e.title.map(|t| t.value).unwrap_or_default(),
                link,
                body,
                published_at,
            }
        })
        .collect())
}

fn to_chrono(dt: OffsetDateTime) -> Option<DateTime<Utc>> {
    Utc.timestamp_opt(dt.unix_timestamp(), dt.nanosecond()).single()
}

fn parse_rfc2822(ts: &str) -> Option<DateTime<Utc>> {
    let ts = ts.trim();
    OffsetDateTime::parse(ts, &Rfc2822)
        .ok()
        .and_then(to_chrono)
        // chrono also accepts the obsolete zone names ("EST", "PDT") some feeds still emit
        .or_else(|| {
            DateTime::parse_from_rfc2822(ts)
                .ok()
                .map(|d| d.with_timezone(&Utc))
        })
}

fn parse_rfc3339(ts: &str) -> Option<DateTime<Utc>> {
    OffsetDateTime::parse(ts.trim(), &Rfc3339)
        .ok()
        .and_then(to_chrono)
}

/// Whole minutes at 200 words per minute, never less than one.
pub fn reading_time_minutes(content: &str) -> u32 {
    let words = content.split_whitespace().count();
    (words / WORDS_PER_MINUTE).max(1) as u32
}

/// Stable within a document: same source, link, title and position give the same id.
pub fn article_id(source: &str, link: &str, title: &str, index: usize) -> String {
    let mut hasher = Sha256::new();
    hasher.update(source.as_bytes());
    hasher.update(b"\n");
    hasher.update(link.as_bytes());
    hasher.update(b"\n");
    hasher.update(title.as_bytes());
    hasher.update(b"\n");
    hasher.update(index.to_string().as_bytes());
    let digest = hasher.finalize();
    digest[..8].iter().map(|b| format!("{b:02x}")).collect()
}

/// Named HTML entities beyond the five XML ones are not valid XML. Known
/// ones become numeric references, unknown ones are escaped literally.
fn scrub_html_entities_for_xml(s: &str) -> String {
    static RE_ENTITY: Lazy<Regex> =
        Lazy::new(|| Regex::new(r"&([A-Za-z][A-Za-z0-9]*);").expect("entity regex"));

    RE_ENTITY
        .replace_all(s, |caps: &Captures| {
            let whole = &caps[0];
            let name = &caps[1];
            if matches!(name, "amp" | "lt" | "gt" | "quot" | "apos") {
                return whole.to_string();
            }
            let decoded = html_escape::decode_html_entities(whole);
            if decoded == whole {
                format!("&amp;{name};")
            } else {
                decoded.chars().map(|c| format!("&#{};", c as u32)).collect()
            }
        })
        .into_owned()
}
