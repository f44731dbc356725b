// src/ingest/registry.rs
use crate::ingest::types::FeedSource;

/// Ordered, immutable list of feed sources. Built once at startup and passed
/// into the collector; iteration order is registry order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceRegistry {
    sources: Vec<FeedSource>,
}

impl SourceRegistry {
    pub fn new(sources: Vec<FeedSource>) -> Self {
        Self { sources }
    }

    /// The sources the worker ships with when no `[[sources]]` are configured.
    pub fn builtin() -> Self {
        Self::new(default_sources())
    }

    pub fn all(&self) -> &[FeedSource] {
        &self.sources
    }

    /// Enabled subset, in registry order.
    pub fn enabled(&self) -> impl Iterator<Item = &FeedSource> {
        self.sources.iter().filter(|s| s.enabled)
    }

    pub fn enabled_count(&self) -> usize {
        self.enabled().count()
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}

pub fn default_sources() -> Vec<FeedSource> {
    vec![
        FeedSource::new("BBC", "http://feeds.bbci.co.uk/news/world/rss.xml", "World"),
        FeedSource::new("TechCrunch", "https://techcrunch.com/feed/", "Tech"),
        FeedSource::new("HackerNews", "https://hnrss.org/frontpage", "Tech"),
    ]
}
