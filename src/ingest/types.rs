// src/ingest/types.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::sentiment::SentimentTag;

fn default_enabled() -> bool {
    true
}

/// A statically configured feed endpoint. Identity is `name` + `url`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FeedSource {
    pub name: String,
    pub url: String,
    pub category: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

impl FeedSource {
    pub fn new(name: &str, url: &str, category: &str) -> Self {
        Self {
            name: name.to_string(),
            url: url.to_string(),
            category: category.to_string(),
            enabled: true,
        }
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }
}

/// Normalized ingestion record produced by the extractor.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Article {
    pub id: String,
    pub title: String,
    pub link: String,
    pub content: String,
    pub published_at: Option<DateTime<Utc>>,
    pub source: String,   // FeedSource::name
    pub category: String, // FeedSource::category
    pub reading_time_minutes: u32,
    pub sentiment: SentimentTag,
    /// Filled by the keyword monitor, never by the extractor.
    pub keywords: BTreeSet<String>,
    pub is_favorite: bool,
    pub saved_at: DateTime<Utc>,
}
