// src/monitor.rs
//! Keyword watch over freshly collected articles.
//!
//! Matching is a case-insensitive substring test against `title + " " + content`.
//! An article matching several keywords reports only the first one in list
//! order, so each article raises at most one alert per cycle.

use crate::ingest::types::Article;
use crate::notify::{NotificationDraft, NotifyHandle};

#[derive(Debug, Clone, PartialEq)]
pub struct MatchEvent {
    pub article: Article,
    pub keyword: String,
}

impl MatchEvent {
    pub fn to_draft(&self) -> NotificationDraft {
        NotificationDraft::keyword_match(&self.keyword, &self.article)
    }
}

#[derive(Debug, Clone)]
struct Keyword {
    display: String,
    needle: String,
}

#[derive(Debug, Clone, Default)]
pub struct KeywordMonitor {
    keywords: Vec<Keyword>,
}

impl KeywordMonitor {
    /// Blank keywords are dropped; they would match every article.
    pub fn new<S: AsRef<str>>(keywords: &[S]) -> Self {
        let keywords = keywords
            .iter()
            .map(|k| k.as_ref().trim())
            .filter(|k| !k.is_empty())
            .map(|k| Keyword {
                display: k.to_string(),
                needle: k.to_lowercase(),
            })
            .collect();
        Self { keywords }
    }

    pub fn keywords(&self) -> impl Iterator<Item = &str> {
        self.keywords.iter().map(|k| k.display.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.keywords.is_empty()
    }

    pub fn first_match(&self, article: &Article) -> Option<&str> {
        if self.keywords.is_empty() {
            return None;
        }
        let haystack = format!("{} {}", article.title, article.content).to_lowercase();
        self.keywords
            .iter()
            .find(|k| haystack.contains(&k.needle))
            .map(|k| k.display.as_str())
    }

    /// Pure check: one event per matching article, in article order.
    pub fn check(&self, articles: &[Article]) -> Vec<MatchEvent> {
        articles
            .iter()
            .filter_map(|a| {
                self.first_match(a).map(|kw| MatchEvent {
                    article: a.clone(),
                    keyword: kw.to_string(),
                })
            })
            .collect()
    }

    /// Like [`check`](Self::check), but also records the matched keyword on
    /// each article.
    pub fn tag(&self, articles: &mut [Article]) -> Vec<MatchEvent> {
        let mut events = Vec::new();
        for article in articles.iter_mut() {
            if let Some(kw) = self.first_match(article).map(str::to_string) {
                article.keywords.insert(kw.clone());
                events.push(MatchEvent {
                    article: article.clone(),
                    keyword: kw,
                });
            }
        }
        events
    }

    /// One notification per event, queued in event order. No I/O happens here.
    pub fn dispatch(&self, events: &[MatchEvent], notifier: &NotifyHandle) {
        for ev in events {
            tracing::debug!(
                target: "notify",
                keyword = %ev.keyword,
                article_id = %ev.article.id,
                "keyword matched"
            );
            notifier.notify(ev.to_draft());
        }
    }
}

/// Convenience for one-off checks.
pub fn check<S: AsRef<str>>(articles: &[Article], keywords: &[S]) -> Vec<MatchEvent> {
    KeywordMonitor::new(keywords).check(articles)
}
