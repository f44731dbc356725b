// tests/extract_feeds.rs
use std::sync::Arc;

use chrono::{TimeZone, Utc};
use news_worker::ingest::clock::ManualClock;
use news_worker::ingest::extract::{Extractor, FeedExtractor};
use news_worker::ingest::types::FeedSource;
use news_worker::sentiment::{LexiconClassifier, SentimentTag};

const BBC: &str = include_str!("fixtures/bbc_rss.xml");
const TECH: &str = include_str!("fixtures/tech_atom.xml");
const MALFORMED: &str = include_str!("fixtures/malformed.xml");

fn extractor() -> FeedExtractor {
    let t = Utc.with_ymd_and_hms(2025, 3, 4, 12, 0, 0).unwrap();
    FeedExtractor::new(Arc::new(ManualClock::new(t)))
}

fn bbc() -> FeedSource {
    FeedSource::new("BBC", "http://feeds.bbci.co.uk/news/world/rss.xml", "World")
}

#[test]
fn rss_items_come_out_in_feed_order() {
    let out = extractor().extract(&bbc(), BBC.as_bytes());
    assert_eq!(out.len(), 3);

    let titles: Vec<&str> = out.iter().map(|a| a.title.as_str()).collect();
    assert_eq!(
        titles,
        vec![
            "Breaking: flood warnings issued across the region",
            "Talks resume after weekend pause",
            "Museum reopens after renovation",
        ]
    );

    let first = &out[0];
    assert_eq!(first.link, "https://www.bbc.co.uk/news/world-1");
    assert_eq!(first.source, "BBC");
    assert_eq!(first.category, "World");
    assert_eq!(
        first.content,
        "Residents are told to move to higher ground as rivers rise."
    );
    assert_eq!(
        first.published_at,
        Some(Utc.with_ymd_and_hms(2025, 3, 4, 10, 30, 0).unwrap())
    );
    assert_eq!(first.reading_time_minutes, 1);
    assert_eq!(first.sentiment, SentimentTag::Neutral);
    assert!(first.keywords.is_empty());
    assert!(!first.is_favorite);
    assert_eq!(first.saved_at, Utc.with_ymd_and_hms(2025, 3, 4, 12, 0, 0).unwrap());
}

#[test]
fn rss_entities_fold_and_bad_dates_are_dropped() {
    let out = extractor().extract(&bbc(), BBC.as_bytes());
    assert_eq!(
        out[1].content,
        r#"Negotiators return to the table with a new proposal "on everything"."#
    );
    assert_eq!(out[2].published_at, None);
}

#[test]
fn atom_entries_prefer_alternate_link_and_summary() {
    let src = FeedSource::new("Tech", "https://tech.test/feed.atom", "Tech");
    let out = extractor().extract(&src, TECH.as_bytes());
    assert_eq!(out.len(), 2);

    assert_eq!(out[0].title, "New AI chip announced");
    assert_eq!(out[0].link, "https://tech.test/posts/ai-chip");
    assert_eq!(out[0].content, "Faster and cheaper inference.");
    assert_eq!(
        out[0].published_at,
        Some(Utc.with_ymd_and_hms(2025, 3, 4, 10, 0, 0).unwrap())
    );

    // no summary: content is used; no published: updated is used
    assert_eq!(out[1].link, "https://tech.test/posts/results");
    assert_eq!(out[1].content, "Revenue grew modestly.");
    assert_eq!(
        out[1].published_at,
        Some(Utc.with_ymd_and_hms(2025, 3, 3, 8, 0, 0).unwrap())
    );
}

#[test]
fn malformed_and_non_feed_input_yield_nothing() {
    let x = extractor();
    assert!(x.extract(&bbc(), MALFORMED.as_bytes()).is_empty());
    assert!(x.extract(&bbc(), b"").is_empty());
    assert!(x.extract(&bbc(), b"{\"json\": true}").is_empty());
    assert!(x.try_extract(&bbc(), MALFORMED.as_bytes()).is_err());
}

#[test]
fn byte_order_mark_is_tolerated() {
    let mut raw = vec![0xEF, 0xBB, 0xBF];
    raw.extend_from_slice(BBC.as_bytes());
    assert_eq!(extractor().extract(&bbc(), &raw).len(), 3);
}

#[test]
fn long_descriptions_take_longer_to_read() {
    let body = "word ".repeat(650);
    let xml = format!(
        "<rss><channel><item><title>Long read</title><description>{body}</description></item></channel></rss>"
    );
    let out = extractor().extract(&bbc(), xml.as_bytes());
    assert_eq!(out[0].reading_time_minutes, 3);
}

#[test]
fn pluggable_classifier_tags_sentiment() {
    let x = extractor().with_classifier(Arc::new(LexiconClassifier::default()));
    let xml = b"<rss><channel><item><title>Markets crash as crisis deepens</title></item></channel></rss>";
    let out = x.extract(&bbc(), xml);
    assert_eq!(out[0].sentiment, SentimentTag::Negative);
}
