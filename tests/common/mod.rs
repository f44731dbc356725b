// tests/common/mod.rs
// Shared stubs for the pipeline integration tests.
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, TimeZone, Utc};
use tokio::sync::Notify;

use news_worker::error::{FetchCause, FetchError};
use news_worker::ingest::clock::{Clock, ManualClock};
use news_worker::ingest::extract::FeedExtractor;
use news_worker::ingest::fetcher::FeedFetcher;
use news_worker::ingest::store::MemorySink;
use news_worker::ingest::types::FeedSource;
use news_worker::notify::{Notifier, NotifyHandle, RecordingTransport};
use news_worker::{Collector, KeywordMonitor};

pub enum Stub {
    Body(Vec<u8>),
    Fail(FetchCause),
    Delayed(Duration, Vec<u8>),
    /// Signals `started`, then waits for `release` before answering.
    Gated {
        started: Arc<Notify>,
        release: Arc<Notify>,
        body: Vec<u8>,
    },
}

/// Fetcher answering from a table keyed by source name.
#[derive(Default)]
pub struct StubFetcher {
    stubs: HashMap<String, Stub>,
    pub calls: Mutex<Vec<String>>,
}

impl StubFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, source: &str, stub: Stub) -> Self {
        self.stubs.insert(source.to_string(), stub);
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl FeedFetcher for StubFetcher {
    async fn fetch(&self, source: &FeedSource) -> Result<Vec<u8>, FetchError> {
        self.calls.lock().unwrap().push(source.name.clone());
        match self.stubs.get(&source.name) {
            Some(Stub::Body(b)) => Ok(b.clone()),
            Some(Stub::Fail(cause)) => Err(FetchError::new(&source.name, &source.url, cause.clone())),
            Some(Stub::Delayed(d, b)) => {
                tokio::time::sleep(*d).await;
                Ok(b.clone())
            }
            Some(Stub::Gated {
                started,
                release,
                body,
            }) => {
                started.notify_one();
                release.notified().await;
                Ok(body.clone())
            }
            None => Err(FetchError::new(
                &source.name,
                &source.url,
                FetchCause::Connect("no stub".into()),
            )),
        }
    }
}

/// Minimal RSS document with (title, description) items.
pub fn rss(items: &[(&str, &str)]) -> Vec<u8> {
    let mut xml = String::from(r#"<?xml version="1.0"?><rss version="2.0"><channel><title>t</title>"#);
    for (i, (title, desc)) in items.iter().enumerate() {
        xml.push_str(&format!(
            "<item><title>{title}</title><link>http://feed.test/{i}</link><description>{desc}</description></item>"
        ));
    }
    xml.push_str("</channel></rss>");
    xml.into_bytes()
}

pub fn source(name: &str) -> FeedSource {
    FeedSource::new(name, &format!("http://{}.test/rss", name.to_lowercase()), "Test")
}

pub fn clock() -> Arc<ManualClock> {
    Arc::new(ManualClock::stepping(
        Utc.with_ymd_and_hms(2025, 3, 4, 12, 0, 0).unwrap(),
        ChronoDuration::seconds(1),
    ))
}

pub struct Harness {
    pub collector: Arc<Collector>,
    pub sink: Arc<MemorySink>,
    pub transport: Arc<RecordingTransport>,
    pub notify: NotifyHandle,
    pub clock: Arc<ManualClock>,
}

pub fn harness(fetcher: StubFetcher, keywords: &[&str]) -> Harness {
    harness_with(Arc::new(fetcher), keywords, Arc::new(MemorySink::new()))
}

pub fn harness_with(fetcher: Arc<StubFetcher>, keywords: &[&str], sink: Arc<MemorySink>) -> Harness {
    let clock = clock();
    let dyn_clock: Arc<dyn Clock> = clock.clone();
    let transport = Arc::new(RecordingTransport::new());
    let notify = NotifyHandle::spawn(Notifier::new(dyn_clock.clone()).with_transport(transport.clone()));
    let collector = Arc::new(Collector::new(
        fetcher,
        Arc::new(FeedExtractor::new(dyn_clock.clone())),
        sink.clone(),
        KeywordMonitor::new(keywords),
        notify.clone(),
        dyn_clock,
    ));
    Harness {
        collector,
        sink,
        transport,
        notify,
        clock,
    }
}
