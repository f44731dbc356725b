// src/ingest/cycle.rs
//! One collection cycle: fetch every enabled source concurrently, extract,
//! aggregate in registry order, then persist and run the keyword monitor.

use chrono::{DateTime, Utc};
use metrics::{counter, gauge, histogram};
use std::sync::{Arc, RwLock};
use std::time::Instant;
use tokio::task::JoinSet;

use crate::error::{FetchCause, FetchError};
use crate::ingest::clock::Clock;
use crate::ingest::extract::Extractor;
use crate::ingest::fetcher::FeedFetcher;
use crate::ingest::registry::SourceRegistry;
use crate::ingest::store::ArticleSink;
use crate::ingest::types::{Article, FeedSource};
use crate::monitor::{KeywordMonitor, MatchEvent};
use crate::notify::{NotificationDraft, NotifyHandle};

#[derive(Debug)]
pub struct CycleResult {
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    /// Grouped by source in registry order; feed order within a source.
    pub articles: Vec<Article>,
    pub per_source_errors: Vec<FetchError>,
    pub matches: Vec<MatchEvent>,
}

impl CycleResult {
    pub fn sources_failed(&self) -> usize {
        self.per_source_errors.len()
    }
}

type SourceOutcome = Result<Vec<Article>, FetchError>;

pub struct Collector {
    fetcher: Arc<dyn FeedFetcher>,
    extractor: Arc<dyn Extractor>,
    sink: Arc<dyn ArticleSink>,
    monitor: KeywordMonitor,
    notifier: NotifyHandle,
    clock: Arc<dyn Clock>,
    last_collected_at: RwLock<Option<DateTime<Utc>>>,
}

impl Collector {
    pub fn new(
        fetcher: Arc<dyn FeedFetcher>,
        extractor: Arc<dyn Extractor>,
        sink: Arc<dyn ArticleSink>,
        monitor: KeywordMonitor,
        notifier: NotifyHandle,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            fetcher,
            extractor,
            sink,
            monitor,
            notifier,
            clock,
            last_collected_at: RwLock::new(None),
        }
    }

    pub fn notifier(&self) -> &NotifyHandle {
        &self.notifier
    }

    /// Start time of the most recent cycle whose aggregation finished.
    pub fn last_collected_at(&self) -> Option<DateTime<Utc>> {
        *self.last_collected_at.read().expect("rwlock poisoned")
    }

    /// Runs one cycle to completion. Individual source failures end up in
    /// `per_source_errors`; the cycle itself never fails.
    pub async fn run_cycle(&self, registry: &SourceRegistry) -> CycleResult {
        let started_at = self.clock.now();
        let t0 = Instant::now();
        let sources: Vec<FeedSource> = registry.enabled().cloned().collect();

        tracing::info!(
            target: "ingest",
            sources = sources.len(),
            "collection cycle started"
        );

        let mut tasks = JoinSet::new();
        for (idx, source) in sources.iter().cloned().enumerate() {
            let fetcher = Arc::clone(&self.fetcher);
            let extractor = Arc::clone(&self.extractor);
            tasks.spawn(async move {
                let outcome = match fetcher.fetch(&source).await {
                    Ok(raw) => Ok(extractor.extract(&source, &raw)),
                    Err(e) => Err(e),
                };
                (idx, outcome)
            });
        }

        // Completion order is arbitrary; slot by index to keep registry order.
        let mut slots: Vec<Option<SourceOutcome>> = sources.iter().map(|_| None).collect();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((idx, outcome)) => slots[idx] = Some(outcome),
                Err(e) => tracing::error!(target: "ingest", error = %e, "source task aborted"),
            }
        }

        let mut articles = Vec::new();
        let mut per_source_errors = Vec::new();
        for (source, slot) in sources.iter().zip(slots) {
            let outcome = slot.unwrap_or_else(|| {
                Err(FetchError::new(
                    &source.name,
                    &source.url,
                    FetchCause::Aborted("fetch task did not complete".to_string()),
                ))
            });
            match outcome {
                Ok(mut batch) => {
                    tracing::info!(
                        target: "ingest",
                        source = %source.name,
                        articles = batch.len(),
                        "source collected"
                    );
                    articles.append(&mut batch);
                }
                Err(e) => {
                    counter!("worker_fetch_errors_total").increment(1);
                    tracing::warn!(
                        target: "ingest",
                        source = %source.name,
                        url = %source.url,
                        error = %e.cause,
                        "source skipped this cycle"
                    );
                    per_source_errors.push(e);
                }
            }
        }

        // Aggregation is complete from here on.
        *self.last_collected_at.write().expect("rwlock poisoned") = Some(started_at);

        let matches = self.monitor.tag(&mut articles);

        if let Err(e) = self.sink.write_articles(&articles).await {
            tracing::error!(target: "ingest", error = %e, "persisting articles failed");
        }

        self.monitor.dispatch(&matches, &self.notifier);

        if !sources.is_empty() && per_source_errors.len() == sources.len() {
            self.notifier.notify(NotificationDraft::system(
                "Collection failed",
                format!("all {} sources failed this cycle", sources.len()),
            ));
        }

        counter!("worker_cycles_total").increment(1);
        counter!("worker_articles_total").increment(articles.len() as u64);
        counter!("worker_matches_total").increment(matches.len() as u64);
        histogram!("worker_cycle_ms").record(t0.elapsed().as_secs_f64() * 1_000.0);
        gauge!("worker_last_collected_ts").set(started_at.timestamp() as f64);

        let completed_at = self.clock.now();
        tracing::info!(
            target: "ingest",
            articles = articles.len(),
            failed_sources = per_source_errors.len(),
            matches = matches.len(),
            elapsed_ms = t0.elapsed().as_millis() as u64,
            "collection cycle finished"
        );

        CycleResult {
            started_at,
            completed_at,
            articles,
            per_source_errors,
            matches,
        }
    }
}
