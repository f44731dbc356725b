// src/ingest/scheduler.rs
//! Drives collection cycles on a fixed interval.
//!
//! States: `Idle -> Running -> Idle` per cycle, then `ShuttingDown -> Stopped`
//! once shutdown is requested. Cycles run inline in the scheduler task, so two
//! cycles can never overlap, and a cycle that is already running is always
//! allowed to finish.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tokio::sync::watch;

use crate::ingest::clock::Ticker;
use crate::ingest::cycle::{Collector, CycleResult};
use crate::ingest::registry::SourceRegistry;

const TRANSITION_CAP: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SchedulerState {
    Idle,
    Running,
    ShuttingDown,
    Stopped,
}

impl fmt::Display for SchedulerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SchedulerState::Idle => "idle",
            SchedulerState::Running => "running",
            SchedulerState::ShuttingDown => "shutting_down",
            SchedulerState::Stopped => "stopped",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CycleSummary {
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    pub articles: usize,
    pub errors: usize,
    pub matches: usize,
}

impl From<&CycleResult> for CycleSummary {
    fn from(r: &CycleResult) -> Self {
        Self {
            started_at: r.started_at,
            completed_at: r.completed_at,
            articles: r.articles.len(),
            errors: r.per_source_errors.len(),
            matches: r.matches.len(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct WorkerStatus {
    pub state: SchedulerState,
    pub started_at: DateTime<Utc>,
    pub last_collected_at: Option<DateTime<Utc>>,
    pub cycles_completed: u64,
    pub last_cycle: Option<CycleSummary>,
    #[serde(skip)]
    pub transitions: Vec<SchedulerState>,
}

/// Shared view of the scheduler, read by the status API.
#[derive(Debug, Clone)]
pub struct StatusHandle {
    inner: Arc<RwLock<WorkerStatus>>,
}

impl StatusHandle {
    pub fn new(started_at: DateTime<Utc>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(WorkerStatus {
                state: SchedulerState::Idle,
                started_at,
                last_collected_at: None,
                cycles_completed: 0,
                last_cycle: None,
                transitions: vec![SchedulerState::Idle],
            })),
        }
    }

    pub fn snapshot(&self) -> WorkerStatus {
        self.inner.read().expect("status lock poisoned").clone()
    }

    pub fn state(&self) -> SchedulerState {
        self.inner.read().expect("status lock poisoned").state
    }

    /// Every state entered so far, oldest first (capped).
    pub fn transitions(&self) -> Vec<SchedulerState> {
        self.inner
            .read()
            .expect("status lock poisoned")
            .transitions
            .clone()
    }

    fn transition(&self, to: SchedulerState) {
        let mut s = self.inner.write().expect("status lock poisoned");
        let from = s.state;
        s.state = to;
        s.transitions.push(to);
        if s.transitions.len() > TRANSITION_CAP {
            let excess = s.transitions.len() - TRANSITION_CAP;
            s.transitions.drain(0..excess);
        }
        drop(s);
        tracing::debug!(target: "scheduler", %from, %to, "state change");
    }

    fn record_cycle(&self, result: &CycleResult, last_collected_at: Option<DateTime<Utc>>) {
        let mut s = self.inner.write().expect("status lock poisoned");
        s.cycles_completed += 1;
        s.last_collected_at = last_collected_at;
        s.last_cycle = Some(CycleSummary::from(result));
    }
}

/// A shutdown trigger plus the receiver the scheduler listens on. Sending
/// `true` (or dropping the sender) requests shutdown.
pub fn shutdown_channel() -> (watch::Sender<bool>, watch::Receiver<bool>) {
    watch::channel(false)
}

/// Resolves once shutdown was requested on `rx`.
pub async fn shutdown_requested(mut rx: watch::Receiver<bool>) {
    loop {
        if *rx.borrow() {
            return;
        }
        if rx.changed().await.is_err() {
            return;
        }
    }
}

enum Wake {
    Tick,
    Signal,
    Shutdown,
}

pub struct Scheduler<T: Ticker> {
    collector: Arc<Collector>,
    registry: SourceRegistry,
    ticker: T,
    shutdown: watch::Receiver<bool>,
    status: StatusHandle,
    drain_timeout: Duration,
}

impl<T: Ticker> Scheduler<T> {
    pub fn new(
        collector: Arc<Collector>,
        registry: SourceRegistry,
        ticker: T,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        Self {
            collector,
            registry,
            ticker,
            shutdown,
            status: StatusHandle::new(Utc::now()),
            drain_timeout: Duration::from_secs(10),
        }
    }

    pub fn with_status(mut self, status: StatusHandle) -> Self {
        self.status = status;
        self
    }

    /// Upper bound on waiting for queued notifications during shutdown.
    pub fn with_drain_timeout(mut self, timeout: Duration) -> Self {
        self.drain_timeout = timeout;
        self
    }

    pub fn status(&self) -> StatusHandle {
        self.status.clone()
    }

    /// Runs one cycle right away, then one per tick until shutdown.
    /// Returns the final status once `Stopped`.
    pub async fn run(mut self) -> WorkerStatus {
        tracing::info!(
            target: "scheduler",
            sources = self.registry.enabled_count(),
            "scheduler started"
        );

        self.cycle().await;
        self.ticker.discard_missed();

        loop {
            if *self.shutdown.borrow() {
                break;
            }
            let wake = tokio::select! {
                biased;
                changed = self.shutdown.changed() => match changed {
                    Ok(()) => Wake::Signal,
                    Err(_) => Wake::Shutdown,
                },
                _ = self.ticker.tick() => Wake::Tick,
            };
            match wake {
                // re-checked at the top of the loop
                Wake::Signal => continue,
                Wake::Shutdown => break,
                Wake::Tick => {
                    self.cycle().await;
                    self.ticker.discard_missed();
                }
            }
        }

        tracing::info!(target: "scheduler", "shutdown requested, draining notifications");
        self.status.transition(SchedulerState::ShuttingDown);
        if !self.collector.notifier().flush(self.drain_timeout).await {
            tracing::warn!(
                target: "scheduler",
                timeout_ms = self.drain_timeout.as_millis() as u64,
                "notification queue not drained before deadline"
            );
        }
        self.status.transition(SchedulerState::Stopped);
        tracing::info!(target: "scheduler", "scheduler stopped");
        self.status.snapshot()
    }

    async fn cycle(&mut self) {
        self.status.transition(SchedulerState::Running);
        let result = self.collector.run_cycle(&self.registry).await;
        self.status
            .record_cycle(&result, self.collector.last_collected_at());
        self.status.transition(SchedulerState::Idle);
    }
}
