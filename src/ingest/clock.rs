// src/ingest/clock.rs
//! Time sources for the pipeline: a wall clock for timestamps and a ticker
//! for the recurring timer. Both are injected so tests can drive them by hand.

use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use std::sync::Mutex;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{Instant, Interval, MissedTickBehavior};

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Test helper: returns `start`, then advances by `step` on every read.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
    step: ChronoDuration,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self::stepping(start, ChronoDuration::zero())
    }

    pub fn stepping(start: DateTime<Utc>, step: ChronoDuration) -> Self {
        Self {
            now: Mutex::new(start),
            step,
        }
    }

    pub fn advance(&self, by: ChronoDuration) {
        let mut now = self.now.lock().expect("clock mutex poisoned");
        *now += by;
    }

    pub fn peek(&self) -> DateTime<Utc> {
        *self.now.lock().expect("clock mutex poisoned")
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        let mut now = self.now.lock().expect("clock mutex poisoned");
        let t = *now;
        *now = t + self.step;
        t
    }
}

/// The recurring timer that drives collection cycles.
#[async_trait]
pub trait Ticker: Send {
    /// Resolves when the next cycle is due.
    async fn tick(&mut self);

    /// Called after a cycle completes. Ticks that came due while the cycle
    /// was running are dropped rather than queued.
    fn discard_missed(&mut self);
}

/// Wall-clock ticker. The first tick is one full period after creation; the
/// eager startup cycle covers time zero.
pub struct IntervalTicker {
    interval: Interval,
    period: Duration,
    last_fired: Instant,
}

impl IntervalTicker {
    pub fn new(period: Duration) -> Self {
        let start = Instant::now();
        let mut interval = tokio::time::interval_at(start + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        Self {
            interval,
            period,
            last_fired: start,
        }
    }
}

#[async_trait]
impl Ticker for IntervalTicker {
    async fn tick(&mut self) {
        self.interval.tick().await;
        self.last_fired = Instant::now();
    }

    fn discard_missed(&mut self) {
        // A cycle longer than one period means a deadline already passed.
        if self.last_fired.elapsed() >= self.period {
            self.interval.reset();
        }
    }
}

/// Test helper: fires only when the paired [`TickTrigger`] says so.
/// Once every trigger is dropped it never fires again.
pub struct ManualTicker {
    rx: mpsc::UnboundedReceiver<()>,
}

#[derive(Clone)]
pub struct TickTrigger {
    tx: mpsc::UnboundedSender<()>,
}

impl TickTrigger {
    pub fn fire(&self) {
        let _ = self.tx.send(());
    }
}

pub fn manual_ticker() -> (TickTrigger, ManualTicker) {
    let (tx, rx) = mpsc::unbounded_channel();
    (TickTrigger { tx }, ManualTicker { rx })
}

#[async_trait]
impl Ticker for ManualTicker {
    async fn tick(&mut self) {
        if self.rx.recv().await.is_none() {
            std::future::pending::<()>().await;
        }
    }

    fn discard_missed(&mut self) {
        while self.rx.try_recv().is_ok() {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn manual_clock_steps_on_each_read() {
        let t0 = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        let c = ManualClock::stepping(t0, ChronoDuration::seconds(2));
        assert_eq!(c.now(), t0);
        assert_eq!(c.now(), t0 + ChronoDuration::seconds(2));
        c.advance(ChronoDuration::seconds(10));
        assert_eq!(c.peek(), t0 + ChronoDuration::seconds(14));
    }

    #[tokio::test]
    async fn manual_ticker_drops_ticks_that_arrive_mid_cycle() {
        let (trigger, mut ticker) = manual_ticker();
        trigger.fire();
        ticker.tick().await;

        // two ticks arrive "while a cycle runs"
        trigger.fire();
        trigger.fire();
        ticker.discard_missed();

        trigger.fire();
        ticker.tick().await;
        assert!(ticker.rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn interval_ticker_waits_one_period_first() {
        let mut ticker = IntervalTicker::new(Duration::from_secs(60));
        let before = Instant::now();
        ticker.tick().await;
        assert!(before.elapsed() >= Duration::from_secs(60));
    }
}
