// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod api;
pub mod config;
pub mod error;
pub mod ingest;
pub mod metrics;
pub mod monitor;
pub mod notify;
pub mod sentiment;

// ---- Re-exports for stable public API ----
pub use crate::api::router;
pub use crate::config::WorkerConfig;
pub use crate::ingest::{Article, Collector, CycleResult, FeedSource, SourceRegistry};
pub use crate::monitor::{KeywordMonitor, MatchEvent};
pub use crate::notify::{Notification, NotificationDraft, NotificationKind, Notifier, NotifyHandle};
