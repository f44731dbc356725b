// src/notify/mod.rs
//! Notification construction and delivery.
//!
//! Producers hand a [`NotificationDraft`] to the [`NotifyHandle`] queue; the
//! single [`Notifier`] behind it assigns the id and `sent_at`, logs the
//! notification and forwards it to the optional transport.

pub mod queue;
pub mod webhook;

pub use queue::NotifyHandle;
pub use webhook::WebhookTransport;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use metrics::counter;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};

use crate::error::DeliveryError;
use crate::ingest::clock::Clock;
use crate::ingest::types::Article;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    KeywordMatch,
    System,
}

/// Everything a notification carries except what the notifier assigns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationDraft {
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    pub related_article_id: Option<String>,
}

impl NotificationDraft {
    pub fn keyword_match(keyword: &str, article: &Article) -> Self {
        Self {
            kind: NotificationKind::KeywordMatch,
            title: format!("Keyword Alert: {keyword}"),
            message: article.title.clone(),
            related_article_id: Some(article.id.clone()),
        }
    }

    pub fn system(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: NotificationKind::System,
            title: title.into(),
            message: message.into(),
            related_article_id: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub id: String,
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    pub related_article_id: Option<String>,
    pub sent_at: DateTime<Utc>,
}

/// Outbound delivery channel. Failures are reported, never retried by the caller.
#[async_trait]
pub trait NotificationTransport: Send + Sync {
    async fn send(&self, notification: &Notification) -> Result<(), DeliveryError>;
    fn name(&self) -> &'static str;
}

pub struct Notifier {
    clock: Arc<dyn Clock>,
    transport: Option<Arc<dyn NotificationTransport>>,
    last_nanos: Mutex<i64>,
}

impl Notifier {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            transport: None,
            last_nanos: Mutex::new(i64::MIN),
        }
    }

    pub fn with_transport(mut self, transport: Arc<dyn NotificationTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// `notif-<nanos>`, bumped by one when the clock has not moved since the
    /// previous id.
    fn next_id(&self, now: DateTime<Utc>) -> String {
        let nanos = now
            .timestamp_nanos_opt()
            .unwrap_or_else(|| now.timestamp_micros().saturating_mul(1_000));
        let mut last = self.last_nanos.lock().expect("id mutex poisoned");
        let id = if nanos > *last { nanos } else { *last + 1 };
        *last = id;
        format!("notif-{id}")
    }

    /// Finalize a draft, log it and hand it to the transport. Delivery
    /// failure is logged and counted; the notification is returned either way.
    pub async fn deliver(&self, draft: NotificationDraft) -> Notification {
        let now = self.clock.now();
        let notification = Notification {
            id: self.next_id(now),
            kind: draft.kind,
            title: draft.title,
            message: draft.message,
            related_article_id: draft.related_article_id,
            sent_at: now,
        };

        tracing::info!(
            target: "notify",
            id = %notification.id,
            kind = ?notification.kind,
            title = %notification.title,
            message = %notification.message,
            article_id = notification.related_article_id.as_deref().unwrap_or("-"),
            "notification"
        );
        counter!("worker_notifications_total").increment(1);

        if let Some(transport) = &self.transport {
            if let Err(e) = transport.send(&notification).await {
                counter!("worker_delivery_failures_total").increment(1);
                tracing::warn!(
                    target: "notify",
                    id = %notification.id,
                    transport = transport.name(),
                    error = %e,
                    "notification delivery failed"
                );
            }
        }

        notification
    }
}

// --- Test helper ---
/// Collects everything it is asked to send; can be told to fail.
#[derive(Debug, Default)]
pub struct RecordingTransport {
    pub sent: Mutex<Vec<Notification>>,
    pub fail: bool,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn sent(&self) -> Vec<Notification> {
        self.sent.lock().expect("transport mutex poisoned").clone()
    }
}

#[async_trait]
impl NotificationTransport for RecordingTransport {
    async fn send(&self, notification: &Notification) -> Result<(), DeliveryError> {
        self.sent
            .lock()
            .expect("transport mutex poisoned")
            .push(notification.clone());
        if self.fail {
            return Err(DeliveryError::Status(503));
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "recording"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::clock::ManualClock;
    use chrono::TimeZone;

    fn frozen() -> Arc<dyn Clock> {
        Arc::new(ManualClock::new(Utc.with_ymd_and_hms(2025, 5, 1, 8, 0, 0).unwrap()))
    }

    #[tokio::test]
    async fn ids_are_unique_even_on_a_frozen_clock() {
        let n = Notifier::new(frozen());
        let a = n.deliver(NotificationDraft::system("a", "x")).await;
        let b = n.deliver(NotificationDraft::system("b", "y")).await;
        assert!(a.id.starts_with("notif-"));
        assert_ne!(a.id, b.id);
        assert_eq!(a.sent_at, b.sent_at);
    }

    #[tokio::test]
    async fn failed_delivery_still_returns_the_notification() {
        let transport = Arc::new(RecordingTransport::failing());
        let n = Notifier::new(frozen()).with_transport(transport.clone());
        let out = n.deliver(NotificationDraft::system("t", "m")).await;
        assert_eq!(out.title, "t");
        assert_eq!(transport.sent().len(), 1);
    }

    #[test]
    fn json_shape_is_snake_case() {
        let n = Notification {
            id: "notif-1".into(),
            kind: NotificationKind::KeywordMatch,
            title: "Keyword Alert: AI".into(),
            message: "AI wins".into(),
            related_article_id: Some("abc".into()),
            sent_at: Utc.with_ymd_and_hms(2025, 5, 1, 8, 0, 0).unwrap(),
        };
        let v = serde_json::to_value(&n).unwrap();
        assert_eq!(v["kind"], "keyword_match");
        assert_eq!(v["related_article_id"], "abc");
        assert_eq!(v["sent_at"], "2025-05-01T08:00:00Z");
    }
}
