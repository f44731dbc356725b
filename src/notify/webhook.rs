// src/notify/webhook.rs
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

use super::{Notification, NotificationTransport};
use crate::error::DeliveryError;

/// POSTs each notification as JSON to a fixed endpoint, with a short
/// per-request timeout and a bounded number of attempts.
#[derive(Clone)]
pub struct WebhookTransport {
    endpoint: String,
    client: Client,
    timeout: Duration,
    max_attempts: u8,
    backoff: Duration,
}

impl WebhookTransport {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            client: Client::new(),
            timeout: Duration::from_secs(5),
            max_attempts: 2,
            backoff: Duration::from_millis(500),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Total attempts including the first; clamped to at least one.
    pub fn with_attempts(mut self, attempts: u8) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    pub fn with_backoff(mut self, backoff: Duration) -> Self {
        self.backoff = backoff;
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl NotificationTransport for WebhookTransport {
    async fn send(&self, notification: &Notification) -> Result<(), DeliveryError> {
        let mut attempt: u8 = 0;
        loop {
            attempt += 1;
            let res = self
                .client
                .post(&self.endpoint)
                .timeout(self.timeout)
                .json(notification)
                .send()
                .await;

            let err = match res {
                Ok(rsp) if rsp.status().is_success() => {
                    tracing::debug!(
                        target: "notify",
                        id = %notification.id,
                        status = rsp.status().as_u16(),
                        attempt,
                        "webhook accepted notification"
                    );
                    return Ok(());
                }
                Ok(rsp) => DeliveryError::Status(rsp.status().as_u16()),
                Err(e) => DeliveryError::Request(e),
            };

            if attempt >= self.max_attempts {
                return Err(err);
            }
            tracing::debug!(target: "notify", id = %notification.id, attempt, error = %err, "retrying webhook");
            tokio::time::sleep(self.backoff * (1u32 << (attempt - 1).min(10))).await;
        }
    }

    fn name(&self) -> &'static str {
        "webhook"
    }
}
