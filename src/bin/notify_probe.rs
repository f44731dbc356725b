//! Sends one `system` notification through the configured webhook, to check
//! that the API layer receives it. Uses the same config resolution as the worker.

use std::sync::Arc;

use anyhow::Context;
use news_worker::ingest::clock::SystemClock;
use news_worker::notify::{NotificationDraft, NotificationTransport, Notifier, WebhookTransport};
use news_worker::WorkerConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt().with_target(false).init();

    let mut cfg = WorkerConfig::load(None)?;
    cfg.validate()?;

    let Some(endpoint) = cfg.resolved_notify_endpoint()? else {
        anyhow::bail!("no notify endpoint configured (NOTIFY_ENDPOINT is empty)");
    };

    let transport = WebhookTransport::new(endpoint.clone())
        .with_timeout(cfg.notify_timeout())
        .with_attempts(cfg.notify_attempts);
    // No transport on the notifier itself: the probe wants the delivery error.
    let notifier = Notifier::new(Arc::new(SystemClock));

    let sent = notifier
        .deliver(NotificationDraft::system(
            "Probe",
            format!("news-worker probe to {endpoint}"),
        ))
        .await;
    transport
        .send(&sent)
        .await
        .with_context(|| format!("delivering probe to {endpoint}"))?;

    println!("notify-probe sent {}", sent.id);
    Ok(())
}
