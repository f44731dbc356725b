// src/notify/queue.rs
//! Single-consumer notification queue.
//!
//! The cycle enqueues drafts without awaiting delivery; one background task
//! drains them in FIFO order through the [`Notifier`]. The queue is bounded:
//! when delivery falls that far behind, new drafts are dropped and counted
//! instead of piling up across cycles. Shutdown uses
//! [`NotifyHandle::flush`] to wait, bounded, until everything queued so far
//! has been handled.

use metrics::counter;
use std::time::Duration;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::sync::oneshot;

use super::{Notifier, NotificationDraft};

enum Message {
    Deliver(NotificationDraft),
    Flush(oneshot::Sender<()>),
}

pub const DEFAULT_QUEUE_CAPACITY: usize = 1024;

#[derive(Clone)]
pub struct NotifyHandle {
    sender: mpsc::Sender<Message>,
}

impl NotifyHandle {
    /// Start the delivery task. It ends once every handle is dropped.
    pub fn spawn(notifier: Notifier) -> Self {
        Self::spawn_with_capacity(notifier, DEFAULT_QUEUE_CAPACITY)
    }

    pub fn spawn_with_capacity(notifier: Notifier, capacity: usize) -> Self {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        tokio::spawn(run(notifier, receiver));
        Self { sender }
    }

    /// Fire-and-forget; order of calls is the order of delivery. Returns
    /// `false` when the draft was dropped because the queue is full or closed.
    pub fn notify(&self, draft: NotificationDraft) -> bool {
        match self.sender.try_send(Message::Deliver(draft)) {
            Ok(()) => true,
            Err(TrySendError::Full(Message::Deliver(draft))) => {
                counter!("worker_delivery_failures_total").increment(1);
                tracing::warn!(
                    target: "notify",
                    title = %draft.title,
                    "notification queue full, dropping notification"
                );
                false
            }
            Err(_) => {
                tracing::warn!(target: "notify", "notification queue closed, dropping notification");
                false
            }
        }
    }

    /// Wait until all previously queued drafts were processed. Returns
    /// `false` when the deadline passed first or the queue is gone.
    pub async fn flush(&self, timeout: Duration) -> bool {
        let (ack, done) = oneshot::channel();
        let sender = self.sender.clone();
        let wait = async move {
            // may have to wait for room in a full queue
            sender.send(Message::Flush(ack)).await.is_ok() && done.await.is_ok()
        };
        matches!(tokio::time::timeout(timeout, wait).await, Ok(true))
    }
}

async fn run(notifier: Notifier, mut receiver: mpsc::Receiver<Message>) {
    tracing::debug!(target: "notify", "notification queue started");
    while let Some(msg) = receiver.recv().await {
        match msg {
            Message::Deliver(draft) => {
                notifier.deliver(draft).await;
            }
            Message::Flush(ack) => {
                let _ = ack.send(());
            }
        }
    }
    tracing::debug!(target: "notify", "notification queue stopped");
}
