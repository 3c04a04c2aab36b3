//! In-memory queue implementation.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::sync::{Mutex, Notify};
use tracing::debug;
use uuid::Uuid;

use pixelmill_core::error::AppError;
use pixelmill_core::result::AppResult;
use pixelmill_core::traits::{MessageQueue, ReceiptHandle, ReceiveOptions, ReceivedMessage};

/// One enqueued message.
#[derive(Debug, Clone)]
struct MessageRecord {
    body: String,
    /// The message is deliverable once this instant has passed; pushed
    /// forward by the visibility timeout on every delivery.
    visible_at: Instant,
    /// Completed deliveries of this message.
    receive_count: u32,
    /// Receipt of the latest delivery; replaced on redelivery.
    receipt: Option<String>,
}

/// Redrive policy: after `max_receive_count` deliveries a message is
/// moved to the dead-letter queue instead of being delivered again.
#[derive(Debug, Clone)]
struct RedrivePolicy {
    max_receive_count: u32,
    dead_letter_queue: String,
}

#[derive(Debug, Default)]
struct QueueState {
    messages: Vec<MessageRecord>,
    redrive: Option<RedrivePolicy>,
}

/// In-process message queue with hosted-queue semantics.
///
/// Cloning yields handles to the same underlying state, so workers and
/// producers in one process (or one test) share the queues. Messages are
/// hidden for the receiver-chosen visibility timeout on delivery and
/// become redeliverable when it expires, which is what makes competing
/// consumers safe without locks.
#[derive(Debug, Clone, Default)]
pub struct InMemoryQueue {
    inner: Arc<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    queues: Mutex<HashMap<String, QueueState>>,
    /// Woken on every send so long-polling receivers see new messages
    /// without busy-waiting.
    notify: Notify,
}

impl InMemoryQueue {
    /// Create an empty queue service.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configure a redrive policy for a queue.
    ///
    /// A message that has already been delivered `max_receive_count`
    /// times is moved to `dead_letter_queue` the next time it would be
    /// delivered.
    pub async fn set_redrive(&self, queue: &str, max_receive_count: u32, dead_letter_queue: &str) {
        let mut queues = self.inner.queues.lock().await;
        queues.entry(queue.to_string()).or_default().redrive = Some(RedrivePolicy {
            max_receive_count,
            dead_letter_queue: dead_letter_queue.to_string(),
        });
    }

    /// Total number of messages in a queue, visible or not. Test helper.
    pub async fn len(&self, queue: &str) -> usize {
        let queues = self.inner.queues.lock().await;
        queues.get(queue).map_or(0, |q| q.messages.len())
    }

    /// Whether a queue holds no messages at all. Test helper.
    pub async fn is_empty(&self, queue: &str) -> bool {
        self.len(queue).await == 0
    }

    /// One delivery pass over a queue.
    ///
    /// Returns the delivered messages and, when nothing was deliverable,
    /// the earliest upcoming visibility instant to sleep until.
    async fn try_deliver(
        &self,
        queue: &str,
        opts: &ReceiveOptions,
    ) -> (Vec<ReceivedMessage>, Option<Instant>) {
        let mut queues = self.inner.queues.lock().await;
        let now = Instant::now();

        let state = queues.entry(queue.to_string()).or_default();
        let redrive = state.redrive.clone();

        let mut delivered = Vec::new();
        let mut dead_lettered = Vec::new();
        let mut next_visible: Option<Instant> = None;

        let mut idx = 0;
        while idx < state.messages.len() {
            let record = &mut state.messages[idx];
            if record.visible_at > now {
                next_visible = Some(match next_visible {
                    Some(t) => t.min(record.visible_at),
                    None => record.visible_at,
                });
                idx += 1;
                continue;
            }
            if delivered.len() >= opts.max_messages {
                idx += 1;
                continue;
            }
            if let Some(policy) = &redrive {
                if record.receive_count >= policy.max_receive_count {
                    dead_lettered.push(state.messages.remove(idx));
                    continue;
                }
            }
            record.receive_count += 1;
            record.visible_at = now + opts.visibility;
            let receipt = Uuid::new_v4().to_string();
            record.receipt = Some(receipt.clone());
            delivered.push(ReceivedMessage {
                body: record.body.clone(),
                receipt: ReceiptHandle(receipt),
            });
            idx += 1;
        }

        if let Some(policy) = redrive {
            for mut record in dead_lettered {
                debug!(
                    queue,
                    dead_letter = %policy.dead_letter_queue,
                    body = %record.body,
                    receive_count = record.receive_count,
                    "Moving exhausted message to dead-letter queue"
                );
                record.visible_at = now;
                record.receipt = None;
                queues
                    .entry(policy.dead_letter_queue.clone())
                    .or_default()
                    .messages
                    .push(record);
            }
        }

        (delivered, next_visible)
    }
}

#[async_trait]
impl MessageQueue for InMemoryQueue {
    async fn send(&self, queue: &str, body: &str, delay: Duration) -> AppResult<()> {
        {
            let mut queues = self.inner.queues.lock().await;
            queues
                .entry(queue.to_string())
                .or_default()
                .messages
                .push(MessageRecord {
                    body: body.to_string(),
                    visible_at: Instant::now() + delay,
                    receive_count: 0,
                    receipt: None,
                });
        }
        debug!(queue, body, ?delay, "Enqueued message");
        self.inner.notify.notify_waiters();
        Ok(())
    }

    async fn receive(&self, queue: &str, opts: ReceiveOptions) -> AppResult<Vec<ReceivedMessage>> {
        let deadline = Instant::now() + opts.wait;
        loop {
            // Register interest before inspecting state so a send that
            // lands between the check and the await still wakes us.
            let notified = self.inner.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            let (delivered, next_visible) = self.try_deliver(queue, &opts).await;
            if !delivered.is_empty() {
                debug!(queue, count = delivered.len(), "Delivered messages");
                return Ok(delivered);
            }

            let now = Instant::now();
            if now >= deadline {
                return Ok(Vec::new());
            }
            let mut sleep_for = deadline - now;
            if let Some(at) = next_visible {
                sleep_for = sleep_for.min(at.saturating_duration_since(now));
            }
            tokio::select! {
                _ = &mut notified => {}
                _ = tokio::time::sleep(sleep_for) => {}
            }
        }
    }

    async fn delete(&self, queue: &str, receipt: &ReceiptHandle) -> AppResult<()> {
        let mut queues = self.inner.queues.lock().await;
        let state = queues
            .get_mut(queue)
            .ok_or_else(|| AppError::not_found(format!("Unknown queue: {queue}")))?;

        let pos = state
            .messages
            .iter()
            .position(|m| m.receipt.as_deref() == Some(receipt.0.as_str()))
            .ok_or_else(|| {
                AppError::not_found(format!("No message with receipt {receipt} in {queue}"))
            })?;
        let record = state.messages.remove(pos);
        debug!(queue, body = %record.body, "Deleted message");
        Ok(())
    }

    async fn purge(&self, queue: &str) -> AppResult<()> {
        let mut queues = self.inner.queues.lock().await;
        if let Some(state) = queues.get_mut(queue) {
            let dropped = state.messages.len();
            state.messages.clear();
            debug!(queue, dropped, "Purged queue");
        }
        Ok(())
    }
}
