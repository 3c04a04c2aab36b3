//! Message queue port: at-least-once delivery with visibility timeouts.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;

use crate::result::AppResult;

/// Opaque token identifying one *delivery* of a message.
///
/// A fresh handle is issued on every receive; deleting a message requires
/// the handle from its most recent delivery, mirroring the contract of
/// hosted queue services.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ReceiptHandle(pub String);

impl fmt::Display for ReceiptHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One message delivered by a receive call.
#[derive(Debug, Clone)]
pub struct ReceivedMessage {
    /// The message body (a job key or a derived result key).
    pub body: String,
    /// The receipt for this delivery, needed to delete the message.
    pub receipt: ReceiptHandle,
}

/// Parameters for a receive call.
#[derive(Debug, Clone, Copy)]
pub struct ReceiveOptions {
    /// Maximum number of messages to return.
    pub max_messages: usize,
    /// Long-poll wait: how long an empty receive blocks before returning.
    pub wait: Duration,
    /// How long delivered messages stay hidden from other receivers
    /// before becoming redeliverable.
    pub visibility: Duration,
}

/// Trait for at-least-once delivery message queues.
///
/// A received-but-undeleted message becomes visible again once its
/// visibility timeout expires, so consumers must tolerate duplicates via
/// idempotent processing. Competing consumers are safe without locks:
/// each message is delivered to exactly one receiver per visibility
/// window.
#[async_trait]
pub trait MessageQueue: Send + Sync + std::fmt::Debug + 'static {
    /// Enqueue a message, visible after the given delay.
    async fn send(&self, queue: &str, body: &str, delay: Duration) -> AppResult<()>;

    /// Receive up to `max_messages` messages, long-polling up to `wait`.
    ///
    /// An empty result is not an error.
    async fn receive(&self, queue: &str, opts: ReceiveOptions) -> AppResult<Vec<ReceivedMessage>>;

    /// Delete a message by the receipt of its latest delivery.
    ///
    /// Returns a `NotFound` error for an unknown or expired receipt.
    async fn delete(&self, queue: &str, receipt: &ReceiptHandle) -> AppResult<()>;

    /// Drop every message in the queue.
    ///
    /// Destructive; appropriate only when resetting a fresh environment
    /// at startup.
    async fn purge(&self, queue: &str) -> AppResult<()>;
}
