//! Worker runner — the long-running loop that drains the inbox queue.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tracing::{info, warn};

use pixelmill_core::config::worker::WorkerConfig;
use pixelmill_core::traits::{MessageQueue, ReceiveOptions};

use crate::pipeline::JobPipeline;

/// Sequential inbox consumer.
///
/// One job is in flight at a time; a failed job is logged and abandoned
/// (never propagated across job boundaries) and the loop moves on.
/// Horizontal scaling means running more worker processes against the
/// same inbox — the queue's competing-consumer delivery provides the
/// safety, not in-process locking.
#[derive(Debug)]
pub struct WorkerRunner {
    queue: Arc<dyn MessageQueue>,
    pipeline: JobPipeline,
    config: WorkerConfig,
    inbox: String,
}

impl WorkerRunner {
    /// Create a runner polling the given inbox queue.
    pub fn new(
        queue: Arc<dyn MessageQueue>,
        pipeline: JobPipeline,
        config: WorkerConfig,
        inbox: impl Into<String>,
    ) -> Self {
        Self {
            queue,
            pipeline,
            config,
            inbox: inbox.into(),
        }
    }

    /// Run until the cancel signal flips to `true`.
    ///
    /// The job in flight when the signal arrives finishes first; the
    /// request message of an abandoned job is left for redelivery.
    pub async fn run(&self, mut cancel: watch::Receiver<bool>) {
        info!(
            inbox = %self.inbox,
            batch = self.config.receive_batch,
            wait_seconds = self.config.receive_wait_seconds,
            "Worker started"
        );

        let opts = ReceiveOptions {
            max_messages: self.config.receive_batch,
            wait: Duration::from_secs(self.config.receive_wait_seconds),
            visibility: Duration::from_secs(self.config.visibility_seconds),
        };

        loop {
            if *cancel.borrow() {
                break;
            }

            let messages = tokio::select! {
                changed = cancel.changed() => {
                    // A dropped sender also means shutdown.
                    if changed.is_err() || *cancel.borrow() {
                        break;
                    }
                    continue;
                }
                received = self.queue.receive(&self.inbox, opts) => match received {
                    Ok(messages) => messages,
                    Err(e) => {
                        warn!(error = %e, "Inbox receive failed; retrying");
                        continue;
                    }
                },
            };

            for message in &messages {
                if let Err(e) = self.pipeline.process(message).await {
                    warn!(
                        body = %message.body,
                        error = %e,
                        "Job abandoned; request message left for redelivery"
                    );
                }
            }
        }

        info!("Worker shut down");
    }
}
