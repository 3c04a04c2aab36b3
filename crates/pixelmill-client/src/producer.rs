//! Job submission and the wait-for-result loop.

use std::sync::Arc;
use std::time::{Duration, Instant};

use bytes::Bytes;
use tracing::{debug, info, warn};

use pixelmill_core::backoff::BackoffPolicy;
use pixelmill_core::config::waiter::WaiterConfig;
use pixelmill_core::result::AppResult;
use pixelmill_core::traits::{BlobStore, MessageQueue, ReceiveOptions};
use pixelmill_core::types::{JobKey, JobPhase};
use pixelmill_core::AppError;

/// Producer-side client: `submit` then `wait_for`.
///
/// Multiple clients may share one outbox queue; each leaves messages it
/// does not own untouched, so they re-appear for their true owner after
/// the (short) visibility timeout. With many concurrent waiters this
/// means repeated re-scanning of each other's completions — an accepted
/// inefficiency, not a correctness problem, since only the owner of a
/// key ever matches it.
#[derive(Debug, Clone)]
pub struct PipelineClient {
    store: Arc<dyn BlobStore>,
    queue: Arc<dyn MessageQueue>,
    config: WaiterConfig,
    inbox: String,
    outbox: String,
}

impl PipelineClient {
    /// Create a client from its injected collaborators.
    pub fn new(
        store: Arc<dyn BlobStore>,
        queue: Arc<dyn MessageQueue>,
        config: WaiterConfig,
        inbox: impl Into<String>,
        outbox: impl Into<String>,
    ) -> Self {
        Self {
            store,
            queue,
            config,
            inbox: inbox.into(),
            outbox: outbox.into(),
        }
    }

    /// Submit a job: mint a key, upload the source object, publish the
    /// request message.
    ///
    /// Not retried internally; on error the caller decides whether to
    /// resubmit (a fresh call mints a fresh key, so a half-failed
    /// submission never collides with a retry).
    pub async fn submit(&self, content: Bytes, file_name: &str) -> AppResult<JobKey> {
        let key = JobKey::mint(file_name);
        info!(%key, file_name, bytes = content.len(), "Submitting job");

        // Object first, then message: a worker that sees the request must
        // be able to fetch the source.
        self.store.put(key.as_str(), content).await?;
        self.queue
            .send(
                &self.inbox,
                key.as_str(),
                Duration::from_secs(self.config.request_delay_seconds),
            )
            .await?;
        Ok(key)
    }

    /// Wait for the job's completion notice and collect the result.
    ///
    /// Polls the outbox under a wall-clock deadline with jittered
    /// exponential backoff between unmatched attempts. On a match the
    /// result object is fetched (a fetch failure here is terminal, not
    /// retried), then the completion message and the result object are
    /// deleted best-effort.
    ///
    /// Deadline exhaustion returns a `Timeout` error meaning "not
    /// available yet" — deliberately indistinguishable from "never
    /// processed" or "collected by someone else" (the wire format
    /// carries no failure signal).
    pub async fn wait_for(&self, key: &JobKey) -> AppResult<Bytes> {
        let result_key = key.result_key();
        let deadline = Instant::now() + Duration::from_secs(self.config.deadline_seconds);
        let backoff = BackoffPolicy::new(
            Duration::from_millis(self.config.backoff_base_ms),
            self.config.backoff_multiplier,
            Duration::from_millis(self.config.backoff_max_ms),
        );
        let mut attempt: u32 = 0;

        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(AppError::timeout(format!(
                    "result for {key} not available within {}s",
                    self.config.deadline_seconds
                )));
            }

            let opts = ReceiveOptions {
                max_messages: self.config.receive_batch,
                wait: Duration::from_secs(self.config.receive_wait_seconds).min(remaining),
                visibility: Duration::from_secs(self.config.visibility_seconds),
            };

            match self.queue.receive(&self.outbox, opts).await {
                Ok(messages) => {
                    debug!(%key, count = messages.len(), "Scanned outbox batch");
                    // Non-matching messages are left untouched; they
                    // become visible again for their own waiters.
                    if let Some(matched) = messages.iter().find(|m| m.body == result_key) {
                        let blob = self.store.get(&result_key).await?;
                        info!(%key, bytes = blob.len(), "Collected result");

                        if let Err(e) = self.queue.delete(&self.outbox, &matched.receipt).await {
                            warn!(%key, error = %e, "Failed to delete completion message");
                        }
                        if let Err(e) = self.store.delete(&result_key).await {
                            warn!(%key, error = %e, "Failed to delete result object");
                        }
                        return Ok(blob);
                    }
                }
                Err(e) => {
                    warn!(%key, error = %e, "Outbox receive failed; backing off");
                }
            }

            attempt += 1;
            let pause = backoff
                .delay(attempt)
                .min(deadline.saturating_duration_since(Instant::now()));
            tokio::time::sleep(pause).await;
        }
    }

    /// Derive the job's lifecycle phase from current store state.
    ///
    /// Nothing is persisted: the phase is inferred from which objects
    /// exist at this instant and may be stale by the time it returns.
    pub async fn status(&self, key: &JobKey) -> AppResult<JobPhase> {
        if self.store.exists(&key.result_key()).await? {
            Ok(JobPhase::Ready)
        } else if self.store.exists(key.as_str()).await? {
            Ok(JobPhase::Processing)
        } else {
            Ok(JobPhase::Collected)
        }
    }
}
