//! The per-message job pipeline.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use tokio::fs;
use tracing::{debug, info, warn};

use pixelmill_core::error::{AppError, ErrorKind};
use pixelmill_core::result::AppResult;
use pixelmill_core::traits::{BlobStore, MessageQueue, ReceivedMessage, Transformer};
use pixelmill_core::types::JobKey;

use crate::staging::StagingArea;

/// Drives one received request message through the whole pipeline:
/// fetch → transform → store → notify → acknowledge → cleanup.
///
/// Any error before acknowledgment abandons the job *without* deleting
/// the request message, so the queue's visibility timeout redelivers it
/// later. Steps up to the completion publish are idempotent (keyed
/// overwrites), which is what makes redelivery safe.
#[derive(Debug, Clone)]
pub struct JobPipeline {
    store: Arc<dyn BlobStore>,
    queue: Arc<dyn MessageQueue>,
    transformer: Arc<dyn Transformer>,
    staging: StagingArea,
    inbox: String,
    outbox: String,
    completion_delay: Duration,
}

impl JobPipeline {
    /// Assemble a pipeline from its injected collaborators.
    pub fn new(
        store: Arc<dyn BlobStore>,
        queue: Arc<dyn MessageQueue>,
        transformer: Arc<dyn Transformer>,
        staging: StagingArea,
        inbox: impl Into<String>,
        outbox: impl Into<String>,
        completion_delay: Duration,
    ) -> Self {
        Self {
            store,
            queue,
            transformer,
            staging,
            inbox: inbox.into(),
            outbox: outbox.into(),
            completion_delay,
        }
    }

    /// Process one request message to completion.
    ///
    /// On `Err` the caller must *not* delete the message; redelivery is
    /// the retry mechanism.
    pub async fn process(&self, message: &ReceivedMessage) -> AppResult<()> {
        let key = JobKey::from_message_body(&message.body);
        let result_key = key.result_key();
        info!(%key, "Processing job");

        // A crashed attempt for this key may have left stale files.
        self.staging.clear(&key).await?;
        let input = self.staging.input_path(&key);
        let output = self.staging.output_path(&key);

        let source = self.store.get(key.as_str()).await?;
        fs::write(&input, &source).await.map_err(|e| {
            AppError::with_source(
                ErrorKind::Storage,
                format!("Failed to stage source object: {key}"),
                e,
            )
        })?;
        debug!(%key, bytes = source.len(), "Fetched source object");

        self.transformer.transform(&input, &output).await?;

        let transformed = fs::read(&output).await.map_err(|e| {
            AppError::with_source(
                ErrorKind::Transform,
                format!("Transform produced no readable output: {key}"),
                e,
            )
        })?;
        self.store
            .put(&result_key, Bytes::from(transformed))
            .await?;
        debug!(%key, result_key, "Stored result object");

        // Publish strictly after the result write is acknowledged: a
        // completion message must always imply the result exists.
        self.queue
            .send(&self.outbox, &result_key, self.completion_delay)
            .await?;
        debug!(%key, "Published completion message");

        // The commit point. Everything after this is space reclamation.
        self.queue.delete(&self.inbox, &message.receipt).await?;
        info!(%key, "Job committed");

        if let Err(e) = self.store.delete(key.as_str()).await {
            warn!(%key, error = %e, "Failed to delete source object; leaving for GC");
        }
        if let Err(e) = self.staging.clear(&key).await {
            warn!(%key, error = %e, "Failed to clear staging files");
        }
        Ok(())
    }
}
