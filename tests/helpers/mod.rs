//! Shared test helpers for integration tests.
#![allow(dead_code)] // not every test target uses every helper

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use pixelmill_client::PipelineClient;
use pixelmill_core::AppError;
use pixelmill_core::config::waiter::WaiterConfig;
use pixelmill_core::config::worker::WorkerConfig;
use pixelmill_core::result::AppResult;
use pixelmill_core::traits::{
    MessageQueue, ReceiptHandle, ReceiveOptions, ReceivedMessage, Transformer,
};
use pixelmill_queue::InMemoryQueue;
use pixelmill_store::InMemoryBlobStore;
use pixelmill_worker::{JobPipeline, StagingArea, WorkerRunner};

pub const INBOX: &str = "inbox";
pub const OUTBOX: &str = "outbox";

/// Deterministic stand-in for the letterboxing image command: the
/// output is a fixed header plus the input bytes, so tests can assert
/// byte-identity between the worker's output and the collected result.
#[derive(Debug)]
pub struct LetterboxTransformer;

pub const LETTERBOX_HEADER: &[u8] = b"512x512|";

#[async_trait]
impl Transformer for LetterboxTransformer {
    async fn transform(&self, input: &Path, output: &Path) -> AppResult<()> {
        let data = tokio::fs::read(input).await?;
        let mut out = LETTERBOX_HEADER.to_vec();
        out.extend_from_slice(&data);
        tokio::fs::write(output, out).await?;
        Ok(())
    }
}

/// Expected pipeline output for a given submission.
pub fn letterboxed(content: &[u8]) -> Bytes {
    let mut out = LETTERBOX_HEADER.to_vec();
    out.extend_from_slice(content);
    Bytes::from(out)
}

/// Always fails, like a transform command exiting with status 2.
#[derive(Debug)]
pub struct FailingTransformer;

#[async_trait]
impl Transformer for FailingTransformer {
    async fn transform(&self, _input: &Path, _output: &Path) -> AppResult<()> {
        Err(AppError::transform("transform exited with status 2"))
    }
}

/// Queue wrapper that fails the *first* delete on one queue, simulating
/// a worker crash at the acknowledgment step.
#[derive(Debug)]
pub struct FlakyAckQueue {
    inner: InMemoryQueue,
    fail_delete_on: String,
    tripped: AtomicBool,
}

impl FlakyAckQueue {
    pub fn new(inner: InMemoryQueue, fail_delete_on: &str) -> Self {
        Self {
            inner,
            fail_delete_on: fail_delete_on.to_string(),
            tripped: AtomicBool::new(false),
        }
    }
}

#[async_trait]
impl MessageQueue for FlakyAckQueue {
    async fn send(&self, queue: &str, body: &str, delay: Duration) -> AppResult<()> {
        self.inner.send(queue, body, delay).await
    }

    async fn receive(&self, queue: &str, opts: ReceiveOptions) -> AppResult<Vec<ReceivedMessage>> {
        self.inner.receive(queue, opts).await
    }

    async fn delete(&self, queue: &str, receipt: &ReceiptHandle) -> AppResult<()> {
        if queue == self.fail_delete_on && !self.tripped.swap(true, Ordering::SeqCst) {
            return Err(AppError::queue("simulated crash at acknowledgment"));
        }
        self.inner.delete(queue, receipt).await
    }

    async fn purge(&self, queue: &str) -> AppResult<()> {
        self.inner.purge(queue).await
    }
}

/// Queue wrapper that fails the *first* send on one queue, simulating
/// a worker crash between writing the result and publishing the
/// completion message.
#[derive(Debug)]
pub struct FlakyPublishQueue {
    inner: InMemoryQueue,
    fail_send_on: String,
    tripped: AtomicBool,
}

impl FlakyPublishQueue {
    pub fn new(inner: InMemoryQueue, fail_send_on: &str) -> Self {
        Self {
            inner,
            fail_send_on: fail_send_on.to_string(),
            tripped: AtomicBool::new(false),
        }
    }
}

#[async_trait]
impl MessageQueue for FlakyPublishQueue {
    async fn send(&self, queue: &str, body: &str, delay: Duration) -> AppResult<()> {
        if queue == self.fail_send_on && !self.tripped.swap(true, Ordering::SeqCst) {
            return Err(AppError::queue("simulated crash before completion publish"));
        }
        self.inner.send(queue, body, delay).await
    }

    async fn receive(&self, queue: &str, opts: ReceiveOptions) -> AppResult<Vec<ReceivedMessage>> {
        self.inner.receive(queue, opts).await
    }

    async fn delete(&self, queue: &str, receipt: &ReceiptHandle) -> AppResult<()> {
        self.inner.delete(queue, receipt).await
    }

    async fn purge(&self, queue: &str) -> AppResult<()> {
        self.inner.purge(queue).await
    }
}

/// One running pipeline: shared in-memory store and queues, a worker
/// task, and a producer client.
pub struct TestPipeline {
    pub store: InMemoryBlobStore,
    pub queue: InMemoryQueue,
    pub client: PipelineClient,
    cancel: watch::Sender<bool>,
    worker: JoinHandle<()>,
    _staging_dir: tempfile::TempDir,
}

impl TestPipeline {
    /// Start a pipeline whose worker uses the given transformer.
    pub async fn start(transformer: Arc<dyn Transformer>) -> Self {
        let queue = InMemoryQueue::new();
        let worker_queue: Arc<dyn MessageQueue> = Arc::new(queue.clone());
        Self::start_with(transformer, queue, worker_queue, default_waiter_config()).await
    }

    /// Start a pipeline with a custom queue handle for the worker (for
    /// fault injection) and a custom waiter configuration.
    pub async fn start_with(
        transformer: Arc<dyn Transformer>,
        queue: InMemoryQueue,
        worker_queue: Arc<dyn MessageQueue>,
        waiter: WaiterConfig,
    ) -> Self {
        let store = InMemoryBlobStore::new();
        let staging_dir = tempfile::tempdir().unwrap();
        let staging = StagingArea::new(staging_dir.path().to_str().unwrap())
            .await
            .unwrap();

        let pipeline = JobPipeline::new(
            Arc::new(store.clone()),
            worker_queue.clone(),
            transformer,
            staging,
            INBOX,
            OUTBOX,
            Duration::ZERO,
        );
        let runner = WorkerRunner::new(worker_queue, pipeline, worker_config(), INBOX);

        let (cancel, cancel_rx) = watch::channel(false);
        let worker = tokio::spawn(async move { runner.run(cancel_rx).await });

        let client = PipelineClient::new(
            Arc::new(store.clone()),
            Arc::new(queue.clone()),
            waiter,
            INBOX,
            OUTBOX,
        );

        Self {
            store,
            queue,
            client,
            cancel,
            worker,
            _staging_dir: staging_dir,
        }
    }

    /// Stop the worker and wait for it to exit.
    pub async fn shutdown(self) {
        let _ = self.cancel.send(true);
        let _ = self.worker.await;
    }
}

/// Worker settings tuned for tests: short long-poll, 1s visibility so
/// redelivery happens within a test's lifetime.
pub fn worker_config() -> WorkerConfig {
    WorkerConfig {
        receive_batch: 1,
        receive_wait_seconds: 1,
        visibility_seconds: 1,
        completion_delay_seconds: 0,
        ..WorkerConfig::default()
    }
}

/// Waiter settings tuned for tests.
pub fn default_waiter_config() -> WaiterConfig {
    WaiterConfig {
        request_delay_seconds: 0,
        receive_wait_seconds: 1,
        visibility_seconds: 1,
        deadline_seconds: 10,
        backoff_base_ms: 20,
        backoff_max_ms: 200,
        ..WaiterConfig::default()
    }
}

/// Poll a condition until it holds or the timeout expires.
pub async fn wait_until<F>(timeout: Duration, mut condition: F) -> bool
where
    F: AsyncFnMut() -> bool,
{
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition().await {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    false
}
