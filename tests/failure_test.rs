//! Failure-path tests: permanent transform failures and dead-lettering.

mod helpers;

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use pixelmill_core::traits::{BlobStore, MessageQueue};
use pixelmill_queue::InMemoryQueue;

use helpers::{
    FailingTransformer, TestPipeline, INBOX, OUTBOX, default_waiter_config, wait_until,
};

#[tokio::test]
async fn test_failing_transform_never_deletes_request_message() {
    let queue = InMemoryQueue::new();
    let worker_queue: Arc<dyn MessageQueue> = Arc::new(queue.clone());
    let mut waiter = default_waiter_config();
    waiter.deadline_seconds = 2;
    let pipeline =
        TestPipeline::start_with(Arc::new(FailingTransformer), queue, worker_queue, waiter).await;

    let key = pipeline
        .client
        .submit(Bytes::from_static(b"poison"), "bad.png")
        .await
        .unwrap();

    // The waiter exhausts its deadline with a timeout, never a false
    // success.
    let err = pipeline.client.wait_for(&key).await.unwrap_err();
    assert!(err.is_timeout());

    // The request message is still in the inbox, being redelivered; no
    // completion was ever published.
    assert_eq!(pipeline.queue.len(INBOX).await, 1);
    assert!(pipeline.queue.is_empty(OUTBOX).await);
    assert!(!pipeline.store.exists(&key.result_key()).await.unwrap());
    // The source object survives for the next redelivery.
    assert!(pipeline.store.exists(key.as_str()).await.unwrap());

    pipeline.shutdown().await;
}

#[tokio::test]
async fn test_exhausted_message_moves_to_dead_letter_queue() {
    let queue = InMemoryQueue::new();
    queue.set_redrive(INBOX, 2, "inbox-dlq").await;
    let worker_queue: Arc<dyn MessageQueue> = Arc::new(queue.clone());
    let pipeline = TestPipeline::start_with(
        Arc::new(FailingTransformer),
        queue,
        worker_queue,
        default_waiter_config(),
    )
    .await;

    let key = pipeline
        .client
        .submit(Bytes::from_static(b"poison"), "bad.png")
        .await
        .unwrap();

    // Two failed deliveries, then the queue itself moves the message
    // aside; the worker never deletes it.
    assert!(
        wait_until(Duration::from_secs(10), async || {
            pipeline.queue.is_empty(INBOX).await && pipeline.queue.len("inbox-dlq").await == 1
        })
        .await,
        "request message should end up in the dead-letter queue"
    );
    assert!(pipeline.store.exists(key.as_str()).await.unwrap());
    assert!(pipeline.queue.is_empty(OUTBOX).await);

    pipeline.shutdown().await;
}
