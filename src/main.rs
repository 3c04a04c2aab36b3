//! Pixelmill — queue-coordinated image transformation pipeline.
//!
//! Entry point that wires configuration, logging, the blob store, the
//! queue service, the worker loop, and the producer client together.

use std::path::PathBuf;
use std::sync::Arc;

use bytes::Bytes;
use clap::{Parser, Subcommand};
use tokio::sync::watch;
use tracing_subscriber::{EnvFilter, fmt};

use pixelmill_client::PipelineClient;
use pixelmill_core::config::AppConfig;
use pixelmill_core::error::AppError;
use pixelmill_core::traits::{BlobStore, MessageQueue};
use pixelmill_queue::InMemoryQueue;
use pixelmill_store::{InMemoryBlobStore, LocalBlobStore};
use pixelmill_worker::{CommandTransformer, JobPipeline, StagingArea, WorkerRunner};

#[derive(Parser)]
#[command(
    name = "pixelmill",
    version,
    about = "Queue-coordinated image transformation pipeline"
)]
struct Cli {
    /// Configuration environment overlay (config/<env>.toml).
    #[arg(long, default_value = "development")]
    env: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the worker loop until interrupted.
    Worker,
    /// Run the full pipeline in-process: submit a file, wait for the
    /// result, write it out.
    Demo {
        /// File to submit.
        #[arg(long)]
        input: PathBuf,
        /// Where to write the transformed result.
        #[arg(long)]
        output: PathBuf,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match AppConfig::load(&cli.env) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            std::process::exit(1);
        }
    };

    init_logging(&config);

    let result = match cli.command {
        Commands::Worker => run_worker(config).await,
        Commands::Demo { input, output } => run_demo(config, input, output).await,
    };

    if let Err(e) = result {
        tracing::error!("Fatal: {e}");
        std::process::exit(1);
    }
}

/// Initialize tracing/logging.
fn init_logging(config: &AppConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.format.as_str() {
        "json" => {
            fmt()
                .json()
                .with_env_filter(filter)
                .with_target(true)
                .init();
        }
        _ => {
            fmt().with_env_filter(filter).with_target(true).init();
        }
    }
}

/// Build the blob store selected by configuration.
async fn build_store(config: &AppConfig) -> Result<Arc<dyn BlobStore>, AppError> {
    match config.storage.provider.as_str() {
        "memory" => Ok(Arc::new(InMemoryBlobStore::new())),
        "local" => Ok(Arc::new(LocalBlobStore::new(&config.storage.root).await?)),
        other => Err(AppError::configuration(format!(
            "Unknown storage provider: {other}"
        ))),
    }
}

/// Build the queue service and apply startup behavior.
///
/// The bundled queue is process-local; `worker` mode is therefore only
/// useful together with a producer in the same process (see `demo`) or
/// behind an embedding application that shares the handle.
async fn build_queue(config: &AppConfig) -> Result<Arc<InMemoryQueue>, AppError> {
    let queue = Arc::new(InMemoryQueue::new());
    if config.queue.purge_on_start {
        queue.purge(&config.queue.inbox).await?;
        queue.purge(&config.queue.outbox).await?;
        tracing::info!("Purged inbox and outbox queues");
    }
    Ok(queue)
}

async fn build_pipeline(
    config: &AppConfig,
    store: Arc<dyn BlobStore>,
    queue: Arc<dyn MessageQueue>,
) -> Result<JobPipeline, AppError> {
    let staging = StagingArea::new(&config.worker.staging_dir).await?;
    let transformer = Arc::new(CommandTransformer::new(config.transform.clone()));
    Ok(JobPipeline::new(
        store,
        queue,
        transformer,
        staging,
        config.queue.inbox.clone(),
        config.queue.outbox.clone(),
        std::time::Duration::from_secs(config.worker.completion_delay_seconds),
    ))
}

/// Flip the cancel signal on ctrl-c.
fn shutdown_signal() -> watch::Receiver<bool> {
    let (tx, rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Shutdown signal received");
            let _ = tx.send(true);
        }
    });
    rx
}

async fn run_worker(config: AppConfig) -> Result<(), AppError> {
    tracing::info!("Starting Pixelmill worker v{}", env!("CARGO_PKG_VERSION"));

    let store = build_store(&config).await?;
    let queue = build_queue(&config).await?;
    let pipeline = build_pipeline(&config, store, queue.clone()).await?;
    let runner = WorkerRunner::new(
        queue,
        pipeline,
        config.worker.clone(),
        config.queue.inbox.clone(),
    );

    runner.run(shutdown_signal()).await;
    Ok(())
}

async fn run_demo(config: AppConfig, input: PathBuf, output: PathBuf) -> Result<(), AppError> {
    tracing::info!(
        input = %input.display(),
        output = %output.display(),
        "Running end-to-end demo"
    );

    let store = build_store(&config).await?;
    let queue = build_queue(&config).await?;
    let pipeline = build_pipeline(&config, store.clone(), queue.clone()).await?;
    let runner = WorkerRunner::new(
        queue.clone(),
        pipeline,
        config.worker.clone(),
        config.queue.inbox.clone(),
    );

    let (cancel_tx, cancel_rx) = watch::channel(false);
    let worker = tokio::spawn(async move { runner.run(cancel_rx).await });

    let client = PipelineClient::new(
        store,
        queue,
        config.waiter.clone(),
        config.queue.inbox.clone(),
        config.queue.outbox.clone(),
    );

    let file_name = input
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| AppError::configuration("Input path has no usable file name"))?
        .to_string();
    let content = tokio::fs::read(&input).await?;

    let key = client.submit(Bytes::from(content), &file_name).await?;
    tracing::info!(%key, "Submitted; waiting for result");

    let blob = client.wait_for(&key).await?;
    tokio::fs::write(&output, &blob).await?;
    tracing::info!(%key, bytes = blob.len(), path = %output.display(), "Result written");

    let _ = cancel_tx.send(true);
    let _ = worker.await;
    Ok(())
}
