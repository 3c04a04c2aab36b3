//! # pixelmill-worker
//!
//! The consumer half of the pipeline: a sequential loop that drains the
//! inbox queue and drives each job through fetch → transform → store →
//! notify → acknowledge → cleanup.
//!
//! Acknowledgment (deleting the request message) is deliberately the
//! last irreversible step, so any failure before it results in
//! redelivery rather than job loss. Every write is keyed by the job key
//! and overwrites, which makes redelivered jobs safe to reprocess.

pub mod pipeline;
pub mod runner;
pub mod staging;
pub mod transform;

pub use pipeline::JobPipeline;
pub use runner::WorkerRunner;
pub use staging::StagingArea;
pub use transform::CommandTransformer;
