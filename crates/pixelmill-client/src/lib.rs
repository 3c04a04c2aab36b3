//! # pixelmill-client
//!
//! The producer half of the pipeline: submit a job, then wait for its
//! completion notice on the outbox queue and collect the result. The
//! producer and the workers never communicate directly; the queues and
//! the blob store are the only shared state.

pub mod producer;

pub use producer::PipelineClient;
