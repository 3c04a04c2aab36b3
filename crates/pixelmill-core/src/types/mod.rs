//! Domain types shared across the pipeline.

pub mod job;

pub use job::{JobKey, JobPhase, RESULT_PREFIX};
