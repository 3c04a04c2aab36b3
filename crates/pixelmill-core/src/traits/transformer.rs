//! Transformer port: the external transformation step.

use std::path::Path;

use async_trait::async_trait;

use crate::result::AppResult;

/// Trait for the transformation applied to each job.
///
/// The production implementation shells out to an external command with
/// a hard wall-clock timeout; tests substitute in-process fakes. Any
/// failure (non-zero exit, crash, timeout) surfaces as a `Transform`
/// error and causes the worker to abandon the job for redelivery.
#[async_trait]
pub trait Transformer: Send + Sync + std::fmt::Debug + 'static {
    /// Transform the file at `input` and write the result to `output`.
    async fn transform(&self, input: &Path, output: &Path) -> AppResult<()>;
}
