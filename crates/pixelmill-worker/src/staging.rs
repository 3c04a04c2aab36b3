//! Local staging paths for in-flight jobs.

use std::path::PathBuf;

use tokio::fs;
use tracing::debug;

use pixelmill_core::error::{AppError, ErrorKind};
use pixelmill_core::result::AppResult;
use pixelmill_core::types::JobKey;

/// Per-job scratch space on the local filesystem.
///
/// The source object is downloaded into `raw/<key>` and the transform
/// writes to `processed/<key>`. Paths are derived purely from the job
/// key, so a redelivered job reuses (and first clears) the same slots a
/// crashed attempt may have left behind.
#[derive(Debug, Clone)]
pub struct StagingArea {
    raw: PathBuf,
    processed: PathBuf,
}

impl StagingArea {
    /// Create the staging directories under the given root.
    pub async fn new(root: &str) -> AppResult<Self> {
        let root = PathBuf::from(root);
        let raw = root.join("raw");
        let processed = root.join("processed");
        for dir in [&raw, &processed] {
            fs::create_dir_all(dir).await.map_err(|e| {
                AppError::with_source(
                    ErrorKind::Storage,
                    format!("Failed to create staging directory: {}", dir.display()),
                    e,
                )
            })?;
        }
        Ok(Self { raw, processed })
    }

    /// Where the source object for this job is staged.
    pub fn input_path(&self, key: &JobKey) -> PathBuf {
        self.raw.join(key.as_str())
    }

    /// Where the transform output for this job is staged.
    pub fn output_path(&self, key: &JobKey) -> PathBuf {
        self.processed.join(key.as_str())
    }

    /// Remove any staged files for this job.
    ///
    /// Idempotent; used both before a job starts (clearing leftovers of
    /// a crashed attempt for the same key) and after it commits.
    pub async fn clear(&self, key: &JobKey) -> AppResult<()> {
        for path in [self.input_path(key), self.output_path(key)] {
            match fs::remove_file(&path).await {
                Ok(()) => debug!(path = %path.display(), "Removed staging file"),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => {
                    return Err(AppError::with_source(
                        ErrorKind::Storage,
                        format!("Failed to remove staging file: {}", path.display()),
                        e,
                    ));
                }
            }
        }
        Ok(())
    }
}
