//! Worker loop configuration.

use serde::{Deserialize, Serialize};

/// Worker loop configuration.
///
/// The worker is a single sequential consumer; throughput scaling comes
/// from running more worker processes against the same inbox queue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerConfig {
    /// Number of request messages fetched per receive.
    #[serde(default = "default_receive_batch")]
    pub receive_batch: usize,
    /// Long-poll wait in seconds for each inbox receive.
    #[serde(default = "default_receive_wait")]
    pub receive_wait_seconds: u64,
    /// Visibility timeout in seconds for received request messages.
    ///
    /// Must comfortably exceed the transform timeout, otherwise a
    /// message can be redelivered while its job is still running.
    #[serde(default = "default_visibility")]
    pub visibility_seconds: u64,
    /// Delivery delay in seconds applied to completion messages.
    #[serde(default = "default_completion_delay")]
    pub completion_delay_seconds: u64,
    /// Directory for per-job local staging files.
    #[serde(default = "default_staging_dir")]
    pub staging_dir: String,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            receive_batch: default_receive_batch(),
            receive_wait_seconds: default_receive_wait(),
            visibility_seconds: default_visibility(),
            completion_delay_seconds: default_completion_delay(),
            staging_dir: default_staging_dir(),
        }
    }
}

fn default_receive_batch() -> usize {
    1
}

fn default_receive_wait() -> u64 {
    10
}

fn default_visibility() -> u64 {
    120
}

fn default_completion_delay() -> u64 {
    1
}

fn default_staging_dir() -> String {
    "data/staging".to_string()
}
