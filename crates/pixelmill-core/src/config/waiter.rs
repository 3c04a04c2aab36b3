//! Producer-side waiter configuration.

use serde::{Deserialize, Serialize};

/// Configuration for the producer's wait-for-result loop.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WaiterConfig {
    /// Delivery delay in seconds applied to request messages at submit.
    #[serde(default = "default_request_delay")]
    pub request_delay_seconds: u64,
    /// Completion messages fetched per outbox receive.
    #[serde(default = "default_receive_batch")]
    pub receive_batch: usize,
    /// Long-poll wait in seconds for each outbox receive.
    #[serde(default = "default_receive_wait")]
    pub receive_wait_seconds: u64,
    /// Visibility timeout in seconds for received completion messages.
    ///
    /// Kept short so an unmatched message re-appears quickly for the
    /// waiter that actually owns it.
    #[serde(default = "default_visibility")]
    pub visibility_seconds: u64,
    /// Overall deadline in seconds for one wait-for-result call.
    #[serde(default = "default_deadline")]
    pub deadline_seconds: u64,
    /// Backoff base delay in milliseconds between unmatched attempts.
    #[serde(default = "default_backoff_base")]
    pub backoff_base_ms: u64,
    /// Backoff multiplier per attempt.
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,
    /// Cap in milliseconds on the backoff delay.
    #[serde(default = "default_backoff_max")]
    pub backoff_max_ms: u64,
}

impl Default for WaiterConfig {
    fn default() -> Self {
        Self {
            request_delay_seconds: default_request_delay(),
            receive_batch: default_receive_batch(),
            receive_wait_seconds: default_receive_wait(),
            visibility_seconds: default_visibility(),
            deadline_seconds: default_deadline(),
            backoff_base_ms: default_backoff_base(),
            backoff_multiplier: default_backoff_multiplier(),
            backoff_max_ms: default_backoff_max(),
        }
    }
}

fn default_request_delay() -> u64 {
    1
}

fn default_receive_batch() -> usize {
    10
}

fn default_receive_wait() -> u64 {
    10
}

fn default_visibility() -> u64 {
    10
}

fn default_deadline() -> u64 {
    300
}

fn default_backoff_base() -> u64 {
    500
}

fn default_backoff_multiplier() -> f64 {
    2.0
}

fn default_backoff_max() -> u64 {
    10_000
}
