//! Queue naming and startup behavior.

use serde::{Deserialize, Serialize};

/// Queue configuration shared by workers and producers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueConfig {
    /// Queue carrying work requests from producers to workers.
    #[serde(default = "default_inbox")]
    pub inbox: String,
    /// Queue carrying completion notices from workers to producers.
    #[serde(default = "default_outbox")]
    pub outbox: String,
    /// Purge both queues at startup.
    ///
    /// Destructive; only sensible when bringing up a fresh environment.
    #[serde(default)]
    pub purge_on_start: bool,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            inbox: default_inbox(),
            outbox: default_outbox(),
            purge_on_start: false,
        }
    }
}

fn default_inbox() -> String {
    "pixelmill-inbox".to_string()
}

fn default_outbox() -> String {
    "pixelmill-outbox".to_string()
}
