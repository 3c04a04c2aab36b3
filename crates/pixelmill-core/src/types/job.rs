//! Job keys and the correlation scheme.
//!
//! A [`JobKey`] is the sole piece of shared identity in the pipeline: the
//! source object is stored under the key, the request message body *is*
//! the key, the result object is stored under the derived key, and the
//! completion message body *is* the derived key. No structured envelope
//! exists on the wire.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Prefix applied to a job key to derive the result object key.
pub const RESULT_PREFIX: &str = "processed-";

/// Opaque, globally unique identifier for one submitted job.
///
/// Minted by the producer at submission time as a random UUID extended
/// with the original file's extension (so the store side can infer the
/// content type). Immutable once minted.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobKey(String);

impl JobKey {
    /// Mint a fresh key for a file with the given original name.
    ///
    /// The extension (text after the last `.`) is carried over; a name
    /// without an extension yields a bare UUID key.
    pub fn mint(file_name: &str) -> Self {
        let id = Uuid::new_v4();
        match extension_of(file_name) {
            Some(ext) => Self(format!("{id}.{ext}")),
            None => Self(id.to_string()),
        }
    }

    /// Reconstruct a key from a request message body.
    pub fn from_message_body(body: &str) -> Self {
        Self(body.to_string())
    }

    /// The key of the result object, `"processed-" + key`.
    ///
    /// Pure and stateless; this derivation is the entire correlation
    /// scheme between workers and waiters.
    pub fn result_key(&self) -> String {
        format!("{RESULT_PREFIX}{}", self.0)
    }

    /// The key as stored in the blob store and sent on the wire.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Derived lifecycle phase of a job.
///
/// The pipeline keeps no persistent job record; the phase is inferred at
/// each check from which blob store objects currently exist. It can
/// therefore go stale immediately and is intended for inspection and
/// tests, not coordination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobPhase {
    /// The source object exists and no result object does yet.
    Processing,
    /// The result object exists and has not been collected.
    Ready,
    /// Neither object exists: the result was collected. A never-submitted
    /// key reports the same phase; nothing distinguishes the two.
    Collected,
}

fn extension_of(file_name: &str) -> Option<&str> {
    file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext)
        .filter(|ext| !ext.is_empty())
}
