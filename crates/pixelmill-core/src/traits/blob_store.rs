//! Blob store port: key-addressed binary object storage.

use async_trait::async_trait;
use bytes::Bytes;

use crate::result::AppResult;

/// Trait for key-addressed blob storage backends.
///
/// Implementations exist for the local filesystem and for an in-memory
/// map used by tests. The trait is defined here in `pixelmill-core` and
/// implemented in `pixelmill-store`.
///
/// `put` overwrites any existing object under the same key; combined
/// with producer-minted unique keys this is what makes redelivered jobs
/// safe to reprocess.
#[async_trait]
pub trait BlobStore: Send + Sync + std::fmt::Debug + 'static {
    /// Store an object under the given key, replacing any previous one.
    async fn put(&self, key: &str, data: Bytes) -> AppResult<()>;

    /// Fetch the object stored under the given key.
    ///
    /// Returns a `NotFound` error when no such object exists.
    async fn get(&self, key: &str) -> AppResult<Bytes>;

    /// Delete the object stored under the given key.
    ///
    /// Idempotent: deleting a missing key succeeds.
    async fn delete(&self, key: &str) -> AppResult<()>;

    /// Check whether an object exists under the given key.
    async fn exists(&self, key: &str) -> AppResult<bool>;
}
