//! In-memory blob store for tests and development.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::Mutex;
use tracing::debug;

use pixelmill_core::error::AppError;
use pixelmill_core::result::AppResult;
use pixelmill_core::traits::BlobStore;

/// Blob store backed by a shared in-memory map.
///
/// Cloning yields handles to the same underlying map, so a test can hand
/// one store to the worker and another to the producer.
#[derive(Debug, Clone, Default)]
pub struct InMemoryBlobStore {
    objects: Arc<Mutex<HashMap<String, Bytes>>>,
}

impl InMemoryBlobStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of objects currently stored. Test helper.
    pub async fn len(&self) -> usize {
        self.objects.lock().await.len()
    }

    /// Whether the store holds no objects. Test helper.
    pub async fn is_empty(&self) -> bool {
        self.objects.lock().await.is_empty()
    }
}

#[async_trait]
impl BlobStore for InMemoryBlobStore {
    async fn put(&self, key: &str, data: Bytes) -> AppResult<()> {
        debug!(key, bytes = data.len(), "Stored object");
        self.objects.lock().await.insert(key.to_string(), data);
        Ok(())
    }

    async fn get(&self, key: &str) -> AppResult<Bytes> {
        self.objects
            .lock()
            .await
            .get(key)
            .cloned()
            .ok_or_else(|| AppError::not_found(format!("Object not found: {key}")))
    }

    async fn delete(&self, key: &str) -> AppResult<()> {
        // Idempotent: removing a missing key is fine.
        self.objects.lock().await.remove(key);
        Ok(())
    }

    async fn exists(&self, key: &str) -> AppResult<bool> {
        Ok(self.objects.lock().await.contains_key(key))
    }
}
