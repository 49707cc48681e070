//! Blob Store Gateway (C1): a thin, content-addressed interface over the
//! output/input buckets. No versioning beyond what the underlying store
//! supplies; writes are at-least-once and readers retry `NotFound` within a
//! bounded window to tolerate eventual consistency (§4.9).

mod error;
mod memory;
mod s3;

pub use error::BlobError;
pub use memory::InMemoryBlobStore;
pub use s3::{S3BlobStore, S3Config};

use async_trait::async_trait;
use std::time::Duration;

/// Default window readers wait out while retrying a `NotFound` that may just
/// be eventual-consistency lag after a recent write (§4.9).
pub const NOT_FOUND_RETRY_WINDOW: Duration = Duration::from_secs(3);

#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn put(&self, key: &str, bytes: &[u8], content_type: &str) -> Result<String, BlobError>;

    async fn get(&self, key: &str) -> Result<Vec<u8>, BlobError>;

    async fn exists(&self, key: &str) -> Result<bool, BlobError>;

    async fn delete(&self, key: &str) -> Result<(), BlobError>;

    async fn list(&self, prefix: &str) -> Result<Vec<String>, BlobError>;
}

/// JSON convenience helpers layered over any `BlobStore`.
#[async_trait]
pub trait JsonBlobStore: BlobStore {
    async fn put_json<T: serde::Serialize + Sync>(
        &self,
        key: &str,
        value: &T,
    ) -> Result<String, BlobError> {
        let bytes = serde_json::to_vec(value).map_err(BlobError::Serialization)?;
        self.put(key, &bytes, "application/json").await
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, key: &str) -> Result<T, BlobError> {
        let bytes = get_with_eventual_consistency_retry(self, key).await?;
        serde_json::from_slice(&bytes).map_err(BlobError::Serialization)
    }
}

impl<T: BlobStore + ?Sized> JsonBlobStore for T {}

/// Retry a `get` against `NotFound` for up to `NOT_FOUND_RETRY_WINDOW`,
/// since a write that just landed may not be immediately visible (§4.9).
pub async fn get_with_eventual_consistency_retry(
    store: &(impl BlobStore + ?Sized),
    key: &str,
) -> Result<Vec<u8>, BlobError> {
    let deadline = tokio::time::Instant::now() + NOT_FOUND_RETRY_WINDOW;
    loop {
        match store.get(key).await {
            Ok(bytes) => return Ok(bytes),
            Err(BlobError::NotFound(_)) if tokio::time::Instant::now() < deadline => {
                tokio::time::sleep(Duration::from_millis(100)).await;
            }
            Err(e) => return Err(e),
        }
    }
}
