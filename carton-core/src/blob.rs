use async_trait::async_trait;

use crate::FulfillResult;

/// Key-value blob storage with publicly resolvable URLs.
///
/// Writing the same path twice overwrites; callers that need idempotent
/// artifacts derive the path deterministically (e.g. from an order id).
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Upload bytes under `path`, returning the public URL.
    async fn put(&self, path: &str, bytes: Vec<u8>, content_type: &str) -> FulfillResult<String>;

    /// Download the blob at `path`, if present.
    async fn get(&self, path: &str) -> FulfillResult<Option<Vec<u8>>>;
}
