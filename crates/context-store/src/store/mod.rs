//! Backing object store contract and adapters
//!
//! The cache manager only needs get/put/delete of opaque blobs addressed by
//! bucket and path. Adapters classify their failures with
//! [`StoreErrorKind`](crate::StoreErrorKind) so not-found handling is a typed
//! branch.

mod fs;
mod http;
mod memory;
mod s3;

pub use fs::FsObjectStore;
pub use http::HttpObjectStore;
pub use memory::{MemoryObjectStore, ObjectStoreStats, StoredObject};
pub use s3::{S3ObjectStore, S3Options};

use crate::error::StoreError;
use async_trait::async_trait;

pub type StoreResult<T> = std::result::Result<T, StoreError>;

#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Prepare the backend. Called from [`ContextStore::open`](crate::ContextStore::open).
    async fn init(&self) -> StoreResult<()> {
        Ok(())
    }

    /// Read the object at `path`, failing with `NotFound` if it does not exist
    async fn fetch(&self, bucket: &str, path: &str) -> StoreResult<Vec<u8>>;

    /// Write `body` to `path`, replacing any existing object
    async fn store(
        &self,
        bucket: &str,
        path: &str,
        body: Vec<u8>,
        content_type: &str,
    ) -> StoreResult<()>;

    /// Remove the object at `path`, failing with `NotFound` if it does not exist
    async fn remove(&self, bucket: &str, path: &str) -> StoreResult<()>;
}
