//! In-process object store

use super::{ObjectStore, StoreResult};
use crate::error::StoreError;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::RwLock;
use tracing::debug;

/// An object held by [`MemoryObjectStore`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub body: Vec<u8>,
    pub content_type: String,
}

/// Call counters for an object store
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObjectStoreStats {
    pub objects: usize,
    pub fetches: u64,
    pub stores: u64,
    pub removes: u64,
}

/// Object store kept entirely in memory, keyed by bucket and path
#[derive(Default)]
pub struct MemoryObjectStore {
    objects: RwLock<HashMap<(String, String), StoredObject>>,
    fetches: AtomicU64,
    stores: AtomicU64,
    removes: AtomicU64,
}

impl MemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look at a stored object without counting it as a fetch
    pub async fn object(&self, bucket: &str, path: &str) -> Option<StoredObject> {
        let objects = self.objects.read().await;
        objects
            .get(&(bucket.to_string(), path.to_string()))
            .cloned()
    }

    /// Place an object directly, bypassing the call counters
    pub async fn insert(&self, bucket: &str, path: &str, body: impl Into<Vec<u8>>) {
        let mut objects = self.objects.write().await;
        objects.insert(
            (bucket.to_string(), path.to_string()),
            StoredObject {
                body: body.into(),
                content_type: "application/json".to_string(),
            },
        );
    }

    pub async fn stats(&self) -> ObjectStoreStats {
        let objects = self.objects.read().await;
        ObjectStoreStats {
            objects: objects.len(),
            fetches: self.fetches.load(Ordering::Relaxed),
            stores: self.stores.load(Ordering::Relaxed),
            removes: self.removes.load(Ordering::Relaxed),
        }
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn fetch(&self, bucket: &str, path: &str) -> StoreResult<Vec<u8>> {
        self.fetches.fetch_add(1, Ordering::Relaxed);
        let objects = self.objects.read().await;
        objects
            .get(&(bucket.to_string(), path.to_string()))
            .map(|object| object.body.clone())
            .ok_or_else(|| StoreError::not_found(path))
    }

    async fn store(
        &self,
        bucket: &str,
        path: &str,
        body: Vec<u8>,
        content_type: &str,
    ) -> StoreResult<()> {
        self.stores.fetch_add(1, Ordering::Relaxed);
        debug!(bucket, path, size = body.len(), "Stored object in memory");
        let mut objects = self.objects.write().await;
        objects.insert(
            (bucket.to_string(), path.to_string()),
            StoredObject {
                body,
                content_type: content_type.to_string(),
            },
        );
        Ok(())
    }

    async fn remove(&self, bucket: &str, path: &str) -> StoreResult<()> {
        self.removes.fetch_add(1, Ordering::Relaxed);
        let mut objects = self.objects.write().await;
        objects
            .remove(&(bucket.to_string(), path.to_string()))
            .map(|_| ())
            .ok_or_else(|| StoreError::not_found(path))
    }
}
