//! Filesystem-backed object store

use super::{ObjectStore, StoreResult};
use crate::error::{StoreError, StoreErrorKind};
use async_trait::async_trait;
use std::path::{Component, Path, PathBuf};
use tokio::fs;
use tracing::{debug, info, warn};

/// Object store laying objects out as files under `{root}/{bucket}/{path}`
pub struct FsObjectStore {
    root: PathBuf,
}

impl FsObjectStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve an object to a file path, refusing anything that would escape the root
    fn object_path(&self, bucket: &str, path: &str) -> StoreResult<PathBuf> {
        let relative = Path::new(bucket).join(path.trim_start_matches('/'));
        let escapes = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_)));
        if bucket.is_empty() || escapes {
            return Err(StoreError::new(
                StoreErrorKind::Other,
                format!("invalid object path {bucket}/{path}"),
            ));
        }
        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl ObjectStore for FsObjectStore {
    async fn init(&self) -> StoreResult<()> {
        fs::create_dir_all(&self.root).await?;
        info!(root = ?self.root, "Object store initialized");
        Ok(())
    }

    async fn fetch(&self, bucket: &str, path: &str) -> StoreResult<Vec<u8>> {
        let file = self.object_path(bucket, path)?;
        let data = fs::read(&file).await?;
        debug!(file = ?file, size = data.len(), "Read object");
        Ok(data)
    }

    async fn store(
        &self,
        bucket: &str,
        path: &str,
        body: Vec<u8>,
        _content_type: &str,
    ) -> StoreResult<()> {
        let file = self.object_path(bucket, path)?;
        if let Some(parent) = file.parent() {
            fs::create_dir_all(parent).await?;
        }

        // Write a sibling temp file, then rename it over the object
        let tmp = file.with_extension("json.tmp");
        fs::write(&tmp, &body).await?;
        if let Err(e) = fs::rename(&tmp, &file).await {
            if let Err(cleanup) = fs::remove_file(&tmp).await {
                warn!(file = ?tmp, error = %cleanup, "Failed to remove temp file");
            }
            return Err(e.into());
        }

        debug!(file = ?file, size = body.len(), "Wrote object");
        Ok(())
    }

    async fn remove(&self, bucket: &str, path: &str) -> StoreResult<()> {
        let file = self.object_path(bucket, path)?;
        fs::remove_file(&file).await?;
        debug!(file = ?file, "Removed object");
        Ok(())
    }
}
