//! Scope cache manager
//!
//! Every read and write of a scope goes through [`ContextStore`]. A scope's
//! document is resident in memory once it has been read or written; it is
//! authoritative only while its loaded marker is set. Writes persist the whole
//! document and then clear the marker so the next read reconciles with the
//! backing store.

use crate::document::{decode_document, encode_document, ScopeDocument, DOCUMENT_CONTENT_TYPE};
use crate::error::{ContextError, Result};
use crate::settings::ContextSettings;
use crate::store::ObjectStore;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

/// Resident documents and loaded markers.
///
/// A marker is only ever set for a scope that also has a document.
#[derive(Default)]
struct CacheState {
    documents: HashMap<String, ScopeDocument>,
    loaded: HashSet<String>,
}

/// Statistics about the scope cache
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub resident_scopes: usize,
    pub loaded_scopes: usize,
    pub hits: u64,
    pub misses: u64,
    pub loads: u64,
    pub writes: u64,
    pub deletes: u64,
}

/// Handle owning the scope cache in front of an [`ObjectStore`]
pub struct ContextStore {
    settings: ContextSettings,
    store: Arc<dyn ObjectStore>,
    state: RwLock<CacheState>,
    hits: AtomicU64,
    misses: AtomicU64,
    loads: AtomicU64,
    writes: AtomicU64,
    deletes: AtomicU64,
}

impl ContextStore {
    /// Create a store handle, failing if the settings do not name a bucket
    pub fn new(settings: ContextSettings, store: Arc<dyn ObjectStore>) -> Result<Self> {
        settings.validate()?;
        Ok(Self {
            settings,
            store,
            state: RwLock::new(CacheState::default()),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            loads: AtomicU64::new(0),
            writes: AtomicU64::new(0),
            deletes: AtomicU64::new(0),
        })
    }

    pub fn settings(&self) -> &ContextSettings {
        &self.settings
    }

    /// Prepare the backing store
    pub async fn open(&self) -> Result<()> {
        self.store.init().await?;
        info!(
            bucket = %self.settings.bucket,
            prefix = %self.settings.prefix,
            "Context store opened"
        );
        Ok(())
    }

    /// Drop every cached scope. The backing store is left as is.
    pub async fn close(&self) {
        self.clear_cache().await;
        info!(bucket = %self.settings.bucket, "Context store closed");
    }

    /// Look up `keys` in `scope`, loading the scope first if it is not loaded.
    ///
    /// Values come back in request order; `None` marks a key the scope does not
    /// hold. A missing scope reads as empty.
    pub async fn get<K: AsRef<str>>(&self, scope: &str, keys: &[K]) -> Result<Vec<Option<Value>>> {
        validate_scope(scope)?;
        self.ensure_loaded(scope).await?;

        let state = self.state.read().await;
        let document = state.documents.get(scope);
        Ok(keys
            .iter()
            .map(|key| document.and_then(|doc| doc.get(key.as_ref())).cloned())
            .collect())
    }

    pub async fn get_one(&self, scope: &str, key: &str) -> Result<Option<Value>> {
        let mut values = self.get(scope, &[key]).await?;
        Ok(values.pop().flatten())
    }

    /// Write `keys[i] = values[i]` into `scope` and persist the whole document.
    ///
    /// The update is applied to a copy of the resident document; the copy only
    /// replaces it once the store accepts the write, after which the scope is
    /// marked for reload. A failed persist leaves the cache untouched.
    pub async fn set<K: AsRef<str>>(&self, scope: &str, keys: &[K], values: Vec<Value>) -> Result<()> {
        validate_scope(scope)?;
        if keys.len() != values.len() {
            return Err(ContextError::Validation(format!(
                "keys and values must have the same length (got {} keys, {} values)",
                keys.len(),
                values.len()
            )));
        }

        let mut document = {
            let state = self.state.read().await;
            state.documents.get(scope).cloned().unwrap_or_default()
        };
        for (key, value) in keys.iter().zip(values) {
            document.insert(key.as_ref().to_string(), value);
        }

        let path = self.settings.document_path(scope);
        let body = encode_document(&document)?;
        self.store
            .store(&self.settings.bucket, &path, body, DOCUMENT_CONTENT_TYPE)
            .await?;

        {
            let mut state = self.state.write().await;
            state.documents.insert(scope.to_string(), document);
            state.loaded.remove(scope);
        }
        self.writes.fetch_add(1, Ordering::Relaxed);
        debug!(scope, path = %path, keys = keys.len(), "Persisted scope document");

        Ok(())
    }

    pub async fn set_one(&self, scope: &str, key: &str, value: Value) -> Result<()> {
        self.set(scope, &[key], vec![value]).await
    }

    /// Key names held by `scope`, in document order
    pub async fn keys(&self, scope: &str) -> Result<Vec<String>> {
        validate_scope(scope)?;
        self.ensure_loaded(scope).await?;

        let state = self.state.read().await;
        Ok(state
            .documents
            .get(scope)
            .map(|doc| doc.keys().cloned().collect())
            .unwrap_or_default())
    }

    /// Remove `scope` from the backing store and the cache.
    ///
    /// Deleting a scope that does not exist succeeds.
    pub async fn delete(&self, scope: &str) -> Result<()> {
        validate_scope(scope)?;
        let path = self.settings.document_path(scope);

        match self.store.remove(&self.settings.bucket, &path).await {
            Ok(()) => debug!(scope, path = %path, "Deleted scope document"),
            Err(e) if e.is_not_found() => {
                warn!(scope, path = %path, "Scope not found during deletion");
            }
            Err(e) => return Err(e.into()),
        }

        {
            let mut state = self.state.write().await;
            state.documents.remove(scope);
            state.loaded.remove(scope);
        }
        self.deletes.fetch_add(1, Ordering::Relaxed);

        Ok(())
    }

    /// Delete each scope in order, stopping at the first failure
    pub async fn clean<S: AsRef<str>>(&self, scopes: &[S]) -> Result<()> {
        for scope in scopes {
            self.delete(scope.as_ref()).await?;
        }
        Ok(())
    }

    /// Discard every resident document and loaded marker
    pub async fn clear_cache(&self) {
        let mut state = self.state.write().await;
        let scopes = state.documents.len();
        state.documents.clear();
        state.loaded.clear();
        debug!(scopes, "Cleared scope cache");
    }

    /// Whether `scope` is currently served from memory without a fetch
    pub async fn is_loaded(&self, scope: &str) -> bool {
        self.state.read().await.loaded.contains(scope)
    }

    pub async fn stats(&self) -> CacheStats {
        let state = self.state.read().await;
        CacheStats {
            resident_scopes: state.documents.len(),
            loaded_scopes: state.loaded.len(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            loads: self.loads.load(Ordering::Relaxed),
            writes: self.writes.load(Ordering::Relaxed),
            deletes: self.deletes.load(Ordering::Relaxed),
        }
    }

    /// Load `scope` from the store unless its marker is already set
    async fn ensure_loaded(&self, scope: &str) -> Result<()> {
        if self.is_loaded(scope).await {
            self.hits.fetch_add(1, Ordering::Relaxed);
            debug!(scope, "Scope cache hit");
            return Ok(());
        }
        self.misses.fetch_add(1, Ordering::Relaxed);

        let path = self.settings.document_path(scope);
        let document = match self.store.fetch(&self.settings.bucket, &path).await {
            Ok(bytes) => decode_document(scope, &bytes)?,
            Err(e) if e.is_not_found() => {
                warn!(scope, path = %path, "Scope not found in object store");
                ScopeDocument::new()
            }
            Err(e) => return Err(e.into()),
        };

        {
            let mut state = self.state.write().await;
            state.documents.insert(scope.to_string(), document);
            state.loaded.insert(scope.to_string());
        }
        self.loads.fetch_add(1, Ordering::Relaxed);
        debug!(scope, path = %path, "Loaded scope document");

        Ok(())
    }
}

/// Path safety is left to the adapters; the core only needs a name
fn validate_scope(scope: &str) -> Result<()> {
    if scope.is_empty() {
        return Err(ContextError::Validation(
            "scope name must not be empty".to_string(),
        ));
    }
    Ok(())
}
