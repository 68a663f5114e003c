//! Scoped Context Store
//!
//! Independent key/value namespaces ("scopes"), each persisted as one JSON
//! document at `{prefix}/context/{scope}.json` in an object store, with an
//! in-process read cache that is invalidated on every write.
//!
//! # Example
//!
//! ```no_run
//! use context_store::{ContextSettings, ContextStore, MemoryObjectStore};
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! # async fn example() -> context_store::Result<()> {
//! let settings = ContextSettings::new("my-bucket").with_prefix("app");
//! let store = ContextStore::new(settings, Arc::new(MemoryObjectStore::new()))?;
//!
//! store.set("session", &["user", "theme"], vec![json!("ana"), json!("dark")]).await?;
//! let values = store.get("session", &["user", "missing"]).await?;
//! assert_eq!(values, vec![Some(json!("ana")), None]);
//! # Ok(())
//! # }
//! ```

mod context;
mod document;
mod error;
mod settings;
mod store;

pub use context::{CacheStats, ContextStore};
pub use document::{decode_document, encode_document, ScopeDocument, DOCUMENT_CONTENT_TYPE};
pub use error::{ContextError, Result, StoreError, StoreErrorKind};
pub use settings::ContextSettings;
pub use store::{
    FsObjectStore, HttpObjectStore, MemoryObjectStore, ObjectStore, ObjectStoreStats,
    S3ObjectStore, S3Options, StoreResult, StoredObject,
};
