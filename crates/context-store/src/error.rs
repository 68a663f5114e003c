//! Error types for the context store

use std::fmt;

/// Classification of a backing store failure.
///
/// `NotFound` is the only kind the cache manager treats specially: absence is a
/// valid state for a scope, so loads and deletes translate it instead of
/// surfacing it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreErrorKind {
    NotFound,
    PermissionDenied,
    Transport,
    Io,
    Other,
}

impl fmt::Display for StoreErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::NotFound => "not found",
            Self::PermissionDenied => "permission denied",
            Self::Transport => "transport",
            Self::Io => "io",
            Self::Other => "other",
        };
        f.write_str(name)
    }
}

/// Failure reported by an [`ObjectStore`](crate::ObjectStore) adapter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreError {
    kind: StoreErrorKind,
    message: String,
}

impl StoreError {
    pub fn new(kind: StoreErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn not_found(path: &str) -> Self {
        Self::new(StoreErrorKind::NotFound, format!("no object at {path}"))
    }

    pub fn kind(&self) -> StoreErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn is_not_found(&self) -> bool {
        self.kind == StoreErrorKind::NotFound
    }
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.message, self.kind)
    }
}

impl std::error::Error for StoreError {}

impl From<std::io::Error> for StoreError {
    fn from(err: std::io::Error) -> Self {
        let kind = match err.kind() {
            std::io::ErrorKind::NotFound => StoreErrorKind::NotFound,
            std::io::ErrorKind::PermissionDenied => StoreErrorKind::PermissionDenied,
            _ => StoreErrorKind::Io,
        };
        Self::new(kind, err.to_string())
    }
}

impl From<reqwest::Error> for StoreError {
    fn from(err: reqwest::Error) -> Self {
        Self::new(StoreErrorKind::Transport, err.to_string())
    }
}

/// Errors surfaced by [`ContextStore`](crate::ContextStore) operations
#[derive(Debug)]
pub enum ContextError {
    /// Malformed call input or settings; no store call was attempted
    Validation(String),
    /// Backing store failure other than not-found
    Store(StoreError),
    /// A fetched scope document is not a JSON object
    Decode {
        scope: String,
        source: serde_json::Error,
    },
    /// A scope document could not be serialized
    Encode(serde_json::Error),
}

impl fmt::Display for ContextError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Validation(msg) => write!(f, "Validation error: {msg}"),
            Self::Store(err) => write!(f, "Store error: {err}"),
            Self::Decode { scope, source } => {
                write!(f, "Invalid document for scope {scope}: {source}")
            }
            Self::Encode(err) => write!(f, "Encode error: {err}"),
        }
    }
}

impl std::error::Error for ContextError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Store(err) => Some(err),
            Self::Decode { source, .. } => Some(source),
            Self::Encode(err) => Some(err),
            Self::Validation(_) => None,
        }
    }
}

impl From<StoreError> for ContextError {
    fn from(err: StoreError) -> Self {
        Self::Store(err)
    }
}

pub type Result<T> = std::result::Result<T, ContextError>;
