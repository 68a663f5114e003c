//! Context store settings

use crate::error::{ContextError, Result};
use serde::{Deserialize, Serialize};
use std::env;

const DEFAULT_FLUSH_INTERVAL: u64 = 5;

/// Settings for a [`ContextStore`](crate::ContextStore)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextSettings {
    #[serde(default)]
    pub bucket: String,
    #[serde(default)]
    pub prefix: String,
    /// Seconds between flushes. Accepted and kept, but writes are never batched.
    #[serde(default = "default_flush_interval", rename = "flushInterval", alias = "flush_interval")]
    pub flush_interval: u64,
}

fn default_flush_interval() -> u64 {
    DEFAULT_FLUSH_INTERVAL
}

impl ContextSettings {
    pub fn new(bucket: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            prefix: String::new(),
            flush_interval: DEFAULT_FLUSH_INTERVAL,
        }
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    pub fn with_flush_interval(mut self, secs: u64) -> Self {
        self.flush_interval = secs;
        self
    }

    /// Parse settings from environment variables
    pub fn from_env() -> Self {
        let bucket = env::var("CONTEXT_BUCKET").unwrap_or_default();

        let prefix = env::var("CONTEXT_PREFIX").unwrap_or_default();

        let flush_interval = env::var("CONTEXT_FLUSH_INTERVAL")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_FLUSH_INTERVAL);

        Self {
            bucket,
            prefix,
            flush_interval,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.bucket.trim().is_empty() {
            return Err(ContextError::Validation(
                "bucket name is required".to_string(),
            ));
        }
        Ok(())
    }

    /// Object path holding the document for `scope`: `{prefix}/context/{scope}.json`.
    ///
    /// The prefix is used verbatim, so an empty prefix yields `/context/{scope}.json`.
    pub fn document_path(&self, scope: &str) -> String {
        format!("{}/context/{}.json", self.prefix, scope)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = ContextSettings::new("test-bucket");
        assert_eq!(settings.bucket, "test-bucket");
        assert_eq!(settings.prefix, "");
        assert_eq!(settings.flush_interval, 5);
    }

    #[test]
    fn test_empty_bucket_rejected() {
        let err = ContextSettings::new("").validate().unwrap_err();
        assert!(matches!(err, ContextError::Validation(_)));
        assert!(ContextSettings::new("   ").validate().is_err());
        assert!(ContextSettings::new("b").validate().is_ok());
    }

    #[test]
    fn test_document_path() {
        let settings = ContextSettings::new("b").with_prefix("test-prefix");
        assert_eq!(
            settings.document_path("test-scope"),
            "test-prefix/context/test-scope.json"
        );

        let settings = ContextSettings::new("b").with_prefix("nested/prefix/");
        assert_eq!(
            settings.document_path("s"),
            "nested/prefix//context/s.json"
        );

        let settings = ContextSettings::new("b");
        assert_eq!(settings.document_path("s"), "/context/s.json");
    }

    #[test]
    fn test_deserialize_with_defaults() {
        let settings: ContextSettings = serde_json::from_str(r#"{"bucket":"b"}"#).unwrap();
        assert_eq!(settings, ContextSettings::new("b"));

        let settings: ContextSettings =
            serde_json::from_str(r#"{"bucket":"b","prefix":"p","flushInterval":30}"#).unwrap();
        assert_eq!(settings.prefix, "p");
        assert_eq!(settings.flush_interval, 30);
    }

    #[test]
    fn test_missing_bucket_fails_validation() {
        let settings: ContextSettings = serde_json::from_str("{}").unwrap();
        assert!(settings.validate().is_err());
    }
}
