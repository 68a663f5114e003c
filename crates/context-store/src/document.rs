//! Scope document encoding

use crate::error::{ContextError, Result};
use serde::de::Error as _;
use serde_json::{Map, Value};

/// Materialized key/value pairs of one scope
pub type ScopeDocument = Map<String, Value>;

pub const DOCUMENT_CONTENT_TYPE: &str = "application/json";

/// Decode a stored blob into a scope document.
///
/// A JSON `null` body decodes to an empty document; any other non-object is
/// rejected so the resident document is always a mapping.
pub fn decode_document(scope: &str, bytes: &[u8]) -> Result<ScopeDocument> {
    let decode_error = |source: serde_json::Error| ContextError::Decode {
        scope: scope.to_string(),
        source,
    };

    match serde_json::from_slice::<Value>(bytes).map_err(decode_error)? {
        Value::Object(map) => Ok(map),
        Value::Null => Ok(ScopeDocument::new()),
        other => Err(decode_error(serde_json::Error::custom(format!(
            "expected a JSON object, found {}",
            kind_name(&other)
        )))),
    }
}

pub fn encode_document(document: &ScopeDocument) -> Result<Vec<u8>> {
    serde_json::to_vec(document).map_err(ContextError::Encode)
}

fn kind_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
