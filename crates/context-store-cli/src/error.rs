//! Error types for the context store CLI

use std::fmt;

#[derive(Debug)]
pub enum CliError {
    Context(context_store::ContextError),
    Store(context_store::StoreError),
    Json(serde_json::Error),
    Config(String),
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::Context(err) => write!(f, "{}", err),
            CliError::Store(err) => write!(f, "Store error: {}", err),
            CliError::Json(err) => write!(f, "JSON error: {}", err),
            CliError::Config(msg) => write!(f, "Configuration error: {}", msg),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::Context(err) => Some(err),
            CliError::Store(err) => Some(err),
            CliError::Json(err) => Some(err),
            CliError::Config(_) => None,
        }
    }
}

impl From<context_store::ContextError> for CliError {
    fn from(err: context_store::ContextError) -> Self {
        CliError::Context(err)
    }
}

impl From<context_store::StoreError> for CliError {
    fn from(err: context_store::StoreError) -> Self {
        CliError::Store(err)
    }
}

impl From<serde_json::Error> for CliError {
    fn from(err: serde_json::Error) -> Self {
        CliError::Json(err)
    }
}

impl From<tracing_subscriber::filter::ParseError> for CliError {
    fn from(err: tracing_subscriber::filter::ParseError) -> Self {
        CliError::Config(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, CliError>;
