//! Command line arguments

use crate::error::{CliError, Result};
use clap::{Parser, Subcommand, ValueEnum};
use context_store::{
    ContextSettings, FsObjectStore, HttpObjectStore, ObjectStore, S3ObjectStore, S3Options,
};
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Debug, Parser)]
#[command(name = "context-store", version, about = "Read and write scoped context documents")]
pub struct Cli {
    /// Bucket holding the context documents (defaults to CONTEXT_BUCKET)
    #[arg(long, global = true)]
    pub bucket: Option<String>,

    /// Path prefix in front of `context/` (defaults to CONTEXT_PREFIX)
    #[arg(long, global = true)]
    pub prefix: Option<String>,

    #[arg(long, global = true, env = "CONTEXT_BACKEND", value_enum, default_value_t = Backend::Fs)]
    pub backend: Backend,

    /// Root directory for the filesystem backend
    #[arg(long, global = true, env = "CONTEXT_ROOT", default_value = "./data")]
    pub root: PathBuf,

    /// Base URL for the HTTP backend, or a custom S3 endpoint
    #[arg(long, global = true, env = "CONTEXT_ENDPOINT")]
    pub endpoint: Option<String>,

    /// AWS region for the S3 backend
    #[arg(long, global = true, env = "CONTEXT_S3_REGION")]
    pub region: Option<String>,

    /// Address S3 buckets by path instead of virtual host
    #[arg(long, global = true)]
    pub force_path_style: bool,

    /// Bearer token for the HTTP backend
    #[arg(long, global = true, env = "CONTEXT_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Backend {
    Fs,
    Http,
    S3,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Print the values of KEYS in SCOPE as a JSON object
    Get {
        scope: String,
        #[arg(required = true)]
        keys: Vec<String>,
    },
    /// Write KEY=VALUE pairs into SCOPE; VALUE is JSON, or a plain string
    Set {
        scope: String,
        #[arg(required = true, value_parser = parse_pair)]
        pairs: Vec<(String, Value)>,
    },
    /// List the keys held by SCOPE
    Keys { scope: String },
    /// Delete SCOPE
    Delete { scope: String },
    /// Delete each SCOPE in order, stopping at the first failure
    Clean {
        #[arg(required = true)]
        scopes: Vec<String>,
    },
}

impl Cli {
    /// Settings from the environment, overridden by flags
    pub fn settings(&self) -> ContextSettings {
        let mut settings = ContextSettings::from_env();
        if let Some(bucket) = &self.bucket {
            settings.bucket = bucket.clone();
        }
        if let Some(prefix) = &self.prefix {
            settings.prefix = prefix.clone();
        }
        settings
    }

    /// S3 options from the environment, overridden by flags
    pub fn s3_options(&self) -> S3Options {
        let mut options = S3Options::from_env();
        if let Some(region) = &self.region {
            options.region = Some(region.clone());
        }
        if let Some(endpoint) = &self.endpoint {
            options.endpoint = Some(endpoint.clone());
        }
        options.force_path_style |= self.force_path_style;
        options
    }

    pub async fn object_store(&self) -> Result<Arc<dyn ObjectStore>> {
        match self.backend {
            Backend::Fs => Ok(Arc::new(FsObjectStore::new(&self.root))),
            Backend::Http => {
                let endpoint = self.endpoint.as_deref().ok_or_else(|| {
                    CliError::Config("--endpoint is required for the http backend".to_string())
                })?;
                let mut store = HttpObjectStore::new(endpoint)?;
                if let Some(token) = &self.token {
                    store = store.with_token(token);
                }
                Ok(Arc::new(store))
            }
            Backend::S3 => Ok(Arc::new(S3ObjectStore::connect(self.s3_options()).await)),
        }
    }
}

/// Parse `KEY=VALUE`, reading VALUE as JSON and falling back to a string
pub fn parse_pair(arg: &str) -> std::result::Result<(String, Value), String> {
    let (key, raw) = arg
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got {arg:?}"))?;
    if key.is_empty() {
        return Err(format!("empty key in {arg:?}"));
    }
    Ok((key.to_string(), parse_value(raw)))
}

pub fn parse_value(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use serde_json::json;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_value() {
        assert_eq!(parse_value("42"), json!(42));
        assert_eq!(parse_value("true"), json!(true));
        assert_eq!(parse_value(r#"{"a":[1]}"#), json!({"a": [1]}));
        assert_eq!(parse_value(r#""quoted""#), json!("quoted"));
        assert_eq!(parse_value("plain text"), json!("plain text"));
    }

    #[test]
    fn test_parse_pair() {
        assert_eq!(parse_pair("k1=v1").unwrap(), ("k1".to_string(), json!("v1")));
        assert_eq!(parse_pair("n=a=b").unwrap(), ("n".to_string(), json!("a=b")));
        assert!(parse_pair("novalue").is_err());
        assert!(parse_pair("=v").is_err());
    }

    #[test]
    fn test_parse_set_command() {
        let cli = Cli::try_parse_from([
            "context-store",
            "--bucket",
            "b",
            "--prefix",
            "p",
            "set",
            "s",
            "k1=v1",
            "k2=2",
        ])
        .unwrap();

        let settings = cli.settings();
        assert_eq!(settings.bucket, "b");
        assert_eq!(settings.prefix, "p");
        match cli.command {
            Command::Set { scope, pairs } => {
                assert_eq!(scope, "s");
                assert_eq!(
                    pairs,
                    vec![("k1".to_string(), json!("v1")), ("k2".to_string(), json!(2))]
                );
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    fn create_test_cli(backend: Backend) -> Cli {
        Cli {
            bucket: None,
            prefix: None,
            backend,
            root: PathBuf::from("./data"),
            endpoint: None,
            region: None,
            force_path_style: false,
            token: None,
            command: Command::Keys {
                scope: "s".to_string(),
            },
        }
    }

    #[tokio::test]
    async fn test_http_backend_requires_endpoint() {
        let cli = create_test_cli(Backend::Http);
        assert!(matches!(cli.object_store().await, Err(CliError::Config(_))));

        let mut cli = create_test_cli(Backend::Http);
        cli.endpoint = Some("http://localhost:9000".to_string());
        assert!(cli.object_store().await.is_ok());
    }

    #[test]
    fn test_parse_s3_backend() {
        let cli = Cli::try_parse_from([
            "context-store",
            "--backend",
            "s3",
            "--region",
            "eu-west-1",
            "--endpoint",
            "http://localhost:9000",
            "--force-path-style",
            "keys",
            "s",
        ])
        .unwrap();
        assert_eq!(cli.backend, Backend::S3);

        let options = cli.s3_options();
        assert_eq!(options.region.as_deref(), Some("eu-west-1"));
        assert_eq!(options.endpoint.as_deref(), Some("http://localhost:9000"));
        assert!(options.force_path_style);
    }
}
