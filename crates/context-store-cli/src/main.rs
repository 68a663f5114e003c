//! Context Store CLI
//!
//! Reads and writes scoped context documents held in a filesystem, HTTP or
//! S3 object store. Results are printed to stdout as JSON.

mod cli;
mod error;

use crate::cli::{Cli, Command};
use crate::error::Result;
use clap::Parser;
use context_store::ContextStore;
use serde_json::{Map, Value};
use tracing::{debug, info};
use tracing_subscriber::{prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    let env_filter = log_filter()?;

    // Use JSON format for GCP Cloud Logging when LOG_FORMAT=json
    if std::env::var("LOG_FORMAT")
        .map(|v| v == "json")
        .unwrap_or(false)
    {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_stackdriver::layer())
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_writer(std::io::stderr)
            .init();
    };

    let cli = Cli::parse();
    let settings = cli.settings();
    debug!(bucket = %settings.bucket, prefix = %settings.prefix, backend = ?cli.backend, "Loaded settings");

    let store = ContextStore::new(settings, cli.object_store().await?)?;
    store.open().await?;

    let output = run(&store, cli.command).await?;
    if let Some(output) = output {
        println!("{}", serde_json::to_string_pretty(&output)?);
    }

    store.close().await;
    Ok(())
}

fn log_filter() -> Result<EnvFilter> {
    Ok(EnvFilter::from_default_env()
        .add_directive("context_store=info".parse()?)
        .add_directive("context_store_cli=info".parse()?))
}

async fn run(store: &ContextStore, command: Command) -> Result<Option<Value>> {
    match command {
        Command::Get { scope, keys } => {
            let values = store.get(&scope, &keys).await?;
            let found: Map<String, Value> = keys
                .into_iter()
                .zip(values)
                .filter_map(|(key, value)| value.map(|v| (key, v)))
                .collect();
            Ok(Some(Value::Object(found)))
        }
        Command::Set { scope, pairs } => {
            let (keys, values): (Vec<String>, Vec<Value>) = pairs.into_iter().unzip();
            store.set(&scope, &keys, values).await?;
            info!(scope = %scope, keys = keys.len(), "Scope updated");
            Ok(None)
        }
        Command::Keys { scope } => {
            let keys = store.keys(&scope).await?;
            Ok(Some(Value::from(keys)))
        }
        Command::Delete { scope } => {
            store.delete(&scope).await?;
            info!(scope = %scope, "Scope deleted");
            Ok(None)
        }
        Command::Clean { scopes } => {
            store.clean(&scopes).await?;
            info!(scopes = scopes.len(), "Scopes cleaned");
            Ok(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use context_store::{ContextSettings, MemoryObjectStore};
    use serde_json::json;
    use std::sync::Arc;

    fn create_test_store() -> ContextStore {
        let settings = ContextSettings::new("b").with_prefix("p");
        ContextStore::new(settings, Arc::new(MemoryObjectStore::new())).unwrap()
    }

    #[test]
    fn test_log_filter_targets_library_crate() {
        let filter = log_filter().unwrap().to_string();
        assert!(filter.contains("context_store=info"));
        assert!(filter.contains("context_store_cli=info"));
    }

    #[tokio::test]
    async fn test_set_then_get() {
        let store = create_test_store();

        let output = run(
            &store,
            Command::Set {
                scope: "s".to_string(),
                pairs: vec![("k1".to_string(), json!("v1")), ("k2".to_string(), json!(2))],
            },
        )
        .await
        .unwrap();
        assert!(output.is_none());

        let output = run(
            &store,
            Command::Get {
                scope: "s".to_string(),
                keys: vec!["k1".to_string(), "missing".to_string()],
            },
        )
        .await
        .unwrap();
        assert_eq!(output, Some(json!({"k1": "v1"})));
    }

    #[tokio::test]
    async fn test_keys_and_clean() {
        let store = create_test_store();
        store.set_one("a", "x", json!(1)).await.unwrap();

        let output = run(&store, Command::Keys { scope: "a".to_string() })
            .await
            .unwrap();
        assert_eq!(output, Some(json!(["x"])));

        run(
            &store,
            Command::Clean {
                scopes: vec!["a".to_string(), "b".to_string()],
            },
        )
        .await
        .unwrap();

        let output = run(&store, Command::Keys { scope: "a".to_string() })
            .await
            .unwrap();
        assert_eq!(output, Some(json!([])));
    }
}
