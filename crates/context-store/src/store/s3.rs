//! Amazon S3 (and S3-compatible) object store

use super::{ObjectStore, StoreResult};
use crate::error::{StoreError, StoreErrorKind};
use async_trait::async_trait;
use aws_sdk_s3::config::http::HttpResponse;
use aws_sdk_s3::config::{Credentials, Region};
use aws_sdk_s3::error::{DisplayErrorContext, SdkError};
use aws_sdk_s3::operation::get_object::GetObjectError;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use std::env;
use tracing::{debug, info, warn};

/// Connection options for [`S3ObjectStore`].
///
/// Anything left unset falls back to the AWS default provider chain
/// (`AWS_REGION`, `AWS_ACCESS_KEY_ID`, profiles, instance metadata, ...).
#[derive(Debug, Clone, Default)]
pub struct S3Options {
    pub region: Option<String>,
    /// Custom endpoint for S3-compatible services such as MinIO
    pub endpoint: Option<String>,
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
    pub session_token: Option<String>,
    pub force_path_style: bool,
}

impl S3Options {
    /// Parse options from environment variables
    pub fn from_env() -> Self {
        Self {
            region: env::var("CONTEXT_S3_REGION").ok(),
            endpoint: env::var("CONTEXT_S3_ENDPOINT").ok(),
            access_key_id: env::var("CONTEXT_S3_ACCESS_KEY_ID").ok(),
            secret_access_key: env::var("CONTEXT_S3_SECRET_ACCESS_KEY").ok(),
            session_token: env::var("CONTEXT_S3_SESSION_TOKEN").ok(),
            force_path_style: env::var("CONTEXT_S3_FORCE_PATH_STYLE")
                .map(|v| v == "true" || v == "1")
                .unwrap_or(false),
        }
    }
}

/// Object store backed by the AWS S3 SDK
pub struct S3ObjectStore {
    client: Client,
}

impl S3ObjectStore {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Build a client from `options`, resolving the rest from the AWS environment
    pub async fn connect(options: S3Options) -> Self {
        let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest());
        if let Some(region) = options.region.clone() {
            loader = loader.region(Region::new(region));
        }
        if let Some(endpoint) = &options.endpoint {
            loader = loader.endpoint_url(endpoint);
        }
        if let (Some(key), Some(secret)) = (&options.access_key_id, &options.secret_access_key) {
            loader = loader.credentials_provider(Credentials::new(
                key,
                secret,
                options.session_token.clone(),
                None,
                "context-store",
            ));
        }

        let shared = loader.load().await;
        let config = aws_sdk_s3::config::Builder::from(&shared)
            .force_path_style(options.force_path_style)
            .build();

        info!(
            region = ?shared.region(),
            endpoint = ?options.endpoint,
            "S3 object store configured"
        );
        Self::new(Client::from_conf(config))
    }
}

/// Classify an HTTP status from S3
fn kind_for_status(status: Option<u16>) -> StoreErrorKind {
    match status {
        Some(404) => StoreErrorKind::NotFound,
        Some(401) | Some(403) => StoreErrorKind::PermissionDenied,
        _ => StoreErrorKind::Other,
    }
}

/// Map an SDK failure to a store error. `missing_key` is set when the
/// operation's modeled error already says the key does not exist.
fn sdk_error<E>(err: SdkError<E, HttpResponse>, missing_key: bool, path: &str) -> StoreError
where
    E: std::error::Error + 'static,
{
    let kind = if missing_key {
        StoreErrorKind::NotFound
    } else {
        match &err {
            SdkError::DispatchFailure(_) | SdkError::TimeoutError(_) => StoreErrorKind::Transport,
            _ => kind_for_status(err.raw_response().map(|r| r.status().as_u16())),
        }
    };

    let message = format!("{} ({path})", DisplayErrorContext(&err));
    if kind != StoreErrorKind::NotFound {
        warn!(path, error = %message, "S3 request failed");
    }
    StoreError::new(kind, message)
}

fn get_object_error(err: SdkError<GetObjectError, HttpResponse>, path: &str) -> StoreError {
    let missing_key = matches!(err.as_service_error(), Some(GetObjectError::NoSuchKey(_)));
    sdk_error(err, missing_key, path)
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn fetch(&self, bucket: &str, path: &str) -> StoreResult<Vec<u8>> {
        debug!(bucket, path, "Fetching S3 object");
        let output = self
            .client
            .get_object()
            .bucket(bucket)
            .key(path)
            .send()
            .await
            .map_err(|err| get_object_error(err, path))?;

        let data = output
            .body
            .collect()
            .await
            .map_err(|e| StoreError::new(StoreErrorKind::Transport, e.to_string()))?;
        Ok(data.into_bytes().to_vec())
    }

    async fn store(
        &self,
        bucket: &str,
        path: &str,
        body: Vec<u8>,
        content_type: &str,
    ) -> StoreResult<()> {
        debug!(bucket, path, size = body.len(), "Putting S3 object");
        self.client
            .put_object()
            .bucket(bucket)
            .key(path)
            .content_type(content_type)
            .body(ByteStream::from(body))
            .send()
            .await
            .map_err(|err| sdk_error(err, false, path))?;
        Ok(())
    }

    async fn remove(&self, bucket: &str, path: &str) -> StoreResult<()> {
        debug!(bucket, path, "Deleting S3 object");
        self.client
            .delete_object()
            .bucket(bucket)
            .key(path)
            .send()
            .await
            .map_err(|err| sdk_error(err, false, path))?;
        Ok(())
    }
}
