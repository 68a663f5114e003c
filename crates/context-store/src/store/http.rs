//! Object store reached over HTTP with S3-style path addressing

use super::{ObjectStore, StoreResult};
use crate::error::{StoreError, StoreErrorKind};
use async_trait::async_trait;
use reqwest::{header, Client, Response, StatusCode};
use std::time::Duration;
use tracing::{debug, warn};

const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Object store speaking plain `GET`/`PUT`/`DELETE` on `{endpoint}/{bucket}/{path}`
pub struct HttpObjectStore {
    client: Client,
    endpoint: String,
    token: Option<String>,
}

impl HttpObjectStore {
    pub fn new(endpoint: &str) -> StoreResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            token: None,
        })
    }

    /// Send `Authorization: Bearer {token}` with every request
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    fn object_url(&self, bucket: &str, path: &str) -> String {
        let key = path
            .trim_start_matches('/')
            .split('/')
            .map(|segment| match segment {
                // Dot segments would be collapsed by URL normalization
                "." => "%2E".to_string(),
                ".." => "%2E%2E".to_string(),
                _ => urlencoding::encode(segment).into_owned(),
            })
            .collect::<Vec<_>>()
            .join("/");
        format!("{}/{}/{}", self.endpoint, urlencoding::encode(bucket), key)
    }

    fn request(&self, method: reqwest::Method, url: &str) -> reqwest::RequestBuilder {
        let builder = self.client.request(method, url);
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }
}

/// Map a non-success response to a classified store error
fn status_error(response: &Response, url: &str) -> StoreError {
    let status = response.status();
    let kind = match status {
        StatusCode::NOT_FOUND => StoreErrorKind::NotFound,
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => StoreErrorKind::PermissionDenied,
        _ => StoreErrorKind::Other,
    };
    if kind != StoreErrorKind::NotFound {
        warn!(status = %status, url = %url, "Object store request failed");
    }
    StoreError::new(kind, format!("object store returned status {status} for {url}"))
}

#[async_trait]
impl ObjectStore for HttpObjectStore {
    async fn fetch(&self, bucket: &str, path: &str) -> StoreResult<Vec<u8>> {
        let url = self.object_url(bucket, path);
        debug!(url = %url, "Fetching object");

        let response = self.request(reqwest::Method::GET, &url).send().await?;
        if !response.status().is_success() {
            return Err(status_error(&response, &url));
        }

        Ok(response.bytes().await?.to_vec())
    }

    async fn store(
        &self,
        bucket: &str,
        path: &str,
        body: Vec<u8>,
        content_type: &str,
    ) -> StoreResult<()> {
        let url = self.object_url(bucket, path);
        debug!(url = %url, size = body.len(), "Storing object");

        let response = self
            .request(reqwest::Method::PUT, &url)
            .header(header::CONTENT_TYPE, content_type)
            .body(body)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(status_error(&response, &url));
        }
        Ok(())
    }

    async fn remove(&self, bucket: &str, path: &str) -> StoreResult<()> {
        let url = self.object_url(bucket, path);
        debug!(url = %url, "Removing object");

        let response = self.request(reqwest::Method::DELETE, &url).send().await?;
        if !response.status().is_success() {
            return Err(status_error(&response, &url));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Bytes,
        extract::{Path, State},
        http::{HeaderMap, StatusCode as AxumStatus},
        routing::get,
        Router,
    };
    use std::collections::HashMap;
    use std::sync::Arc;
    use tokio::sync::RwLock;

    type Objects = Arc<RwLock<HashMap<String, (Vec<u8>, String)>>>;

    async fn get_object(
        State(objects): State<Objects>,
        Path(key): Path<String>,
    ) -> Result<Vec<u8>, AxumStatus> {
        if key.starts_with("private/") {
            return Err(AxumStatus::FORBIDDEN);
        }
        objects
            .read()
            .await
            .get(&key)
            .map(|(body, _)| body.clone())
            .ok_or(AxumStatus::NOT_FOUND)
    }

    async fn put_object(
        State(objects): State<Objects>,
        Path(key): Path<String>,
        headers: HeaderMap,
        body: Bytes,
    ) -> AxumStatus {
        let content_type = headers
            .get("content-type")
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        objects
            .write()
            .await
            .insert(key, (body.to_vec(), content_type));
        AxumStatus::OK
    }

    async fn delete_object(State(objects): State<Objects>, Path(key): Path<String>) -> AxumStatus {
        match objects.write().await.remove(&key) {
            Some(_) => AxumStatus::NO_CONTENT,
            None => AxumStatus::NOT_FOUND,
        }
    }

    /// Serve a throwaway object server on a random local port
    async fn spawn_server() -> (String, Objects) {
        let objects: Objects = Arc::new(RwLock::new(HashMap::new()));
        let router = Router::new()
            .route(
                "/{*key}",
                get(get_object).put(put_object).delete(delete_object),
            )
            .with_state(objects.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });

        (format!("http://{}", addr), objects)
    }

    #[test]
    fn test_object_url() {
        let store = HttpObjectStore::new("http://localhost:9000/").unwrap();
        assert_eq!(
            store.object_url("b", "p/context/my scope.json"),
            "http://localhost:9000/b/p/context/my%20scope.json"
        );
        assert_eq!(
            store.object_url("b", "/context/../s.json"),
            "http://localhost:9000/b/context/%2E%2E/s.json"
        );
    }

    #[tokio::test]
    async fn test_store_fetch_remove() {
        let (endpoint, objects) = spawn_server().await;
        let store = HttpObjectStore::new(&endpoint).unwrap();

        store
            .store("b", "p/context/s.json", b"{\"k\":1}".to_vec(), "application/json")
            .await
            .unwrap();
        {
            let objects = objects.read().await;
            let (body, content_type) = objects.get("b/p/context/s.json").unwrap();
            assert_eq!(body, b"{\"k\":1}");
            assert_eq!(content_type, "application/json");
        }

        let data = store.fetch("b", "p/context/s.json").await.unwrap();
        assert_eq!(data, b"{\"k\":1}");

        store.remove("b", "p/context/s.json").await.unwrap();
        assert!(objects.read().await.is_empty());
    }

    #[tokio::test]
    async fn test_status_classification() {
        let (endpoint, _objects) = spawn_server().await;
        let store = HttpObjectStore::new(&endpoint).unwrap();

        let err = store.fetch("b", "context/missing.json").await.unwrap_err();
        assert!(err.is_not_found());

        let err = store.remove("b", "context/missing.json").await.unwrap_err();
        assert!(err.is_not_found());

        let err = store.fetch("private", "context/s.json").await.unwrap_err();
        assert_eq!(err.kind(), StoreErrorKind::PermissionDenied);
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_transport_error() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let store = HttpObjectStore::new(&format!("http://{}", addr)).unwrap();
        let err = store.fetch("b", "context/s.json").await.unwrap_err();
        assert_eq!(err.kind(), StoreErrorKind::Transport);
    }
}
