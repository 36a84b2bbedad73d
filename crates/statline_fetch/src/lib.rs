//! Document retrieval for Statline workers.
//!
//! The worker only needs one capability from the document side: given a
//! storage path, produce the raw bytes or fail with a retrieval error. The
//! [`HttpStore`] implementation talks to a bearer-token object storage API;
//! [`MemoryStore`] is the in-process fake for tests.

use async_trait::async_trait;
use std::collections::HashMap;
use thiserror::Error;
use tracing::debug;

/// Document retrieval errors. Any of these fails the job carrying the
/// error's Display text as the stored cause.
#[derive(Debug, Error)]
pub enum RetrievalError {
    /// Transport-level failure (connect, TLS, timeout).
    #[error("Retrieval failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The storage service answered with a non-success status.
    #[error("Retrieval failed for '{path}': HTTP {status}")]
    Status { path: String, status: u16 },

    /// No document at that path.
    #[error("Document not found: {0}")]
    NotFound(String),
}

/// Capability to fetch a stored document's bytes.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn fetch(&self, storage_path: &str) -> Result<Vec<u8>, RetrievalError>;
}

/// Object storage over HTTP with bearer-token auth
/// (`{endpoint}/storage/v1/object/{bucket}/{path}`).
pub struct HttpStore {
    client: reqwest::Client,
    endpoint: String,
    bucket: String,
    service_key: String,
}

impl HttpStore {
    pub fn new(
        endpoint: impl Into<String>,
        bucket: impl Into<String>,
        service_key: impl Into<String>,
    ) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            bucket: bucket.into(),
            service_key: service_key.into(),
        }
    }

    /// Object URL for a storage path. Paths that already carry the bucket
    /// prefix are used as-is.
    fn object_url(&self, storage_path: &str) -> String {
        if storage_path.starts_with(&self.bucket) {
            format!("{}/storage/v1/object/{}", self.endpoint, storage_path)
        } else {
            format!(
                "{}/storage/v1/object/{}/{}",
                self.endpoint, self.bucket, storage_path
            )
        }
    }
}

#[async_trait]
impl DocumentStore for HttpStore {
    async fn fetch(&self, storage_path: &str) -> Result<Vec<u8>, RetrievalError> {
        let url = self.object_url(storage_path);
        debug!(%url, "Fetching document");

        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.service_key)
            .header("apikey", &self.service_key)
            .send()
            .await?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(RetrievalError::NotFound(storage_path.to_string()));
        }
        if !status.is_success() {
            return Err(RetrievalError::Status {
                path: storage_path.to_string(),
                status: status.as_u16(),
            });
        }

        Ok(response.bytes().await?.to_vec())
    }
}

/// In-memory store for tests: path -> bytes, missing paths are NotFound.
#[derive(Debug, Default)]
pub struct MemoryStore {
    objects: HashMap<String, Vec<u8>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, path: impl Into<String>, bytes: Vec<u8>) {
        self.objects.insert(path.into(), bytes);
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn fetch(&self, storage_path: &str) -> Result<Vec<u8>, RetrievalError> {
        self.objects
            .get(storage_path)
            .cloned()
            .ok_or_else(|| RetrievalError::NotFound(storage_path.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn object_url_handles_bucket_prefixed_paths() {
        let store = HttpStore::new("https://storage.example.com/", "filings", "key");

        assert_eq!(
            store.object_url("acme/fy2025.pdf"),
            "https://storage.example.com/storage/v1/object/filings/acme/fy2025.pdf"
        );
        assert_eq!(
            store.object_url("filings/acme/fy2025.pdf"),
            "https://storage.example.com/storage/v1/object/filings/acme/fy2025.pdf"
        );
    }

    #[tokio::test]
    async fn memory_store_round_trip_and_not_found() {
        let mut store = MemoryStore::new();
        store.insert("a.pdf", vec![1, 2, 3]);

        assert_eq!(store.fetch("a.pdf").await.unwrap(), vec![1, 2, 3]);

        let err = store.fetch("missing.pdf").await.unwrap_err();
        assert!(err.to_string().contains("not found"));
        assert!(err.to_string().contains("missing.pdf"));
    }
}
