//! Object storage behind a trait seam.
//!
//! [`S3Storage`] talks to any S3-compatible bucket through the `object_store`
//! crate; [`MemoryStorage`] backs tests and local development with the same
//! crate's in-memory implementation.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use futures::TryStreamExt;
use object_store::aws::{AmazonS3, AmazonS3Builder};
use object_store::memory::InMemory;
use object_store::path::Path as ObjectPath;
use object_store::signer::Signer;
use object_store::{Attribute, Attributes, ObjectStore, PutOptions, PutPayload};
use thiserror::Error;
use url::Url;
use uuid::Uuid;

use crate::config::StorageConfig;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Object not found: {0}")]
    NotFound(String),

    #[error("Storage backend error: {0}")]
    Backend(String),

    #[error("Invalid storage configuration: {0}")]
    Config(String),
}

impl StorageError {
    fn wrap(key: &str, err: object_store::Error) -> Self {
        match err {
            object_store::Error::NotFound { .. } => StorageError::NotFound(key.to_string()),
            other => StorageError::Backend(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignedUrlMethod {
    Get,
    Put,
}

/// A file received through a multipart request, held in memory.
#[derive(Debug, Clone)]
pub struct UploadFile {
    pub file_name: String,
    pub content_type: Option<String>,
    pub data: Bytes,
}

#[async_trait]
pub trait FileStorage: Send + Sync {
    /// Uploads under `key` and returns the public URL of the stored object.
    async fn upload(
        &self,
        key: &str,
        data: Bytes,
        content_type: Option<&str>,
    ) -> Result<String, StorageError>;

    async fn delete(&self, key: &str) -> Result<(), StorageError>;

    async fn signed_url(
        &self,
        key: &str,
        method: SignedUrlMethod,
        expires_in: Duration,
    ) -> Result<String, StorageError>;

    fn public_url(&self, key: &str) -> String;
}

/// S3-compatible backend.
pub struct S3Storage {
    store: AmazonS3,
    bucket: String,
    region: String,
    endpoint: Option<String>,
}

impl S3Storage {
    pub fn from_config(config: &StorageConfig) -> Result<Self, StorageError> {
        let mut builder = AmazonS3Builder::new()
            .with_bucket_name(&config.bucket)
            .with_region(&config.region);

        if let Some(access_key) = &config.access_key {
            builder = builder.with_access_key_id(access_key);
        }
        if let Some(secret_key) = &config.secret_key {
            builder = builder.with_secret_access_key(secret_key);
        }
        if let Some(endpoint) = &config.endpoint {
            builder = builder.with_endpoint(endpoint);
            if endpoint.starts_with("http://") {
                builder = builder.with_allow_http(true);
            }
        }

        let store = builder
            .build()
            .map_err(|e| StorageError::Config(e.to_string()))?;

        Ok(Self {
            store,
            bucket: config.bucket.clone(),
            region: config.region.clone(),
            endpoint: config.endpoint.clone(),
        })
    }
}

#[async_trait]
impl FileStorage for S3Storage {
    async fn upload(
        &self,
        key: &str,
        data: Bytes,
        content_type: Option<&str>,
    ) -> Result<String, StorageError> {
        let path = ObjectPath::from(key);
        let payload = PutPayload::from_bytes(data);

        let mut attributes = Attributes::new();
        if let Some(ct) = content_type {
            attributes.insert(Attribute::ContentType, ct.to_string().into());
        }
        let opts = PutOptions {
            attributes,
            ..Default::default()
        };

        self.store
            .put_opts(&path, payload, opts)
            .await
            .map_err(|e| StorageError::wrap(key, e))?;

        Ok(self.public_url(key))
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        let path = ObjectPath::from(key);
        self.store
            .delete(&path)
            .await
            .map_err(|e| StorageError::wrap(key, e))
    }

    async fn signed_url(
        &self,
        key: &str,
        method: SignedUrlMethod,
        expires_in: Duration,
    ) -> Result<String, StorageError> {
        let path = ObjectPath::from(key);
        let http_method = match method {
            SignedUrlMethod::Get => http::Method::GET,
            SignedUrlMethod::Put => http::Method::PUT,
        };
        let url = self
            .store
            .signed_url(http_method, &path, expires_in)
            .await
            .map_err(|e| StorageError::wrap(key, e))?;
        Ok(url.to_string())
    }

    fn public_url(&self, key: &str) -> String {
        match &self.endpoint {
            Some(endpoint) => format!("{}/{}/{}", endpoint.trim_end_matches('/'), self.bucket, key),
            None => format!(
                "https://{}.s3.{}.amazonaws.com/{}",
                self.bucket, self.region, key
            ),
        }
    }
}

/// In-memory backend for tests and local runs without a bucket.
pub struct MemoryStorage {
    store: InMemory,
    base_url: String,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self {
            store: InMemory::new(),
            base_url: "https://storage.test".to_string(),
        }
    }

    pub async fn contains(&self, key: &str) -> bool {
        self.store.head(&ObjectPath::from(key)).await.is_ok()
    }

    pub async fn keys(&self) -> Vec<String> {
        self.store
            .list(None)
            .map_ok(|meta| meta.location.to_string())
            .try_collect()
            .await
            .unwrap_or_default()
    }
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl FileStorage for MemoryStorage {
    async fn upload(
        &self,
        key: &str,
        data: Bytes,
        _content_type: Option<&str>,
    ) -> Result<String, StorageError> {
        let path = ObjectPath::from(key);
        self.store
            .put(&path, PutPayload::from_bytes(data))
            .await
            .map_err(|e| StorageError::wrap(key, e))?;
        Ok(self.public_url(key))
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        let path = ObjectPath::from(key);
        self.store
            .delete(&path)
            .await
            .map_err(|e| StorageError::wrap(key, e))
    }

    async fn signed_url(
        &self,
        key: &str,
        _method: SignedUrlMethod,
        expires_in: Duration,
    ) -> Result<String, StorageError> {
        Ok(format!(
            "{}/{}?expires={}",
            self.base_url,
            key,
            expires_in.as_secs()
        ))
    }

    fn public_url(&self, key: &str) -> String {
        format!("{}/{}", self.base_url, key)
    }
}

/// `{timestamp}-{random}.{ext}`, optionally namespaced by folder.
pub fn file_key(original_name: &str, folder: Option<&str>) -> String {
    let timestamp = Utc::now().timestamp_millis();
    let random = Uuid::new_v4().simple().to_string();
    let extension = original_name.rsplit('.').next().unwrap_or("bin");
    let file_name = format!("{}-{}.{}", timestamp, &random[..12], extension);

    match folder {
        Some(folder) => format!("{}/{}", folder, file_name),
        None => file_name,
    }
}

/// Extracts the storage key from a stored asset URL: the URL path component,
/// without its leading slash. Unparseable values are treated as raw keys.
pub fn key_from_url(url: &str) -> String {
    match Url::parse(url) {
        Ok(parsed) => parsed.path().trim_start_matches('/').to_string(),
        Err(_) => url.trim_start_matches('/').to_string(),
    }
}

/// Absolute URLs pass through; relative paths are joined onto the configured
/// base URL with exactly one slash.
pub fn resolve_asset_url(base_url: &str, url: &str) -> String {
    if url.starts_with("http") {
        url.to_string()
    } else {
        format!(
            "{}/{}",
            base_url.trim_end_matches('/'),
            url.trim_start_matches('/')
        )
    }
}
