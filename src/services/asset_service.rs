//! Uploaded-asset lifecycle shared by catalog, blog, and the generic files
//! endpoints.
//!
//! Uploads are all-or-nothing for the request: one failed part fails the
//! whole request. Deletes are best effort: records are removed even when
//! their stored objects cannot be, and each failure is logged.

use std::sync::Arc;

use futures::future::join_all;

use crate::error::ApiError;
use crate::storage::{file_key, key_from_url, FileStorage, UploadFile};

pub struct AssetService {
    storage: Arc<dyn FileStorage>,
}

impl AssetService {
    pub fn new(storage: Arc<dyn FileStorage>) -> Self {
        Self { storage }
    }

    /// Uploads one file under a generated key and returns its public URL.
    pub async fn upload(&self, folder: &str, file: &UploadFile) -> Result<String, ApiError> {
        let key = file_key(&file.file_name, Some(folder));
        let url = self
            .storage
            .upload(&key, file.data.clone(), file.content_type.as_deref())
            .await?;
        Ok(url)
    }

    /// Uploads every file concurrently. Any failure fails the batch; objects
    /// already stored by the batch are not rolled back.
    pub async fn upload_all(
        &self,
        folder: &str,
        files: &[UploadFile],
    ) -> Result<Vec<String>, ApiError> {
        let uploads = files.iter().map(|file| self.upload(folder, file));
        join_all(uploads).await.into_iter().collect()
    }

    /// Deletes the stored objects behind asset URLs in parallel, logging
    /// failures instead of propagating them. External URLs resolve to their
    /// path component and simply come back not-found, which is also just
    /// logged.
    pub async fn delete_urls(&self, urls: &[String]) {
        let deletes = urls.iter().map(|url| async move {
            let key = key_from_url(url);
            if let Err(err) = self.storage.delete(&key).await {
                tracing::warn!("Failed to delete stored object {}: {}", key, err);
            }
        });
        join_all(deletes).await;
    }
}
