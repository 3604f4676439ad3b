//! Upload/delete lifecycle against the in-memory storage backend.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;

use storefront_api::services::asset_service::AssetService;
use storefront_api::storage::{
    key_from_url, FileStorage, MemoryStorage, SignedUrlMethod, StorageError, UploadFile,
};

fn upload(name: &str, body: &'static [u8]) -> UploadFile {
    UploadFile {
        file_name: name.to_string(),
        content_type: Some("image/png".to_string()),
        data: Bytes::from_static(body),
    }
}

#[tokio::test]
async fn batch_upload_stores_every_file_under_the_folder() {
    let storage = Arc::new(MemoryStorage::new());
    let assets = AssetService::new(storage.clone());

    let urls = assets
        .upload_all(
            "images",
            &[upload("front.png", b"front"), upload("back.png", b"back")],
        )
        .await
        .unwrap();

    assert_eq!(urls.len(), 2);
    for url in &urls {
        assert!(url.starts_with("https://storage.test/images/"));
        assert!(storage.contains(&key_from_url(url)).await);
    }

    // generated keys keep the extension but not the original name
    assert!(urls[0].ends_with(".png"));
    assert!(!urls[0].contains("front"));
}

#[tokio::test]
async fn empty_batch_is_a_no_op() {
    let storage = Arc::new(MemoryStorage::new());
    let assets = AssetService::new(storage.clone());

    let urls = assets.upload_all("images", &[]).await.unwrap();
    assert!(urls.is_empty());
    assert!(storage.keys().await.is_empty());
}

#[tokio::test]
async fn delete_urls_removes_stored_objects() {
    let storage = Arc::new(MemoryStorage::new());
    let assets = AssetService::new(storage.clone());

    let urls = assets
        .upload_all("blog", &[upload("cover.webp", b"img")])
        .await
        .unwrap();
    assert_eq!(storage.keys().await.len(), 1);

    assets.delete_urls(&urls).await;
    assert!(storage.keys().await.is_empty());
}

#[tokio::test]
async fn gallery_replacement_removes_only_the_old_keys() {
    let storage = Arc::new(MemoryStorage::new());
    let assets = AssetService::new(storage.clone());

    // the sequence entity updates follow: upload the replacement batch
    // first, then drop the previously stored batch
    let old_urls = assets
        .upload_all(
            "images",
            &[upload("old-front.png", b"old1"), upload("old-back.png", b"old2")],
        )
        .await
        .unwrap();
    let new_urls = assets
        .upload_all(
            "images",
            &[upload("new-front.png", b"new1"), upload("new-back.png", b"new2")],
        )
        .await
        .unwrap();

    assets.delete_urls(&old_urls).await;

    for url in &old_urls {
        assert!(!storage.contains(&key_from_url(url)).await);
    }
    for url in &new_urls {
        assert!(storage.contains(&key_from_url(url)).await);
    }
    assert_eq!(storage.keys().await.len(), new_urls.len());
}

#[tokio::test]
async fn deleting_unknown_urls_does_not_fail() {
    let storage = Arc::new(MemoryStorage::new());
    let assets = AssetService::new(storage);

    // both a missing stored object and an external URL are just logged
    assets
        .delete_urls(&[
            "https://storage.test/images/never-existed.png".to_string(),
            "https://cdn.elsewhere.example/logo.svg".to_string(),
        ])
        .await;
}

/// Backend that refuses every write, for exercising failure propagation.
struct BrokenStorage;

#[async_trait]
impl FileStorage for BrokenStorage {
    async fn upload(
        &self,
        _key: &str,
        _data: Bytes,
        _content_type: Option<&str>,
    ) -> Result<String, StorageError> {
        Err(StorageError::Backend("disk on fire".to_string()))
    }

    async fn delete(&self, _key: &str) -> Result<(), StorageError> {
        Err(StorageError::Backend("disk on fire".to_string()))
    }

    async fn signed_url(
        &self,
        _key: &str,
        _method: SignedUrlMethod,
        _expires_in: Duration,
    ) -> Result<String, StorageError> {
        Err(StorageError::Backend("disk on fire".to_string()))
    }

    fn public_url(&self, key: &str) -> String {
        format!("https://broken.test/{}", key)
    }
}

#[tokio::test]
async fn upload_failure_fails_the_whole_batch() {
    let assets = AssetService::new(Arc::new(BrokenStorage));

    let err = assets
        .upload_all("images", &[upload("a.png", b"a")])
        .await
        .unwrap_err();
    assert_eq!(err.status_code(), 502);
}

#[tokio::test]
async fn delete_failure_is_swallowed() {
    let assets = AssetService::new(Arc::new(BrokenStorage));
    assets
        .delete_urls(&["https://broken.test/images/a.png".to_string()])
        .await;
}

#[tokio::test]
async fn signed_urls_carry_the_expiry() {
    let storage = MemoryStorage::new();
    let url = storage
        .signed_url("uploads/a.pdf", SignedUrlMethod::Get, Duration::from_secs(600))
        .await
        .unwrap();
    assert!(url.contains("expires=600"));
}
