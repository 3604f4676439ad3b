use std::time::Duration;

use axum::extract::{Multipart, Path, Query, State};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::ApiError;
use crate::handlers::parse_multipart;
use crate::middleware::AuthUser;
use crate::state::AppState;
use crate::storage::{file_key, SignedUrlMethod};

const DEFAULT_FOLDER: &str = "uploads";
const DEFAULT_SIGNED_URL_TTL_SECS: u64 = 3600;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/files/upload", post(upload))
        .route("/api/files/url/*key", get(public_url))
        .route("/api/files/signed-url/*key", get(signed_url))
        .route("/api/files/*key", delete(delete_file))
}

/// Generic authenticated upload, for content not tied to a catalog or blog
/// record.
async fn upload(
    State(state): State<AppState>,
    _user: AuthUser,
    multipart: Multipart,
) -> Result<Json<Value>, ApiError> {
    let form = parse_multipart(multipart).await?;
    let file = form
        .files("file")
        .first()
        .ok_or_else(|| ApiError::bad_request("Missing file"))?;
    let folder = form.field("folder").unwrap_or(DEFAULT_FOLDER);

    let key = file_key(&file.file_name, Some(folder));
    let url = state
        .storage
        .upload(&key, file.data.clone(), file.content_type.as_deref())
        .await?;

    Ok(Json(json!({
        "message": "File uploaded successfully",
        "key": key,
        "url": url
    })))
}

async fn public_url(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<Value>, ApiError> {
    Ok(Json(json!({ "url": state.storage.public_url(&key) })))
}

#[derive(Debug, Default, Deserialize)]
struct SignedUrlParams {
    operation: Option<String>,
    #[serde(alias = "expiresIn")]
    expires_in: Option<u64>,
}

async fn signed_url(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(key): Path<String>,
    Query(params): Query<SignedUrlParams>,
) -> Result<Json<Value>, ApiError> {
    let method = match params.operation.as_deref() {
        None | Some("get") => SignedUrlMethod::Get,
        Some("put") => SignedUrlMethod::Put,
        Some(other) => {
            return Err(ApiError::bad_request(format!(
                "Unknown operation: {}",
                other
            )))
        }
    };
    let expires_in = Duration::from_secs(params.expires_in.unwrap_or(DEFAULT_SIGNED_URL_TTL_SECS));

    let url = state.storage.signed_url(&key, method, expires_in).await?;
    Ok(Json(json!({ "url": url })))
}

async fn delete_file(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(key): Path<String>,
) -> Result<Json<Value>, ApiError> {
    state.storage.delete(&key).await?;
    Ok(Json(json!({ "success": true })))
}
