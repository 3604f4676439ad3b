use axum::extract::{Multipart, Path, Query, State};
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::ApiError;
use crate::handlers::{parse_multipart, split_tags, MultipartForm};
use crate::middleware::AuthUser;
use crate::services::blog_service::{
    self, BlogListParams, CreateBlogPostRequest, UpdateBlogPostRequest,
};
use crate::state::AppState;

const FEATURED_IMAGE_FOLDER: &str = "blog";

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/blog", get(list).post(create))
        .route("/api/blog/popular", get(popular))
        .route("/api/blog/recent", get(recent))
        .route("/api/blog/tags", get(tags))
        .route("/api/blog/slug/:slug", get(get_by_slug))
        .route(
            "/api/blog/:slug",
            get(get_by_slug).patch(update).delete(delete_one),
        )
}

#[derive(Debug, Deserialize)]
struct LimitParams {
    limit: Option<i64>,
}

async fn list(
    State(state): State<AppState>,
    Query(params): Query<BlogListParams>,
) -> Result<Json<Value>, ApiError> {
    let page = blog_service::list(&state, &params).await?;
    Ok(Json(json!(page)))
}

async fn popular(
    State(state): State<AppState>,
    Query(params): Query<LimitParams>,
) -> Result<Json<Value>, ApiError> {
    let posts = blog_service::popular(&state, params.limit).await?;
    Ok(Json(json!(posts)))
}

async fn recent(
    State(state): State<AppState>,
    Query(params): Query<LimitParams>,
) -> Result<Json<Value>, ApiError> {
    let posts = blog_service::recent(&state, params.limit).await?;
    Ok(Json(json!(posts)))
}

async fn tags(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let tags = blog_service::tags(&state).await?;
    Ok(Json(json!(tags)))
}

async fn get_by_slug(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let post = blog_service::get_by_slug(&state, &slug).await?;
    Ok(Json(json!(post)))
}

async fn create(
    State(state): State<AppState>,
    _user: AuthUser,
    multipart: Multipart,
) -> Result<Json<Value>, ApiError> {
    let form = parse_multipart(multipart).await?;
    let request = create_request(&form)?;

    let featured_image = match form.files("featuredImage").first() {
        Some(file) => Some(state.assets().upload(FEATURED_IMAGE_FOLDER, file).await?),
        None => None,
    };

    let post = blog_service::create(&state, &request, featured_image).await?;
    Ok(Json(json!(post)))
}

async fn update(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(id): Path<i64>,
    multipart: Multipart,
) -> Result<Json<Value>, ApiError> {
    let form = parse_multipart(multipart).await?;
    let request = update_request(&form);

    let featured_image = match form.files("featuredImage").first() {
        Some(file) => Some(state.assets().upload(FEATURED_IMAGE_FOLDER, file).await?),
        None => None,
    };

    let post = blog_service::update(&state, id, &request, featured_image).await?;
    Ok(Json(json!(post)))
}

async fn delete_one(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(id): Path<i64>,
) -> Result<Json<Value>, ApiError> {
    blog_service::delete(&state, id).await?;
    Ok(Json(json!({ "success": true })))
}

fn create_request(form: &MultipartForm) -> Result<CreateBlogPostRequest, ApiError> {
    Ok(CreateBlogPostRequest {
        title: form.require_field("title")?.to_string(),
        slug: form.require_field("slug")?.to_string(),
        content: form.require_field("content")?.to_string(),
        excerpt: form.field("excerpt").unwrap_or_default().to_string(),
        tags: form.field("tags").map(split_tags).unwrap_or_default(),
        author: form.require_field("author")?.to_string(),
        published: form.field("published").map(|v| v == "true"),
    })
}

fn update_request(form: &MultipartForm) -> UpdateBlogPostRequest {
    UpdateBlogPostRequest {
        title: form.field("title").map(String::from),
        slug: form.field("slug").map(String::from),
        content: form.field("content").map(String::from),
        excerpt: form.field("excerpt").map(String::from),
        tags: form.field("tags").map(split_tags),
        author: form.field("author").map(String::from),
        published: form.field("published").map(|v| v == "true"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_request_requires_title_slug_content_author() {
        let mut form = MultipartForm::default();
        form.fields.insert("title".to_string(), "Review".to_string());
        assert!(create_request(&form).is_err());

        form.fields.insert("slug".to_string(), "review".to_string());
        form.fields.insert("content".to_string(), "Body".to_string());
        form.fields.insert("author".to_string(), "Ada".to_string());
        form.fields
            .insert("tags".to_string(), "reviews, apple".to_string());

        let request = create_request(&form).unwrap();
        assert_eq!(request.tags, vec!["reviews", "apple"]);
        assert_eq!(request.published, None);
    }

    #[test]
    fn update_request_is_fully_optional() {
        let form = MultipartForm::default();
        let request = update_request(&form);
        assert!(request.title.is_none());
        assert!(request.tags.is_none());
        assert!(request.published.is_none());
    }
}
