//! Blog content management.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use sqlx::Row;

use crate::error::ApiError;
use crate::models::{BlogPost, ListPage};
use crate::query::{bind_values, bind_values_query, Predicate, UpdateSet};
use crate::state::AppState;
use crate::storage::resolve_asset_url;

const DEFAULT_PAGE_SIZE: i64 = 10;
const DEFAULT_HIGHLIGHT_LIMIT: i64 = 5;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlogListParams {
    pub published: Option<String>,
    pub tag: Option<String>,
    pub search: Option<String>,
    pub author: Option<String>,
    pub skip: Option<String>,
    pub take: Option<String>,
}

impl BlogListParams {
    fn skip(&self) -> i64 {
        self.skip
            .as_deref()
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or(0)
            .max(0)
    }

    fn take(&self) -> i64 {
        self.take
            .as_deref()
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or(DEFAULT_PAGE_SIZE)
            .clamp(1, 100)
    }

    // Drafts stay hidden unless explicitly requested.
    fn published(&self) -> bool {
        self.published
            .as_deref()
            .map(|s| s == "true")
            .unwrap_or(true)
    }
}

pub fn build_predicate(params: &BlogListParams) -> Predicate {
    let mut predicate = Predicate::new();
    predicate.equals("published", params.published());

    if let Some(tag) = params.tag.as_deref().filter(|s| !s.is_empty()) {
        predicate.array_has("tags", tag);
    }
    if let Some(author) = params.author.as_deref().filter(|s| !s.is_empty()) {
        predicate.contains("author", author);
    }
    if let Some(search) = params.search.as_deref() {
        let term = search.trim();
        if !term.is_empty() {
            predicate.any(|or| {
                or.contains("title", term);
                or.contains("excerpt", term);
                or.contains("content", term);
            });
        }
    }

    predicate
}

pub async fn list(
    state: &AppState,
    params: &BlogListParams,
) -> Result<ListPage<BlogPost>, ApiError> {
    let predicate = build_predicate(params);
    let skip = params.skip();
    let take = params.take();

    let sql = format!(
        "SELECT * FROM blog_posts {} ORDER BY created_at DESC, id ASC LIMIT {} OFFSET {}",
        predicate.where_sql(),
        take,
        skip
    );
    let mut items = bind_values(sqlx::query_as::<_, BlogPost>(&sql), predicate.params())
        .fetch_all(&state.pool)
        .await?;

    let count_sql = format!(
        "SELECT COUNT(*) AS count FROM blog_posts {}",
        predicate.where_sql()
    );
    let count_row = bind_values_query(sqlx::query(&count_sql), predicate.params())
        .fetch_one(&state.pool)
        .await?;
    let total: i64 = count_row.try_get("count")?;

    for post in &mut items {
        normalize_featured_image(state, post);
    }

    Ok(ListPage { items, total, skip })
}

/// Fetches one post by slug and counts the read. The increment and the read
/// happen in a single statement.
pub async fn get_by_slug(state: &AppState, slug: &str) -> Result<BlogPost, ApiError> {
    let mut post = sqlx::query_as::<_, BlogPost>(
        "UPDATE blog_posts SET view_count = view_count + 1 WHERE slug = $1 RETURNING *",
    )
    .bind(slug)
    .fetch_optional(&state.pool)
    .await?
    .ok_or_else(|| ApiError::not_found("Blog post not found"))?;

    normalize_featured_image(state, &mut post);
    Ok(post)
}

pub async fn get_by_id(state: &AppState, id: i64) -> Result<BlogPost, ApiError> {
    sqlx::query_as::<_, BlogPost>("SELECT * FROM blog_posts WHERE id = $1")
        .bind(id)
        .fetch_optional(&state.pool)
        .await?
        .ok_or_else(|| ApiError::not_found("Blog post not found"))
}

/// Most-read published posts.
pub async fn popular(state: &AppState, limit: Option<i64>) -> Result<Vec<BlogPost>, ApiError> {
    let limit = limit.unwrap_or(DEFAULT_HIGHLIGHT_LIMIT).clamp(1, 50);
    let mut items = sqlx::query_as::<_, BlogPost>(
        "SELECT * FROM blog_posts WHERE published = TRUE \
         ORDER BY view_count DESC, id ASC LIMIT $1",
    )
    .bind(limit)
    .fetch_all(&state.pool)
    .await?;

    for post in &mut items {
        normalize_featured_image(state, post);
    }
    Ok(items)
}

/// Latest published posts by publish date.
pub async fn recent(state: &AppState, limit: Option<i64>) -> Result<Vec<BlogPost>, ApiError> {
    let limit = limit.unwrap_or(DEFAULT_HIGHLIGHT_LIMIT).clamp(1, 50);
    let mut items = sqlx::query_as::<_, BlogPost>(
        "SELECT * FROM blog_posts WHERE published = TRUE \
         ORDER BY published_at DESC NULLS LAST, id ASC LIMIT $1",
    )
    .bind(limit)
    .fetch_all(&state.pool)
    .await?;

    for post in &mut items {
        normalize_featured_image(state, post);
    }
    Ok(items)
}

#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct TagCount {
    pub tag: String,
    pub count: i64,
}

/// Every tag used by published posts with its usage count, alphabetical.
pub async fn tags(state: &AppState) -> Result<Vec<TagCount>, ApiError> {
    let tag_lists: Vec<Vec<String>> =
        sqlx::query_scalar("SELECT tags FROM blog_posts WHERE published = TRUE")
            .fetch_all(&state.pool)
            .await?;

    Ok(count_tags(tag_lists))
}

pub fn count_tags(tag_lists: Vec<Vec<String>>) -> Vec<TagCount> {
    let mut counts: BTreeMap<String, i64> = BTreeMap::new();
    for tag in tag_lists.into_iter().flatten() {
        *counts.entry(tag).or_insert(0) += 1;
    }
    counts
        .into_iter()
        .map(|(tag, count)| TagCount { tag, count })
        .collect()
}

/// How a write changes the publish state of a post.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishTransition {
    /// No change requested, or re-publishing an already published post.
    Keep,
    /// First publish: stamp `published_at` now.
    SetNow,
    /// Unpublish: clear `published_at`.
    Clear,
}

pub fn publish_transition(currently_published: bool, requested: Option<bool>) -> PublishTransition {
    match requested {
        Some(true) if !currently_published => PublishTransition::SetNow,
        Some(false) => PublishTransition::Clear,
        _ => PublishTransition::Keep,
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBlogPostRequest {
    pub title: String,
    pub slug: String,
    pub content: String,
    pub excerpt: String,
    #[serde(default)]
    pub tags: Vec<String>,
    pub author: String,
    pub published: Option<bool>,
}

impl CreateBlogPostRequest {
    pub fn validate(&self) -> Result<(), ApiError> {
        let mut field_errors = HashMap::new();

        if self.title.trim().is_empty() {
            field_errors.insert("title".to_string(), "Must not be empty".to_string());
        }
        if self.slug.trim().is_empty() {
            field_errors.insert("slug".to_string(), "Must not be empty".to_string());
        }
        if self.content.trim().is_empty() {
            field_errors.insert("content".to_string(), "Must not be empty".to_string());
        }
        if self.author.trim().is_empty() {
            field_errors.insert("author".to_string(), "Must not be empty".to_string());
        }

        if field_errors.is_empty() {
            Ok(())
        } else {
            Err(ApiError::validation_error(
                "Validation failed",
                Some(field_errors),
            ))
        }
    }
}

pub async fn create(
    state: &AppState,
    request: &CreateBlogPostRequest,
    featured_image: Option<String>,
) -> Result<BlogPost, ApiError> {
    request.validate()?;
    ensure_slug_free(state, &request.slug, None).await?;

    let published = request.published.unwrap_or(false);
    let post = sqlx::query_as::<_, BlogPost>(
        "INSERT INTO blog_posts \
         (title, slug, content, excerpt, featured_image, tags, author, published, published_at) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, CASE WHEN $8 THEN NOW() ELSE NULL END) \
         RETURNING *",
    )
    .bind(&request.title)
    .bind(&request.slug)
    .bind(&request.content)
    .bind(&request.excerpt)
    .bind(&featured_image)
    .bind(&request.tags)
    .bind(&request.author)
    .bind(published)
    .fetch_one(&state.pool)
    .await?;

    Ok(post)
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateBlogPostRequest {
    pub title: Option<String>,
    pub slug: Option<String>,
    pub content: Option<String>,
    pub excerpt: Option<String>,
    pub tags: Option<Vec<String>>,
    pub author: Option<String>,
    pub published: Option<bool>,
}

/// Partial update. A `Some` featured image replaces the stored one and the
/// old object is deleted best-effort.
pub async fn update(
    state: &AppState,
    id: i64,
    request: &UpdateBlogPostRequest,
    featured_image: Option<String>,
) -> Result<BlogPost, ApiError> {
    let existing = get_by_id(state, id).await?;

    if let Some(slug) = request.slug.as_deref() {
        if slug != existing.slug {
            ensure_slug_free(state, slug, Some(id)).await?;
        }
    }

    let mut update = UpdateSet::new();
    if let Some(title) = &request.title {
        update.set("title", title.as_str());
    }
    if let Some(slug) = &request.slug {
        update.set("slug", slug.as_str());
    }
    if let Some(content) = &request.content {
        update.set("content", content.as_str());
    }
    if let Some(excerpt) = &request.excerpt {
        update.set("excerpt", excerpt.as_str());
    }
    if let Some(tags) = &request.tags {
        update.set(
            "tags",
            serde_json::Value::Array(
                tags.iter()
                    .map(|t| serde_json::Value::String(t.clone()))
                    .collect(),
            ),
        );
    }
    if let Some(author) = &request.author {
        update.set("author", author.as_str());
    }
    if let Some(published) = request.published {
        update.set("published", published);
        match publish_transition(existing.published, Some(published)) {
            PublishTransition::SetNow => update.set_raw("\"published_at\" = NOW()"),
            PublishTransition::Clear => update.set_null("published_at"),
            PublishTransition::Keep => {}
        }
    }
    if let Some(image) = &featured_image {
        update.set("featured_image", image.as_str());
    }

    if update.is_empty() {
        return Ok(existing);
    }

    let (sql, params) = update.into_update_sql("blog_posts", id);
    let post = bind_values(sqlx::query_as::<_, BlogPost>(&sql), &params)
        .fetch_one(&state.pool)
        .await?;

    if featured_image.is_some() {
        if let Some(old) = &existing.featured_image {
            state.assets().delete_urls(std::slice::from_ref(old)).await;
        }
    }

    Ok(post)
}

/// Deletes the featured image best-effort, then the row. Storage failures
/// never block row deletion.
pub async fn delete(state: &AppState, id: i64) -> Result<(), ApiError> {
    let existing = get_by_id(state, id).await?;

    if let Some(image) = &existing.featured_image {
        state.assets().delete_urls(std::slice::from_ref(image)).await;
    }

    sqlx::query("DELETE FROM blog_posts WHERE id = $1")
        .bind(id)
        .execute(&state.pool)
        .await?;
    Ok(())
}

async fn ensure_slug_free(
    state: &AppState,
    slug: &str,
    exclude_id: Option<i64>,
) -> Result<(), ApiError> {
    let existing: Option<i64> = sqlx::query_scalar("SELECT id FROM blog_posts WHERE slug = $1")
        .bind(slug)
        .fetch_optional(&state.pool)
        .await?;

    match existing {
        Some(id) if Some(id) != exclude_id => {
            Err(ApiError::conflict("Blog post with this slug already exists"))
        }
        _ => Ok(()),
    }
}

fn normalize_featured_image(state: &AppState, post: &mut BlogPost) {
    if let Some(image) = &mut post.featured_image {
        *image = resolve_asset_url(&state.config.asset_base_url, image);
    }
}
