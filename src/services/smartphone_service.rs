//! Catalog listing, filtering, and CRUD.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use sqlx::Row;

use crate::error::ApiError;
use crate::models::{ListPage, Smartphone};
use crate::query::{bind_values, bind_values_query, Predicate, UpdateSet};
use crate::state::AppState;
use crate::storage::resolve_asset_url;

const DEFAULT_PAGE_SIZE: i64 = 10;
const RELATED_LIMIT: i64 = 4;

/// Listing filters. Everything arrives as an optional string straight from
/// the query string; absent filters contribute no predicate clause.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SmartphoneListParams {
    pub color: Option<String>,
    pub capacity: Option<String>,
    pub min_price: Option<String>,
    pub max_price: Option<String>,
    pub name: Option<String>,
    pub search: Option<String>,
    pub active: Option<String>,
    pub skip: Option<String>,
    pub take: Option<String>,
}

impl SmartphoneListParams {
    fn skip(&self) -> i64 {
        parse_i64(self.skip.as_deref()).unwrap_or(0).max(0)
    }

    fn take(&self) -> i64 {
        parse_i64(self.take.as_deref())
            .unwrap_or(DEFAULT_PAGE_SIZE)
            .clamp(1, 100)
    }

    // Listings show active items unless the caller asks otherwise.
    fn active(&self) -> bool {
        self.active.as_deref().map(|s| s == "true").unwrap_or(true)
    }
}

fn parse_i64(value: Option<&str>) -> Option<i64> {
    value.and_then(|v| v.trim().parse().ok())
}

fn parse_f64(value: Option<&str>) -> Option<f64> {
    value.and_then(|v| v.trim().parse().ok())
}

/// Builds the catalog predicate. Each search token must match somewhere
/// (name, slug, color, or exact capacity for numeric tokens); the structured
/// filters stack on top with `AND`.
pub fn build_predicate(params: &SmartphoneListParams) -> Predicate {
    let mut predicate = Predicate::new();
    predicate.equals("active", params.active());

    if let Some(color) = params.color.as_deref().filter(|s| !s.is_empty()) {
        predicate.equals("color", color);
    }
    if let Some(capacity) = parse_i64(params.capacity.as_deref()) {
        predicate.equals("capacity", capacity);
    }
    if let Some(min_price) = parse_f64(params.min_price.as_deref()) {
        predicate.gte("price", min_price);
    }
    if let Some(max_price) = parse_f64(params.max_price.as_deref()) {
        predicate.lte("price", max_price);
    }
    if let Some(name) = params.name.as_deref().filter(|s| !s.is_empty()) {
        predicate.contains("name", name);
    }

    if let Some(search) = params.search.as_deref() {
        for token in search.split_whitespace() {
            predicate.any(|or| {
                or.contains("name", token);
                or.contains("slug", token);
                or.contains("color", token);
                if let Ok(capacity) = token.parse::<i64>() {
                    or.equals("capacity", capacity);
                }
            });
        }
    }

    predicate
}

pub async fn list(
    state: &AppState,
    params: &SmartphoneListParams,
) -> Result<ListPage<Smartphone>, ApiError> {
    let predicate = build_predicate(params);
    let skip = params.skip();
    let take = params.take();

    let sql = format!(
        "SELECT * FROM smartphones {} ORDER BY created_at DESC, id ASC LIMIT {} OFFSET {}",
        predicate.where_sql(),
        take,
        skip
    );
    let query = bind_values(sqlx::query_as::<_, Smartphone>(&sql), predicate.params());
    let mut items = query.fetch_all(&state.pool).await?;

    let count_sql = format!(
        "SELECT COUNT(*) AS count FROM smartphones {}",
        predicate.where_sql()
    );
    let count_row = bind_values_query(sqlx::query(&count_sql), predicate.params())
        .fetch_one(&state.pool)
        .await?;
    let total: i64 = count_row.try_get("count")?;

    for phone in &mut items {
        normalize_gallery(state, phone);
    }

    Ok(ListPage { items, total, skip })
}

pub async fn get_by_slug(state: &AppState, slug: &str) -> Result<Smartphone, ApiError> {
    let mut phone = sqlx::query_as::<_, Smartphone>("SELECT * FROM smartphones WHERE slug = $1")
        .bind(slug)
        .fetch_optional(&state.pool)
        .await?
        .ok_or_else(|| ApiError::not_found("Smartphone not found"))?;

    normalize_gallery(state, &mut phone);
    Ok(phone)
}

pub async fn get_by_id(state: &AppState, id: i64) -> Result<Smartphone, ApiError> {
    sqlx::query_as::<_, Smartphone>("SELECT * FROM smartphones WHERE id = $1")
        .bind(id)
        .fetch_optional(&state.pool)
        .await?
        .ok_or_else(|| ApiError::not_found("Smartphone not found"))
}

/// Up to four other active models sharing the color or the leading word of
/// the name (the brand/model family for names like "iPhone 15 Pro").
pub async fn related(state: &AppState, slug: &str) -> Result<Vec<Smartphone>, ApiError> {
    let source = get_by_slug(state, slug).await?;
    let family = source.name.split_whitespace().next().unwrap_or(&source.name);

    let mut predicate = Predicate::new();
    predicate.equals("active", true);
    predicate.not_equals("slug", source.slug.as_str());
    predicate.any(|or| {
        or.equals("color", source.color.as_str());
        or.contains("name", family);
    });

    let sql = format!(
        "SELECT * FROM smartphones {} ORDER BY created_at DESC LIMIT {}",
        predicate.where_sql(),
        RELATED_LIMIT
    );
    let query = bind_values(sqlx::query_as::<_, Smartphone>(&sql), predicate.params());
    let mut items = query.fetch_all(&state.pool).await?;

    for phone in &mut items {
        normalize_gallery(state, phone);
    }
    Ok(items)
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterOptions {
    pub names: Vec<String>,
    pub colors: Vec<String>,
    pub capacities: Vec<i64>,
    pub price: PriceRange,
}

#[derive(Debug, Serialize)]
pub struct PriceRange {
    pub min: f64,
    pub max: f64,
}

/// Distinct values across active catalog entries, for building filter UIs.
pub async fn filter_options(state: &AppState) -> Result<FilterOptions, ApiError> {
    let names: Vec<String> = sqlx::query_scalar(
        "SELECT DISTINCT name FROM smartphones WHERE active = TRUE ORDER BY name",
    )
    .fetch_all(&state.pool)
    .await?;

    let colors: Vec<String> = sqlx::query_scalar(
        "SELECT DISTINCT color FROM smartphones WHERE active = TRUE ORDER BY color",
    )
    .fetch_all(&state.pool)
    .await?;

    let capacities: Vec<i64> = sqlx::query_scalar(
        "SELECT DISTINCT capacity FROM smartphones WHERE active = TRUE ORDER BY capacity",
    )
    .fetch_all(&state.pool)
    .await?;

    let (min, max): (Option<f64>, Option<f64>) = sqlx::query_as(
        "SELECT MIN(price), MAX(price) FROM smartphones WHERE active = TRUE",
    )
    .fetch_one(&state.pool)
    .await?;

    Ok(FilterOptions {
        names,
        colors,
        capacities,
        price: PriceRange {
            min: min.unwrap_or(0.0),
            max: max.unwrap_or(0.0),
        },
    })
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSmartphoneRequest {
    pub name: String,
    pub slug: String,
    pub color: String,
    pub capacity: i64,
    pub price: f64,
    pub description: String,
    pub short_description: String,
    pub active: Option<bool>,
}

impl CreateSmartphoneRequest {
    pub fn validate(&self) -> Result<(), ApiError> {
        let mut field_errors = HashMap::new();

        if self.name.trim().is_empty() {
            field_errors.insert("name".to_string(), "Must not be empty".to_string());
        }
        if self.slug.trim().is_empty() {
            field_errors.insert("slug".to_string(), "Must not be empty".to_string());
        }
        if self.color.trim().is_empty() {
            field_errors.insert("color".to_string(), "Must not be empty".to_string());
        }
        if self.capacity < 64 {
            field_errors.insert("capacity".to_string(), "Must be at least 64".to_string());
        }
        if self.price < 0.0 {
            field_errors.insert("price".to_string(), "Must not be negative".to_string());
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
    request: &CreateSmartphoneRequest,
    gallery: Vec<String>,
) -> Result<Smartphone, ApiError> {
    request.validate()?;
    ensure_slug_free(state, &request.slug, None).await?;

    let phone = sqlx::query_as::<_, Smartphone>(
        "INSERT INTO smartphones \
         (name, slug, color, capacity, price, gallery, description, short_description, active) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) RETURNING *",
    )
    .bind(&request.name)
    .bind(&request.slug)
    .bind(&request.color)
    .bind(request.capacity)
    .bind(request.price)
    .bind(&gallery)
    .bind(&request.description)
    .bind(&request.short_description)
    .bind(request.active.unwrap_or(true))
    .fetch_one(&state.pool)
    .await?;

    Ok(phone)
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSmartphoneRequest {
    pub name: Option<String>,
    pub slug: Option<String>,
    pub color: Option<String>,
    pub capacity: Option<i64>,
    pub price: Option<f64>,
    pub description: Option<String>,
    pub short_description: Option<String>,
    pub active: Option<bool>,
}

/// Partial update. When `gallery` is `Some` the image list is replaced and
/// the previous objects are deleted from storage best-effort.
pub async fn update(
    state: &AppState,
    id: i64,
    request: &UpdateSmartphoneRequest,
    gallery: Option<Vec<String>>,
) -> Result<Smartphone, ApiError> {
    let existing = get_by_id(state, id).await?;

    if let Some(slug) = request.slug.as_deref() {
        if slug != existing.slug {
            ensure_slug_free(state, slug, Some(id)).await?;
        }
    }

    let mut update = UpdateSet::new();
    if let Some(name) = &request.name {
        update.set("name", name.as_str());
    }
    if let Some(slug) = &request.slug {
        update.set("slug", slug.as_str());
    }
    if let Some(color) = &request.color {
        update.set("color", color.as_str());
    }
    if let Some(capacity) = request.capacity {
        update.set("capacity", capacity);
    }
    if let Some(price) = request.price {
        update.set("price", price);
    }
    if let Some(description) = &request.description {
        update.set("description", description.as_str());
    }
    if let Some(short_description) = &request.short_description {
        update.set("short_description", short_description.as_str());
    }
    if let Some(active) = request.active {
        update.set("active", active);
    }
    if let Some(gallery) = &gallery {
        update.set(
            "gallery",
            serde_json::Value::Array(
                gallery
                    .iter()
                    .map(|url| serde_json::Value::String(url.clone()))
                    .collect(),
            ),
        );
    }

    if update.is_empty() {
        return Ok(existing);
    }

    let (sql, params) = update.into_update_sql("smartphones", id);
    let phone = bind_values(sqlx::query_as::<_, Smartphone>(&sql), &params)
        .fetch_one(&state.pool)
        .await?;

    if gallery.is_some() {
        state.assets().delete_urls(&existing.gallery).await;
    }

    Ok(phone)
}

/// Deletes the gallery objects best-effort, then the row. Storage failures
/// never block row deletion.
pub async fn delete(state: &AppState, id: i64) -> Result<(), ApiError> {
    let existing = get_by_id(state, id).await?;

    state.assets().delete_urls(&existing.gallery).await;

    sqlx::query("DELETE FROM smartphones WHERE id = $1")
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
    let existing: Option<i64> = sqlx::query_scalar("SELECT id FROM smartphones WHERE slug = $1")
        .bind(slug)
        .fetch_optional(&state.pool)
        .await?;

    match existing {
        Some(id) if Some(id) != exclude_id => {
            Err(ApiError::conflict("Smartphone with this slug already exists"))
        }
        _ => Ok(()),
    }
}

fn normalize_gallery(state: &AppState, phone: &mut Smartphone) {
    for url in &mut phone.gallery {
        *url = resolve_asset_url(&state.config.asset_base_url, url);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    #[test]
    fn default_listing_filters_to_active_rows() {
        let params = SmartphoneListParams::default();
        let predicate = build_predicate(&params);
        assert_eq!(predicate.where_sql(), "WHERE \"active\" = $1");
        assert_eq!(predicate.params()[0], Value::Bool(true));
        assert_eq!(params.skip(), 0);
        assert_eq!(params.take(), DEFAULT_PAGE_SIZE);
    }

    #[test]
    fn structured_filters_stack_with_and() {
        let params = SmartphoneListParams {
            color: Some("black".to_string()),
            capacity: Some("256".to_string()),
            min_price: Some("100".to_string()),
            max_price: Some("900.50".to_string()),
            ..Default::default()
        };

        let predicate = build_predicate(&params);
        assert_eq!(
            predicate.where_sql(),
            "WHERE \"active\" = $1 AND \"color\" = $2 AND \"capacity\" = $3 \
             AND \"price\" >= $4 AND \"price\" <= $5"
        );
        assert_eq!(predicate.params()[2], Value::from(256));
        assert_eq!(predicate.params()[4], Value::from(900.50));
    }

    #[test]
    fn unparseable_numeric_filters_are_ignored() {
        let params = SmartphoneListParams {
            capacity: Some("lots".to_string()),
            min_price: Some("".to_string()),
            ..Default::default()
        };
        let predicate = build_predicate(&params);
        assert_eq!(predicate.where_sql(), "WHERE \"active\" = $1");
    }

    #[test]
    fn search_tokens_become_and_joined_or_groups() {
        let params = SmartphoneListParams {
            search: Some("iphone 256".to_string()),
            ..Default::default()
        };

        let predicate = build_predicate(&params);
        let sql = predicate.where_sql();

        // non-numeric token matches the text columns
        assert!(sql.contains("(\"name\" ILIKE $2 OR \"slug\" ILIKE $3 OR \"color\" ILIKE $4)"));
        // numeric token additionally matches capacity exactly
        assert!(sql.contains(
            "(\"name\" ILIKE $5 OR \"slug\" ILIKE $6 OR \"color\" ILIKE $7 \
             OR \"capacity\" = $8)"
        ));
        // groups are AND-joined
        assert_eq!(sql.matches(" AND ").count(), 2);
    }

    #[test]
    fn inactive_rows_are_reachable_on_request() {
        let params = SmartphoneListParams {
            active: Some("false".to_string()),
            ..Default::default()
        };
        let predicate = build_predicate(&params);
        assert_eq!(predicate.params()[0], Value::Bool(false));
    }

    #[test]
    fn take_is_clamped() {
        let params = SmartphoneListParams {
            take: Some("100000".to_string()),
            skip: Some("-5".to_string()),
            ..Default::default()
        };
        assert_eq!(params.take(), 100);
        assert_eq!(params.skip(), 0);
    }

    #[test]
    fn create_validation_reports_every_failing_field() {
        let request = CreateSmartphoneRequest {
            name: "".to_string(),
            slug: " ".to_string(),
            color: "Black".to_string(),
            capacity: 0,
            price: -1.0,
            description: String::new(),
            short_description: String::new(),
            active: None,
        };

        let err = request.validate().unwrap_err();
        match err {
            ApiError::ValidationError { field_errors, .. } => {
                let fields = field_errors.unwrap();
                assert_eq!(fields.len(), 4);
                assert!(fields.contains_key("name"));
                assert!(fields.contains_key("slug"));
                assert!(fields.contains_key("capacity"));
                assert!(fields.contains_key("price"));
            }
            other => panic!("expected validation error, got {:?}", other),
        }
    }
}
