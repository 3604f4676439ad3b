use std::collections::HashMap;

use axum::extract::{Multipart, Path, Query, State};
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{json, Value};

use crate::error::ApiError;
use crate::handlers::{parse_multipart, MultipartForm};
use crate::middleware::AuthUser;
use crate::services::smartphone_service::{
    self, CreateSmartphoneRequest, SmartphoneListParams, UpdateSmartphoneRequest,
};
use crate::state::AppState;

const GALLERY_FOLDER: &str = "images";
const MAX_GALLERY_FILES: usize = 10;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/smartphones", get(list).post(create))
        .route("/api/smartphones/filters", get(filters))
        .route("/api/smartphones/related-smartphones/:slug", get(related))
        .route("/api/smartphones/slug/:slug", get(get_by_slug))
        .route(
            "/api/smartphones/:slug",
            get(get_by_slug).patch(update).delete(delete_one),
        )
        .route("/api/smartphones/id/:id", get(get_by_id))
}

async fn list(
    State(state): State<AppState>,
    Query(params): Query<SmartphoneListParams>,
) -> Result<Json<Value>, ApiError> {
    let page = smartphone_service::list(&state, &params).await?;
    Ok(Json(json!(page)))
}

async fn filters(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let options = smartphone_service::filter_options(&state).await?;
    Ok(Json(json!(options)))
}

async fn related(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let items = smartphone_service::related(&state, &slug).await?;
    Ok(Json(json!(items)))
}

async fn get_by_slug(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let phone = smartphone_service::get_by_slug(&state, &slug).await?;
    Ok(Json(json!(phone)))
}

async fn get_by_id(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(id): Path<i64>,
) -> Result<Json<Value>, ApiError> {
    let phone = smartphone_service::get_by_id(&state, id).await?;
    Ok(Json(json!(phone)))
}

async fn create(
    State(state): State<AppState>,
    _user: AuthUser,
    multipart: Multipart,
) -> Result<Json<Value>, ApiError> {
    let form = parse_multipart(multipart).await?;
    let request = create_request(&form)?;

    let gallery_files = form.files("gallery");
    if gallery_files.len() > MAX_GALLERY_FILES {
        return Err(ApiError::bad_request(format!(
            "Gallery accepts at most {} images",
            MAX_GALLERY_FILES
        )));
    }
    let gallery = state.assets().upload_all(GALLERY_FOLDER, gallery_files).await?;

    let phone = smartphone_service::create(&state, &request, gallery).await?;
    Ok(Json(json!(phone)))
}

async fn update(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(id): Path<i64>,
    multipart: Multipart,
) -> Result<Json<Value>, ApiError> {
    let form = parse_multipart(multipart).await?;
    let request = update_request(&form)?;

    let gallery_files = form.files("gallery");
    if gallery_files.len() > MAX_GALLERY_FILES {
        return Err(ApiError::bad_request(format!(
            "Gallery accepts at most {} images",
            MAX_GALLERY_FILES
        )));
    }
    let gallery = if gallery_files.is_empty() {
        None
    } else {
        Some(state.assets().upload_all(GALLERY_FOLDER, gallery_files).await?)
    };

    let phone = smartphone_service::update(&state, id, &request, gallery).await?;
    Ok(Json(json!(phone)))
}

async fn delete_one(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(id): Path<i64>,
) -> Result<Json<Value>, ApiError> {
    smartphone_service::delete(&state, id).await?;
    Ok(Json(json!({ "success": true })))
}

fn create_request(form: &MultipartForm) -> Result<CreateSmartphoneRequest, ApiError> {
    let mut field_errors = HashMap::new();

    let capacity = parse_numeric_field::<i64>(form, "capacity", &mut field_errors);
    let price = parse_numeric_field::<f64>(form, "price", &mut field_errors);
    if !field_errors.is_empty() {
        return Err(ApiError::validation_error(
            "Validation failed",
            Some(field_errors),
        ));
    }

    Ok(CreateSmartphoneRequest {
        name: form.require_field("name")?.to_string(),
        slug: form.require_field("slug")?.to_string(),
        color: form.require_field("color")?.to_string(),
        capacity: capacity.unwrap_or(0),
        price: price.unwrap_or(0.0),
        description: form.field("description").unwrap_or_default().to_string(),
        short_description: form
            .field("shortDescription")
            .unwrap_or_default()
            .to_string(),
        active: form.field("active").map(|v| v == "true"),
    })
}

fn update_request(form: &MultipartForm) -> Result<UpdateSmartphoneRequest, ApiError> {
    let mut field_errors = HashMap::new();

    let capacity = parse_optional_numeric::<i64>(form, "capacity", &mut field_errors);
    let price = parse_optional_numeric::<f64>(form, "price", &mut field_errors);
    if !field_errors.is_empty() {
        return Err(ApiError::validation_error(
            "Validation failed",
            Some(field_errors),
        ));
    }

    Ok(UpdateSmartphoneRequest {
        name: form.field("name").map(String::from),
        slug: form.field("slug").map(String::from),
        color: form.field("color").map(String::from),
        capacity,
        price,
        description: form.field("description").map(String::from),
        short_description: form.field("shortDescription").map(String::from),
        active: form.field("active").map(|v| v == "true"),
    })
}

fn parse_numeric_field<T: std::str::FromStr>(
    form: &MultipartForm,
    name: &str,
    field_errors: &mut HashMap<String, String>,
) -> Option<T> {
    match form.field(name) {
        Some(raw) => match raw.trim().parse() {
            Ok(value) => Some(value),
            Err(_) => {
                field_errors.insert(name.to_string(), "Must be a number".to_string());
                None
            }
        },
        None => {
            field_errors.insert(name.to_string(), "Must not be empty".to_string());
            None
        }
    }
}

fn parse_optional_numeric<T: std::str::FromStr>(
    form: &MultipartForm,
    name: &str,
    field_errors: &mut HashMap<String, String>,
) -> Option<T> {
    let raw = form.field(name)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            field_errors.insert(name.to_string(), "Must be a number".to_string());
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form_with(fields: &[(&str, &str)]) -> MultipartForm {
        let mut form = MultipartForm::default();
        for (name, value) in fields {
            form.fields.insert(name.to_string(), value.to_string());
        }
        form
    }

    #[test]
    fn create_request_parses_numeric_fields() {
        let form = form_with(&[
            ("name", "iPhone 15"),
            ("slug", "iphone-15"),
            ("color", "Black"),
            ("capacity", "256"),
            ("price", "999.99"),
        ]);

        let request = create_request(&form).unwrap();
        assert_eq!(request.capacity, 256);
        assert_eq!(request.price, 999.99);
        assert_eq!(request.active, None);
    }

    #[test]
    fn bad_numbers_are_reported_together() {
        let form = form_with(&[
            ("name", "iPhone 15"),
            ("slug", "iphone-15"),
            ("color", "Black"),
            ("capacity", "huge"),
            ("price", "cheap"),
        ]);

        let err = create_request(&form).unwrap_err();
        match err {
            ApiError::ValidationError { field_errors, .. } => {
                let fields = field_errors.unwrap();
                assert_eq!(fields.get("capacity").unwrap(), "Must be a number");
                assert_eq!(fields.get("price").unwrap(), "Must be a number");
            }
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn update_request_leaves_absent_fields_untouched() {
        let form = form_with(&[("price", "799")]);
        let request = update_request(&form).unwrap();
        assert_eq!(request.price, Some(799.0));
        assert!(request.name.is_none());
        assert!(request.capacity.is_none());
    }
}
