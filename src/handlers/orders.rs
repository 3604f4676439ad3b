use axum::extract::{Path, Query, State};
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{json, Value};

use crate::error::ApiError;
use crate::middleware::AuthUser;
use crate::services::order_service::{
    self, CreateOrderRequest, OrderListParams, UpdateOrderRequest,
};
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/orders", get(list).post(create))
        .route("/api/orders/:id", get(get_one).patch(update).delete(delete_one))
}

/// Public order intake from the storefront checkout.
async fn create(
    State(state): State<AppState>,
    Json(request): Json<CreateOrderRequest>,
) -> Result<Json<Value>, ApiError> {
    let order = order_service::create(&state, &request).await?;
    Ok(Json(json!(order)))
}

async fn list(
    State(state): State<AppState>,
    _user: AuthUser,
    Query(params): Query<OrderListParams>,
) -> Result<Json<Value>, ApiError> {
    let page = order_service::list(&state, &params).await?;
    Ok(Json(json!(page)))
}

async fn get_one(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(id): Path<i64>,
) -> Result<Json<Value>, ApiError> {
    let order = order_service::get(&state, id).await?;
    Ok(Json(json!(order)))
}

async fn update(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(id): Path<i64>,
    Json(request): Json<UpdateOrderRequest>,
) -> Result<Json<Value>, ApiError> {
    let order = order_service::update(&state, id, &request).await?;
    Ok(Json(json!(order)))
}

async fn delete_one(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(id): Path<i64>,
) -> Result<Json<Value>, ApiError> {
    order_service::delete(&state, id).await?;
    Ok(Json(json!({ "success": true })))
}
