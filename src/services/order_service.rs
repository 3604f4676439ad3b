//! Order intake and admin follow-up.
//!
//! Orders snapshot the referenced catalog entries at creation time, so later
//! price or name changes never rewrite order history. Email delivery runs
//! after the order is persisted and never fails the request.

use std::collections::HashMap;

use futures::future::join_all;
use serde::Deserialize;
use sqlx::types::Json;
use sqlx::Row;

use crate::config::EmailConfig;
use crate::email::{templates, EmailMessage, Mailer, OrderEmail};
use crate::error::ApiError;
use crate::models::{ListPage, Order, OrderItemSnapshot, Smartphone, SmartphoneSnapshot};
use crate::query::{bind_values, bind_values_query, Predicate, UpdateSet};
use crate::services::auth_service::looks_like_email;
use crate::state::AppState;

const DEFAULT_PAGE_SIZE: i64 = 10;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
    pub email: String,
    pub phone: String,
    pub name: String,
    pub message: Option<String>,
    pub items: Vec<CreateOrderItem>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderItem {
    pub smartphone_id: i64,
    pub quantity: i64,
}

impl CreateOrderRequest {
    pub fn validate(&self) -> Result<(), ApiError> {
        let mut field_errors = HashMap::new();

        if !looks_like_email(&self.email) {
            field_errors.insert("email".to_string(), "Must be a valid email".to_string());
        }
        if self.phone.trim().is_empty() {
            field_errors.insert("phone".to_string(), "Must not be empty".to_string());
        }
        if self.name.trim().is_empty() {
            field_errors.insert("name".to_string(), "Must not be empty".to_string());
        }
        if self.items.is_empty() {
            field_errors.insert("items".to_string(), "Must contain at least one item".to_string());
        }
        if self.items.iter().any(|item| item.quantity < 1) {
            field_errors.insert(
                "items.quantity".to_string(),
                "Must be at least 1".to_string(),
            );
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

/// Persists the order with snapshotted items, then sends the notification
/// emails. Items referencing unknown catalog ids are kept with an empty
/// snapshot rather than rejected.
pub async fn create(state: &AppState, request: &CreateOrderRequest) -> Result<Order, ApiError> {
    request.validate()?;

    let lookups = request.items.iter().map(|item| async move {
        let phone =
            sqlx::query_as::<_, Smartphone>("SELECT * FROM smartphones WHERE id = $1")
                .bind(item.smartphone_id)
                .fetch_optional(&state.pool)
                .await?;
        Ok::<_, ApiError>((item, phone))
    });

    let mut items = Vec::with_capacity(request.items.len());
    for result in join_all(lookups).await {
        let (item, phone) = result?;
        if phone.is_none() {
            tracing::warn!(
                "Order references unknown smartphone id {}",
                item.smartphone_id
            );
        }
        items.push(OrderItemSnapshot {
            smartphone: phone.as_ref().map(SmartphoneSnapshot::from),
            quantity: item.quantity,
        });
    }

    let order = sqlx::query_as::<_, Order>(
        "INSERT INTO orders (email, phone, name, message, items) \
         VALUES ($1, $2, $3, $4, $5) RETURNING *",
    )
    .bind(&request.email)
    .bind(&request.phone)
    .bind(&request.name)
    .bind(&request.message)
    .bind(Json(&items))
    .fetch_one(&state.pool)
    .await?;

    send_order_emails(state.mailer.as_ref(), &state.config.email, &order).await;

    Ok(order)
}

/// Order value from its snapshots; unresolved items contribute nothing.
pub fn order_total(items: &[OrderItemSnapshot]) -> f64 {
    items
        .iter()
        .filter_map(|item| {
            item.smartphone
                .as_ref()
                .map(|phone| phone.price * item.quantity as f64)
        })
        .sum()
}

/// Admin notification first, then customer confirmation. Each failure is
/// logged and otherwise ignored.
pub async fn send_order_emails(mailer: &dyn Mailer, config: &EmailConfig, order: &Order) {
    let email = OrderEmail::from_order(order);

    let admin = EmailMessage {
        from: config.notifications_from.clone(),
        to: vec![config.admin_email.clone()],
        subject: format!("New order #{}", order.id),
        html: templates::admin_notification(&email),
    };
    if let Err(err) = mailer.send(&admin).await {
        tracing::error!("Failed to send admin notification for order {}: {}", order.id, err);
    }

    let confirmation = EmailMessage {
        from: config.orders_from.clone(),
        to: vec![order.email.clone()],
        subject: format!("Your order #{} is confirmed", order.id),
        html: templates::order_confirmation(&email),
    };
    if let Err(err) = mailer.send(&confirmation).await {
        tracing::error!("Failed to send confirmation for order {}: {}", order.id, err);
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderListParams {
    pub checked: Option<String>,
    pub skip: Option<String>,
    pub take: Option<String>,
}

impl OrderListParams {
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
}

pub async fn list(state: &AppState, params: &OrderListParams) -> Result<ListPage<Order>, ApiError> {
    let mut predicate = Predicate::new();
    if let Some(checked) = params.checked.as_deref() {
        predicate.equals("checked", checked == "true");
    }

    let skip = params.skip();
    let sql = format!(
        "SELECT * FROM orders {} ORDER BY created_at DESC, id ASC LIMIT {} OFFSET {}",
        predicate.where_sql(),
        params.take(),
        skip
    );
    let items = bind_values(sqlx::query_as::<_, Order>(&sql), predicate.params())
        .fetch_all(&state.pool)
        .await?;

    let count_sql = format!(
        "SELECT COUNT(*) AS count FROM orders {}",
        predicate.where_sql()
    );
    let count_row = bind_values_query(sqlx::query(&count_sql), predicate.params())
        .fetch_one(&state.pool)
        .await?;
    let total: i64 = count_row.try_get("count")?;

    Ok(ListPage { items, total, skip })
}

pub async fn get(state: &AppState, id: i64) -> Result<Order, ApiError> {
    sqlx::query_as::<_, Order>("SELECT * FROM orders WHERE id = $1")
        .bind(id)
        .fetch_optional(&state.pool)
        .await?
        .ok_or_else(|| ApiError::not_found("Order not found"))
}

/// Admin follow-up fields only; item snapshots are immutable once placed.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateOrderRequest {
    pub email: Option<String>,
    pub phone: Option<String>,
    pub name: Option<String>,
    pub message: Option<String>,
    pub checked: Option<bool>,
}

pub async fn update(
    state: &AppState,
    id: i64,
    request: &UpdateOrderRequest,
) -> Result<Order, ApiError> {
    let existing = get(state, id).await?;

    let mut update = UpdateSet::new();
    if let Some(email) = &request.email {
        update.set("email", email.as_str());
    }
    if let Some(phone) = &request.phone {
        update.set("phone", phone.as_str());
    }
    if let Some(name) = &request.name {
        update.set("name", name.as_str());
    }
    if let Some(message) = &request.message {
        update.set("message", message.as_str());
    }
    if let Some(checked) = request.checked {
        update.set("checked", checked);
    }

    if update.is_empty() {
        return Ok(existing);
    }

    let (sql, params) = update.into_update_sql("orders", id);
    let order = bind_values(sqlx::query_as::<_, Order>(&sql), &params)
        .fetch_one(&state.pool)
        .await?;
    Ok(order)
}

pub async fn delete(state: &AppState, id: i64) -> Result<(), ApiError> {
    let result = sqlx::query("DELETE FROM orders WHERE id = $1")
        .bind(id)
        .execute(&state.pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(ApiError::not_found("Order not found"));
    }
    Ok(())
}
