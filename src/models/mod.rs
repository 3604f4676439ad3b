use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Smartphone {
    pub id: i64,
    pub name: String,
    pub slug: String,
    pub color: String,
    pub capacity: i64,
    pub price: f64,
    /// Ordered list of stored asset URLs.
    pub gallery: Vec<String>,
    pub description: String,
    pub short_description: String,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct BlogPost {
    pub id: i64,
    pub title: String,
    pub slug: String,
    pub content: String,
    pub excerpt: String,
    pub featured_image: Option<String>,
    pub tags: Vec<String>,
    pub author: String,
    pub published: bool,
    /// Set on first publish, cleared on unpublish.
    pub published_at: Option<DateTime<Utc>>,
    pub view_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Point-in-time copy of the referenced smartphone, captured when the order
/// is placed. Later catalog changes never affect historical orders.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SmartphoneSnapshot {
    pub id: i64,
    pub name: String,
    pub slug: String,
    pub color: String,
    pub capacity: i64,
    pub price: f64,
}

impl From<&Smartphone> for SmartphoneSnapshot {
    fn from(phone: &Smartphone) -> Self {
        Self {
            id: phone.id,
            name: phone.name.clone(),
            slug: phone.slug.clone(),
            color: phone.color.clone(),
            capacity: phone.capacity,
            price: phone.price,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItemSnapshot {
    /// `None` when the referenced catalog entry did not exist at order time.
    pub smartphone: Option<SmartphoneSnapshot>,
    pub quantity: i64,
}

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: i64,
    pub email: String,
    pub phone: String,
    pub name: String,
    pub message: Option<String>,
    pub items: Json<Vec<OrderItemSnapshot>>,
    pub checked: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One page of a filtered listing. `total` counts every row matching the
/// predicate, ignoring pagination.
#[derive(Debug, Serialize)]
pub struct ListPage<T> {
    pub items: Vec<T>,
    pub total: i64,
    pub skip: i64,
}
