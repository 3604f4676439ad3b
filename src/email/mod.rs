//! Transactional email behind a trait seam.
//!
//! Order creation sends two messages (admin notification, customer
//! confirmation) through a [`Mailer`]. Failures are always swallowed and
//! logged by the caller; an order must never fail because email did.

pub mod templates;

use async_trait::async_trait;
use serde_json::json;
use thiserror::Error;

use crate::config::EmailConfig;
use crate::models::Order;

#[derive(Debug, Error)]
pub enum EmailError {
    #[error("Email API key not configured")]
    MissingApiKey,

    #[error("Email API request failed: {0}")]
    Transport(String),

    #[error("Email API returned {status}: {body}")]
    Api { status: u16, body: String },
}

#[derive(Debug, Clone)]
pub struct EmailMessage {
    pub from: String,
    pub to: Vec<String>,
    pub subject: String,
    pub html: String,
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, message: &EmailMessage) -> Result<(), EmailError>;
}

/// Client for a Resend-style transactional email HTTP API.
pub struct HttpMailer {
    client: reqwest::Client,
    api_url: String,
    api_key: String,
}

impl HttpMailer {
    pub fn new(config: &EmailConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_url: config.api_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
        }
    }
}

#[async_trait]
impl Mailer for HttpMailer {
    async fn send(&self, message: &EmailMessage) -> Result<(), EmailError> {
        if self.api_key.is_empty() {
            return Err(EmailError::MissingApiKey);
        }

        let response = self
            .client
            .post(format!("{}/emails", self.api_url))
            .bearer_auth(&self.api_key)
            .json(&json!({
                "from": message.from,
                "to": message.to,
                "subject": message.subject,
                "html": message.html,
            }))
            .send()
            .await
            .map_err(|e| EmailError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(EmailError::Api {
                status: status.as_u16(),
                body,
            });
        }

        Ok(())
    }
}

/// Data rendered into both order email templates.
#[derive(Debug, Clone)]
pub struct OrderEmail {
    pub order_id: i64,
    pub customer_name: String,
    pub customer_email: String,
    pub customer_phone: String,
    pub message: Option<String>,
    pub items: Vec<OrderEmailLine>,
    pub total: f64,
}

#[derive(Debug, Clone)]
pub struct OrderEmailLine {
    pub name: String,
    pub color: String,
    pub capacity: i64,
    pub unit_price: f64,
    pub quantity: i64,
}

impl OrderEmail {
    pub fn from_order(order: &Order) -> Self {
        let items: Vec<OrderEmailLine> = order
            .items
            .iter()
            .map(|item| match &item.smartphone {
                Some(phone) => OrderEmailLine {
                    name: phone.name.clone(),
                    color: phone.color.clone(),
                    capacity: phone.capacity,
                    unit_price: phone.price,
                    quantity: item.quantity,
                },
                None => OrderEmailLine {
                    name: "Unknown product".to_string(),
                    color: "-".to_string(),
                    capacity: 0,
                    unit_price: 0.0,
                    quantity: item.quantity,
                },
            })
            .collect();

        let total = items
            .iter()
            .map(|line| line.unit_price * line.quantity as f64)
            .sum();

        Self {
            order_id: order.id,
            customer_name: order.name.clone(),
            customer_email: order.email.clone(),
            customer_phone: order.phone.clone(),
            message: order.message.clone(),
            items,
            total,
        }
    }
}
