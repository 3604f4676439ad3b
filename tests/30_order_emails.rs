//! Order notification emails through a recording mailer.

use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use sqlx::types::Json;

use storefront_api::config::EmailConfig;
use storefront_api::email::{EmailError, EmailMessage, Mailer};
use storefront_api::models::{Order, OrderItemSnapshot, SmartphoneSnapshot};
use storefront_api::services::order_service::{order_total, send_order_emails};

#[derive(Default)]
struct RecordingMailer {
    sent: Mutex<Vec<EmailMessage>>,
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, message: &EmailMessage) -> Result<(), EmailError> {
        self.sent.lock().unwrap().push(message.clone());
        Ok(())
    }
}

struct FailingMailer;

#[async_trait]
impl Mailer for FailingMailer {
    async fn send(&self, _message: &EmailMessage) -> Result<(), EmailError> {
        Err(EmailError::Transport("connection refused".to_string()))
    }
}

fn email_config() -> EmailConfig {
    EmailConfig {
        api_url: "https://api.resend.test".to_string(),
        api_key: "key".to_string(),
        admin_email: "admin@store.example".to_string(),
        notifications_from: "Store <noreply@store.example>".to_string(),
        orders_from: "Store <orders@store.example>".to_string(),
    }
}

fn sample_order() -> Order {
    let now = Utc::now();
    Order {
        id: 7,
        email: "ada@example.com".to_string(),
        phone: "+123456789".to_string(),
        name: "Ada".to_string(),
        message: Some("Leave at the door".to_string()),
        items: Json(vec![
            OrderItemSnapshot {
                smartphone: Some(SmartphoneSnapshot {
                    id: 1,
                    name: "iPhone 15 Pro".to_string(),
                    slug: "iphone-15-pro".to_string(),
                    color: "Black".to_string(),
                    capacity: 256,
                    price: 999.0,
                }),
                quantity: 2,
            },
            OrderItemSnapshot {
                smartphone: None,
                quantity: 1,
            },
        ]),
        checked: false,
        created_at: now,
        updated_at: now,
    }
}

#[tokio::test]
async fn both_order_emails_are_sent() {
    let mailer = RecordingMailer::default();
    let config = email_config();
    let order = sample_order();

    send_order_emails(&mailer, &config, &order).await;

    let sent = mailer.sent.lock().unwrap();
    assert_eq!(sent.len(), 2);

    let admin = &sent[0];
    assert_eq!(admin.to, vec!["admin@store.example"]);
    assert_eq!(admin.from, "Store <noreply@store.example>");
    assert_eq!(admin.subject, "New order #7");
    assert!(admin.html.contains("iPhone 15 Pro"));
    assert!(admin.html.contains("ada@example.com"));
    assert!(admin.html.contains("Leave at the door"));

    let confirmation = &sent[1];
    assert_eq!(confirmation.to, vec!["ada@example.com"]);
    assert_eq!(confirmation.from, "Store <orders@store.example>");
    assert_eq!(confirmation.subject, "Your order #7 is confirmed");
    assert!(confirmation.html.contains("Thank you for your order, Ada!"));
}

#[tokio::test]
async fn unresolved_items_show_as_unknown_but_do_not_count() {
    let mailer = RecordingMailer::default();
    let order = sample_order();

    // total ignores the unresolved second item
    assert_eq!(order_total(&order.items), 1998.0);

    send_order_emails(&mailer, &email_config(), &order).await;
    let sent = mailer.sent.lock().unwrap();
    assert!(sent[0].html.contains("Unknown product"));
    assert!(sent[0].html.contains("Total: 1998.00"));
}

#[tokio::test]
async fn mailer_failures_do_not_propagate() {
    // both sends fail; the call must still return normally
    send_order_emails(&FailingMailer, &email_config(), &sample_order()).await;
}
