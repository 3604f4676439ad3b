//! HTML bodies for the two order emails.

use crate::email::OrderEmail;

/// Email sent to the store admin when a new order arrives.
pub fn admin_notification(order: &OrderEmail) -> String {
    let mut rows = String::new();
    for line in &order.items {
        rows.push_str(&format!(
            "<tr>\
             <td style=\"padding:8px;border-bottom:1px solid #eee;\">{}</td>\
             <td style=\"padding:8px;border-bottom:1px solid #eee;\">{}</td>\
             <td style=\"padding:8px;border-bottom:1px solid #eee;\">{} GB</td>\
             <td style=\"padding:8px;border-bottom:1px solid #eee;\">{}</td>\
             <td style=\"padding:8px;border-bottom:1px solid #eee;\">{:.2}</td>\
             </tr>",
            escape_html(&line.name),
            escape_html(&line.color),
            line.capacity,
            line.quantity,
            line.unit_price * line.quantity as f64,
        ));
    }

    let message_block = match &order.message {
        Some(message) if !message.is_empty() => format!(
            "<p><strong>Message:</strong> {}</p>",
            escape_html(message)
        ),
        _ => String::new(),
    };

    format!(
        "<div style=\"font-family:Arial,sans-serif;max-width:600px;margin:0 auto;\">\
         <h2>New order #{id}</h2>\
         <p><strong>Customer:</strong> {name}</p>\
         <p><strong>Email:</strong> {email}</p>\
         <p><strong>Phone:</strong> {phone}</p>\
         {message_block}\
         <table style=\"width:100%;border-collapse:collapse;\">\
         <thead><tr>\
         <th style=\"text-align:left;padding:8px;\">Model</th>\
         <th style=\"text-align:left;padding:8px;\">Color</th>\
         <th style=\"text-align:left;padding:8px;\">Capacity</th>\
         <th style=\"text-align:left;padding:8px;\">Qty</th>\
         <th style=\"text-align:left;padding:8px;\">Subtotal</th>\
         </tr></thead>\
         <tbody>{rows}</tbody>\
         </table>\
         <p style=\"font-size:18px;\"><strong>Total: {total:.2}</strong></p>\
         </div>",
        id = order.order_id,
        name = escape_html(&order.customer_name),
        email = escape_html(&order.customer_email),
        phone = escape_html(&order.customer_phone),
        message_block = message_block,
        rows = rows,
        total = order.total,
    )
}

/// Confirmation sent to the customer.
pub fn order_confirmation(order: &OrderEmail) -> String {
    let mut rows = String::new();
    for line in &order.items {
        rows.push_str(&format!(
            "<li>{} ({}, {} GB) &times; {} &mdash; {:.2}</li>",
            escape_html(&line.name),
            escape_html(&line.color),
            line.capacity,
            line.quantity,
            line.unit_price * line.quantity as f64,
        ));
    }

    format!(
        "<div style=\"font-family:Arial,sans-serif;max-width:600px;margin:0 auto;\">\
         <h2>Thank you for your order, {name}!</h2>\
         <p>We received your order <strong>#{id}</strong> and will contact you shortly \
         at {phone} to confirm the details.</p>\
         <ul>{rows}</ul>\
         <p style=\"font-size:18px;\"><strong>Total: {total:.2}</strong></p>\
         <p>If anything looks wrong, just reply to this email.</p>\
         </div>",
        name = escape_html(&order.customer_name),
        id = order.order_id,
        phone = escape_html(&order.customer_phone),
        rows = rows,
        total = order.total,
    )
}

fn escape_html(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
