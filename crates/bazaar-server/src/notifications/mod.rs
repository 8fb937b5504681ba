//! Seller notifications for new orders.
//!
//! Delivery is best-effort: [`dispatch_seller_notice`] runs the notifier on
//! its own task and only logs failures, so an order is never affected by
//! what happens here.

pub mod webhook;

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::storage::SellerNotice;

pub use webhook::WebhookNotifier;

/// Errors that can occur while notifying a seller.
#[derive(Debug, thiserror::Error)]
pub enum NotificationError {
    /// HTTP request to the mail endpoint failed.
    #[error("Notification request error: {0}")]
    Request(String),

    /// The mail endpoint returned a non-success status code.
    #[error("Notification API error (status {status}): {body}")]
    ApiError {
        /// HTTP status code returned by the endpoint.
        status: u16,
        /// Response body from the endpoint.
        body: String,
    },
}

/// Something that can tell a seller their product was ordered.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify_seller(
        &self,
        seller_email: &str,
        seller_name: &str,
        product_name: &str,
    ) -> Result<(), NotificationError>;
}

/// A plain-text mail message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MailMessage {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub body: String,
}

impl MailMessage {
    /// The "new order" mail sent to a seller.
    pub fn new_order(sender: &str, seller_email: &str, seller_name: &str, product_name: &str) -> Self {
        Self {
            from: sender.to_string(),
            to: seller_email.to_string(),
            subject: "New Order Received".to_string(),
            body: format!(
                "Hello {seller_name},\n\nYou have received a new order for {product_name}.\n"
            ),
        }
    }
}

/// Logs the mail it would have sent. Used while sending is suppressed.
#[derive(Debug, Clone)]
pub struct LogNotifier {
    sender: String,
}

impl LogNotifier {
    pub fn new(sender: impl Into<String>) -> Self {
        Self {
            sender: sender.into(),
        }
    }
}

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify_seller(
        &self,
        seller_email: &str,
        seller_name: &str,
        product_name: &str,
    ) -> Result<(), NotificationError> {
        let mail = MailMessage::new_order(&self.sender, seller_email, seller_name, product_name);
        info!(
            from = %mail.from,
            to = %mail.to,
            subject = %mail.subject,
            "Mail sending suppressed"
        );
        Ok(())
    }
}

/// Notify the seller on a background task. Failures are logged at warn level.
pub fn dispatch_seller_notice(notifier: Arc<dyn Notifier>, notice: SellerNotice) -> JoinHandle<()> {
    tokio::spawn(async move {
        if let Err(e) = notifier
            .notify_seller(&notice.seller_email, &notice.seller_name, &notice.product_name)
            .await
        {
            warn!(
                error = %e,
                seller_email = %notice.seller_email,
                "Seller notification failed"
            );
        }
    })
}
