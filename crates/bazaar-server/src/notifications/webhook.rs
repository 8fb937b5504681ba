//! HTTP mail relay client.
//!
//! Posts [`MailMessage`] JSON to a configured endpoint, e.g. a local mail
//! gateway that turns it into SMTP.

use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, warn};

use super::{MailMessage, NotificationError, Notifier};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Sends seller notifications to a JSON webhook.
#[derive(Debug)]
pub struct WebhookNotifier {
    http: reqwest::Client,
    url: String,
    sender: String,
}

impl WebhookNotifier {
    /// Build a notifier posting to `url`.
    ///
    /// Installs the `ring` crypto provider first, since the workspace builds
    /// reqwest with `rustls-no-provider`.
    pub fn new(url: impl Into<String>, sender: impl Into<String>) -> Result<Self, NotificationError> {
        // No-op if a provider is already installed.
        let _ = rustls::crypto::ring::default_provider().install_default();

        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| NotificationError::Request(e.to_string()))?;

        Ok(Self::with_client(http, url, sender))
    }

    /// Build a notifier around a pre-built HTTP client.
    pub fn with_client(
        http: reqwest::Client,
        url: impl Into<String>,
        sender: impl Into<String>,
    ) -> Self {
        Self {
            http,
            url: url.into(),
            sender: sender.into(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    async fn send(&self, mail: &MailMessage) -> Result<(), NotificationError> {
        let response = self
            .http
            .post(&self.url)
            .json(mail)
            .send()
            .await
            .map_err(|e| NotificationError::Request(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            debug!(to = %mail.to, "Notification mail sent");
            Ok(())
        } else {
            let status_code = status.as_u16();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<failed to read body>".to_string());
            warn!(status = status_code, body = %body, "Mail endpoint returned error");
            Err(NotificationError::ApiError {
                status: status_code,
                body,
            })
        }
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn notify_seller(
        &self,
        seller_email: &str,
        seller_name: &str,
        product_name: &str,
    ) -> Result<(), NotificationError> {
        let mail = MailMessage::new_order(&self.sender, seller_email, seller_name, product_name);
        self.send(&mail).await
    }
}
