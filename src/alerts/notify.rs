//! Outbound notification channel for triggered alerts.

use async_trait::async_trait;
use serde::Serialize;
use tracing::info;

use crate::error::{AppError, Result};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub title: String,
    pub body: String,
}

#[async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver one notification to a user's registered contact address.
    async fn dispatch(&self, to: &str, notification: &Notification) -> Result<()>;
}

/// Posts `{to, title, body}` as JSON to a configured webhook.
pub struct WebhookNotifier {
    client: reqwest::Client,
    url: String,
}

impl WebhookNotifier {
    pub fn new(url: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            url,
        }
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn dispatch(&self, to: &str, notification: &Notification) -> Result<()> {
        let payload = serde_json::json!({
            "to": to,
            "title": notification.title,
            "body": notification.body,
        });
        let response = self.client.post(&self.url).json(&payload).send().await?;
        if !response.status().is_success() {
            return Err(AppError::NotificationDispatch(format!(
                "webhook returned {}",
                response.status()
            )));
        }
        Ok(())
    }
}

/// Fallback channel when no webhook is configured: the notification only
/// lands in the logs.
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn dispatch(&self, to: &str, notification: &Notification) -> Result<()> {
        info!(to, title = %notification.title, body = %notification.body, "alert notification");
        Ok(())
    }
}
