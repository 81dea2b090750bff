//! Outbound notifications. Callers treat every send as best effort: a
//! failure here is logged and never undoes the write that triggered it.

use std::time::Duration;

use reqwest::Client;
use serde::Serialize;
use thiserror::Error;

use crate::models::ContactMessage;

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("webhook request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("webhook responded with status {0}")]
    Status(reqwest::StatusCode),
}

#[derive(Debug, Serialize)]
struct ContactPayload<'a> {
    event: &'static str,
    text: String,
    name: Option<&'a str>,
    email: &'a str,
    subject: Option<&'a str>,
    message: &'a str,
}

/// Posts JSON events to a webhook. Without a configured URL every send is
/// a no-op.
#[derive(Clone, Debug)]
pub struct Notifier {
    client: Client,
    webhook_url: Option<String>,
}

impl Notifier {
    pub fn new(webhook_url: Option<String>) -> Result<Self, NotifyError> {
        let client = Client::builder().timeout(Duration::from_secs(5)).build()?;
        Ok(Self {
            client,
            webhook_url,
        })
    }

    pub fn is_enabled(&self) -> bool {
        self.webhook_url.is_some()
    }

    pub async fn contact_received(&self, message: &ContactMessage) -> Result<(), NotifyError> {
        let Some(url) = self.webhook_url.as_deref() else {
            tracing::debug!(message_id = %message.id, "no webhook configured, skipping notification");
            return Ok(());
        };

        let subject = message.subject.as_deref().filter(|s| !s.is_empty());
        let text = match subject {
            Some(subject) => format!("Contact: {subject}"),
            None => "New contact form message".to_string(),
        };
        let payload = ContactPayload {
            event: "contact_message",
            text,
            name: message.name.as_deref(),
            email: &message.email,
            subject,
            message: &message.message,
        };

        let response = self.client.post(url).json(&payload).send().await?;
        if !response.status().is_success() {
            return Err(NotifyError::Status(response.status()));
        }
        tracing::debug!(message_id = %message.id, "contact notification delivered");
        Ok(())
    }
}
