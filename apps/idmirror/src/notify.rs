//! Webhook notifications.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, instrument};

use idmirror_provisioning::{Notifier, NotifyError, TracingNotifier};

use crate::config::NotifyConfig;
use crate::error::{CliError, CliResult};

/// JSON body posted to the webhook.
#[derive(Debug, Serialize)]
pub struct WebhookPayload<'a> {
    pub subject: String,
    pub body: &'a str,
    pub sent_at: DateTime<Utc>,
}

/// Posts notifications to a webhook endpoint.
#[derive(Debug, Clone)]
pub struct WebhookNotifier {
    http_client: reqwest::Client,
    url: String,
    subject_prefix: String,
}

impl WebhookNotifier {
    /// Create a notifier posting to `url`.
    pub fn new(url: impl Into<String>, subject_prefix: impl Into<String>, timeout: Duration) -> CliResult<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| CliError::Config(format!("cannot build HTTP client: {e}")))?;
        Ok(Self {
            http_client,
            url: url.into(),
            subject_prefix: subject_prefix.into(),
        })
    }

    fn payload<'a>(&self, subject: &str, body: &'a str) -> WebhookPayload<'a> {
        WebhookPayload {
            subject: prefixed(&self.subject_prefix, subject),
            body,
            sent_at: Utc::now(),
        }
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    #[instrument(skip(self, body))]
    async fn send(&self, subject: &str, body: &str) -> Result<(), NotifyError> {
        let response = self
            .http_client
            .post(&self.url)
            .json(&self.payload(subject, body))
            .send()
            .await
            .map_err(|e| NotifyError::transport("webhook request failed", e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(NotifyError::Rejected {
                status: status.as_u16(),
            });
        }
        debug!(status = status.as_u16(), "Notification delivered");
        Ok(())
    }
}

/// Notifier selected by configuration.
#[derive(Debug)]
pub enum AppNotifier {
    Webhook(WebhookNotifier),
    Log(TracingNotifier),
}

impl AppNotifier {
    /// Webhook when a URL is configured, otherwise log-only.
    pub fn from_config(config: &NotifyConfig) -> CliResult<Self> {
        match &config.webhook_url {
            Some(url) => Ok(Self::Webhook(WebhookNotifier::new(
                url.clone(),
                config.subject_prefix.clone(),
                Duration::from_secs(config.timeout_secs),
            )?)),
            None => Ok(Self::Log(TracingNotifier)),
        }
    }
}

#[async_trait]
impl Notifier for AppNotifier {
    async fn send(&self, subject: &str, body: &str) -> Result<(), NotifyError> {
        match self {
            AppNotifier::Webhook(notifier) => notifier.send(subject, body).await,
            AppNotifier::Log(notifier) => notifier.send(subject, body).await,
        }
    }
}

fn prefixed(prefix: &str, subject: &str) -> String {
    if prefix.is_empty() {
        subject.to_string()
    } else {
        format!("{prefix} {subject}")
    }
}
