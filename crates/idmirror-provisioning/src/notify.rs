//! Operator notifications.
//!
//! Sent on fatal pre-flight failures, safety-gate aborts, and once per
//! category with failed records. Delivery failures are logged by the caller
//! and never abort a run.

use async_trait::async_trait;
use tracing::warn;

use crate::error::NotifyError;

/// Destination for operator notifications.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver one notification.
    async fn send(&self, subject: &str, body: &str) -> Result<(), NotifyError>;
}

/// Notifier that writes notifications to the log.
#[derive(Debug, Clone, Default)]
pub struct TracingNotifier;

#[async_trait]
impl Notifier for TracingNotifier {
    async fn send(&self, subject: &str, body: &str) -> Result<(), NotifyError> {
        warn!(subject, body, "Notification");
        Ok(())
    }
}

/// Deliver `subject`/`body`, logging delivery failures.
pub async fn notify_logged<N>(notifier: &N, subject: &str, body: &str)
where
    N: Notifier + ?Sized,
{
    if let Err(e) = notifier.send(subject, body).await {
        warn!(error = %e, subject, "Failed to deliver notification");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Rejecting;

    #[async_trait]
    impl Notifier for Rejecting {
        async fn send(&self, _subject: &str, _body: &str) -> Result<(), NotifyError> {
            Err(NotifyError::Rejected { status: 503 })
        }
    }

    #[tokio::test]
    async fn test_tracing_notifier_never_fails() {
        assert!(TracingNotifier.send("subject", "body").await.is_ok());
    }

    #[tokio::test]
    async fn test_delivery_failure_is_swallowed() {
        notify_logged(&Rejecting, "subject", "body").await;
    }
}
