//! Delivery of grant notices.
//!
//! Delivery is best effort: a failure is logged by the caller and never rolls
//! back a grant that has already been persisted.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use packet_types::models::{GrantOutcome, RewardKind};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::error::NotifyError;
use crate::template;

#[derive(Debug, Clone)]
pub struct PacketNotice {
    pub email: String,
    pub reward: RewardKind,
    pub is_ultra_rare: bool,
}

impl From<&GrantOutcome> for PacketNotice {
    fn from(outcome: &GrantOutcome) -> Self {
        Self {
            email: outcome.email.clone(),
            reward: outcome.reward.clone(),
            is_ultra_rare: outcome.is_ultra_rare,
        }
    }
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, notice: &PacketNotice) -> Result<(), NotifyError>;
}

/// Logs the notice instead of sending it. Used when no mail relay is configured.
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, notice: &PacketNotice) -> Result<(), NotifyError> {
        info!(
            email = %notice.email,
            reward = %notice.reward.name,
            ultra_rare = notice.is_ultra_rare,
            "Packet notice (mail relay disabled)"
        );
        Ok(())
    }
}

/// POSTs the rendered email as JSON to an HTTP mail relay.
pub struct WebhookNotifier {
    client: reqwest::Client,
    url: String,
    from: String,
    app_url: String,
}

impl WebhookNotifier {
    pub fn new(url: String, from: String, app_url: String, timeout: Duration) -> Result<Self, NotifyError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            url,
            from,
            app_url,
        })
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn notify(&self, notice: &PacketNotice) -> Result<(), NotifyError> {
        let message = template::render(notice, &self.from, &self.app_url);
        let resp = self.client.post(&self.url).json(&message).send().await?;

        if !resp.status().is_success() {
            return Err(NotifyError::Rejected(resp.status().as_u16()));
        }

        info!("Email sent to {}: {}", notice.email, notice.reward.name);
        Ok(())
    }
}

/// Fire-and-forget delivery. The returned handle may be dropped; failures are
/// logged inside the task.
pub fn dispatch(notifier: Arc<dyn Notifier>, notice: PacketNotice) -> JoinHandle<()> {
    tokio::spawn(async move {
        if let Err(e) = notifier.notify(&notice).await {
            warn!(email = %notice.email, "Email error: {}", e);
        }
    })
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::catalog::RewardCatalog;

    struct Counting(AtomicUsize);

    #[async_trait]
    impl Notifier for Counting {
        async fn notify(&self, _notice: &PacketNotice) -> Result<(), NotifyError> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Err(NotifyError::Rejected(503))
        }
    }

    fn notice() -> PacketNotice {
        PacketNotice {
            email: "a@x.com".into(),
            reward: RewardCatalog::standard().lookup(1).unwrap().clone(),
            is_ultra_rare: false,
        }
    }

    #[tokio::test]
    async fn dispatch_swallows_failures() {
        let notifier = Arc::new(Counting(AtomicUsize::new(0)));
        dispatch(notifier.clone(), notice()).await.unwrap();
        assert_eq!(notifier.0.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn log_notifier_succeeds() {
        assert!(LogNotifier.notify(&notice()).await.is_ok());
    }

    #[tokio::test]
    async fn webhook_reports_unreachable_relay() {
        // Port 9 (discard) on localhost is not expected to accept HTTP.
        let notifier = WebhookNotifier::new(
            "http://127.0.0.1:9/send".into(),
            "game@x.com".into(),
            "http://localhost".into(),
            Duration::from_secs(2),
        )
        .unwrap();
        let err = notifier.notify(&notice()).await.unwrap_err();
        assert!(matches!(err, NotifyError::Http(_)));
    }
}
