//! Download notifications
//!
//! After a webhook grants an entitlement, the purchaser is sent the signed
//! link. Delivery (email provider, templates) lives behind
//! [`DownloadNotifier`] so the webhook path can be tested without it.

use crate::entitlement::Entitlement;

/// Sends a download link to a purchaser
#[async_trait::async_trait]
pub trait DownloadNotifier: Send + Sync + 'static {
    /// Deliver `entitlement` to `email`
    async fn send_download(&self, email: &str, entitlement: &Entitlement) -> anyhow::Result<()>;
}

/// No-op notifier for testing
#[derive(Debug, Clone, Default)]
pub struct NoOpNotifier;

#[async_trait::async_trait]
impl DownloadNotifier for NoOpNotifier {
    async fn send_download(&self, _email: &str, _entitlement: &Entitlement) -> anyhow::Result<()> {
        Ok(())
    }
}

/// Logging notifier, the default when no mail transport is wired in
#[derive(Debug, Clone, Default)]
pub struct LoggingNotifier;

#[async_trait::async_trait]
impl DownloadNotifier for LoggingNotifier {
    async fn send_download(&self, email: &str, entitlement: &Entitlement) -> anyhow::Result<()> {
        tracing::info!(
            recipient = %mask_email(email),
            slug = %entitlement.slug,
            product = %entitlement.name,
            "Download link ready for delivery"
        );
        Ok(())
    }
}

/// `buyer@example.com` -> `b***@example.com`
pub fn mask_email(email: &str) -> String {
    match email.split_once('@') {
        Some((local, domain)) => {
            let first = local.chars().next().map(String::from).unwrap_or_default();
            format!("{first}***@{domain}")
        }
        None => "***".to_string(),
    }
}
