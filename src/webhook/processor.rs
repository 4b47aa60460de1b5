//! Webhook event dispatch
//!
//! Runs once a delivery has been authenticated and parsed:
//!
//! ```text
//! WebhookEvent
//!       |
//!       v
//! [Entitlement-bearing kind?] --no--> Ignored (still acknowledged)
//!       |
//!       v
//! [Plan -> slug -> downloadable?] --no--> Unmapped
//!       |
//!       v
//! [Purchaser email present?] --no--> MissingEmail
//!       |
//!       v
//! [Issue token, notify with timeout] --> Delivered | NotifyFailed
//! ```
//!
//! Processing is inline. There is no dedup store: a redelivered event
//! issues a fresh link and notifies again.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::timeout;

use crate::entitlement::{Entitlement, EntitlementResolver};
use crate::notify::{mask_email, DownloadNotifier};
use crate::registry::ProductRegistry;
use crate::webhook::events::{Provider, WebhookEvent};

/// What happened to an authenticated event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Event kind carries no entitlement
    Ignored,
    /// No downloadable product for the event's plan
    Unmapped,
    /// Product resolved but the payload has no purchaser email
    MissingEmail,
    /// Link issued and handed to the notifier
    Delivered(Entitlement),
    /// Link issued but the notifier failed or timed out
    NotifyFailed(Entitlement),
}

impl DispatchOutcome {
    /// Short name for logs; never includes the signed link
    pub fn label(&self) -> &'static str {
        match self {
            Self::Ignored => "ignored",
            Self::Unmapped => "unmapped",
            Self::MissingEmail => "missing_email",
            Self::Delivered(_) => "delivered",
            Self::NotifyFailed(_) => "notify_failed",
        }
    }
}

/// Maps authenticated webhook events to download notifications
#[derive(Clone)]
pub struct EntitlementDispatcher {
    resolver: Arc<EntitlementResolver>,
    notifier: Arc<dyn DownloadNotifier>,
    notify_timeout: Duration,
}

impl EntitlementDispatcher {
    /// Create a dispatcher
    pub fn new(
        resolver: Arc<EntitlementResolver>,
        notifier: Arc<dyn DownloadNotifier>,
        notify_timeout: Duration,
    ) -> Self {
        Self {
            resolver,
            notifier,
            notify_timeout,
        }
    }

    /// Process one event against the sending provider's registry
    pub async fn dispatch(&self, registry: &ProductRegistry, event: &WebhookEvent) -> DispatchOutcome {
        let provider = event.provider.as_str();

        if !event.kind.grants_entitlement(event.provider) {
            tracing::debug!(provider, event = %event.kind.as_str(), "Ignoring event");
            return DispatchOutcome::Ignored;
        }

        let subject = event.subject();
        let plan_id = subject.plan_id.as_deref().unwrap_or_default();

        let mut entitlement = self.resolver.resolve_plan(registry, plan_id);

        // Lemon Squeezy checkouts carry the slug in custom data; only trust it
        // for slugs that are actually sold through Lemon Squeezy.
        if entitlement.is_none() && event.provider == Provider::LemonSqueezy {
            if let Some(hint) = subject.slug_hint.as_deref() {
                if registry.plan_id_for(hint).is_some() {
                    entitlement = self.resolver.entitle(registry, hint);
                }
            }
        }

        let Some(entitlement) = entitlement else {
            tracing::info!(
                provider,
                event = %event.kind.as_str(),
                plan_id,
                "No downloadable product for event"
            );
            return DispatchOutcome::Unmapped;
        };

        let Some(email) = subject.email.as_deref() else {
            tracing::warn!(
                provider,
                event = %event.kind.as_str(),
                plan_id,
                slug = %entitlement.slug,
                "Event has no purchaser email, skipping notification"
            );
            return DispatchOutcome::MissingEmail;
        };

        tracing::info!(
            provider,
            event = %event.kind.as_str(),
            plan_id,
            slug = %entitlement.slug,
            recipient = %mask_email(email),
            "Entitlement granted"
        );

        match timeout(
            self.notify_timeout,
            self.notifier.send_download(email, &entitlement),
        )
        .await
        {
            Ok(Ok(())) => DispatchOutcome::Delivered(entitlement),
            Ok(Err(e)) => {
                tracing::error!(
                    provider,
                    slug = %entitlement.slug,
                    error = %e,
                    "Download notification failed"
                );
                DispatchOutcome::NotifyFailed(entitlement)
            }
            Err(_) => {
                tracing::error!(
                    provider,
                    slug = %entitlement.slug,
                    timeout_ms = self.notify_timeout.as_millis() as u64,
                    "Download notification timed out"
                );
                DispatchOutcome::NotifyFailed(entitlement)
            }
        }
    }
}

impl std::fmt::Debug for EntitlementDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntitlementDispatcher")
            .field("notify_timeout", &self.notify_timeout)
            .finish_non_exhaustive()
    }
}
