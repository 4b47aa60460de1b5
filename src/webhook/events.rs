//! Webhook event normalization
//!
//! Providers name events differently (`type`, `event`, `action`,
//! `meta.event_name`) and disagree on separators (`payment_succeeded` vs
//! `payment.succeeded`). Names are normalized to lowercase with `.`
//! separators before matching.
//!
//! Plan id, email and slug hint are pulled from the payload by trying an
//! ordered list of JSON pointers per field; the first present value wins.

use serde_json::Value;

use crate::entitlement::first_string;
use crate::error::WebhookError;

/// Event name locations, tried in order
const EVENT_NAME: &[&str] = &["/type", "/event", "/action", "/meta/event_name"];

/// Payment provider that sent an event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    /// Whop (Standard Webhooks)
    Whop,
    /// Lemon Squeezy (raw-body HMAC)
    LemonSqueezy,
}

impl Provider {
    /// Name used in logs
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Whop => "whop",
            Self::LemonSqueezy => "lemon-squeezy",
        }
    }

    fn plan_strategies(&self) -> &'static [&'static str] {
        match self {
            Self::Whop => &["/data/plan_id", "/data/plan/id", "/data/plan"],
            Self::LemonSqueezy => &[
                "/data/attributes/variant_id",
                "/data/attributes/first_order_item/variant_id",
            ],
        }
    }

    fn email_strategies(&self) -> &'static [&'static str] {
        match self {
            Self::Whop => &["/data/email", "/data/user/email"],
            Self::LemonSqueezy => &["/data/attributes/user_email", "/data/email"],
        }
    }
}

/// Event kinds that carry an entitlement
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventKind {
    /// `payment.succeeded`
    PaymentSucceeded,
    /// `membership.went_valid`
    MembershipActivated,
    /// `order_created`
    OrderCreated,
    /// Anything else, kept normalized for logging
    Other(String),
}

impl EventKind {
    /// Classify a raw event name
    pub fn parse(raw: &str) -> Self {
        let normalized = normalize_event_name(raw);
        match normalized.as_str() {
            "payment.succeeded" => Self::PaymentSucceeded,
            "membership.went.valid" => Self::MembershipActivated,
            "order.created" => Self::OrderCreated,
            _ => Self::Other(normalized),
        }
    }

    /// Canonical name
    pub fn as_str(&self) -> &str {
        match self {
            Self::PaymentSucceeded => "payment.succeeded",
            Self::MembershipActivated => "membership.went.valid",
            Self::OrderCreated => "order.created",
            Self::Other(name) => name,
        }
    }

    /// Whether `provider` grants entitlements on this kind
    pub fn grants_entitlement(&self, provider: Provider) -> bool {
        match provider {
            Provider::Whop => matches!(self, Self::PaymentSucceeded | Self::MembershipActivated),
            Provider::LemonSqueezy => matches!(self, Self::OrderCreated),
        }
    }
}

/// Lowercase, `_` becomes `.`
pub fn normalize_event_name(raw: &str) -> String {
    raw.trim().to_lowercase().replace('_', ".")
}

/// A parsed, provider-tagged webhook payload
#[derive(Debug, Clone)]
pub struct WebhookEvent {
    /// Sender
    pub provider: Provider,
    /// Normalized kind
    pub kind: EventKind,
    /// Raw JSON payload
    pub payload: Value,
}

impl WebhookEvent {
    /// Parse a verified raw body
    pub fn from_bytes(provider: Provider, body: &[u8]) -> Result<Self, WebhookError> {
        let payload: Value = serde_json::from_slice(body)
            .map_err(|e| WebhookError::InvalidPayload(e.to_string()))?;
        if !payload.is_object() {
            return Err(WebhookError::InvalidPayload("expected a JSON object".to_string()));
        }
        let kind = EventKind::parse(&first_string(&payload, EVENT_NAME).unwrap_or_default());
        Ok(Self {
            provider,
            kind,
            payload,
        })
    }

    /// Extract the fields needed to resolve an entitlement
    pub fn subject(&self) -> EventSubject {
        EventSubject {
            plan_id: first_string(&self.payload, self.provider.plan_strategies()),
            email: first_string(&self.payload, self.provider.email_strategies()),
            slug_hint: first_string(&self.payload, &["/meta/custom_data/slug"]),
        }
    }
}

/// Fields extracted from an event payload
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventSubject {
    /// Plan (Whop) or variant (Lemon Squeezy) id
    pub plan_id: Option<String>,
    /// Purchaser email
    pub email: Option<String>,
    /// Checkout custom data slug (Lemon Squeezy)
    pub slug_hint: Option<String>,
}
