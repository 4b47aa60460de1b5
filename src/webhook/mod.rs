//! Payment webhook ingestion
//!
//! Each provider gets its own receiver, verifier and registry:
//!
//! ```text
//! POST /api/webhook/whop          POST /api/webhook/lemon-squeezy
//!        |                                 |
//!        v                                 v
//! StandardWebhookVerifier           HmacBodyVerifier
//!        |                                 |
//!        +---------> WebhookEvent <--------+
//!                  (normalized kind)
//!                         |
//!                         v
//!               EntitlementDispatcher
//!                         |
//!                         v
//!                 DownloadNotifier
//! ```
//!
//! Signature failures never reach the parser. Every structurally valid
//! payload is acknowledged with `200 {"received": true}`, whether or not
//! an entitlement was granted, so providers do not retry.

pub mod events;
pub mod processor;
pub mod signature;

pub use events::{EventKind, EventSubject, Provider, WebhookEvent};
pub use processor::{DispatchOutcome, EntitlementDispatcher};
pub use signature::{HmacBodyVerifier, SignatureVerifier, StandardWebhookVerifier};
