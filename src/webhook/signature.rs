//! Webhook signature verification
//!
//! Two schemes are supported:
//!
//! - [`StandardWebhookVerifier`]: the Standard Webhooks pattern. Signs
//!   `"{webhook-id}.{webhook-timestamp}.{raw_body}"` with HMAC-SHA256 and
//!   sends one or more `v1,<base64>` candidates in `webhook-signature`.
//! - [`HmacBodyVerifier`]: HMAC-SHA256 over the raw body, hex encoded, in a
//!   single header.
//!
//! Both compare digests in constant time and fail closed when no secret is
//! configured. Standard Webhooks deliveries are also refused when the signed
//! timestamp is more than [`TIMESTAMP_TOLERANCE_SECS`] from the local clock,
//! which bounds how long a captured delivery can be replayed.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use hmac::{Hmac, Mac};
use http::HeaderMap;
use sha2::Sha256;
use subtle::ConstantTimeEq;

use crate::error::WebhookError;

type HmacSha256 = Hmac<Sha256>;

/// Standard Webhooks message id header
pub const WEBHOOK_ID_HEADER: &str = "webhook-id";
/// Standard Webhooks timestamp header
pub const WEBHOOK_TIMESTAMP_HEADER: &str = "webhook-timestamp";
/// Standard Webhooks signature header
pub const WEBHOOK_SIGNATURE_HEADER: &str = "webhook-signature";
/// Raw-body HMAC signature header
pub const BODY_SIGNATURE_HEADER: &str = "x-signature";

/// Largest accepted distance between `webhook-timestamp` and now, either way
pub const TIMESTAMP_TOLERANCE_SECS: i64 = 5 * 60;

/// Authenticates a raw webhook request
pub trait SignatureVerifier: Send + Sync {
    /// Check `body` against the signature carried in `headers`
    fn verify(&self, headers: &HeaderMap, body: &[u8]) -> Result<(), WebhookError>;
}

fn header<'a>(headers: &'a HeaderMap, name: &str) -> &'a str {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
}

fn hmac_sha256(key: &[u8], parts: &[&[u8]]) -> Vec<u8> {
    let mut mac =
        <HmacSha256 as Mac>::new_from_slice(key).expect("HMAC can take key of any size");
    for part in parts {
        mac.update(part);
    }
    mac.finalize().into_bytes().to_vec()
}

// =============================================================================
// Standard Webhooks
// =============================================================================

/// Verifier for Standard Webhooks signed requests
#[derive(Clone)]
pub struct StandardWebhookVerifier {
    key: Option<Vec<u8>>,
}

impl StandardWebhookVerifier {
    /// Build from a provider secret.
    ///
    /// `whsec_` prefix: base64. `ws_` prefix: hex. Otherwise bare base64.
    /// A missing or undecodable secret rejects every request.
    pub fn new(secret: Option<&str>) -> Self {
        let key = secret.and_then(|secret| {
            let decoded = if let Some(rest) = secret.strip_prefix("whsec_") {
                BASE64.decode(rest).ok()
            } else if let Some(rest) = secret.strip_prefix("ws_") {
                hex::decode(rest).ok()
            } else {
                BASE64.decode(secret).ok()
            };
            if decoded.is_none() {
                tracing::error!("Webhook secret could not be decoded; all deliveries will be rejected");
            }
            decoded.filter(|key| !key.is_empty())
        });
        Self { key }
    }

    /// Whether a usable secret is loaded
    pub fn is_configured(&self) -> bool {
        self.key.is_some()
    }

    /// Base64 signature for a message, as the sender computes it
    pub fn sign(&self, msg_id: &str, timestamp: &str, body: &[u8]) -> Option<String> {
        let key = self.key.as_ref()?;
        let digest = hmac_sha256(key, &[msg_id.as_bytes(), b".", timestamp.as_bytes(), b".", body]);
        Some(BASE64.encode(digest))
    }

    /// Verify explicit header values against the current time
    pub fn verify_parts(
        &self,
        msg_id: &str,
        timestamp: &str,
        signature: &str,
        body: &[u8],
    ) -> Result<(), WebhookError> {
        self.verify_parts_at(msg_id, timestamp, signature, body, chrono::Utc::now().timestamp())
    }

    /// Verify explicit header values as if the current time were `now`
    pub fn verify_parts_at(
        &self,
        msg_id: &str,
        timestamp: &str,
        signature: &str,
        body: &[u8],
        now: i64,
    ) -> Result<(), WebhookError> {
        let key = self.key.as_ref().ok_or(WebhookError::InvalidSignature)?;

        let sent_at: i64 = timestamp
            .trim()
            .parse()
            .map_err(|_| WebhookError::StaleTimestamp)?;
        if now.abs_diff(sent_at) > TIMESTAMP_TOLERANCE_SECS.unsigned_abs() {
            return Err(WebhookError::StaleTimestamp);
        }

        let expected =
            hmac_sha256(key, &[msg_id.as_bytes(), b".", timestamp.as_bytes(), b".", body]);

        let matched = signature
            .split_whitespace()
            .filter_map(|candidate| {
                // Strip the version prefix: "v1,<sig>"
                let sig = match candidate.split_once(',') {
                    Some((version, sig)) if version.starts_with('v') => sig,
                    _ => candidate,
                };
                BASE64.decode(sig).ok()
            })
            .any(|candidate| bool::from(candidate.ct_eq(&expected)));

        if matched {
            Ok(())
        } else {
            Err(WebhookError::InvalidSignature)
        }
    }
}

impl SignatureVerifier for StandardWebhookVerifier {
    fn verify(&self, headers: &HeaderMap, body: &[u8]) -> Result<(), WebhookError> {
        self.verify_parts(
            header(headers, WEBHOOK_ID_HEADER),
            header(headers, WEBHOOK_TIMESTAMP_HEADER),
            header(headers, WEBHOOK_SIGNATURE_HEADER),
            body,
        )
    }
}

impl std::fmt::Debug for StandardWebhookVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StandardWebhookVerifier")
            .field("configured", &self.is_configured())
            .finish()
    }
}

// =============================================================================
// Raw-body HMAC
// =============================================================================

/// Verifier for a hex HMAC-SHA256 of the raw body
#[derive(Clone)]
pub struct HmacBodyVerifier {
    secret: Option<Vec<u8>>,
    header: &'static str,
}

impl HmacBodyVerifier {
    /// Build from a secret, read from the `x-signature` header
    pub fn new(secret: Option<&str>) -> Self {
        Self {
            secret: secret
                .filter(|s| !s.is_empty())
                .map(|s| s.as_bytes().to_vec()),
            header: BODY_SIGNATURE_HEADER,
        }
    }

    /// Whether a secret is loaded
    pub fn is_configured(&self) -> bool {
        self.secret.is_some()
    }

    /// Hex signature for a body
    pub fn sign(&self, body: &[u8]) -> Option<String> {
        self.secret
            .as_ref()
            .map(|secret| hex::encode(hmac_sha256(secret, &[body])))
    }

    /// Verify an explicit signature value
    pub fn verify_signature(&self, signature: &str, body: &[u8]) -> Result<(), WebhookError> {
        let secret = self.secret.as_ref().ok_or(WebhookError::InvalidSignature)?;
        let expected = hex::encode(hmac_sha256(secret, &[body]));

        if bool::from(expected.as_bytes().ct_eq(signature.trim().as_bytes())) {
            Ok(())
        } else {
            Err(WebhookError::InvalidSignature)
        }
    }
}

impl SignatureVerifier for HmacBodyVerifier {
    fn verify(&self, headers: &HeaderMap, body: &[u8]) -> Result<(), WebhookError> {
        self.verify_signature(header(headers, self.header), body)
    }
}

impl std::fmt::Debug for HmacBodyVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HmacBodyVerifier")
            .field("configured", &self.is_configured())
            .field("header", &self.header)
            .finish()
    }
}
