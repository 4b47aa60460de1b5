//! Signed, expiring download tokens.
//!
//! A token is the first 32 hex characters of
//! `HMAC-SHA256(secret, "{slug}:{exp}")`. It is never stored: the download
//! endpoint recomputes it from the `slug` and `exp` carried in the URL.
//!
//! # URL format
//!
//! ```text
//! /api/download/{token}?slug={slug}&exp={epoch_seconds}
//! ```
//!
//! # Security
//!
//! - Constant-time comparison of the presented and expected token
//! - Strict expiry (`now > exp` fails, no grace period)
//! - Slugs outside the [`DownloadableSet`] never verify
//! - Optional [`TokenDenyList`] consulted before anything else

use std::collections::HashSet;
use std::fmt;
use std::time::Duration;

use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use url::form_urlencoded;

use crate::registry::DownloadableSet;

type HmacSha256 = Hmac<Sha256>;

/// Token lifetime: 7 days
pub const TOKEN_TTL: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// Length of the truncated hex token
pub const TOKEN_HEX_LEN: usize = 32;

/// Development-only signing secret. Refused in production by `AppConfig`.
pub const FALLBACK_SECRET: &str = "dev-download-secret-change-me";

// =============================================================================
// Secret
// =============================================================================

/// The process-wide HMAC key for download tokens. Never printed.
#[derive(Clone)]
pub struct DownloadSecret {
    bytes: Vec<u8>,
    fallback: bool,
}

impl DownloadSecret {
    /// A configured secret
    pub fn new(secret: impl Into<String>) -> Self {
        let secret = secret.into();
        let fallback = secret == FALLBACK_SECRET;
        Self {
            bytes: secret.into_bytes(),
            fallback,
        }
    }

    /// The publicly known development secret
    pub fn fallback() -> Self {
        Self::new(FALLBACK_SECRET)
    }

    /// Whether this is the hard-coded development value
    pub fn is_fallback(&self) -> bool {
        self.fallback
    }

    fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}

impl fmt::Debug for DownloadSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DownloadSecret")
            .field("fallback", &self.fallback)
            .finish_non_exhaustive()
    }
}

// =============================================================================
// Deny list
// =============================================================================

/// Revoked tokens, keyed by hex SHA-256 of the token string.
#[derive(Debug, Clone, Default)]
pub struct TokenDenyList {
    hashes: HashSet<String>,
}

impl TokenDenyList {
    /// Build from hex SHA-256 digests
    pub fn from_hashes<I, S>(hashes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            hashes: hashes
                .into_iter()
                .map(|h| h.as_ref().trim().to_ascii_lowercase())
                .filter(|h| !h.is_empty())
                .collect(),
        }
    }

    /// Hex SHA-256 of a token, the key used by this list
    pub fn hash_token(token: &str) -> String {
        hex::encode(Sha256::digest(token.as_bytes()))
    }

    /// Whether the token has been revoked
    pub fn is_revoked(&self, token: &str) -> bool {
        !self.hashes.is_empty() && self.hashes.contains(&Self::hash_token(token))
    }

    pub fn len(&self) -> usize {
        self.hashes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hashes.is_empty()
    }
}

// =============================================================================
// Codec
// =============================================================================

/// A freshly issued token and the relative URL that carries it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedToken {
    /// 32 lowercase hex characters
    pub token: String,
    /// Expiry, Unix epoch seconds
    pub expiry: i64,
    /// `/api/download/{token}?slug=..&exp=..`
    pub url: String,
}

/// Issues and verifies download tokens. Pure apart from reading the clock.
#[derive(Debug, Clone)]
pub struct TokenCodec {
    secret: DownloadSecret,
    ttl: Duration,
    downloadable: DownloadableSet,
    deny_list: TokenDenyList,
}

impl TokenCodec {
    /// Create a codec with the standard 7-day TTL
    pub fn new(secret: DownloadSecret, downloadable: DownloadableSet) -> Self {
        Self {
            secret,
            ttl: TOKEN_TTL,
            downloadable,
            deny_list: TokenDenyList::default(),
        }
    }

    /// Attach a deny list
    pub fn with_deny_list(mut self, deny_list: TokenDenyList) -> Self {
        self.deny_list = deny_list;
        self
    }

    /// Token lifetime
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Whether the codec signs with the development fallback secret
    pub fn uses_fallback_secret(&self) -> bool {
        self.secret.is_fallback()
    }

    /// Issue a token for `slug` expiring one TTL from now
    pub fn issue(&self, slug: &str) -> IssuedToken {
        self.issue_at(slug, now_epoch())
    }

    /// Issue a token as if the current time were `now` (epoch seconds)
    pub fn issue_at(&self, slug: &str, now: i64) -> IssuedToken {
        let expiry = now.saturating_add(self.ttl.as_secs() as i64);
        let token = self.sign(slug, expiry);
        let url = download_path(&token, slug, expiry);
        IssuedToken { token, expiry, url }
    }

    /// Verify a presented token against the current time
    pub fn verify(&self, token: &str, slug: &str, expiry: i64) -> bool {
        self.verify_at(token, slug, expiry, now_epoch())
    }

    /// Verify a presented token as if the current time were `now`
    pub fn verify_at(&self, token: &str, slug: &str, expiry: i64, now: i64) -> bool {
        if self.deny_list.is_revoked(token) {
            return false;
        }
        if !self.downloadable.contains(slug) {
            return false;
        }
        if now > expiry {
            return false;
        }

        let expected = self.sign(slug, expiry);
        // Length differences fail immediately; equal lengths compare in constant time
        expected.as_bytes().ct_eq(token.as_bytes()).into()
    }

    /// Prefix a relative download URL with the public base URL
    pub fn absolute_url(base_url: &str, issued: &IssuedToken) -> String {
        format!("{}{}", base_url.trim_end_matches('/'), issued.url)
    }

    fn sign(&self, slug: &str, expiry: i64) -> String {
        let mut mac = <HmacSha256 as Mac>::new_from_slice(self.secret.as_bytes())
            .expect("HMAC can take key of any size");
        mac.update(slug.as_bytes());
        mac.update(b":");
        mac.update(expiry.to_string().as_bytes());

        let mut token = hex::encode(mac.finalize().into_bytes());
        token.truncate(TOKEN_HEX_LEN);
        token
    }
}

/// Relative download URL for a token
fn download_path(token: &str, slug: &str, expiry: i64) -> String {
    let slug: String = form_urlencoded::byte_serialize(slug.as_bytes()).collect();
    format!("/api/download/{token}?slug={slug}&exp={expiry}")
}

fn now_epoch() -> i64 {
    chrono::Utc::now().timestamp()
}
