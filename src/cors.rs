//! CORS policy for the storefront API
//!
//! Browser calls come from the storefront itself. Webhooks are
//! server-to-server and never send an `Origin`.
//!
//! # Policy
//!
//! - **Allowed Origins**: the configured app origin, plus `localhost`,
//!   `127.0.0.1` and `[::1]` on any port
//! - **Allowed Methods**: GET, POST, OPTIONS (preflight)
//! - **Allowed Headers**: Content-Type, Accept-Language
//! - **Max Age**: 3600 seconds for preflight caching

use std::time::Duration;

use http::header::{HeaderName, HeaderValue, ACCEPT_LANGUAGE, CONTENT_TYPE};
use http::Method;
use tower_http::cors::{AllowOrigin, CorsLayer};
use url::Url;

/// Request headers browsers may send
pub const ALLOWED_HEADERS: [HeaderName; 2] = [CONTENT_TYPE, ACCEPT_LANGUAGE];

/// Methods browsers may use
pub const ALLOWED_METHODS: [Method; 3] = [Method::GET, Method::POST, Method::OPTIONS];

/// Preflight cache lifetime (1 hour)
pub const DEFAULT_MAX_AGE_SECS: u64 = 3600;

/// CORS layer for the storefront at `app_url`
pub fn cors_layer(app_url: &str) -> CorsLayer {
    let app_origin = origin_of(app_url);
    if app_origin.is_none() {
        tracing::warn!(app_url, "App URL has no usable origin; only localhost may call the API");
    }

    CorsLayer::new()
        .allow_origin(AllowOrigin::predicate(move |origin, _| {
            is_allowed_origin(origin, app_origin.as_deref())
        }))
        .allow_methods(ALLOWED_METHODS)
        .allow_headers(ALLOWED_HEADERS)
        .max_age(Duration::from_secs(DEFAULT_MAX_AGE_SECS))
}

/// `scheme://host[:port]` of a URL, lowercase
pub fn origin_of(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    match parsed.origin() {
        origin @ url::Origin::Tuple(..) => Some(origin.ascii_serialization()),
        url::Origin::Opaque(_) => None,
    }
}

/// Whether `origin` is the app origin or a loopback origin
pub fn is_allowed_origin(origin: &HeaderValue, app_origin: Option<&str>) -> bool {
    let Ok(origin) = origin.to_str() else {
        return false;
    };
    if app_origin.is_some_and(|app| origin.eq_ignore_ascii_case(app)) {
        return true;
    }
    is_localhost_origin(origin)
}

/// `http(s)://localhost`, `127.0.0.1` or `[::1]`, with any port
pub fn is_localhost_origin(origin: &str) -> bool {
    let Ok(url) = Url::parse(origin) else {
        return false;
    };
    if !matches!(url.scheme(), "http" | "https") {
        return false;
    }
    // An Origin header never carries a path, query or credentials
    if url.path() != "/" || url.query().is_some() || !url.username().is_empty() {
        return false;
    }
    match url.host() {
        Some(url::Host::Domain(host)) => host.eq_ignore_ascii_case("localhost"),
        Some(url::Host::Ipv4(ip)) => ip.is_loopback(),
        Some(url::Host::Ipv6(ip)) => ip.is_loopback(),
        None => false,
    }
}
