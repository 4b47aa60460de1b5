//! Liveness and readiness probes.
//!
//! - `/health` - Simple health check for load balancers
//! - `/ready` - Which integrations are configured
//!
//! # Example Response
//!
//! ```json
//! {
//!   "status": "ready",
//!   "name": "skillwire-web",
//!   "version": "0.1.0",
//!   "uptime_seconds": 3600,
//!   "download_secret": "configured",
//!   "integrations": {
//!     "whop_api": true,
//!     "whop_webhook": true,
//!     "lemon_squeezy_checkout": false,
//!     "lemon_squeezy_webhook": false,
//!     "airtable": true
//!   },
//!   "timestamp": "2026-01-01T12:00:00+00:00"
//! }
//! ```

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::state::AppState;

/// Server version from Cargo.toml
pub const SERVER_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Server name from Cargo.toml
pub const SERVER_NAME: &str = env!("CARGO_PKG_NAME");

// ============================================================================
// Response Types
// ============================================================================

/// Health check response for liveness probes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Health status (always "healthy" if responding)
    pub status: String,
}

impl Default for HealthResponse {
    fn default() -> Self {
        Self {
            status: "healthy".to_string(),
        }
    }
}

/// Configured third-party integrations
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Integrations {
    /// Membership lookups (retrieval)
    pub whop_api: bool,
    /// Whop webhook secret loaded
    pub whop_webhook: bool,
    /// Lemon Squeezy checkout sessions
    pub lemon_squeezy_checkout: bool,
    /// Lemon Squeezy webhook secret loaded
    pub lemon_squeezy_webhook: bool,
    /// Leads and reviews
    pub airtable: bool,
}

/// Readiness response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadinessResponse {
    /// Always "ready" if responding
    pub status: String,
    /// Server name
    pub name: String,
    /// Server version
    pub version: String,
    /// Seconds since startup
    pub uptime_seconds: u64,
    /// "configured" or "fallback"
    pub download_secret: String,
    /// Integration flags
    pub integrations: Integrations,
    /// RFC 3339 timestamp
    pub timestamp: String,
}

// ============================================================================
// HTTP Handlers
// ============================================================================

/// `GET /health`
///
/// Returns `200 {"status": "healthy"}` whenever the process is serving.
#[instrument(skip_all)]
pub async fn health_handler() -> impl IntoResponse {
    debug!("Health check requested");
    (StatusCode::OK, Json(HealthResponse::default()))
}

/// `GET /ready`
///
/// Reports configured integrations. Missing integrations do not make the
/// service unready; the affected endpoints answer 503 on their own.
#[instrument(skip_all)]
pub async fn readiness_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    debug!("Readiness check requested");

    let config = state.config();
    let response = ReadinessResponse {
        status: "ready".to_string(),
        name: SERVER_NAME.to_string(),
        version: SERVER_VERSION.to_string(),
        uptime_seconds: state.uptime_seconds(),
        download_secret: if state.codec().uses_fallback_secret() {
            "fallback".to_string()
        } else {
            "configured".to_string()
        },
        integrations: Integrations {
            whop_api: state.membership_source().is_some(),
            whop_webhook: state.whop_verifier().is_configured(),
            lemon_squeezy_checkout: config.lemon_squeezy.checkout_configured(),
            lemon_squeezy_webhook: state.lemon_squeezy_verifier().is_configured(),
            airtable: state.airtable().is_some(),
        },
        timestamp: chrono::Utc::now().to_rfc3339(),
    };

    (StatusCode::OK, Json(response))
}

// ============================================================================
// Router Setup
// ============================================================================

/// Router with `/health` and `/ready`
pub fn status_router() -> axum::Router<Arc<AppState>> {
    use axum::routing::get;

    axum::Router::new()
        .route("/health", get(health_handler))
        .route("/ready", get(readiness_handler))
}
