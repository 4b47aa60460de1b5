//! `POST /api/lead` - free-skill download in exchange for an email.
//!
//! Storing the lead is best effort: an Airtable outage never blocks the
//! download.

use std::sync::{Arc, OnceLock};

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{header, HeaderMap};
use axum::Json;
use regex::Regex;
use serde::Serialize;
use serde_json::Value;
use tracing::{info, instrument, warn};

use crate::error::ApiError;
use crate::notify::mask_email;
use crate::provider::airtable::Lead;
use crate::state::AppState;

static EMAIL_RE: OnceLock<Regex> = OnceLock::new();

/// Loose `local@domain.tld` check
pub fn is_valid_email(email: &str) -> bool {
    EMAIL_RE
        .get_or_init(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid email regex"))
        .is_match(email)
}

/// First `Accept-Language` entry, `en` by default
fn request_locale(headers: &HeaderMap) -> String {
    headers
        .get(header::ACCEPT_LANGUAGE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .unwrap_or("en")
        .to_string()
}

/// Lead response body
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeadResponse {
    /// Always `true`
    pub success: bool,
    /// Signed download link for the free skill
    pub download_url: String,
}

/// Capture a lead and hand out the free skill
#[instrument(skip_all)]
pub async fn lead_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<LeadResponse>, ApiError> {
    let payload: Value = serde_json::from_slice(&body)
        .map_err(|_| ApiError::bad_request("Missing required fields"))?;

    let email = payload.get("email").and_then(Value::as_str).map(str::trim);
    let slug = payload.get("slug").and_then(Value::as_str).map(str::trim);
    let consent = payload.get("consent").and_then(Value::as_bool) == Some(true);

    let (Some(email), Some(slug)) = (email.filter(|e| !e.is_empty()), slug.filter(|s| !s.is_empty()))
    else {
        return Err(ApiError::bad_request("Missing required fields"));
    };
    if !consent {
        return Err(ApiError::bad_request("Missing required fields"));
    }
    if !is_valid_email(email) {
        return Err(ApiError::bad_request("Invalid email format"));
    }
    if !state.catalog().skill(slug).is_some_and(|skill| skill.is_free) {
        return Err(ApiError::bad_request("Invalid skill slug"));
    }

    let Some(entitlement) = state.resolver().entitle(state.whop_registry(), slug) else {
        warn!(slug, "Free skill has no archive");
        return Err(ApiError::not_found("Download not available"));
    };

    if let Some(airtable) = state.airtable() {
        let locale = request_locale(&headers);
        let lead = Lead {
            email,
            slug,
            locale: &locale,
        };
        if let Err(e) = airtable.save_lead(&lead).await {
            warn!(slug, recipient = %mask_email(email), error = %e, "Failed to store lead");
        }
    }

    info!(slug, recipient = %mask_email(email), "Lead captured");
    Ok(Json(LeadResponse {
        success: true,
        download_url: entitlement.download_url,
    }))
}
