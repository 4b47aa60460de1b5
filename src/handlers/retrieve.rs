//! `POST /api/retrieve` - self-service recovery of purchased downloads.
//!
//! `{ "email": "..." }` → `200 {"results": [{name, slug, downloadUrl}]}`.
//! An empty list means no purchases were found; a missing membership API
//! key is a 503, distinct from a bad email (400).

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::Json;
use serde::Serialize;
use serde_json::Value;
use tracing::{info, instrument, warn};

use crate::entitlement::Entitlement;
use crate::error::{ApiError, RetrievalError};
use crate::state::AppState;

/// Retrieval response body
#[derive(Debug, Serialize)]
pub struct RetrieveResponse {
    /// One entry per downloadable product, deduplicated by slug
    pub results: Vec<Entitlement>,
}

/// Look up every downloadable purchase for an email
#[instrument(skip_all)]
pub async fn retrieve_handler(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<RetrieveResponse>, ApiError> {
    let payload: Value =
        serde_json::from_slice(&body).map_err(|_| ApiError::bad_request("Valid email required."))?;

    let email = payload
        .get("email")
        .and_then(Value::as_str)
        .filter(|email| email.contains('@'))
        .ok_or_else(|| ApiError::bad_request("Valid email required."))?;

    let results = state
        .resolver()
        .retrieve(email, state.membership_source(), state.whop_registry())
        .await
        .map_err(|e| {
            match e {
                RetrievalError::ServiceUnavailable => {
                    warn!("Retrieval requested but WHOP_API_KEY is not configured");
                }
            }
            ApiError::from(e)
        })?;

    info!(results = results.len(), "Retrieval complete");
    Ok(Json(RetrieveResponse { results }))
}
