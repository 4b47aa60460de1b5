//! Webhook receivers
//!
//! - `POST /api/webhook/whop` (Standard Webhooks headers)
//! - `POST /api/webhook/lemon-squeezy` (`x-signature`)
//!
//! `401` on a bad signature, `400` on an unparseable body, otherwise
//! `200 {"received": true}` regardless of whether anything was granted.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use serde_json::{json, Value};
use tracing::{debug, info, instrument, warn};

use crate::error::ApiError;
use crate::registry::ProductRegistry;
use crate::state::AppState;
use crate::webhook::{Provider, SignatureVerifier, WebhookEvent};

/// Whop deliveries
#[instrument(skip_all)]
pub async fn whop_webhook_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Value>, ApiError> {
    receive(
        &state,
        Provider::Whop,
        state.whop_verifier(),
        state.whop_registry(),
        &headers,
        &body,
    )
    .await
}

/// Lemon Squeezy deliveries
#[instrument(skip_all)]
pub async fn lemon_squeezy_webhook_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Value>, ApiError> {
    receive(
        &state,
        Provider::LemonSqueezy,
        state.lemon_squeezy_verifier(),
        state.lemon_squeezy_registry(),
        &headers,
        &body,
    )
    .await
}

async fn receive(
    state: &AppState,
    provider: Provider,
    verifier: &dyn SignatureVerifier,
    registry: &ProductRegistry,
    headers: &HeaderMap,
    body: &[u8],
) -> Result<Json<Value>, ApiError> {
    let provider_name = provider.as_str();

    // Nothing is parsed before the signature checks out
    if let Err(e) = verifier.verify(headers, body) {
        warn!(provider = provider_name, reason = %e, "Webhook signature rejected");
        return Err(e.into());
    }

    let event = WebhookEvent::from_bytes(provider, body).map_err(|e| {
        warn!(provider = provider_name, error = %e, "Unparseable webhook payload");
        ApiError::from(e)
    })?;

    info!(provider = provider_name, event = %event.kind.as_str(), "Webhook received");

    let outcome = state.dispatcher().dispatch(registry, &event).await;
    debug!(provider = provider_name, outcome = outcome.label(), "Webhook processed");

    Ok(Json(json!({ "received": true })))
}
