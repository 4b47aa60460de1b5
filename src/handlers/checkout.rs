//! `POST /api/checkout` - start a hosted checkout for the first cart item.
//!
//! Lemon Squeezy is used when it is configured; otherwise the Whop hosted
//! checkout link for the slug's plan is returned.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument};

use crate::error::ApiError;
use crate::provider::lemon_squeezy::CheckoutRequest;
use crate::provider::whop;
use crate::state::AppState;

/// Supported storefront locales
pub const LOCALES: &[&str] = &["en", "it"];

#[derive(Debug, Deserialize)]
struct CartItem {
    slug: String,
}

#[derive(Debug, Deserialize)]
struct CheckoutBody {
    #[serde(default)]
    items: Vec<CartItem>,
    #[serde(default)]
    locale: Option<String>,
}

/// Checkout response body
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutResponse {
    /// Hosted checkout page
    pub checkout_url: String,
}

/// `en` unless the requested locale is supported
pub fn normalize_locale(locale: Option<&str>) -> &'static str {
    let requested = locale.map(str::trim).unwrap_or_default();
    LOCALES
        .iter()
        .copied()
        .find(|l| l.eq_ignore_ascii_case(requested))
        .unwrap_or("en")
}

/// Create a checkout session or link
#[instrument(skip_all)]
pub async fn checkout_handler(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<CheckoutResponse>, ApiError> {
    let body: CheckoutBody =
        serde_json::from_slice(&body).map_err(|_| ApiError::bad_request("Invalid request body."))?;

    let Some(item) = body.items.first() else {
        return Err(ApiError::bad_request("Cart is empty."));
    };
    let slug = item.slug.trim();
    let locale = normalize_locale(body.locale.as_deref());

    let lemon_squeezy = state.lemon_squeezy();
    if lemon_squeezy.is_configured() {
        let Some(variant_id) = state.lemon_squeezy_registry().plan_id_for(slug) else {
            return Err(ApiError::bad_request(format!(
                "No variant configured for \"{slug}\"."
            )));
        };

        let checkout_url = lemon_squeezy
            .create_checkout(CheckoutRequest {
                variant_id,
                slug,
                locale,
                embed: true,
            })
            .await
            .map_err(|e| {
                error!(slug, error = %e, "Lemon Squeezy checkout failed");
                ApiError::new(
                    axum::http::StatusCode::INTERNAL_SERVER_ERROR,
                    "Failed to create checkout session.",
                )
            })?;

        info!(provider = "lemon-squeezy", slug, locale, "Checkout created");
        return Ok(Json(CheckoutResponse { checkout_url }));
    }

    let Some(plan_id) = state.whop_registry().plan_id_for(slug) else {
        return Err(ApiError::bad_request(format!(
            "No plan configured for \"{slug}\"."
        )));
    };

    info!(provider = "whop", slug, locale, "Checkout link issued");
    Ok(Json(CheckoutResponse {
        checkout_url: whop::checkout_url(plan_id, locale, &state.config().app_url),
    }))
}
