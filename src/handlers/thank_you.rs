//! `GET /api/thank-you?p={planId}&membership_id={membershipId}`
//!
//! The Whop checkout redirects to the thank-you page with the plan id, which
//! asks here for a signed link. Plan ids are public, so a link is issued only
//! when the membership id looks up to a valid membership on that plan.
//! Everything else gets `downloadUrl: null`; the purchaser still receives the
//! webhook email and can use retrieval.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use crate::state::AppState;

/// `?p={planId}&membership_id={membershipId}`
#[derive(Debug, Deserialize)]
pub struct ThankYouQuery {
    p: Option<String>,
    membership_id: Option<String>,
}

/// Thank-you response body
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ThankYouResponse {
    /// Signed link, `null` unless the purchase is confirmed upstream
    pub download_url: Option<String>,
}

/// Signed link for the plan just purchased
#[instrument(skip_all)]
pub async fn thank_you_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ThankYouQuery>,
) -> Json<ThankYouResponse> {
    let (Some(plan_id), Some(membership_id)) = (query.p.as_deref(), query.membership_id.as_deref())
    else {
        debug!("Thank-you request without proof of purchase");
        return Json(ThankYouResponse { download_url: None });
    };

    let Some(source) = state.membership_source() else {
        warn!("Whop API key missing; thank-you links cannot be confirmed");
        return Json(ThankYouResponse { download_url: None });
    };

    let download_url = state
        .resolver()
        .verify_purchase(source, state.whop_registry(), plan_id, membership_id)
        .await
        .map(|entitlement| entitlement.download_url);

    debug!(plan_id, issued = download_url.is_some(), "Thank-you link requested");
    Json(ThankYouResponse { download_url })
}
