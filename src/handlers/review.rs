//! Star ratings
//!
//! - `POST /api/review` `{slug, rating, source?}` stores a rating
//! - `GET /api/review?slug=` returns `{averageRating, reviewCount}`
//!
//! Reads degrade to "no reviews" when Airtable is missing or failing;
//! writes report 503 / 500.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{error, info, instrument, warn};

use crate::error::ApiError;
use crate::provider::airtable::Review;
use crate::provider::ReviewSummary;
use crate::state::AppState;

/// `?slug=`
#[derive(Debug, Deserialize)]
pub struct ReviewQuery {
    slug: Option<String>,
}

/// Store a rating
#[instrument(skip_all)]
pub async fn submit_review_handler(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<Value>, ApiError> {
    let invalid = || ApiError::bad_request("Invalid fields: slug required, rating must be 1-5");

    let payload: Value = serde_json::from_slice(&body).map_err(|_| invalid())?;
    let slug = payload
        .get("slug")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(invalid)?;
    let rating = payload
        .get("rating")
        .and_then(Value::as_f64)
        .filter(|r| (1.0..=5.0).contains(r))
        .ok_or_else(invalid)?;
    let source = payload
        .get("source")
        .and_then(Value::as_str)
        .unwrap_or("free");

    if state.catalog().skill(slug).is_none() {
        return Err(ApiError::bad_request("Unknown skill slug"));
    }

    let Some(airtable) = state.airtable() else {
        warn!("Review submitted but Airtable is not configured");
        return Err(ApiError::unavailable("Rating service not configured"));
    };

    let review = Review {
        slug,
        rating: rating.round() as u8,
        source,
    };
    airtable.save_review(&review).await.map_err(|e| {
        error!(slug, error = %e, "Failed to store review");
        ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
    })?;

    info!(slug, rating = review.rating, source, "Review stored");
    Ok(Json(json!({ "success": true })))
}

/// Average rating for a skill
#[instrument(skip_all)]
pub async fn review_summary_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ReviewQuery>,
) -> Result<Json<ReviewSummary>, ApiError> {
    let Some(slug) = query.slug.as_deref().map(str::trim).filter(|s| !s.is_empty()) else {
        return Err(ApiError::bad_request("Missing slug parameter"));
    };

    let Some(airtable) = state.airtable() else {
        return Ok(Json(ReviewSummary::EMPTY));
    };

    match airtable.review_summary(slug).await {
        Ok(summary) => Ok(Json(summary)),
        Err(e) => {
            warn!(slug, error = %e, "Review lookup failed");
            Ok(Json(ReviewSummary::EMPTY))
        }
    }
}
