//! `GET /api/download/:token?slug=&exp=`
//!
//! Checks run in a fixed order and stop at the first failure:
//!
//! 1. `slug` and `exp` present, `exp` an integer → else 400
//! 2. `slug` in the downloadable set → else 400
//! 3. token verifies (signature, expiry, deny list) → else 403
//! 4. `{slug}.zip` exists in the artifact store → else 404
//!
//! Step 3 answers the same way for tampered and expired links. Step 2 runs
//! before any filesystem access, so unknown slugs never reveal whether a
//! file exists.

use std::sync::Arc;

use axum::body::Body;
use axum::extract::{Path, Query, State};
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use serde::Deserialize;
use tokio_util::io::ReaderStream;
use tracing::{info, instrument, warn};

use crate::error::ApiError;
use crate::state::AppState;

/// Query half of a download URL
#[derive(Debug, Deserialize)]
pub struct DownloadQuery {
    slug: Option<String>,
    exp: Option<String>,
}

/// Serve the archive for a verified download link
#[instrument(skip_all)]
pub async fn download_handler(
    State(state): State<Arc<AppState>>,
    Path(token): Path<String>,
    Query(query): Query<DownloadQuery>,
) -> Result<Response, ApiError> {
    let (Some(slug), Some(exp)) = (query.slug.as_deref(), query.exp.as_deref()) else {
        return Err(ApiError::bad_request("Missing parameters"));
    };
    if token.is_empty() || slug.is_empty() {
        return Err(ApiError::bad_request("Missing parameters"));
    }
    let expiry: i64 = exp
        .trim()
        .parse()
        .map_err(|_| ApiError::bad_request("Invalid expiry"))?;

    if !state.whop_registry().is_downloadable(slug) {
        return Err(ApiError::bad_request("Unknown product"));
    }

    if !state.codec().verify(&token, slug, expiry) {
        warn!(slug, "Rejected download link");
        return Err(ApiError::forbidden());
    }

    let path = state.config().downloads_dir.join(format!("{slug}.zip"));
    let file = match tokio::fs::File::open(&path).await {
        Ok(file) => file,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            warn!(slug, path = %path.display(), "Archive missing from artifact store");
            return Err(ApiError::not_found("File not found"));
        }
        Err(e) => {
            tracing::error!(slug, path = %path.display(), error = %e, "Failed to open archive");
            return Err(ApiError::internal());
        }
    };
    let metadata = file.metadata().await.map_err(|e| {
        tracing::error!(slug, error = %e, "Failed to stat archive");
        ApiError::internal()
    })?;
    if !metadata.is_file() {
        warn!(slug, path = %path.display(), "Archive path is not a file");
        return Err(ApiError::not_found("File not found"));
    }

    let disposition = HeaderValue::from_str(&format!("attachment; filename=\"{slug}.zip\""))
        .map_err(|_| ApiError::internal())?;

    info!(slug, bytes = metadata.len(), "Serving download");

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, HeaderValue::from_static("application/zip")),
            (header::CONTENT_DISPOSITION, disposition),
            (header::CACHE_CONTROL, HeaderValue::from_static("no-store")),
            (header::CONTENT_LENGTH, HeaderValue::from(metadata.len())),
        ],
        Body::from_stream(ReaderStream::new(file)),
    )
        .into_response())
}
