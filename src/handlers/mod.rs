//! HTTP handlers and router
//!
//! ```text
//! GET  /health                       liveness
//! GET  /ready                        configured integrations
//! GET  /api/download/:token          signed archive delivery
//! POST /api/retrieve                 purchases by email
//! POST /api/webhook/whop             Whop events
//! POST /api/webhook/lemon-squeezy    Lemon Squeezy events
//! POST /api/checkout                 hosted checkout
//! GET  /api/thank-you                post-checkout link
//! POST /api/lead                     free-skill lead capture
//! GET  /api/review, POST /api/review ratings
//! ```

pub mod checkout;
pub mod download;
pub mod lead;
pub mod retrieve;
pub mod review;
pub mod status;
pub mod thank_you;
pub mod webhook;

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;

use crate::cors::cors_layer;
use crate::state::AppState;

pub use status::status_router;

/// The complete application router
pub fn app_router(state: Arc<AppState>) -> Router {
    let cors = cors_layer(&state.config().app_url);

    let api = Router::new()
        .route("/download/:token", get(download::download_handler))
        .route("/retrieve", post(retrieve::retrieve_handler))
        .route("/webhook/whop", post(webhook::whop_webhook_handler))
        .route(
            "/webhook/lemon-squeezy",
            post(webhook::lemon_squeezy_webhook_handler),
        )
        .route("/checkout", post(checkout::checkout_handler))
        .route("/thank-you", get(thank_you::thank_you_handler))
        .route("/lead", post(lead::lead_handler))
        .route(
            "/review",
            get(review::review_summary_handler).post(review::submit_review_handler),
        );

    Router::new()
        .merge(status_router())
        .nest("/api", api)
        .layer(cors)
        .with_state(state)
}
