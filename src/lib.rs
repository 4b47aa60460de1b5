//! Skillwire Web - storefront backend for digital skill products
//!
//! This crate turns payment signals into signed, expiring download links and
//! serves the archives behind them.
//!
//! # Features
//!
//! - **Download tokens**: stateless HMAC-SHA256 capability URLs with a 7-day TTL
//! - **Webhooks**: Whop (Standard Webhooks) and Lemon Squeezy (raw-body HMAC)
//! - **Retrieval**: rebuild a customer's downloads from the Whop membership list
//! - **Storefront extras**: checkout links, free-skill leads, star ratings
//!
//! # Architecture
//!
//! ```text
//! Payment Provider ──▶ Webhook (verify) ──▶ EntitlementResolver ──▶ TokenCodec
//!                                                  ▲                    │
//!                       Email ──▶ MembershipSource ┘                    ▼
//!                                                            /api/download/{token}
//!                                                                       │
//!                                                                       ▼
//!                                                              {slug}.zip (no-store)
//! ```
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use skillwire_web::{app_router, AppConfig, AppState};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = AppConfig::from_env()?;
//!     let state = Arc::new(AppState::new(config)?);
//!
//!     let listener = tokio::net::TcpListener::bind("127.0.0.1:3000").await?;
//!     axum::serve(listener, app_router(state)).await?;
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod catalog;
pub mod config;
pub mod cors;
pub mod entitlement;
pub mod error;
pub mod handlers;
pub mod notify;
pub mod provider;
pub mod registry;
pub mod state;
pub mod token;
pub mod webhook;

// Re-exports for convenience
pub use config::AppConfig;
pub use entitlement::{Entitlement, EntitlementResolver, MembershipPage, MembershipSource};
pub use error::{ApiError, Error, Result};
pub use handlers::app_router;
pub use notify::{DownloadNotifier, LoggingNotifier, NoOpNotifier};
pub use registry::{DownloadableSet, ProductRegistry};
pub use state::AppState;
pub use token::{DownloadSecret, IssuedToken, TokenCodec};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
