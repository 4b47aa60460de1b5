//! Skillwire Web server
//!
//! Storefront backend: download links, payment webhooks, retrieval.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use skillwire_web::{app_router, AppConfig, AppState};

/// Skillwire Web server
#[derive(Parser, Debug)]
#[command(name = "sw-web")]
#[command(author = "Skillwire Team <team@skillwire.ai>")]
#[command(version)]
#[command(about = "Storefront backend for signed downloads and payment webhooks")]
struct Args {
    /// Port to listen on
    #[arg(short, long, default_value = "3000")]
    port: u16,

    /// Host to bind to
    #[arg(short = 'H', long, default_value = "127.0.0.1")]
    host: String,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Production mode (same as SKILLWIRE_ENV=production)
    #[arg(long)]
    production: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // RUST_LOG wins over --verbose
    let default_filter = if args.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::fmt().with_env_filter(filter).init();

    let mut vars: std::collections::HashMap<String, String> = std::env::vars().collect();
    if args.production {
        vars.insert("SKILLWIRE_ENV".to_string(), "production".to_string());
    }
    let config = AppConfig::from_vars(&vars).context("invalid configuration")?;
    let state = Arc::new(AppState::new(config).context("failed to build application state")?);

    let addr: SocketAddr = format!("{}:{}", args.host, args.port)
        .parse()
        .with_context(|| format!("invalid listen address {}:{}", args.host, args.port))?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    tracing::info!(
        "Skillwire Web {} listening on {}",
        skillwire_web::VERSION,
        addr
    );

    axum::serve(listener, app_router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
