//! Shared helpers for the HTTP integration tests.

#![allow(dead_code)]

use std::sync::{Arc, OnceLock};

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use parking_lot::Mutex;
use serde_json::Value;
use tower::ServiceExt;

use skillwire_web::{app_router, AppConfig, AppState, DownloadNotifier, Entitlement};

/// Base64 of "skillwire-test-webhook-key"
pub const WHOP_SECRET: &str = "whsec_c2tpbGx3aXJlLXRlc3Qtd2ViaG9vay1rZXk=";

pub const LEMON_SQUEEZY_SECRET: &str = "ls-test-signing-secret";

/// `webhook-timestamp` for signed Whop deliveries, fixed for the whole run
pub fn webhook_timestamp() -> &'static str {
    static TIMESTAMP: OnceLock<String> = OnceLock::new();
    TIMESTAMP.get_or_init(|| chrono::Utc::now().timestamp().to_string())
}

/// Captures every notification instead of sending it
#[derive(Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<(String, Entitlement)>>,
}

impl RecordingNotifier {
    pub fn sent(&self) -> Vec<(String, Entitlement)> {
        self.sent.lock().clone()
    }
}

#[async_trait]
impl DownloadNotifier for RecordingNotifier {
    async fn send_download(&self, email: &str, entitlement: &Entitlement) -> anyhow::Result<()> {
        self.sent
            .lock()
            .push((email.to_string(), entitlement.clone()));
        Ok(())
    }
}

/// Config with both webhook secrets set
pub fn webhook_config() -> AppConfig {
    let mut config = AppConfig::test_config();
    config.whop.webhook_secret = Some(WHOP_SECRET.to_string());
    config.lemon_squeezy.webhook_secret = Some(LEMON_SQUEEZY_SECRET.to_string());
    config
}

pub fn router(config: AppConfig) -> Router {
    app_router(Arc::new(AppState::new(config).expect("state")))
}

pub fn router_with_notifier(config: AppConfig, notifier: Arc<RecordingNotifier>) -> Router {
    let state = AppState::with_notifier(config, notifier).expect("state");
    app_router(Arc::new(state))
}

pub async fn send(router: Router, request: Request<Body>) -> (StatusCode, Vec<u8>) {
    let response = router.oneshot(request).await.expect("response");
    let status = response.status();
    let body = response
        .into_body()
        .collect()
        .await
        .expect("body")
        .to_bytes()
        .to_vec();
    (status, body)
}

pub async fn send_json(router: Router, request: Request<Body>) -> (StatusCode, Value) {
    let (status, body) = send(router, request).await;
    let json = serde_json::from_slice(&body).unwrap_or(Value::Null);
    (status, json)
}

pub fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .method(Method::GET)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

pub fn post_json(uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub fn post_raw(uri: &str, body: &'static str) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body))
        .unwrap()
}

/// Strip the public base URL, leaving `/api/download/...`
pub fn relative(download_url: &str) -> &str {
    download_url
        .strip_prefix("https://skillwire.test")
        .unwrap_or(download_url)
}
