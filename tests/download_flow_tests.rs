//! End-to-end download flow
//!
//! Payment webhook → signed link → archive delivery, plus every way a
//! download request can be refused.
//!
//! ```bash
//! cargo test --package skillwire-web --test download_flow_tests
//! ```

mod common;

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use pretty_assertions::assert_eq;
use serde_json::json;
use tempfile::TempDir;
use wiremock::matchers::{bearer_token, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use common::*;
use skillwire_web::token::TokenDenyList;
use skillwire_web::webhook::StandardWebhookVerifier;
use skillwire_web::{AppConfig, DownloadSecret, DownloadableSet, TokenCodec};

const ARCHIVE: &[u8] = b"PK\x03\x04 human-writer archive";

fn store_with(slug: &str) -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join(format!("{slug}.zip")), ARCHIVE).unwrap();
    dir
}

fn config_with_store(dir: &TempDir) -> AppConfig {
    let mut config = webhook_config();
    config.downloads_dir = dir.path().to_path_buf();
    config
}

/// Same secret as `AppConfig::test_config`
fn test_codec() -> TokenCodec {
    TokenCodec::new(
        DownloadSecret::new("test-download-secret-for-unit-tests"),
        DownloadableSet::storefront(),
    )
}

fn signed_whop_request(body: &str) -> Request<Body> {
    let verifier = StandardWebhookVerifier::new(Some(WHOP_SECRET));
    let (id, ts) = ("msg_2kX9", webhook_timestamp());
    let signature = verifier.sign(id, ts, body.as_bytes()).unwrap();

    Request::builder()
        .method(Method::POST)
        .uri("/api/webhook/whop")
        .header("content-type", "application/json")
        .header("webhook-id", id)
        .header("webhook-timestamp", ts)
        .header("webhook-signature", format!("v1,{signature}"))
        .body(Body::from(body.to_string()))
        .unwrap()
}

// ============================================================================
// Webhook to download
// ============================================================================

#[tokio::test]
async fn test_whop_payment_delivers_working_link() {
    let store = store_with("human-writer");
    let notifier = Arc::new(RecordingNotifier::default());
    let router = router_with_notifier(config_with_store(&store), notifier.clone());

    let body = json!({
        "type": "payment_succeeded",
        "data": { "plan_id": "plan_t1Zmwe6wHBUzJ", "email": "buyer@example.com" }
    })
    .to_string();

    let (status, ack) = send_json(router.clone(), signed_whop_request(&body)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ack, json!({ "received": true }));

    let sent = notifier.sent();
    assert_eq!(sent.len(), 1);
    let (email, entitlement) = &sent[0];
    assert_eq!(email, "buyer@example.com");
    assert_eq!(entitlement.slug, "human-writer");
    assert_eq!(entitlement.name, "HumanWriter");
    assert!(entitlement
        .download_url
        .starts_with("https://skillwire.test/api/download/"));

    let response = {
        use tower::ServiceExt;
        router
            .oneshot(get(relative(&entitlement.download_url)))
            .await
            .unwrap()
    };
    assert_eq!(response.status(), StatusCode::OK);
    let headers = response.headers();
    assert_eq!(headers[header::CONTENT_TYPE], "application/zip");
    assert_eq!(
        headers[header::CONTENT_DISPOSITION],
        "attachment; filename=\"human-writer.zip\""
    );
    assert_eq!(headers[header::CACHE_CONTROL], "no-store");

    let bytes = {
        use http_body_util::BodyExt;
        response.into_body().collect().await.unwrap().to_bytes()
    };
    assert_eq!(&bytes[..], ARCHIVE);
}

#[tokio::test]
async fn test_membership_went_valid_with_nested_fields() {
    let notifier = Arc::new(RecordingNotifier::default());
    let router = router_with_notifier(webhook_config(), notifier.clone());

    let body = json!({
        "action": "membership.went_valid",
        "data": { "plan": { "id": "plan_dGvHQ3ruuk4CD" }, "user": { "email": "lead@example.com" } }
    })
    .to_string();

    let (status, _) = send(router, signed_whop_request(&body)).await;
    assert_eq!(status, StatusCode::OK);

    let sent = notifier.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].1.slug, "janus");
}

#[tokio::test]
async fn test_unmapped_plan_is_acknowledged_without_notification() {
    let notifier = Arc::new(RecordingNotifier::default());
    let router = router_with_notifier(webhook_config(), notifier.clone());

    // workspace-architect has a plan but no archive
    for plan in ["plan_unknown", "plan_CGUQAu3tBDug1"] {
        let body = json!({
            "type": "payment.succeeded",
            "data": { "plan_id": plan, "email": "buyer@example.com" }
        })
        .to_string();
        let (status, _) = send(router.clone(), signed_whop_request(&body)).await;
        assert_eq!(status, StatusCode::OK);
    }

    assert!(notifier.sent().is_empty());
}

// ============================================================================
// Download refusals
// ============================================================================

#[tokio::test]
async fn test_expired_link_is_forbidden() {
    let store = store_with("human-writer");
    let router = router(config_with_store(&store));

    let eight_days_ago = chrono::Utc::now().timestamp() - 8 * 24 * 3600;
    let issued = test_codec().issue_at("human-writer", eight_days_ago);

    let (status, body) = send_json(router, get(&issued.url)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body, json!({ "error": "Invalid or expired download link" }));
}

#[tokio::test]
async fn test_tampered_links_are_forbidden() {
    let store = store_with("human-writer");
    let router = router(config_with_store(&store));
    let issued = test_codec().issue("human-writer");

    // Flipped token character
    let first = if issued.token.starts_with('0') { '1' } else { '0' };
    let tampered = format!("{first}{}", &issued.token[1..]);
    let uri = format!(
        "/api/download/{tampered}?slug=human-writer&exp={}",
        issued.expiry
    );
    let (status, _) = send(router.clone(), get(&uri)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // Extended expiry
    let uri = format!(
        "/api/download/{}?slug=human-writer&exp={}",
        issued.token,
        issued.expiry + 3600
    );
    let (status, _) = send(router.clone(), get(&uri)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // Token moved to another downloadable product
    let uri = format!("/api/download/{}?slug=janus&exp={}", issued.token, issued.expiry);
    let (status, _) = send(router, get(&uri)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_malformed_requests_are_bad_requests() {
    let router = router(AppConfig::test_config());
    let issued = test_codec().issue("human-writer");

    let cases = [
        format!("/api/download/{}?exp={}", issued.token, issued.expiry),
        format!("/api/download/{}?slug=human-writer", issued.token),
        format!("/api/download/{}?slug=human-writer&exp=soon", issued.token),
        format!("/api/download/{}?slug=../secrets&exp={}", issued.token, issued.expiry),
        format!(
            "/api/download/{}?slug=workspace-architect&exp={}",
            issued.token, issued.expiry
        ),
    ];
    for uri in cases {
        let (status, _) = send(router.clone(), get(&uri)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
    }
}

#[tokio::test]
async fn test_large_archive_streams_intact() {
    let store = tempfile::tempdir().unwrap();
    let archive: Vec<u8> = (0..256 * 1024u32).map(|i| (i % 251) as u8).collect();
    std::fs::write(store.path().join("janus.zip"), &archive).unwrap();
    let router = router(config_with_store(&store));
    let issued = test_codec().issue("janus");

    let response = {
        use tower::ServiceExt;
        router.oneshot(get(&issued.url)).await.unwrap()
    };
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_LENGTH],
        archive.len().to_string().as_str()
    );

    let bytes = {
        use http_body_util::BodyExt;
        response.into_body().collect().await.unwrap().to_bytes()
    };
    assert_eq!(bytes.len(), archive.len());
    assert!(bytes[..] == archive[..]);
}

#[tokio::test]
async fn test_directory_in_place_of_archive_is_not_found() {
    let store = tempfile::tempdir().unwrap();
    std::fs::create_dir(store.path().join("maia.zip")).unwrap();
    let router = router(config_with_store(&store));
    let issued = test_codec().issue("maia");

    let (status, body) = send_json(router, get(&issued.url)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, json!({ "error": "File not found" }));
}

#[tokio::test]
async fn test_archive_outside_downloadable_set_is_bad_request() {
    // Present on disk, but not a downloadable product
    let store = store_with("workspace-architect");
    let router = router(config_with_store(&store));
    let issued = test_codec().issue("workspace-architect");

    let (status, body) = send(router, get(&issued.url)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(!body.starts_with(b"PK"));
}

#[tokio::test]
async fn test_missing_archive_is_not_found() {
    let empty = tempfile::tempdir().unwrap();
    let router = router(config_with_store(&empty));
    let issued = test_codec().issue("human-writer");

    let (status, body) = send_json(router, get(&issued.url)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, json!({ "error": "File not found" }));
}

#[tokio::test]
async fn test_revoked_token_is_forbidden() {
    let store = store_with("human-writer");
    let issued = test_codec().issue("human-writer");

    let mut config = config_with_store(&store);
    config.deny_list = TokenDenyList::from_hashes([TokenDenyList::hash_token(&issued.token)]);
    let router = router(config);

    let (status, _) = send(router, get(&issued.url)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

// ============================================================================
// Thank-you page
// ============================================================================

fn whop_api_config(server: &MockServer, store: &TempDir) -> AppConfig {
    let mut config = config_with_store(store);
    config.whop.api_key = Some("whop_test_key".to_string());
    config.whop.api_url = server.uri();
    config
}

async fn mount_membership(server: &MockServer, id: &str, response: ResponseTemplate) {
    Mock::given(method("GET"))
        .and(path(format!("/v2/memberships/{id}")))
        .and(bearer_token("whop_test_key"))
        .respond_with(response)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_thank_you_bare_plan_id_yields_no_link() {
    let server = MockServer::start().await;
    let store = store_with("human-writer");
    let router = router(whop_api_config(&server, &store));

    // The plan id is public: any visitor can read it off a checkout URL
    let (status, body) = send_json(
        router.clone(),
        post_json("/api/checkout", &json!({ "items": [{ "slug": "human-writer" }] })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["checkoutUrl"]
        .as_str()
        .unwrap()
        .contains("/checkout/plan_t1Zmwe6wHBUzJ/"));

    for uri in [
        "/api/thank-you?p=plan_t1Zmwe6wHBUzJ",
        "/api/thank-you?p=plan_unknown",
        "/api/thank-you?membership_id=mem_paid",
        "/api/thank-you",
    ] {
        let (status, body) = send_json(router.clone(), get(uri)).await;
        assert_eq!(status, StatusCode::OK, "{uri}");
        assert_eq!(body, json!({ "downloadUrl": null }), "{uri}");
    }
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_thank_you_confirmed_membership_issues_working_link() {
    let server = MockServer::start().await;
    mount_membership(
        &server,
        "mem_paid",
        ResponseTemplate::new(200).set_body_json(json!({
            "id": "mem_paid",
            "plan": "plan_t1Zmwe6wHBUzJ",
            "valid": true,
            "email": "buyer@example.com"
        })),
    )
    .await;
    let store = store_with("human-writer");
    let router = router(whop_api_config(&server, &store));

    let (status, body) = send_json(
        router.clone(),
        get("/api/thank-you?p=plan_t1Zmwe6wHBUzJ&membership_id=mem_paid"),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let url = body["downloadUrl"].as_str().unwrap();
    assert!(url.starts_with("https://skillwire.test/api/download/"));
    assert!(url.contains("slug=human-writer"));

    let (status, bytes) = send(router, get(relative(url))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(&bytes[..], ARCHIVE);
}

#[tokio::test]
async fn test_thank_you_unconfirmed_membership_yields_no_link() {
    let server = MockServer::start().await;
    // Real membership for a cheaper product
    mount_membership(
        &server,
        "mem_janus",
        ResponseTemplate::new(200).set_body_json(json!({
            "id": "mem_janus",
            "plan": { "id": "plan_dGvHQ3ruuk4CD" },
            "valid": true
        })),
    )
    .await;
    mount_membership(
        &server,
        "mem_lapsed",
        ResponseTemplate::new(200).set_body_json(json!({
            "id": "mem_lapsed",
            "plan": "plan_t1Zmwe6wHBUzJ",
            "valid": false
        })),
    )
    .await;
    mount_membership(&server, "mem_missing", ResponseTemplate::new(404)).await;
    mount_membership(&server, "mem_outage", ResponseTemplate::new(503)).await;
    let store = store_with("human-writer");
    let router = router(whop_api_config(&server, &store));

    for membership in ["mem_janus", "mem_lapsed", "mem_missing", "mem_outage", "..%2Fme"] {
        let uri = format!("/api/thank-you?p=plan_t1Zmwe6wHBUzJ&membership_id={membership}");
        let (status, body) = send_json(router.clone(), get(&uri)).await;
        assert_eq!(status, StatusCode::OK, "{membership}");
        assert_eq!(body, json!({ "downloadUrl": null }), "{membership}");
    }
}

#[tokio::test]
async fn test_thank_you_without_whop_api_yields_no_link() {
    let router = router(AppConfig::test_config());
    let (status, body) = send_json(
        router,
        get("/api/thank-you?p=plan_t1Zmwe6wHBUzJ&membership_id=mem_paid"),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "downloadUrl": null }));
}
