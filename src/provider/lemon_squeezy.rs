//! Lemon Squeezy checkout sessions
//!
//! The HTTP client is built lazily on first use by
//! [`LemonSqueezyClient::ensure_initialized`]; later calls reuse it.

use parking_lot::Mutex;
use serde_json::{json, Value};

use crate::config::LemonSqueezyConfig;
use crate::error::{ProviderError, ProviderResult};
use crate::provider::{check_status, http_client};

const JSON_API: &str = "application/vnd.api+json";

/// Parameters for one checkout session
#[derive(Debug, Clone)]
pub struct CheckoutRequest<'a> {
    /// Lemon Squeezy variant id
    pub variant_id: &'a str,
    /// Product slug, echoed back in the `order_created` webhook
    pub slug: &'a str,
    /// `en` or `it`
    pub locale: &'a str,
    /// Overlay checkout instead of a full page
    pub embed: bool,
}

/// Lemon Squeezy API client
pub struct LemonSqueezyClient {
    api_key: Option<String>,
    store_id: Option<String>,
    api_url: String,
    app_url: String,
    http: Mutex<Option<reqwest::Client>>,
}

impl LemonSqueezyClient {
    /// Create an uninitialized client
    pub fn new(config: &LemonSqueezyConfig, app_url: impl Into<String>) -> Self {
        Self {
            api_key: config.api_key.clone(),
            store_id: config.store_id.clone(),
            api_url: config.api_url.trim_end_matches('/').to_string(),
            app_url: app_url.into().trim_end_matches('/').to_string(),
            http: Mutex::new(None),
        }
    }

    /// Whether checkout creation can be attempted
    pub fn is_configured(&self) -> bool {
        self.api_key.is_some() && self.store_id.is_some()
    }

    /// Whether the HTTP client has been built
    pub fn is_initialized(&self) -> bool {
        self.http.lock().is_some()
    }

    /// Build the HTTP client once. Safe to call repeatedly.
    ///
    /// # Errors
    ///
    /// `ProviderError::NotConfigured` without an API key.
    pub fn ensure_initialized(&self) -> ProviderResult<reqwest::Client> {
        if self.api_key.is_none() {
            return Err(ProviderError::NotConfigured("LEMON_SQUEEZY_API_KEY"));
        }
        let mut guard = self.http.lock();
        if let Some(client) = guard.as_ref() {
            return Ok(client.clone());
        }
        let client = http_client()?;
        *guard = Some(client.clone());
        tracing::debug!("Lemon Squeezy client initialized");
        Ok(client)
    }

    /// Create a checkout session and return its hosted URL
    pub async fn create_checkout(&self, request: CheckoutRequest<'_>) -> ProviderResult<String> {
        let http = self.ensure_initialized()?;
        let api_key = self
            .api_key
            .as_deref()
            .ok_or(ProviderError::NotConfigured("LEMON_SQUEEZY_API_KEY"))?;
        let store_id = self
            .store_id
            .as_deref()
            .ok_or(ProviderError::NotConfigured("LEMON_SQUEEZY_STORE_ID"))?;

        let body = self.checkout_body(store_id, &request);

        let response = http
            .post(format!("{}/v1/checkouts", self.api_url))
            .bearer_auth(api_key)
            .header(reqwest::header::ACCEPT, JSON_API)
            .header(reqwest::header::CONTENT_TYPE, JSON_API)
            .body(body.to_string())
            .send()
            .await?;
        let response = check_status(response).await?;

        let payload: Value = response
            .json()
            .await
            .map_err(|e| ProviderError::UnexpectedResponse(e.to_string()))?;

        payload
            .pointer("/data/attributes/url")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| ProviderError::UnexpectedResponse("checkout has no url".to_string()))
    }

    fn checkout_body(&self, store_id: &str, request: &CheckoutRequest<'_>) -> Value {
        json!({
            "data": {
                "type": "checkouts",
                "attributes": {
                    "product_options": {
                        "redirect_url": format!("{}/{}/thank-you", self.app_url, request.locale),
                    },
                    "checkout_options": { "embed": request.embed },
                    "checkout_data": {
                        "custom": { "slug": request.slug, "locale": request.locale },
                    },
                },
                "relationships": {
                    "store": { "data": { "type": "stores", "id": store_id } },
                    "variant": { "data": { "type": "variants", "id": request.variant_id } },
                },
            }
        })
    }
}

impl std::fmt::Debug for LemonSqueezyClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LemonSqueezyClient")
            .field("configured", &self.is_configured())
            .field("initialized", &self.is_initialized())
            .field("api_url", &self.api_url)
            .finish()
    }
}
