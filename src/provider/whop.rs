//! Whop API client
//!
//! Used for the self-service retrieval path: the membership list is paged
//! with `GET /v2/memberships?page_size=50&page_num=N` and returned raw, so
//! the resolver can apply its own extraction strategies. Single records
//! (`GET /v2/memberships/{id}`) back the thank-you redirect.

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::Value;
use url::form_urlencoded;

use crate::config::WhopConfig;
use crate::entitlement::{MembershipPage, MembershipSource};
use crate::error::{ProviderError, ProviderResult};
use crate::provider::{check_status, http_client};

/// Records requested per page
pub const PAGE_SIZE: u32 = 50;

/// Hosted checkout base
const CHECKOUT_BASE: &str = "https://whop.com/checkout";

#[derive(Debug, Deserialize)]
struct MembershipsResponse {
    #[serde(default)]
    data: Vec<Value>,
    #[serde(default)]
    pagination: Option<Pagination>,
}

#[derive(Debug, Deserialize)]
struct Pagination {
    #[serde(default)]
    next_page: Option<Value>,
}

impl Pagination {
    fn has_next(&self) -> bool {
        match &self.next_page {
            None | Some(Value::Null) | Some(Value::Bool(false)) => false,
            Some(Value::Number(n)) => n.as_u64().map_or(true, |n| n > 0),
            Some(Value::String(s)) => !s.is_empty(),
            Some(_) => true,
        }
    }
}

/// Authenticated Whop API client
#[derive(Clone)]
pub struct WhopClient {
    http: reqwest::Client,
    api_url: String,
    api_key: String,
}

impl WhopClient {
    /// Create a client for `api_url`
    pub fn new(api_key: impl Into<String>, api_url: impl Into<String>) -> ProviderResult<Self> {
        Ok(Self {
            http: http_client()?,
            api_url: api_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        })
    }

    /// Build from configuration; `None` without an API key
    pub fn from_config(config: &WhopConfig) -> ProviderResult<Option<Self>> {
        match &config.api_key {
            Some(key) => Self::new(key.clone(), config.api_url.clone()).map(Some),
            None => Ok(None),
        }
    }
}

#[async_trait]
impl MembershipSource for WhopClient {
    async fn fetch_page(&self, page_num: u32) -> ProviderResult<MembershipPage> {
        let url = format!("{}/v2/memberships", self.api_url);
        let page_size = PAGE_SIZE.to_string();
        let page = page_num.to_string();

        let response = self
            .http
            .get(&url)
            .bearer_auth(&self.api_key)
            .query(&[("page_size", page_size.as_str()), ("page_num", page.as_str())])
            .send()
            .await?;
        let response = check_status(response).await?;

        let body: MembershipsResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::UnexpectedResponse(e.to_string()))?;

        tracing::debug!(page_num, records = body.data.len(), "Fetched Whop memberships");

        Ok(MembershipPage {
            has_next: body.pagination.as_ref().is_some_and(Pagination::has_next),
            memberships: body.data,
        })
    }

    async fn fetch_membership(&self, membership_id: &str) -> ProviderResult<Option<Value>> {
        let url = format!("{}/v2/memberships/{membership_id}", self.api_url);

        let response = self.http.get(&url).bearer_auth(&self.api_key).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let response = check_status(response).await?;

        response
            .json()
            .await
            .map(Some)
            .map_err(|e| ProviderError::UnexpectedResponse(e.to_string()))
    }
}

impl std::fmt::Debug for WhopClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WhopClient")
            .field("api_url", &self.api_url)
            .finish_non_exhaustive()
    }
}

/// Hosted checkout link for a plan.
///
/// Both redirect parameters point at the thank-you page with `?p={plan_id}`.
/// The plan id alone proves nothing: the page must also pass on the
/// `membership_id` Whop appends on return before a link is issued.
pub fn checkout_url(plan_id: &str, locale: &str, app_url: &str) -> String {
    let redirect = format!(
        "{}/{locale}/thank-you?p={plan_id}",
        app_url.trim_end_matches('/')
    );
    let encoded: String = form_urlencoded::byte_serialize(redirect.as_bytes()).collect();
    format!("{CHECKOUT_BASE}/{plan_id}/?redirect_url={encoded}&returnUrl={encoded}")
}
