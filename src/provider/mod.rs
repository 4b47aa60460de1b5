//! Outbound clients for third-party services
//!
//! - [`whop`]: membership lookups for retrieval, hosted checkout links
//! - [`lemon_squeezy`]: checkout session creation
//! - [`airtable`]: lead and review storage

pub mod airtable;
pub mod lemon_squeezy;
pub mod whop;

use std::time::Duration;

use crate::error::{ProviderError, ProviderResult};

pub use airtable::{AirtableClient, ReviewSummary};
pub use lemon_squeezy::LemonSqueezyClient;
pub use whop::WhopClient;

/// Per-request timeout for outbound calls
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Longest upstream body kept in an error
const ERROR_BODY_LIMIT: usize = 512;

/// Shared HTTP client configuration
pub(crate) fn http_client() -> ProviderResult<reqwest::Client> {
    Ok(reqwest::Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .user_agent(concat!("skillwire-web/", env!("CARGO_PKG_VERSION")))
        .build()?)
}

/// Turn a non-success response into `ProviderError::Status`
pub(crate) async fn check_status(response: reqwest::Response) -> ProviderResult<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let mut body = response.text().await.unwrap_or_default();
    if body.len() > ERROR_BODY_LIMIT {
        let mut cut = ERROR_BODY_LIMIT;
        while !body.is_char_boundary(cut) {
            cut -= 1;
        }
        body.truncate(cut);
    }
    Err(ProviderError::Status {
        status: status.as_u16(),
        body,
    })
}
