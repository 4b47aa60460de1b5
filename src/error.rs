//! Error types for Skillwire Web
//!
//! This module provides the error type hierarchy using `thiserror`, plus
//! [`ApiError`], which turns handler failures into JSON HTTP responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

/// The main error type for Skillwire Web operations
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Product registry errors
    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),

    /// Payment provider / upstream API errors
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    /// Webhook verification or payload errors
    #[error("Webhook error: {0}")]
    Webhook(#[from] WebhookError),

    /// Entitlement retrieval errors
    #[error("Retrieval error: {0}")]
    Retrieval(#[from] RetrievalError),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Configuration loading errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Production deployment without a real download secret
    #[error("DOWNLOAD_SECRET must be set to a non-default value in production")]
    InsecureDownloadSecret,

    /// A variable is present but cannot be parsed
    #[error("Invalid value for {name}: {reason}")]
    Invalid {
        /// Environment variable name
        name: &'static str,
        /// Why the value was rejected
        reason: String,
    },
}

/// Product registry construction errors
#[derive(Error, Debug, PartialEq, Eq)]
pub enum RegistryError {
    /// Two slugs point at the same payment plan
    #[error("Plan {plan_id} is mapped to more than one slug")]
    DuplicatePlan {
        /// The plan identifier listed twice
        plan_id: String,
    },

    /// The same slug is listed twice
    #[error("Slug {slug} is listed more than once")]
    DuplicateSlug {
        /// The repeated slug
        slug: String,
    },
}

/// Upstream payment provider / third-party API errors
#[derive(Error, Debug)]
pub enum ProviderError {
    /// Transport-level failure
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-success status from the upstream API
    #[error("Upstream returned {status}: {body}")]
    Status {
        /// HTTP status code
        status: u16,
        /// Response body (truncated)
        body: String,
    },

    /// Response could not be interpreted
    #[error("Unexpected response: {0}")]
    UnexpectedResponse(String),

    /// Integration is missing required configuration
    #[error("{0} is not configured")]
    NotConfigured(&'static str),
}

/// Webhook ingestion errors
#[derive(Error, Debug, PartialEq, Eq)]
pub enum WebhookError {
    /// Signature missing, malformed, or wrong
    #[error("Invalid signature")]
    InvalidSignature,

    /// Signed timestamp missing or outside the accepted window
    #[error("Webhook timestamp outside tolerance")]
    StaleTimestamp,

    /// Body is not valid JSON
    #[error("Invalid payload: {0}")]
    InvalidPayload(String),
}

/// Self-service retrieval errors
#[derive(Error, Debug)]
pub enum RetrievalError {
    /// The membership provider is not configured
    #[error("Membership provider is not configured")]
    ServiceUnavailable,
}

/// Result type alias for Skillwire Web operations
pub type Result<T> = std::result::Result<T, Error>;

/// Result type alias for provider calls
pub type ProviderResult<T> = std::result::Result<T, ProviderError>;

// =============================================================================
// HTTP-facing errors
// =============================================================================

/// Error returned by HTTP handlers, rendered as `{"error": "..."}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    /// Build an error with an explicit status
    pub fn new<S: Into<String>>(status: StatusCode, message: S) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    /// 400 Bad Request
    pub fn bad_request<S: Into<String>>(message: S) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    /// 401 Unauthorized, always with a generic message
    pub fn unauthorized() -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "Invalid signature")
    }

    /// 403 Forbidden for bad or expired download links
    pub fn forbidden() -> Self {
        Self::new(StatusCode::FORBIDDEN, "Invalid or expired download link")
    }

    /// 404 Not Found
    pub fn not_found<S: Into<String>>(message: S) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    /// 503 Service Unavailable
    pub fn unavailable<S: Into<String>>(message: S) -> Self {
        Self::new(StatusCode::SERVICE_UNAVAILABLE, message)
    }

    /// 500 Internal Server Error
    pub fn internal() -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error.")
    }

    /// HTTP status of this error
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Client-facing message
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.status.as_u16(), self.message)
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

impl From<WebhookError> for ApiError {
    fn from(err: WebhookError) -> Self {
        match err {
            WebhookError::InvalidSignature | WebhookError::StaleTimestamp => {
                ApiError::unauthorized()
            }
            WebhookError::InvalidPayload(_) => ApiError::bad_request("Invalid payload"),
        }
    }
}

impl From<RetrievalError> for ApiError {
    fn from(err: RetrievalError) -> Self {
        match err {
            RetrievalError::ServiceUnavailable => {
                ApiError::unavailable("Service temporarily unavailable.")
            }
        }
    }
}
