//! Application configuration.
//!
//! All settings come from environment variables, read once at startup.
//! Secrets are never logged; only their presence is.
//!
//! | Variable | Purpose |
//! |----------|---------|
//! | `SKILLWIRE_ENV` | `production` or `development` (default) |
//! | `SKILLWIRE_APP_URL` | Public base URL for absolute links |
//! | `SKILLWIRE_DOWNLOADS_DIR` | Artifact store directory |
//! | `DOWNLOAD_SECRET` | Download-token HMAC secret |
//! | `SKILLWIRE_REVOKED_TOKEN_HASHES` | Comma-separated hex SHA-256 of revoked tokens |
//! | `WHOP_API_KEY`, `WHOP_API_URL`, `WHOP_WEBHOOK_SECRET` | Whop |
//! | `LEMON_SQUEEZY_API_KEY`, `LEMON_SQUEEZY_STORE_ID`, `LEMON_SQUEEZY_API_URL`, `LEMON_SQUEEZY_WEBHOOK_SECRET`, `LEMON_SQUEEZY_VARIANTS` | Lemon Squeezy |
//! | `AIRTABLE_PAT`, `AIRTABLE_LEADS_BASE_ID`, `AIRTABLE_API_URL` | Airtable leads/reviews |

use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use tracing::{info, warn};

use crate::error::ConfigError;
use crate::token::{DownloadSecret, TokenDenyList};

/// Default public base URL
pub const DEFAULT_APP_URL: &str = "https://skillwire.ai";

/// Default artifact store directory
pub const DEFAULT_DOWNLOADS_DIR: &str = "public/downloads";

/// Default Whop API base
pub const DEFAULT_WHOP_API_URL: &str = "https://api.whop.com";

/// Default Lemon Squeezy API base
pub const DEFAULT_LEMON_SQUEEZY_API_URL: &str = "https://api.lemonsqueezy.com";

/// Default Airtable API base
pub const DEFAULT_AIRTABLE_API_URL: &str = "https://api.airtable.com";

/// Deployment environment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    /// Local development; fallback secrets allowed with a warning
    Development,
    /// Public deployment; fallback secrets refused
    Production,
}

impl Environment {
    fn parse(value: Option<&str>) -> Result<Self, ConfigError> {
        match value.map(str::to_ascii_lowercase).as_deref() {
            None | Some("development") | Some("dev") => Ok(Self::Development),
            Some("production") | Some("prod") => Ok(Self::Production),
            Some(other) => Err(ConfigError::Invalid {
                name: "SKILLWIRE_ENV",
                reason: format!("unknown environment '{other}'"),
            }),
        }
    }
}

/// Whop settings
#[derive(Clone)]
pub struct WhopConfig {
    /// API key for the memberships API
    pub api_key: Option<String>,
    /// API base URL
    pub api_url: String,
    /// Standard Webhooks signing secret
    pub webhook_secret: Option<String>,
}

/// Lemon Squeezy settings
#[derive(Clone)]
pub struct LemonSqueezyConfig {
    /// API key for checkout creation
    pub api_key: Option<String>,
    /// Store id for checkout creation
    pub store_id: Option<String>,
    /// API base URL
    pub api_url: String,
    /// Raw-body HMAC signing secret
    pub webhook_secret: Option<String>,
    /// `(slug, variant_id)` pairs
    pub variants: Vec<(String, String)>,
}

impl LemonSqueezyConfig {
    /// Whether checkout creation is possible
    pub fn checkout_configured(&self) -> bool {
        self.api_key.is_some() && self.store_id.is_some()
    }
}

/// Airtable settings
#[derive(Clone)]
pub struct AirtableConfig {
    /// Personal access token
    pub pat: Option<String>,
    /// Base holding the `Leads` and `Reviews` tables
    pub base_id: Option<String>,
    /// API base URL
    pub api_url: String,
}

impl AirtableConfig {
    /// Whether both credentials are present
    pub fn is_configured(&self) -> bool {
        self.pat.is_some() && self.base_id.is_some()
    }
}

// Credentials render as presence flags only

impl fmt::Debug for WhopConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WhopConfig")
            .field("api_key", &self.api_key.is_some())
            .field("api_url", &self.api_url)
            .field("webhook_secret", &self.webhook_secret.is_some())
            .finish()
    }
}

impl fmt::Debug for LemonSqueezyConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LemonSqueezyConfig")
            .field("api_key", &self.api_key.is_some())
            .field("store_id", &self.store_id)
            .field("api_url", &self.api_url)
            .field("webhook_secret", &self.webhook_secret.is_some())
            .field("variants", &self.variants)
            .finish()
    }
}

impl fmt::Debug for AirtableConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AirtableConfig")
            .field("pat", &self.pat.is_some())
            .field("base_id", &self.base_id)
            .field("api_url", &self.api_url)
            .finish()
    }
}

/// Complete application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Deployment environment
    pub environment: Environment,
    /// Public base URL, without trailing slash
    pub app_url: String,
    /// Artifact store directory
    pub downloads_dir: PathBuf,
    /// Download-token secret
    pub download_secret: DownloadSecret,
    /// Revoked download tokens
    pub deny_list: TokenDenyList,
    /// Upper bound on the download notifier call
    pub notify_timeout: Duration,
    /// Whop
    pub whop: WhopConfig,
    /// Lemon Squeezy
    pub lemon_squeezy: LemonSqueezyConfig,
    /// Airtable
    pub airtable: AirtableConfig,
}

impl AppConfig {
    /// Load configuration from the process environment
    ///
    /// # Errors
    ///
    /// - `ConfigError::InsecureDownloadSecret` in production without a real
    ///   `DOWNLOAD_SECRET`
    /// - `ConfigError::Invalid` for unparseable values
    pub fn from_env() -> Result<Self, ConfigError> {
        let vars: HashMap<String, String> = std::env::vars().collect();
        Self::from_vars(&vars)
    }

    /// Load configuration from an explicit variable map
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let get = |name: &str| {
            vars.get(name)
                .map(|v| v.trim())
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        };

        let environment = Environment::parse(get("SKILLWIRE_ENV").as_deref())?;

        let download_secret = match get("DOWNLOAD_SECRET") {
            Some(secret) => DownloadSecret::new(secret),
            None => DownloadSecret::fallback(),
        };
        if download_secret.is_fallback() {
            if environment == Environment::Production {
                return Err(ConfigError::InsecureDownloadSecret);
            }
            warn!("DOWNLOAD_SECRET not set: signing download links with the development fallback");
        }

        let deny_list = match get("SKILLWIRE_REVOKED_TOKEN_HASHES") {
            Some(raw) => parse_revoked_hashes(&raw)?,
            None => TokenDenyList::default(),
        };

        let variants = match get("LEMON_SQUEEZY_VARIANTS") {
            Some(raw) => parse_variants(&raw)?,
            None => Vec::new(),
        };

        let config = Self {
            environment,
            app_url: get("SKILLWIRE_APP_URL")
                .unwrap_or_else(|| DEFAULT_APP_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
            downloads_dir: get("SKILLWIRE_DOWNLOADS_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_DOWNLOADS_DIR)),
            download_secret,
            deny_list,
            notify_timeout: Duration::from_secs(10),
            whop: WhopConfig {
                api_key: get("WHOP_API_KEY"),
                api_url: get("WHOP_API_URL").unwrap_or_else(|| DEFAULT_WHOP_API_URL.to_string()),
                webhook_secret: get("WHOP_WEBHOOK_SECRET"),
            },
            lemon_squeezy: LemonSqueezyConfig {
                api_key: get("LEMON_SQUEEZY_API_KEY"),
                store_id: get("LEMON_SQUEEZY_STORE_ID"),
                api_url: get("LEMON_SQUEEZY_API_URL")
                    .unwrap_or_else(|| DEFAULT_LEMON_SQUEEZY_API_URL.to_string()),
                webhook_secret: get("LEMON_SQUEEZY_WEBHOOK_SECRET"),
                variants,
            },
            airtable: AirtableConfig {
                pat: get("AIRTABLE_PAT"),
                base_id: get("AIRTABLE_LEADS_BASE_ID"),
                api_url: get("AIRTABLE_API_URL")
                    .unwrap_or_else(|| DEFAULT_AIRTABLE_API_URL.to_string()),
            },
        };

        config.log_summary();
        Ok(config)
    }

    /// Configuration for tests: nothing external configured
    pub fn test_config() -> Self {
        Self {
            environment: Environment::Development,
            app_url: "https://skillwire.test".to_string(),
            downloads_dir: PathBuf::from(DEFAULT_DOWNLOADS_DIR),
            download_secret: DownloadSecret::new("test-download-secret-for-unit-tests"),
            deny_list: TokenDenyList::default(),
            notify_timeout: Duration::from_secs(2),
            whop: WhopConfig {
                api_key: None,
                api_url: DEFAULT_WHOP_API_URL.to_string(),
                webhook_secret: None,
            },
            lemon_squeezy: LemonSqueezyConfig {
                api_key: None,
                store_id: None,
                api_url: DEFAULT_LEMON_SQUEEZY_API_URL.to_string(),
                webhook_secret: None,
                variants: Vec::new(),
            },
            airtable: AirtableConfig {
                pat: None,
                base_id: None,
                api_url: DEFAULT_AIRTABLE_API_URL.to_string(),
            },
        }
    }

    fn log_summary(&self) {
        info!(
            environment = ?self.environment,
            app_url = %self.app_url,
            downloads_dir = %self.downloads_dir.display(),
            whop_api = self.whop.api_key.is_some(),
            whop_webhook = self.whop.webhook_secret.is_some(),
            lemon_squeezy_checkout = self.lemon_squeezy.checkout_configured(),
            lemon_squeezy_webhook = self.lemon_squeezy.webhook_secret.is_some(),
            lemon_squeezy_variants = self.lemon_squeezy.variants.len(),
            airtable = self.airtable.is_configured(),
            revoked_tokens = self.deny_list.len(),
            "Configuration loaded"
        );
        if self.whop.webhook_secret.is_none() {
            warn!("WHOP_WEBHOOK_SECRET not set: Whop webhooks will be rejected");
        }
        if self.lemon_squeezy.webhook_secret.is_none() {
            warn!("LEMON_SQUEEZY_WEBHOOK_SECRET not set: Lemon Squeezy webhooks will be rejected");
        }
    }
}

/// Parse `slug=variant,slug=variant`
fn parse_variants(raw: &str) -> Result<Vec<(String, String)>, ConfigError> {
    raw.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| {
            let (slug, variant) = entry.split_once('=').ok_or_else(|| ConfigError::Invalid {
                name: "LEMON_SQUEEZY_VARIANTS",
                reason: format!("expected slug=variantId, got '{entry}'"),
            })?;
            let (slug, variant) = (slug.trim(), variant.trim());
            if slug.is_empty() || variant.is_empty() {
                return Err(ConfigError::Invalid {
                    name: "LEMON_SQUEEZY_VARIANTS",
                    reason: format!("empty slug or variant in '{entry}'"),
                });
            }
            Ok((slug.to_string(), variant.to_string()))
        })
        .collect()
}

fn parse_revoked_hashes(raw: &str) -> Result<TokenDenyList, ConfigError> {
    let hashes: Vec<&str> = raw
        .split(',')
        .map(str::trim)
        .filter(|h| !h.is_empty())
        .collect();

    if let Some(bad) = hashes
        .iter()
        .find(|h| h.len() != 64 || !h.chars().all(|c| c.is_ascii_hexdigit()))
    {
        return Err(ConfigError::Invalid {
            name: "SKILLWIRE_REVOKED_TOKEN_HASHES",
            reason: format!("'{bad}' is not a hex SHA-256 digest"),
        });
    }

    Ok(TokenDenyList::from_hashes(hashes))
}
