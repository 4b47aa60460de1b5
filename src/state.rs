//! Shared application state
//!
//! Everything here is built once at startup from [`AppConfig`] and is
//! read-only afterwards. Handlers receive it as `State<Arc<AppState>>`.

use std::sync::Arc;
use std::time::Instant;

use crate::catalog::Catalog;
use crate::config::AppConfig;
use crate::entitlement::{EntitlementResolver, MembershipSource};
use crate::error::Result;
use crate::notify::{DownloadNotifier, LoggingNotifier};
use crate::provider::{AirtableClient, LemonSqueezyClient, WhopClient};
use crate::registry::{DownloadableSet, ProductRegistry};
use crate::token::TokenCodec;
use crate::webhook::{EntitlementDispatcher, HmacBodyVerifier, StandardWebhookVerifier};

/// Process-wide, immutable service state
pub struct AppState {
    config: AppConfig,
    start_time: Instant,
    resolver: Arc<EntitlementResolver>,
    whop_registry: ProductRegistry,
    lemon_squeezy_registry: ProductRegistry,
    whop_verifier: StandardWebhookVerifier,
    lemon_squeezy_verifier: HmacBodyVerifier,
    dispatcher: EntitlementDispatcher,
    membership_source: Option<Arc<dyn MembershipSource>>,
    lemon_squeezy: LemonSqueezyClient,
    airtable: Option<AirtableClient>,
}

impl AppState {
    /// Build state with the logging notifier
    pub fn new(config: AppConfig) -> Result<Self> {
        Self::with_notifier(config, Arc::new(LoggingNotifier))
    }

    /// Build state with an explicit notifier
    ///
    /// # Errors
    ///
    /// Fails if the Lemon Squeezy variant map is inconsistent or an HTTP
    /// client cannot be built.
    pub fn with_notifier(config: AppConfig, notifier: Arc<dyn DownloadNotifier>) -> Result<Self> {
        let downloadable = DownloadableSet::storefront();

        let codec = TokenCodec::new(config.download_secret.clone(), downloadable.clone())
            .with_deny_list(config.deny_list.clone());
        let resolver = Arc::new(EntitlementResolver::new(
            codec,
            Catalog::storefront(),
            config.app_url.clone(),
        ));

        let whop_registry = ProductRegistry::whop(downloadable.clone());
        let lemon_squeezy_registry =
            ProductRegistry::lemon_squeezy(&config.lemon_squeezy.variants, downloadable)?;

        let dispatcher =
            EntitlementDispatcher::new(resolver.clone(), notifier, config.notify_timeout);

        let membership_source = WhopClient::from_config(&config.whop)?
            .map(|client| Arc::new(client) as Arc<dyn MembershipSource>);

        Ok(Self {
            whop_verifier: StandardWebhookVerifier::new(config.whop.webhook_secret.as_deref()),
            lemon_squeezy_verifier: HmacBodyVerifier::new(
                config.lemon_squeezy.webhook_secret.as_deref(),
            ),
            lemon_squeezy: LemonSqueezyClient::new(&config.lemon_squeezy, config.app_url.clone()),
            airtable: AirtableClient::from_config(&config.airtable)?,
            start_time: Instant::now(),
            resolver,
            whop_registry,
            lemon_squeezy_registry,
            dispatcher,
            membership_source,
            config,
        })
    }

    /// Replace the membership source (retrieval path)
    pub fn with_membership_source(mut self, source: Arc<dyn MembershipSource>) -> Self {
        self.membership_source = Some(source);
        self
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Seconds since startup
    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    pub fn resolver(&self) -> &EntitlementResolver {
        &self.resolver
    }

    pub fn codec(&self) -> &TokenCodec {
        self.resolver.codec()
    }

    pub fn catalog(&self) -> &Catalog {
        self.resolver.catalog()
    }

    pub fn whop_registry(&self) -> &ProductRegistry {
        &self.whop_registry
    }

    pub fn lemon_squeezy_registry(&self) -> &ProductRegistry {
        &self.lemon_squeezy_registry
    }

    pub fn whop_verifier(&self) -> &StandardWebhookVerifier {
        &self.whop_verifier
    }

    pub fn lemon_squeezy_verifier(&self) -> &HmacBodyVerifier {
        &self.lemon_squeezy_verifier
    }

    pub fn dispatcher(&self) -> &EntitlementDispatcher {
        &self.dispatcher
    }

    /// `None` when the Whop API key is missing
    pub fn membership_source(&self) -> Option<&dyn MembershipSource> {
        self.membership_source.as_deref()
    }

    pub fn lemon_squeezy(&self) -> &LemonSqueezyClient {
        &self.lemon_squeezy
    }

    /// `None` unless Airtable is configured
    pub fn airtable(&self) -> Option<&AirtableClient> {
        self.airtable.as_ref()
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("app_url", &self.config.app_url)
            .field("whop_products", &self.whop_registry.len())
            .field("lemon_squeezy_products", &self.lemon_squeezy_registry.len())
            .field("retrieval", &self.membership_source.is_some())
            .field("airtable", &self.airtable.is_some())
            .finish_non_exhaustive()
    }
}
