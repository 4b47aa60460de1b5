//! Entitlement resolution
//!
//! Turns a payment signal into the `(name, slug, downloadUrl)` triples a
//! purchaser receives. Three paths feed it:
//!
//! ```text
//! Webhook event ──▶ plan id ──┐
//! Redirect ──▶ membership id ─┤
//!                             ├──▶ Registry ──▶ Downloadable? ──▶ TokenCodec ──▶ Entitlement
//! Email ──▶ MembershipSource ─┘    (plan→slug)                   (signed URL)
//!            (paged, bounded)
//! ```
//!
//! A redirect only carries a plan id, which is public. It yields a link
//! only when the accompanying membership id resolves upstream to a valid
//! membership on that same plan.
//!
//! The retrieval path deduplicates by slug (first occurrence wins) and
//! degrades to partial results when the membership source fails mid-way.

use std::collections::HashSet;

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::catalog::Catalog;
use crate::error::{ProviderResult, RetrievalError};
use crate::registry::ProductRegistry;
use crate::token::TokenCodec;

/// Upper bound on membership pages fetched per retrieval
pub const MAX_PAGES: u32 = 20;

/// Membership email locations, tried in order
const MEMBERSHIP_EMAIL: &[&str] = &["/email", "/user/email"];

/// Membership plan locations, tried in order. `plan` is usually a bare id.
const MEMBERSHIP_PLAN: &[&str] = &["/plan", "/plan_id", "/plan/id"];

/// A product the purchaser may download, with a freshly signed link
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Entitlement {
    /// Display name
    pub name: String,
    /// Product slug
    pub slug: String,
    /// Absolute signed download URL
    pub download_url: String,
}

/// One page of raw membership records
#[derive(Debug, Clone, Default)]
pub struct MembershipPage {
    /// Records as returned by the provider
    pub memberships: Vec<Value>,
    /// Whether the provider reports another page
    pub has_next: bool,
}

/// Read-only view over a provider's membership list
#[async_trait::async_trait]
pub trait MembershipSource: Send + Sync {
    /// Fetch page `page_num` (1-based)
    async fn fetch_page(&self, page_num: u32) -> ProviderResult<MembershipPage>;

    /// Fetch one membership by id; `None` when the provider does not know it
    async fn fetch_membership(&self, membership_id: &str) -> ProviderResult<Option<Value>>;
}

/// Provider membership ids are short ASCII identifiers such as `mem_1a2B`
pub fn is_membership_id(id: &str) -> bool {
    !id.is_empty()
        && id.len() <= 64
        && id.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-')
}

/// First non-empty string (or number, stringified) found at `pointers`
pub fn first_string(value: &Value, pointers: &[&str]) -> Option<String> {
    pointers.iter().find_map(|pointer| match value.pointer(pointer) {
        Some(Value::String(s)) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

/// Trim and lowercase an email for comparison
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Builds entitlements from plan ids or membership lookups
#[derive(Debug, Clone)]
pub struct EntitlementResolver {
    codec: TokenCodec,
    catalog: Catalog,
    base_url: String,
}

impl EntitlementResolver {
    /// Create a resolver issuing absolute links under `base_url`
    pub fn new(codec: TokenCodec, catalog: Catalog, base_url: impl Into<String>) -> Self {
        Self {
            codec,
            catalog,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// The token codec in use
    pub fn codec(&self) -> &TokenCodec {
        &self.codec
    }

    /// The catalog in use
    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Public base URL, without trailing slash
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Signed absolute download URL for `slug`. Does not check downloadability.
    pub fn download_url(&self, slug: &str) -> String {
        let issued = self.codec.issue(slug);
        TokenCodec::absolute_url(&self.base_url, &issued)
    }

    /// Entitlement for a slug, or `None` if it is not downloadable
    pub fn entitle(&self, registry: &ProductRegistry, slug: &str) -> Option<Entitlement> {
        if !registry.is_downloadable(slug) {
            return None;
        }
        Some(Entitlement {
            name: self.catalog.product_name(slug),
            slug: slug.to_string(),
            download_url: self.download_url(slug),
        })
    }

    /// Webhook path: plan id to entitlement
    pub fn resolve_plan(&self, registry: &ProductRegistry, plan_id: &str) -> Option<Entitlement> {
        let Some(slug) = registry.slug_for_plan_id(plan_id) else {
            debug!(provider = registry.provider(), plan_id, "Plan not mapped to a product");
            return None;
        };
        let entitlement = self.entitle(registry, slug);
        if entitlement.is_none() {
            debug!(provider = registry.provider(), plan_id, slug, "Product has no archive");
        }
        entitlement
    }

    /// Redirect path: entitlement for `plan_id`, proven by `membership_id`.
    ///
    /// Returns `None` unless the provider reports a membership with that id
    /// on the same plan that has not been marked invalid. Lookup failures
    /// are logged and treated as unproven.
    pub async fn verify_purchase(
        &self,
        source: &dyn MembershipSource,
        registry: &ProductRegistry,
        plan_id: &str,
        membership_id: &str,
    ) -> Option<Entitlement> {
        if !is_membership_id(membership_id) {
            debug!("Malformed membership id on redirect");
            return None;
        }

        let membership = match source.fetch_membership(membership_id).await {
            Ok(Some(membership)) => membership,
            Ok(None) => {
                debug!(plan_id, "Membership not found");
                return None;
            }
            Err(e) => {
                warn!(plan_id, error = %e, "Membership lookup failed");
                return None;
            }
        };

        if membership.pointer("/valid") == Some(&Value::Bool(false)) {
            debug!(plan_id, "Membership is no longer valid");
            return None;
        }
        if first_string(&membership, MEMBERSHIP_PLAN).as_deref() != Some(plan_id) {
            warn!(plan_id, "Membership does not belong to the requested plan");
            return None;
        }

        self.resolve_plan(registry, plan_id)
    }

    /// Retrieval path: every downloadable product held by `email`.
    ///
    /// # Errors
    ///
    /// `RetrievalError::ServiceUnavailable` when `source` is `None`; no
    /// request is made in that case. Upstream failures are not errors: paging
    /// stops and the results gathered so far are returned.
    pub async fn retrieve(
        &self,
        email: &str,
        source: Option<&dyn MembershipSource>,
        registry: &ProductRegistry,
    ) -> Result<Vec<Entitlement>, RetrievalError> {
        let source = source.ok_or(RetrievalError::ServiceUnavailable)?;
        let wanted = normalize_email(email);

        let mut results = Vec::new();
        let mut seen = HashSet::new();

        for page_num in 1..=MAX_PAGES {
            let page = match source.fetch_page(page_num).await {
                Ok(page) => page,
                Err(e) => {
                    warn!(
                        page_num,
                        collected = results.len(),
                        error = %e,
                        "Membership lookup failed, returning partial results"
                    );
                    break;
                }
            };

            for membership in &page.memberships {
                let Some(member_email) = first_string(membership, MEMBERSHIP_EMAIL) else {
                    continue;
                };
                if member_email.to_lowercase() != wanted {
                    continue;
                }
                let Some(plan_id) = first_string(membership, MEMBERSHIP_PLAN) else {
                    continue;
                };
                let Some(slug) = registry.slug_for_plan_id(&plan_id) else {
                    continue;
                };
                if seen.contains(slug) {
                    continue;
                }
                if let Some(entitlement) = self.entitle(registry, slug) {
                    seen.insert(slug.to_string());
                    results.push(entitlement);
                }
            }

            if !page.has_next || page.memberships.is_empty() {
                break;
            }
        }

        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProviderError;
    use crate::registry::DownloadableSet;
    use crate::token::DownloadSecret;
    use serde_json::json;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// In-memory source with an optional failing page
    struct FakeSource {
        pages: Vec<Vec<Value>>,
        fail_on: Option<u32>,
        endless: bool,
        calls: AtomicU32,
    }

    impl FakeSource {
        fn new(pages: Vec<Vec<Value>>) -> Self {
            Self {
                pages,
                fail_on: None,
                endless: false,
                calls: AtomicU32::new(0),
            }
        }

        fn calls(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait::async_trait]
    impl MembershipSource for FakeSource {
        async fn fetch_page(&self, page_num: u32) -> ProviderResult<MembershipPage> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_on == Some(page_num) {
                return Err(ProviderError::Status {
                    status: 500,
                    body: "boom".to_string(),
                });
            }
            if self.endless {
                return Ok(MembershipPage {
                    memberships: vec![json!({"email": "x@example.com", "plan": "plan_x"})],
                    has_next: true,
                });
            }
            let idx = (page_num - 1) as usize;
            Ok(MembershipPage {
                memberships: self.pages.get(idx).cloned().unwrap_or_default(),
                has_next: idx + 1 < self.pages.len(),
            })
        }

        async fn fetch_membership(&self, membership_id: &str) -> ProviderResult<Option<Value>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_on.is_some() {
                return Err(ProviderError::Status {
                    status: 502,
                    body: "bad gateway".to_string(),
                });
            }
            Ok(self
                .pages
                .iter()
                .flatten()
                .find(|m| m.pointer("/id").and_then(Value::as_str) == Some(membership_id))
                .cloned())
        }
    }

    fn resolver() -> EntitlementResolver {
        let codec = TokenCodec::new(DownloadSecret::new("resolver-secret"), DownloadableSet::storefront());
        EntitlementResolver::new(codec, Catalog::storefront(), "https://skillwire.test/")
    }

    fn registry() -> ProductRegistry {
        ProductRegistry::whop(DownloadableSet::storefront())
    }

    #[test]
    fn test_first_string_strategies() {
        let value = json!({"data": {"plan": {"id": "plan_1"}, "variant": 42, "empty": ""}});
        assert_eq!(
            first_string(&value, &["/data/plan_id", "/data/plan/id", "/data/plan"]),
            Some("plan_1".to_string())
        );
        assert_eq!(first_string(&value, &["/data/variant"]), Some("42".to_string()));
        assert_eq!(first_string(&value, &["/data/empty", "/data/missing"]), None);
    }

    #[test]
    fn test_resolve_plan() {
        let resolver = resolver();
        let registry = registry();

        let entitlement = resolver.resolve_plan(&registry, "plan_t1Zmwe6wHBUzJ").unwrap();
        assert_eq!(entitlement.slug, "human-writer");
        assert_eq!(entitlement.name, "HumanWriter");
        assert!(entitlement
            .download_url
            .starts_with("https://skillwire.test/api/download/"));
        assert!(entitlement.download_url.contains("slug=human-writer&exp="));

        assert!(resolver.resolve_plan(&registry, "plan_unknown").is_none());
        // Mapped, but no archive
        assert!(resolver.resolve_plan(&registry, "plan_CGUQAu3tBDug1").is_none());
    }

    #[tokio::test]
    async fn test_verify_purchase_requires_matching_membership() {
        let source = FakeSource::new(vec![vec![
            json!({"id": "mem_paid", "plan": "plan_t1Zmwe6wHBUzJ", "valid": true}),
            json!({"id": "mem_other", "plan": "plan_dGvHQ3ruuk4CD", "valid": true}),
            json!({"id": "mem_lapsed", "plan": "plan_t1Zmwe6wHBUzJ", "valid": false}),
        ]]);
        let resolver = resolver();
        let registry = registry();
        let plan = "plan_t1Zmwe6wHBUzJ";

        let entitlement = resolver
            .verify_purchase(&source, &registry, plan, "mem_paid")
            .await
            .unwrap();
        assert_eq!(entitlement.slug, "human-writer");

        // Real membership, different plan
        assert!(resolver.verify_purchase(&source, &registry, plan, "mem_other").await.is_none());
        assert!(resolver.verify_purchase(&source, &registry, plan, "mem_lapsed").await.is_none());
        assert!(resolver.verify_purchase(&source, &registry, plan, "mem_unknown").await.is_none());
        assert_eq!(source.calls(), 4);

        // Rejected before any lookup
        assert!(resolver.verify_purchase(&source, &registry, plan, "../v1/me").await.is_none());
        assert!(resolver.verify_purchase(&source, &registry, plan, "").await.is_none());
        assert_eq!(source.calls(), 4);
    }

    #[tokio::test]
    async fn test_verify_purchase_lookup_failure_issues_nothing() {
        let mut source = FakeSource::new(vec![vec![json!({"id": "mem_paid", "plan": "plan_t1Zmwe6wHBUzJ"})]]);
        source.fail_on = Some(1);
        assert!(resolver()
            .verify_purchase(&source, &registry(), "plan_t1Zmwe6wHBUzJ", "mem_paid")
            .await
            .is_none());
    }

    #[test]
    fn test_is_membership_id() {
        assert!(is_membership_id("mem_A1b2-C3"));
        assert!(!is_membership_id(""));
        assert!(!is_membership_id("mem/../x"));
        assert!(!is_membership_id("mem 1"));
        assert!(!is_membership_id(&"m".repeat(65)));
    }

    #[tokio::test]
    async fn test_retrieve_deduplicates_by_slug() {
        let source = FakeSource::new(vec![
            vec![
                json!({"email": "Buyer@Example.com", "plan": "plan_t1Zmwe6wHBUzJ"}),
                json!({"email": "someone@else.com", "plan": "plan_dGvHQ3ruuk4CD"}),
            ],
            vec![
                json!({"user": {"email": "buyer@example.com"}, "plan_id": "plan_t1Zmwe6wHBUzJ"}),
                json!({"user": {"email": "buyer@example.com"}, "plan": {"id": "plan_dGvHQ3ruuk4CD"}}),
            ],
        ]);

        let results = resolver()
            .retrieve("  buyer@example.com ", Some(&source), &registry())
            .await
            .unwrap();

        let slugs: Vec<_> = results.iter().map(|e| e.slug.as_str()).collect();
        assert_eq!(slugs, vec!["human-writer", "janus"]);
        assert_eq!(source.calls(), 2);
    }

    #[tokio::test]
    async fn test_retrieve_no_matches_is_empty() {
        let source = FakeSource::new(vec![vec![json!({"email": "a@b.com", "plan": "plan_t1Zmwe6wHBUzJ"})]]);
        let results = resolver()
            .retrieve("nobody@example.com", Some(&source), &registry())
            .await
            .unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn test_retrieve_without_source_is_unavailable() {
        let err = resolver()
            .retrieve("buyer@example.com", None, &registry())
            .await
            .unwrap_err();
        assert!(matches!(err, RetrievalError::ServiceUnavailable));
    }

    #[tokio::test]
    async fn test_retrieve_keeps_partial_results_on_error() {
        let mut source = FakeSource::new(vec![
            vec![json!({"email": "buyer@example.com", "plan": "plan_sHkYk6j2neCu6"})],
            vec![],
            vec![],
        ]);
        source.fail_on = Some(2);

        let results = resolver()
            .retrieve("buyer@example.com", Some(&source), &registry())
            .await
            .unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].slug, "maia");
        assert_eq!(source.calls(), 2);
    }

    #[tokio::test]
    async fn test_retrieve_page_limit() {
        let mut source = FakeSource::new(Vec::new());
        source.endless = true;

        let results = resolver()
            .retrieve("buyer@example.com", Some(&source), &registry())
            .await
            .unwrap();
        assert!(results.is_empty());
        assert_eq!(source.calls(), MAX_PAGES);
    }

    #[tokio::test]
    async fn test_retrieve_skips_non_downloadable() {
        let source = FakeSource::new(vec![vec![
            json!({"email": "buyer@example.com", "plan": "plan_CGUQAu3tBDug1"}),
            json!({"email": "buyer@example.com"}),
            json!({"plan": "plan_t1Zmwe6wHBUzJ"}),
        ]]);
        let results = resolver()
            .retrieve("buyer@example.com", Some(&source), &registry())
            .await
            .unwrap();
        assert!(results.is_empty());
    }

    #[test]
    fn test_entitlement_serializes_camel_case() {
        let entitlement = Entitlement {
            name: "Janus".to_string(),
            slug: "janus".to_string(),
            download_url: "u".to_string(),
        };
        assert_eq!(
            serde_json::to_value(&entitlement).unwrap(),
            json!({"name": "Janus", "slug": "janus", "downloadUrl": "u"})
        );
    }
}
