//! Product registry: slug ↔ payment plan translation.
//!
//! Each payment provider has its own registry (Whop plans, Lemon Squeezy
//! variants). All registries share one [`DownloadableSet`], the slugs that
//! have an archive in the artifact store.
//!
//! Registries are built once at startup and never mutated. Unknown slugs and
//! plan ids yield `None`; callers treat absence as "do not grant".

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::error::RegistryError;

/// Slugs with a `{slug}.zip` archive in the artifact store
static STOREFRONT_DOWNLOADABLE: &[&str] = &[
    "ask-to-andrew",
    "human-writer",
    "janus",
    "ask-to-vera",
    "ai-b2b-sales-methodology",
    "b2b-presentation-builder",
    "deep-research-agent",
    "cv-guru",
    "n8n-ai-workflow-expert",
    "n8n-docs-live",
    "n8n-workflow-repository",
    "iterative-self-critique",
    "skill-creator-guru",
    "memory-manager",
    "maia",
    "llm-arena-vs",
    "content-pipeline-pro",
    "remotion-best-practices",
    "nano-banana-guru",
    // Bundles
    "b2b-sales-pro",
    "career-navigator",
    "n8n-power-pack",
    "claude-code-mastery",
    "linkedin-toolkit",
];

/// Whop plan ids, one per published slug
static WHOP_PLANS: &[(&str, &str)] = &[
    // Skills
    ("ask-to-andrew", "plan_0d4wKLYdVXMHb"),
    ("human-writer", "plan_t1Zmwe6wHBUzJ"),
    ("janus", "plan_dGvHQ3ruuk4CD"),
    ("ask-to-vera", "plan_ru2RnPeBv1PXM"),
    ("ai-b2b-sales-methodology", "plan_3M06gJ3Ztrkfd"),
    ("b2b-presentation-builder", "plan_UYFq7SdtEJydR"),
    ("deep-research-agent", "plan_fD2gbeVTzrZpX"),
    ("cv-guru", "plan_miUiPZ9916CzR"),
    ("n8n-ai-workflow-expert", "plan_bHJU5txZWydMq"),
    ("n8n-docs-live", "plan_fbTN07gMJwsHv"),
    ("n8n-workflow-repository", "plan_9YuLsqE8KeTQZ"),
    ("iterative-self-critique", "plan_kqqqoWFveHUtO"),
    ("skill-creator-guru", "plan_93BCj16Cc4hHu"),
    ("memory-manager", "plan_XviXDXzefwi1F"),
    ("maia", "plan_sHkYk6j2neCu6"),
    ("llm-arena-vs", "plan_2wnUsR8FXQnqU"),
    ("content-pipeline-pro", "plan_orQeX2lHkQpI0"),
    ("remotion-best-practices", "plan_5YYWJZhbnfF99"),
    ("nano-banana-guru", "plan_8fUkM9kpesAK2"),
    ("workspace-architect", "plan_CGUQAu3tBDug1"),
    // Bundles
    ("b2b-sales-pro", "plan_CZQCeLL1eGNKg"),
    ("career-navigator", "plan_9JaBuhfFbNKzy"),
    ("n8n-power-pack", "plan_U2MIsrSamhKay"),
    ("claude-code-mastery", "plan_cu2TlB2SfUdzU"),
    ("linkedin-toolkit", "plan_lApIJEKfzuFyr"),
];

// =============================================================================
// Downloadable Set
// =============================================================================

/// The slugs that may be delivered. Cheap to clone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadableSet {
    slugs: Arc<HashSet<String>>,
}

impl DownloadableSet {
    /// Build a set from arbitrary slugs
    pub fn new<I, S>(slugs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            slugs: Arc::new(slugs.into_iter().map(Into::into).collect()),
        }
    }

    /// The storefront's archives
    pub fn storefront() -> Self {
        Self::new(STOREFRONT_DOWNLOADABLE.iter().copied())
    }

    /// Membership test
    #[inline]
    pub fn contains(&self, slug: &str) -> bool {
        self.slugs.contains(slug)
    }

    /// Number of downloadable slugs
    pub fn len(&self) -> usize {
        self.slugs.len()
    }

    /// Whether the set is empty
    pub fn is_empty(&self) -> bool {
        self.slugs.is_empty()
    }
}

// =============================================================================
// Product Registry
// =============================================================================

/// Bidirectional slug ↔ plan id map for one payment provider.
#[derive(Debug, Clone)]
pub struct ProductRegistry {
    provider: &'static str,
    slug_to_plan: HashMap<String, String>,
    plan_to_slug: HashMap<String, String>,
    downloadable: DownloadableSet,
}

impl ProductRegistry {
    /// Build a registry from `(slug, plan_id)` pairs.
    ///
    /// # Errors
    ///
    /// Fails if a slug or a plan id appears twice, since the two maps would
    /// no longer be exact inverses.
    pub fn new<I, S, P>(
        provider: &'static str,
        pairs: I,
        downloadable: DownloadableSet,
    ) -> Result<Self, RegistryError>
    where
        I: IntoIterator<Item = (S, P)>,
        S: Into<String>,
        P: Into<String>,
    {
        let mut slug_to_plan = HashMap::new();
        let mut plan_to_slug = HashMap::new();

        for (slug, plan_id) in pairs {
            let slug = slug.into();
            let plan_id = plan_id.into();

            if plan_to_slug.contains_key(&plan_id) {
                return Err(RegistryError::DuplicatePlan { plan_id });
            }
            if slug_to_plan.contains_key(&slug) {
                return Err(RegistryError::DuplicateSlug { slug });
            }

            plan_to_slug.insert(plan_id.clone(), slug.clone());
            slug_to_plan.insert(slug, plan_id);
        }

        Ok(Self {
            provider,
            slug_to_plan,
            plan_to_slug,
            downloadable,
        })
    }

    /// The storefront's Whop plans
    pub fn whop(downloadable: DownloadableSet) -> Self {
        // The static table is checked by `test_whop_registry_is_consistent`
        let mut registry = Self {
            provider: "whop",
            slug_to_plan: HashMap::with_capacity(WHOP_PLANS.len()),
            plan_to_slug: HashMap::with_capacity(WHOP_PLANS.len()),
            downloadable,
        };
        for (slug, plan_id) in WHOP_PLANS {
            registry
                .slug_to_plan
                .insert((*slug).to_string(), (*plan_id).to_string());
            registry
                .plan_to_slug
                .insert((*plan_id).to_string(), (*slug).to_string());
        }
        registry
    }

    /// Lemon Squeezy variants, as configured
    pub fn lemon_squeezy(
        variants: &[(String, String)],
        downloadable: DownloadableSet,
    ) -> Result<Self, RegistryError> {
        Self::new(
            "lemon-squeezy",
            variants.iter().map(|(s, v)| (s.as_str(), v.as_str())),
            downloadable,
        )
    }

    /// Provider name, for logs
    pub fn provider(&self) -> &'static str {
        self.provider
    }

    /// Plan id for a slug
    pub fn plan_id_for(&self, slug: &str) -> Option<&str> {
        self.slug_to_plan.get(slug).map(String::as_str)
    }

    /// Slug for a plan id (exact inverse of [`plan_id_for`](Self::plan_id_for))
    pub fn slug_for_plan_id(&self, plan_id: &str) -> Option<&str> {
        self.plan_to_slug.get(plan_id).map(String::as_str)
    }

    /// Whether an archive may be delivered for this slug
    #[inline]
    pub fn is_downloadable(&self, slug: &str) -> bool {
        self.downloadable.contains(slug)
    }

    /// The shared downloadable set
    pub fn downloadable(&self) -> &DownloadableSet {
        &self.downloadable
    }

    /// Number of mapped slugs
    pub fn len(&self) -> usize {
        self.slug_to_plan.len()
    }

    /// Whether no slug is mapped
    pub fn is_empty(&self) -> bool {
        self.slug_to_plan.is_empty()
    }

    /// Iterate `(slug, plan_id)` pairs
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.slug_to_plan
            .iter()
            .map(|(s, p)| (s.as_str(), p.as_str()))
    }
}
