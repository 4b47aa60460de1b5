// Catalog fields are self-describing
#![allow(missing_docs)]

//! Static storefront catalog.
//!
//! Only the fields the backend needs are kept here: display names for
//! delivery emails and retrieval results, prices for checkout, and the
//! `is_free` flag that gates the lead-capture download.

use serde::Serialize;

/// Skill category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Sales,
    Career,
    Content,
    Automation,
    Devtools,
}

/// A single purchasable skill
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Skill {
    pub slug: &'static str,
    pub name: &'static str,
    pub category: Category,
    /// Price in EUR
    pub price: u32,
    pub is_free: bool,
    /// Only sold as part of a bundle
    pub is_bundle_only: bool,
}

/// A bundle of skills sold together
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Bundle {
    pub slug: &'static str,
    pub name: &'static str,
    /// Price in EUR
    pub bundle_price: u32,
    /// Sum of the individual prices, in EUR
    pub original_price: u32,
    pub skill_slugs: &'static [&'static str],
}

const fn skill(
    slug: &'static str,
    name: &'static str,
    category: Category,
    price: u32,
    is_bundle_only: bool,
) -> Skill {
    Skill {
        slug,
        name,
        category,
        price,
        is_free: price == 0,
        is_bundle_only,
    }
}

static SKILLS: &[Skill] = &[
    skill("ask-to-andrew", "SchoolPath AI", Category::Career, 29, false),
    skill("human-writer", "HumanWriter", Category::Content, 29, false),
    skill("janus", "Janus", Category::Sales, 29, false),
    skill("ask-to-vera", "Vera Career Coach", Category::Career, 49, false),
    skill(
        "ai-b2b-sales-methodology",
        "AI-Powered B2B Sales Methodology",
        Category::Sales,
        149,
        false,
    ),
    skill(
        "b2b-presentation-builder",
        "B2B Presentation Builder",
        Category::Sales,
        79,
        false,
    ),
    skill(
        "deep-research-agent",
        "Deep Research Agent",
        Category::Sales,
        49,
        false,
    ),
    skill("cv-guru", "CV Guru", Category::Career, 19, false),
    skill(
        "n8n-ai-workflow-expert",
        "n8n Workflow Expert",
        Category::Automation,
        39,
        true,
    ),
    skill("n8n-docs-live", "n8n Docs Live", Category::Automation, 19, true),
    skill(
        "n8n-workflow-repository",
        "n8n Workflow Repository",
        Category::Automation,
        29,
        true,
    ),
    skill(
        "iterative-self-critique",
        "Iterative Self-Critique",
        Category::Devtools,
        19,
        false,
    ),
    skill(
        "skill-creator-guru",
        "Skill Creator Guru",
        Category::Devtools,
        0,
        false,
    ),
    skill("memory-manager", "Memory Manager", Category::Devtools, 9, false),
    skill("maia", "MaIA", Category::Devtools, 19, false),
    skill("llm-arena-vs", "LLM Arena VS", Category::Devtools, 9, false),
    skill(
        "content-pipeline-pro",
        "Content Pipeline Pro",
        Category::Content,
        29,
        false,
    ),
    skill(
        "remotion-best-practices",
        "Remotion Best Practices",
        Category::Devtools,
        29,
        false,
    ),
    skill(
        "nano-banana-guru",
        "Nano Banana Guru",
        Category::Devtools,
        29,
        false,
    ),
];

static BUNDLES: &[Bundle] = &[
    Bundle {
        slug: "b2b-sales-pro",
        name: "B2B Sales Pro System",
        bundle_price: 249,
        original_price: 306,
        skill_slugs: &[
            "sales-methodology-pro",
            "b2b-presentation-builder",
            "janus",
            "deep-research-agent",
        ],
    },
    Bundle {
        slug: "career-navigator",
        name: "Career & Life Navigator",
        bundle_price: 79,
        original_price: 126,
        skill_slugs: &["ask-to-vera", "ask-to-andrew", "cv-guru", "human-writer"],
    },
    Bundle {
        slug: "n8n-power-pack",
        name: "n8n Power Pack",
        bundle_price: 69,
        original_price: 106,
        skill_slugs: &[
            "n8n-ai-workflow-expert",
            "n8n-docs-live",
            "n8n-workflow-repository",
            "iterative-self-critique",
        ],
    },
    Bundle {
        slug: "claude-code-mastery",
        name: "Claude Code Mastery",
        bundle_price: 39,
        original_price: 75,
        skill_slugs: &[
            "skill-creator-guru",
            "memory-manager",
            "maia",
            "llm-arena-vs",
            "iterative-self-critique",
        ],
    },
    Bundle {
        slug: "linkedin-toolkit",
        name: "LinkedIn Thought Leadership Toolkit",
        bundle_price: 79,
        original_price: 106,
        skill_slugs: &[
            "content-pipeline-pro",
            "human-writer",
            "janus",
            "competitive-ads-extractor",
        ],
    },
];

/// Read-only view over the storefront catalog
#[derive(Debug, Clone)]
pub struct Catalog {
    skills: &'static [Skill],
    bundles: &'static [Bundle],
}

impl Catalog {
    /// The storefront catalog
    pub fn storefront() -> Self {
        Self {
            skills: SKILLS,
            bundles: BUNDLES,
        }
    }

    pub fn skills(&self) -> &'static [Skill] {
        self.skills
    }

    pub fn bundles(&self) -> &'static [Bundle] {
        self.bundles
    }

    /// Look up a skill by slug
    pub fn skill(&self, slug: &str) -> Option<&'static Skill> {
        self.skills.iter().find(|s| s.slug == slug)
    }

    /// Look up a bundle by slug
    pub fn bundle(&self, slug: &str) -> Option<&'static Bundle> {
        self.bundles.iter().find(|b| b.slug == slug)
    }

    /// Human-readable name: skill, then bundle, then the slug itself.
    pub fn product_name(&self, slug: &str) -> String {
        if let Some(skill) = self.skill(slug) {
            return skill.name.to_string();
        }
        if let Some(bundle) = self.bundle(slug) {
            return bundle.name.to_string();
        }
        slug.to_string()
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::storefront()
    }
}
