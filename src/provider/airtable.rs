//! Airtable storage for leads and reviews.
//!
//! Both tables live in the same base: `Leads` (free-skill downloads) and
//! `Reviews` (star ratings).

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::config::AirtableConfig;
use crate::error::{ProviderError, ProviderResult};
use crate::provider::{check_status, http_client};

const LEADS_TABLE: &str = "Leads";
const REVIEWS_TABLE: &str = "Reviews";

/// A free-skill download request
#[derive(Debug, Clone)]
pub struct Lead<'a> {
    /// Validated email
    pub email: &'a str,
    /// Free skill slug
    pub slug: &'a str,
    /// First `Accept-Language` entry
    pub locale: &'a str,
}

/// A star rating for a skill
#[derive(Debug, Clone)]
pub struct Review<'a> {
    /// Skill slug
    pub slug: &'a str,
    /// 1..=5
    pub rating: u8,
    /// Where the rating was given, `free` by default
    pub source: &'a str,
}

/// Aggregate rating for a skill
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewSummary {
    /// Mean rating rounded to one decimal, `None` without reviews
    pub average_rating: Option<f64>,
    /// Number of valid ratings
    pub review_count: usize,
}

impl ReviewSummary {
    /// No reviews
    pub const EMPTY: Self = Self {
        average_rating: None,
        review_count: 0,
    };

    /// Summarize raw ratings, ignoring anything outside 1..=5
    pub fn from_ratings(ratings: impl IntoIterator<Item = f64>) -> Self {
        let valid: Vec<f64> = ratings
            .into_iter()
            .filter(|r| (1.0..=5.0).contains(r))
            .collect();
        if valid.is_empty() {
            return Self::EMPTY;
        }
        let mean = valid.iter().sum::<f64>() / valid.len() as f64;
        Self {
            average_rating: Some((mean * 10.0).round() / 10.0),
            review_count: valid.len(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ListResponse {
    #[serde(default)]
    records: Vec<Record>,
}

#[derive(Debug, Deserialize)]
struct Record {
    #[serde(default)]
    fields: Value,
}

/// Airtable REST client
#[derive(Clone)]
pub struct AirtableClient {
    http: reqwest::Client,
    api_url: String,
    base_id: String,
    pat: String,
}

impl AirtableClient {
    /// Build from configuration; `None` unless both PAT and base id are set
    pub fn from_config(config: &AirtableConfig) -> ProviderResult<Option<Self>> {
        let (Some(pat), Some(base_id)) = (&config.pat, &config.base_id) else {
            return Ok(None);
        };
        Ok(Some(Self {
            http: http_client()?,
            api_url: config.api_url.trim_end_matches('/').to_string(),
            base_id: base_id.clone(),
            pat: pat.clone(),
        }))
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/v0/{}/{}", self.api_url, self.base_id, table)
    }

    async fn create_record(&self, table: &str, fields: Value) -> ProviderResult<()> {
        let response = self
            .http
            .post(self.table_url(table))
            .bearer_auth(&self.pat)
            .json(&json!({ "records": [{ "fields": fields }] }))
            .send()
            .await?;
        check_status(response).await?;
        Ok(())
    }

    /// Store a lead
    pub async fn save_lead(&self, lead: &Lead<'_>) -> ProviderResult<()> {
        self.create_record(
            LEADS_TABLE,
            json!({
                "Email": lead.email,
                "Skill": lead.slug,
                "Consent": true,
                "Locale": lead.locale,
            }),
        )
        .await
    }

    /// Store a review
    pub async fn save_review(&self, review: &Review<'_>) -> ProviderResult<()> {
        self.create_record(
            REVIEWS_TABLE,
            json!({
                "Skill": review.slug,
                "Rating": review.rating,
                "Source": review.source,
            }),
        )
        .await
    }

    /// Average rating and count for a skill
    pub async fn review_summary(&self, slug: &str) -> ProviderResult<ReviewSummary> {
        let formula = format!("{{Skill}}=\"{}\"", slug.replace('\\', "\\\\").replace('"', "\\\""));
        let response = self
            .http
            .get(self.table_url(REVIEWS_TABLE))
            .bearer_auth(&self.pat)
            .query(&[("filterByFormula", formula.as_str()), ("fields[]", "Rating")])
            .send()
            .await?;
        let response = check_status(response).await?;

        let body: ListResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::UnexpectedResponse(e.to_string()))?;

        Ok(ReviewSummary::from_ratings(
            body.records
                .iter()
                .filter_map(|r| r.fields.get("Rating").and_then(Value::as_f64)),
        ))
    }
}

impl std::fmt::Debug for AirtableClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AirtableClient")
            .field("api_url", &self.api_url)
            .field("base_id", &self.base_id)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use wiremock::matchers::{bearer_token, body_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(api_url: &str) -> AirtableClient {
        let mut config = AppConfig::test_config().airtable;
        config.pat = Some("pat_test".to_string());
        config.base_id = Some("appBASE".to_string());
        config.api_url = api_url.to_string();
        AirtableClient::from_config(&config).unwrap().unwrap()
    }

    #[test]
    fn test_summary_from_ratings() {
        assert_eq!(ReviewSummary::from_ratings(Vec::new()), ReviewSummary::EMPTY);
        assert_eq!(
            ReviewSummary::from_ratings([5.0, 4.0, 4.0]),
            ReviewSummary {
                average_rating: Some(4.3),
                review_count: 3
            }
        );
        // Out-of-range values are ignored
        assert_eq!(
            ReviewSummary::from_ratings([0.0, 6.0, 3.0]),
            ReviewSummary {
                average_rating: Some(3.0),
                review_count: 1
            }
        );
    }

    #[test]
    fn test_unconfigured() {
        let config = AppConfig::test_config().airtable;
        assert!(AirtableClient::from_config(&config).unwrap().is_none());
    }

    #[tokio::test]
    async fn test_save_lead() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v0/appBASE/Leads"))
            .and(bearer_token("pat_test"))
            .and(body_json(json!({
                "records": [{"fields": {
                    "Email": "lead@example.com",
                    "Skill": "skill-creator-guru",
                    "Consent": true,
                    "Locale": "it-IT"
                }}]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"records": []})))
            .expect(1)
            .mount(&server)
            .await;

        client(&server.uri())
            .save_lead(&Lead {
                email: "lead@example.com",
                slug: "skill-creator-guru",
                locale: "it-IT",
            })
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_review_summary() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v0/appBASE/Reviews"))
            .and(query_param("filterByFormula", "{Skill}=\"maia\""))
            .and(query_param("fields[]", "Rating"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "records": [
                    {"fields": {"Rating": 5}},
                    {"fields": {"Rating": 4}},
                    {"fields": {}},
                    {"fields": {"Rating": 9}}
                ]
            })))
            .mount(&server)
            .await;

        let summary = client(&server.uri()).review_summary("maia").await.unwrap();
        assert_eq!(summary.average_rating, Some(4.5));
        assert_eq!(summary.review_count, 2);
    }

    #[tokio::test]
    async fn test_save_review_upstream_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v0/appBASE/Reviews"))
            .respond_with(ResponseTemplate::new(401).set_body_string("bad token"))
            .mount(&server)
            .await;

        let err = client(&server.uri())
            .save_review(&Review {
                slug: "maia",
                rating: 5,
                source: "free",
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::Status { status: 401, .. }));
    }
}
