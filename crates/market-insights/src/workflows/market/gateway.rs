//! Boundaries between the insight pipeline and its upstream providers.
//!
//! Each trait is implemented by an HTTP client under [`crate::providers`] and by
//! in-memory fakes in tests, so the pipeline never depends on a live network.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use super::domain::SearchQuery;
use crate::providers::ProviderError;

/// Job search and salary histogram provider.
#[async_trait]
pub trait JobBoard: Send + Sync {
    async fn search(&self, query: &SearchQuery, page_size: u32)
        -> Result<SearchPage, ProviderError>;

    async fn histogram(&self, query: &SearchQuery) -> Result<HistogramPayload, ProviderError>;
}

/// OAuth2 client-credentials exchange for the taxonomy provider.
#[async_trait]
pub trait TokenIssuer: Send + Sync {
    async fn exchange(&self) -> Result<IssuedToken, ProviderError>;
}

/// Job-title taxonomy lookups. Both calls are bearer-token authenticated.
#[async_trait]
pub trait TaxonomyApi: Send + Sync {
    /// Best single taxonomy match for a free-text title, if any.
    async fn normalize_title(
        &self,
        token: &str,
        title: &str,
    ) -> Result<Option<TitleMatch>, ProviderError>;

    /// Skill names mapped to a taxonomy id. `None` when the mapping is absent.
    async fn title_skills(
        &self,
        token: &str,
        taxonomy_id: &str,
    ) -> Result<Option<Vec<String>>, ProviderError>;
}

/// Chat-completion endpoint. Returns the first choice's message content.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn complete(&self, request: &CompletionRequest) -> Result<Option<String>, ProviderError>;
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchPage {
    #[serde(default)]
    pub count: u64,
    /// Entries that are not objects are dropped instead of failing the page.
    #[serde(default, deserialize_with = "lenient_results")]
    pub results: Vec<RawJobResult>,
}

/// One search hit. Fields with an unexpected JSON type decode as absent.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawJobResult {
    #[serde(default, deserialize_with = "lenient_string")]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "lenient_display_name")]
    pub company: Option<DisplayName>,
    #[serde(default, deserialize_with = "lenient_display_name")]
    pub location: Option<DisplayName>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub redirect_url: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub created: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DisplayName {
    #[serde(default, deserialize_with = "lenient_string")]
    pub display_name: Option<String>,
}

fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(text)) => Some(text),
        _ => None,
    })
}

fn lenient_display_name<'de, D>(deserializer: D) -> Result<Option<DisplayName>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Value>::deserialize(deserializer)?
        .filter(Value::is_object)
        .and_then(|value| serde_json::from_value(value).ok()))
}

fn lenient_results<'de, D>(deserializer: D) -> Result<Vec<RawJobResult>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<Vec<Value>>::deserialize(deserializer)?.unwrap_or_default();
    Ok(raw
        .into_iter()
        .filter(Value::is_object)
        .filter_map(|value| serde_json::from_value(value).ok())
        .collect())
}

/// Raw histogram body. Counts stay untyped until the aggregator cleans them.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HistogramPayload {
    #[serde(default)]
    pub histogram: Option<BTreeMap<String, serde_json::Value>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IssuedToken {
    pub access_token: String,
    pub expires_in: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TitleMatch {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct CompletionRequest {
    pub messages: Vec<ChatMessage>,
    pub max_tokens: u32,
    pub temperature: f32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatMessage {
    pub role: &'static str,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system",
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user",
            content: content.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn malformed_fields_decode_as_absent() {
        let page: SearchPage = serde_json::from_value(json!({
            "count": 3,
            "results": [
                {
                    "title": 42,
                    "description": { "html": "<p>care</p>" },
                    "company": "Mass General",
                    "location": { "display_name": ["Boston"] },
                    "redirect_url": "https://www.adzuna.com/land/ad/4100000001"
                },
                null,
                "not a job",
                { "title": "Travel Nurse", "description": "Rotating shifts." }
            ]
        }))
        .expect("page decodes despite malformed entries");

        assert_eq!(page.count, 3);
        assert_eq!(page.results.len(), 2);

        let first = &page.results[0];
        assert!(first.title.is_none());
        assert!(first.description.is_none());
        assert!(first.company.is_none());
        assert!(first
            .location
            .as_ref()
            .is_some_and(|location| location.display_name.is_none()));
        assert_eq!(
            first.redirect_url.as_deref(),
            Some("https://www.adzuna.com/land/ad/4100000001")
        );

        assert_eq!(page.results[1].title.as_deref(), Some("Travel Nurse"));
        assert_eq!(page.results[1].description.as_deref(), Some("Rotating shifts."));
    }

    #[test]
    fn null_results_decode_as_empty_page() {
        let page: SearchPage =
            serde_json::from_value(json!({ "count": 0, "results": null })).expect("decodes");
        assert!(page.results.is_empty());
    }
}
