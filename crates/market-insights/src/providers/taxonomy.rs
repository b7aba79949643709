use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use tracing::debug;
use url::Url;

use super::ProviderError;
use crate::config::SkillsConfig;
use crate::workflows::market::{TaxonomyApi, TitleMatch};

const TAXONOMY_TIMEOUT: Duration = Duration::from_secs(10);

/// Title normalization and title detail lookups (bearer auth).
#[derive(Debug, Clone)]
pub struct TitlesClient {
    http: Client,
    base_url: Url,
}

impl TitlesClient {
    pub fn new(config: &SkillsConfig) -> Result<Self, ProviderError> {
        let http = Client::builder()
            .build()
            .map_err(|err| ProviderError::Client(err.to_string()))?;
        let base_url = Url::parse(&format!("{}/", config.api_base_url.trim_end_matches('/')))?;
        Ok(Self { http, base_url })
    }

    fn url(&self, segments: &[&str]) -> Result<Url, ProviderError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ProviderError::Client("taxonomy base url cannot carry a path".into()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }
}

#[async_trait]
impl TaxonomyApi for TitlesClient {
    async fn normalize_title(
        &self,
        token: &str,
        title: &str,
    ) -> Result<Option<TitleMatch>, ProviderError> {
        let url = self.url(&["versions", "latest", "normalize"])?;
        debug!(%url, "normalizing job title");

        let body: Value = self
            .http
            .post(url)
            .bearer_auth(token)
            .json(&json!({ "term": title }))
            .timeout(TAXONOMY_TIMEOUT)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(parse_title_match(&body))
    }

    async fn title_skills(
        &self,
        token: &str,
        taxonomy_id: &str,
    ) -> Result<Option<Vec<String>>, ProviderError> {
        let url = self.url(&["versions", "latest", "titles", taxonomy_id])?;
        debug!(%url, "fetching title skill mapping");

        let body: Value = self
            .http
            .get(url)
            .bearer_auth(token)
            .timeout(TAXONOMY_TIMEOUT)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(extract_skill_names(&body))
    }
}

/// `{"data": {"id": .., "name": ..}}`; blank ids count as no match.
pub(crate) fn parse_title_match(body: &Value) -> Option<TitleMatch> {
    let data = body.get("data")?;
    let id = data.get("id")?.as_str()?.trim();
    if id.is_empty() {
        return None;
    }
    let name = data
        .get("name")
        .and_then(Value::as_str)
        .unwrap_or(id)
        .to_string();
    Some(TitleMatch {
        id: id.to_string(),
        name,
    })
}

/// Names under `data.mapping.skills[].name`, in provider order.
pub(crate) fn extract_skill_names(body: &Value) -> Option<Vec<String>> {
    let skills = body
        .get("data")?
        .get("mapping")?
        .get("skills")?
        .as_array()?;
    Some(
        skills
            .iter()
            .filter_map(|skill| skill.get("name").and_then(Value::as_str))
            .map(str::to_string)
            .collect(),
    )
}
