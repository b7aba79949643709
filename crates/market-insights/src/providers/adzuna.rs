use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

use super::ProviderError;
use crate::config::JobSearchConfig;
use crate::workflows::market::{HistogramPayload, JobBoard, SearchPage, SearchQuery};

const SEARCH_TIMEOUT: Duration = Duration::from_secs(20);
const HISTOGRAM_TIMEOUT: Duration = Duration::from_secs(15);

/// Job search and salary histogram client keyed by an app id / app key pair.
#[derive(Clone)]
pub struct AdzunaClient {
    http: Client,
    app_id: String,
    app_key: String,
    base_url: String,
}

impl AdzunaClient {
    pub fn new(config: &JobSearchConfig) -> Result<Self, ProviderError> {
        let http = Client::builder()
            .build()
            .map_err(|err| ProviderError::Client(err.to_string()))?;
        Ok(Self::with_client(http, config))
    }

    pub fn with_client(http: Client, config: &JobSearchConfig) -> Self {
        Self {
            http,
            app_id: config.app_id.clone(),
            app_key: config.app_key.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
        }
    }

    fn endpoint(&self, country: &str, path: &str) -> String {
        format!(
            "{}/{}/{}",
            self.base_url,
            country.to_ascii_lowercase(),
            path
        )
    }
}

impl std::fmt::Debug for AdzunaClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdzunaClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl JobBoard for AdzunaClient {
    async fn search(
        &self,
        query: &SearchQuery,
        page_size: u32,
    ) -> Result<SearchPage, ProviderError> {
        let url = self.endpoint(query.country(), "search/1");
        let page_size = page_size.to_string();
        debug!(%url, "requesting job search page");

        let response = self
            .http
            .get(&url)
            .query(&[
                ("app_id", self.app_id.as_str()),
                ("app_key", self.app_key.as_str()),
                ("what", query.what()),
                ("where", query.location()),
                ("results_per_page", page_size.as_str()),
                ("content-type", "application/json"),
            ])
            .timeout(SEARCH_TIMEOUT)
            .send()
            .await?
            .error_for_status()?;

        Ok(response.json::<SearchPage>().await?)
    }

    async fn histogram(&self, query: &SearchQuery) -> Result<HistogramPayload, ProviderError> {
        let url = self.endpoint(query.country(), "histogram");
        debug!(%url, "requesting salary histogram");

        let response = self
            .http
            .get(&url)
            .query(&[
                ("app_id", self.app_id.as_str()),
                ("app_key", self.app_key.as_str()),
                ("location0", query.location()),
                ("what", query.what()),
                ("content-type", "application/json"),
            ])
            .timeout(HISTOGRAM_TIMEOUT)
            .send()
            .await?
            .error_for_status()?;

        Ok(response.json::<HistogramPayload>().await?)
    }
}
