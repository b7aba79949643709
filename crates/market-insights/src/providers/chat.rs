use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, warn};

use super::ProviderError;
use crate::config::NarrativeConfig;
use crate::workflows::market::{CompletionRequest, TextGenerator};

const COMPLETION_TIMEOUT: Duration = Duration::from_secs(30);

/// Azure-style chat completion client authenticated by an `api-key` header.
#[derive(Clone)]
pub struct AzureChatClient {
    http: Client,
    endpoint: String,
}

impl AzureChatClient {
    pub fn new(config: &NarrativeConfig) -> Result<Self, ProviderError> {
        let mut headers = HeaderMap::new();
        let mut api_key = HeaderValue::from_str(config.api_key.trim())
            .map_err(|_| ProviderError::Client("invalid chat completion api key".to_string()))?;
        api_key.set_sensitive(true);
        headers.insert("api-key", api_key);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let http = Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|err| ProviderError::Client(err.to_string()))?;

        Ok(Self {
            http,
            endpoint: config.endpoint.clone(),
        })
    }
}

impl std::fmt::Debug for AzureChatClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AzureChatClient")
            .field("endpoint", &self.endpoint)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl TextGenerator for AzureChatClient {
    async fn complete(&self, request: &CompletionRequest) -> Result<Option<String>, ProviderError> {
        debug!(endpoint = %self.endpoint, "sending chat completion request");

        let response: ChatCompletionResponse = self
            .http
            .post(&self.endpoint)
            .json(request)
            .timeout(COMPLETION_TIMEOUT)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let content = response.first_content();
        if content.is_none() {
            warn!("chat completion response carried no message content");
        }
        Ok(content)
    }
}

#[derive(Debug, Default, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    #[serde(default)]
    message: Option<ChoiceMessage>,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

impl ChatCompletionResponse {
    fn first_content(self) -> Option<String> {
        self.choices
            .into_iter()
            .next()?
            .message?
            .content
            .map(|content| content.trim().to_string())
            .filter(|content| !content.is_empty())
    }
}
