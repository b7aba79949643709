use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

use super::ProviderError;
use crate::config::SkillsConfig;
use crate::workflows::market::{IssuedToken, TokenIssuer};

const TOKEN_TIMEOUT: Duration = Duration::from_secs(10);

/// OAuth2 client-credentials grant against the taxonomy auth endpoint.
#[derive(Clone)]
pub struct ClientCredentialsIssuer {
    http: Client,
    auth_url: String,
    client_id: String,
    client_secret: String,
    scope: String,
}

impl ClientCredentialsIssuer {
    pub fn new(config: &SkillsConfig) -> Result<Self, ProviderError> {
        let http = Client::builder()
            .build()
            .map_err(|err| ProviderError::Client(err.to_string()))?;
        Ok(Self {
            http,
            auth_url: config.auth_url.clone(),
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
            scope: config.scope.clone(),
        })
    }
}

impl std::fmt::Debug for ClientCredentialsIssuer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientCredentialsIssuer")
            .field("auth_url", &self.auth_url)
            .field("scope", &self.scope)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl TokenIssuer for ClientCredentialsIssuer {
    async fn exchange(&self) -> Result<IssuedToken, ProviderError> {
        debug!(auth_url = %self.auth_url, "exchanging client credentials");

        let response = self
            .http
            .post(&self.auth_url)
            .form(&[
                ("grant_type", "client_credentials"),
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("scope", self.scope.as_str()),
            ])
            .timeout(TOKEN_TIMEOUT)
            .send()
            .await?
            .error_for_status()?;

        Ok(response.json::<IssuedToken>().await?)
    }
}
