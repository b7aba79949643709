use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};

use super::domain::{InsightRequest, MarketInsights};
use super::narrative::NarrativeSummarizer;
use super::salary::SalaryAggregator;
use super::search::JobSearchClient;
use super::skills::SkillExtractor;
use super::token::TokenCache;
use crate::config::ProvidersConfig;
use crate::providers::{
    AdzunaClient, AzureChatClient, ClientCredentialsIssuer, ProviderError, TitlesClient,
};

/// Listings handed to the narrative prompt.
pub const NARRATIVE_SAMPLE_SIZE: usize = 10;

/// Fatal pipeline failures. Everything else degrades to an absent section.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InsightsError {
    #[error("job search provider credentials are not configured")]
    MissingCredentials,
    #[error("job search request timed out")]
    SearchTimeout,
    #[error("job search provider returned HTTP {status}")]
    SearchStatus { status: u16 },
    #[error("could not reach job search provider: {0}")]
    SearchConnection(String),
    #[error("unexpected job search response: {0}")]
    SearchResponse(String),
}

impl InsightsError {
    pub fn user_message(&self) -> String {
        match self {
            InsightsError::MissingCredentials => {
                "Job search API credentials not configured.".to_string()
            }
            InsightsError::SearchTimeout => {
                "Job search request timed out. Please try again.".to_string()
            }
            InsightsError::SearchStatus { status } => format!(
                "Job search API error ({status}). Please check search terms or try again later."
            ),
            InsightsError::SearchConnection(_) => {
                "Could not connect to the job search provider. Please check your connection or try again later."
                    .to_string()
            }
            InsightsError::SearchResponse(_) => {
                "An internal server error occurred while fetching insights.".to_string()
            }
        }
    }
}

impl From<ProviderError> for InsightsError {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::Timeout => Self::SearchTimeout,
            ProviderError::Status(status) => Self::SearchStatus { status },
            ProviderError::Connection(detail) | ProviderError::Client(detail) => {
                Self::SearchConnection(detail)
            }
            ProviderError::Decode(detail) => Self::SearchResponse(detail),
        }
    }
}

/// Sequences search, enrichment, and assembly for one request.
#[derive(Default)]
pub struct InsightOrchestrator {
    search: Option<JobSearchClient>,
    salary: Option<SalaryAggregator>,
    skills: Option<SkillExtractor>,
    narrative: Option<NarrativeSummarizer>,
}

impl InsightOrchestrator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wires HTTP clients for every provider section that is configured.
    pub fn from_config(config: &ProvidersConfig) -> Result<Self, ProviderError> {
        let mut orchestrator = Self::new();

        if let Some(search) = &config.job_search {
            let board = Arc::new(AdzunaClient::new(search)?);
            orchestrator = orchestrator
                .with_search(JobSearchClient::new(board.clone(), search.results_per_page))
                .with_salary(SalaryAggregator::new(board));
        } else {
            warn!("job search provider not configured; insight requests will be rejected");
        }

        match &config.skills {
            Some(skills) => {
                let issuer = Arc::new(ClientCredentialsIssuer::new(skills)?);
                let tokens = Arc::new(TokenCache::new(issuer));
                let titles = Arc::new(TitlesClient::new(skills)?);
                orchestrator = orchestrator.with_skills(SkillExtractor::new(tokens, titles));
            }
            None => info!("skills taxonomy not configured; skills enrichment disabled"),
        }

        match &config.narrative {
            Some(narrative) => {
                let generator = Arc::new(AzureChatClient::new(narrative)?);
                orchestrator = orchestrator.with_narrative(NarrativeSummarizer::new(generator));
            }
            None => info!("text generation not configured; narrative summaries disabled"),
        }

        Ok(orchestrator)
    }

    pub fn with_search(mut self, search: JobSearchClient) -> Self {
        self.search = Some(search);
        self
    }

    pub fn with_salary(mut self, salary: SalaryAggregator) -> Self {
        self.salary = Some(salary);
        self
    }

    pub fn with_skills(mut self, skills: SkillExtractor) -> Self {
        self.skills = Some(skills);
        self
    }

    pub fn with_narrative(mut self, narrative: NarrativeSummarizer) -> Self {
        self.narrative = Some(narrative);
        self
    }

    pub fn is_search_configured(&self) -> bool {
        self.search.is_some()
    }

    pub async fn fetch_market_insights(
        &self,
        request: &InsightRequest,
    ) -> Result<MarketInsights, InsightsError> {
        let query = &request.query;
        let search = self
            .search
            .as_ref()
            .ok_or(InsightsError::MissingCredentials)?;

        let outcome = search.search(query).await.map_err(|err| {
            warn!(error = %err, "job search failed; aborting insight request");
            InsightsError::from(err)
        })?;

        let total_jobs = outcome.total_jobs;
        let sample = &outcome.listings[..outcome.listings.len().min(NARRATIVE_SAMPLE_SIZE)];

        // Narrative consumes the salary result, so it shares salary's branch;
        // skills run alongside.
        let salary_then_narrative = async {
            let salary = match &self.salary {
                Some(aggregator) => aggregator.salary(query).await,
                None => None,
            };
            let narrative = match (&self.narrative, request.generate_summary) {
                (Some(summarizer), true) => {
                    summarizer
                        .summarize(query, total_jobs, sample, salary.as_ref())
                        .await
                }
                _ => None,
            };
            (salary, narrative)
        };
        let skills = async {
            match &self.skills {
                Some(extractor) => extractor.skills(query.what()).await,
                None => None,
            }
        };

        let ((salary, narrative), skills) = tokio::join!(salary_then_narrative, skills);

        info!(
            total_jobs,
            listings = outcome.listings.len(),
            salary = salary.is_some(),
            skills = skills.is_some(),
            narrative = narrative.is_some(),
            "assembled market insights"
        );

        Ok(MarketInsights {
            query: query.clone(),
            total_jobs,
            listings: outcome.listings,
            salary,
            skills,
            narrative,
            generated_at: Utc::now(),
        })
    }
}
