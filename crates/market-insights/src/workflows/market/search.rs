use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use super::domain::{JobListing, SearchQuery};
use super::gateway::{DisplayName, JobBoard, RawJobResult};
use super::job_id::JobIdPolicy;
use crate::providers::ProviderError;

const MISSING_LABEL: &str = "N/A";
const MISSING_DESCRIPTION: &str = "No description available.";

/// Provider total plus the listings whose ids could be recovered.
#[derive(Debug, Clone)]
pub struct SearchOutcome {
    pub total_jobs: u64,
    pub listings: Vec<JobListing>,
}

/// First-page job search with listing normalization.
pub struct JobSearchClient {
    board: Arc<dyn JobBoard>,
    policy: JobIdPolicy,
    page_size: u32,
}

impl JobSearchClient {
    pub fn new(board: Arc<dyn JobBoard>, page_size: u32) -> Self {
        Self::with_policy(board, page_size, JobIdPolicy::default())
    }

    pub fn with_policy(board: Arc<dyn JobBoard>, page_size: u32, policy: JobIdPolicy) -> Self {
        Self {
            board,
            policy,
            page_size,
        }
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    pub async fn search(&self, query: &SearchQuery) -> Result<SearchOutcome, ProviderError> {
        info!(
            what = query.what(),
            location = query.location(),
            country = query.country(),
            page_size = self.page_size,
            "searching job listings"
        );
        let page = self.board.search(query, self.page_size).await?;
        let returned = page.results.len();
        let listings = normalize_results(page.results, &self.policy);

        info!(
            total_jobs = page.count,
            returned,
            kept = listings.len(),
            "job search completed"
        );

        Ok(SearchOutcome {
            total_jobs: page.count,
            listings,
        })
    }
}

pub(crate) fn normalize_results(results: Vec<RawJobResult>, policy: &JobIdPolicy) -> Vec<JobListing> {
    results
        .into_iter()
        .filter_map(|result| normalize_result(result, policy))
        .collect()
}

fn normalize_result(result: RawJobResult, policy: &JobIdPolicy) -> Option<JobListing> {
    let url = result.redirect_url.unwrap_or_default();
    let Some(external_id) = policy.extract(&url) else {
        warn!(
            title = result.title.as_deref().unwrap_or_default(),
            "skipping job without a recoverable id"
        );
        return None;
    };

    Some(JobListing {
        external_id,
        title: result.title.unwrap_or_default(),
        company: display_name(result.company),
        location: display_name(result.location),
        description: result
            .description
            .unwrap_or_else(|| MISSING_DESCRIPTION.to_string()),
        url,
        created_at: result.created.as_deref().and_then(parse_created),
    })
}

fn display_name(value: Option<DisplayName>) -> String {
    value
        .and_then(|named| named.display_name)
        .unwrap_or_else(|| MISSING_LABEL.to_string())
}

fn parse_created(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw.trim())
        .ok()
        .map(|created| created.with_timezone(&Utc))
}
