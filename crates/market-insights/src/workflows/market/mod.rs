//! Multi-source job market aggregation.
//!
//! A search against the job board is the only mandatory step. Salary, skills,
//! and narrative enrichment each degrade to an absent section on failure.

pub mod domain;
pub mod gateway;
mod job_id;
mod narrative;
mod orchestrator;
mod salary;
mod search;
mod skills;
mod token;

pub use domain::{
    InsightRequest, JobListing, MarketInsights, QueryError, SalaryInsight, SearchQuery, SkillSet,
    TrustedHtml,
};
pub use gateway::{
    ChatMessage, CompletionRequest, DisplayName, HistogramPayload, IssuedToken, JobBoard,
    RawJobResult, SearchPage, TaxonomyApi, TextGenerator, TitleMatch, TokenIssuer,
};
pub use job_id::{JobIdPolicy, JobIdStrategy};
pub use narrative::{
    render_markdown, salary_phrase, truncate_with_ellipsis, NarrativeSettings, NarrativeSummarizer,
};
pub use orchestrator::{InsightOrchestrator, InsightsError, NARRATIVE_SAMPLE_SIZE};
pub use salary::{weighted_average, SalaryAggregator};
pub use search::{JobSearchClient, SearchOutcome};
pub use skills::{SkillExtractor, MAX_SKILLS};
pub use token::{AuthToken, TokenCache, REFRESH_MARGIN_SECS};
