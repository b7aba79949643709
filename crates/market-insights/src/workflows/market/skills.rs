use std::sync::Arc;

use tracing::{info, warn};

use super::domain::SkillSet;
use super::gateway::TaxonomyApi;
use super::token::TokenCache;
use crate::providers::ProviderError;

pub const MAX_SKILLS: usize = 15;

/// Title normalization followed by a skills lookup for the resolved id.
pub struct SkillExtractor {
    tokens: Arc<TokenCache>,
    api: Arc<dyn TaxonomyApi>,
    limit: usize,
}

impl SkillExtractor {
    pub fn new(tokens: Arc<TokenCache>, api: Arc<dyn TaxonomyApi>) -> Self {
        Self {
            tokens,
            api,
            limit: MAX_SKILLS,
        }
    }

    pub async fn skills(&self, title: &str) -> Option<SkillSet> {
        let token = match self.tokens.get_token().await {
            Ok(token) => token,
            Err(err) => {
                warn!(error = %err, "taxonomy token unavailable; skipping skills");
                return None;
            }
        };

        let matched = match self.api.normalize_title(&token, title).await {
            Ok(Some(matched)) => matched,
            Ok(None) => {
                info!(title, "no taxonomy match for title");
                return None;
            }
            Err(err) => {
                self.report_failure("title normalization", &err).await;
                return None;
            }
        };

        let skills = match self.api.title_skills(&token, &matched.id).await {
            Ok(Some(skills)) => skills,
            Ok(None) => {
                info!(taxonomy_id = %matched.id, "taxonomy title has no skill mapping");
                return None;
            }
            Err(err) => {
                self.report_failure("title skills", &err).await;
                return None;
            }
        };

        let skills: Vec<String> = skills.into_iter().take(self.limit).collect();
        info!(
            taxonomy_id = %matched.id,
            skills = skills.len(),
            "resolved skills for title"
        );

        Some(SkillSet {
            taxonomy_id: matched.id,
            normalized_title: matched.name,
            skills,
        })
    }

    async fn report_failure(&self, stage: &'static str, err: &ProviderError) {
        warn!(stage, error = %err, "taxonomy lookup failed");
        if err.is_unauthorized() {
            self.tokens.invalidate().await;
        }
    }
}
