use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Validated search criteria. Only constructible through [`SearchQuery::new`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchQuery {
    what: String,
    #[serde(rename = "where")]
    location: String,
    country: String,
}

impl SearchQuery {
    pub fn new(
        what: impl Into<String>,
        location: impl Into<String>,
        country: impl Into<String>,
    ) -> Result<Self, QueryError> {
        let what = required("what", what.into())?;
        let location = required("where", location.into())?;
        let country = required("country", country.into())?;

        if country.len() != 2 || !country.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(QueryError::InvalidCountry(country));
        }

        Ok(Self {
            what,
            location,
            country: country.to_ascii_lowercase(),
        })
    }

    pub fn what(&self) -> &str {
        &self.what
    }

    pub fn location(&self) -> &str {
        &self.location
    }

    /// Lower-case two-letter country code.
    pub fn country(&self) -> &str {
        &self.country
    }
}

fn required(field: &'static str, value: String) -> Result<String, QueryError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        Err(QueryError::MissingField(field))
    } else {
        Ok(trimmed.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QueryError {
    #[error("missing search criteria: {0}")]
    MissingField(&'static str),
    #[error("country must be a two-letter code, got '{0}'")]
    InvalidCountry(String),
}

impl QueryError {
    pub fn user_message(&self) -> &'static str {
        match self {
            QueryError::MissingField(_) => "Missing search criteria.",
            QueryError::InvalidCountry(_) => "Country must be a two-letter country code.",
        }
    }
}

/// One pipeline invocation.
#[derive(Debug, Clone)]
pub struct InsightRequest {
    pub query: SearchQuery,
    pub generate_summary: bool,
}

impl InsightRequest {
    pub fn new(query: SearchQuery) -> Self {
        Self {
            query,
            generate_summary: true,
        }
    }

    pub fn without_summary(mut self) -> Self {
        self.generate_summary = false;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobListing {
    pub external_id: String,
    pub title: String,
    pub company: String,
    pub location: String,
    pub description: String,
    pub url: String,
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SalaryInsight {
    pub histogram: BTreeMap<String, u64>,
    /// Weighted mean over numeric buckets; absent when none carry counts.
    pub average: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkillSet {
    pub taxonomy_id: String,
    pub normalized_title: String,
    pub skills: Vec<String>,
}

/// HTML rendered from generated markdown with raw HTML escaped.
///
/// Only the narrative renderer can build one, so plain strings never pass
/// for embeddable markup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct TrustedHtml(String);

impl TrustedHtml {
    pub(crate) fn from_rendered(html: String) -> Self {
        Self(html)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

/// Composite result handed back to the request handler.
#[derive(Debug, Clone, Serialize)]
pub struct MarketInsights {
    pub query: SearchQuery,
    /// Count reported by the provider; may exceed `listings.len()`.
    #[serde(rename = "total_matching_jobs")]
    pub total_jobs: u64,
    #[serde(rename = "job_listings")]
    pub listings: Vec<JobListing>,
    pub salary: Option<SalaryInsight>,
    pub skills: Option<SkillSet>,
    pub narrative: Option<TrustedHtml>,
    pub generated_at: DateTime<Utc>,
}
