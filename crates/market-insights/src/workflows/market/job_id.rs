//! Recovery of provider job identifiers from opaque redirect URLs.

use std::sync::OnceLock;

use tracing::warn;
use url::Url;

/// One way of pulling an identifier out of a redirect URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobIdStrategy {
    /// Last path segment, accepted when fully alphanumeric and longer than
    /// `longer_than` characters.
    TrailingPathSegment { longer_than: usize },
    /// First non-empty value of the named query parameter.
    QueryParam(String),
}

impl JobIdStrategy {
    fn apply(&self, url: &Url) -> Option<String> {
        match self {
            JobIdStrategy::TrailingPathSegment { longer_than } => {
                let segment = url.path().trim_matches('/').rsplit('/').next()?;
                let alphanumeric =
                    !segment.is_empty() && segment.chars().all(char::is_alphanumeric);
                (alphanumeric && segment.chars().count() > *longer_than)
                    .then(|| segment.to_string())
            }
            JobIdStrategy::QueryParam(name) => url
                .query_pairs()
                .find(|(key, value)| key == name.as_str() && !value.is_empty())
                .map(|(_, value)| value.into_owned()),
        }
    }
}

/// Ordered list of strategies; the first one yielding a value wins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobIdPolicy {
    strategies: Vec<JobIdStrategy>,
}

impl Default for JobIdPolicy {
    fn default() -> Self {
        Self::new(vec![
            JobIdStrategy::TrailingPathSegment { longer_than: 5 },
            JobIdStrategy::QueryParam("aid".to_string()),
            JobIdStrategy::QueryParam("jobId".to_string()),
            JobIdStrategy::QueryParam("id".to_string()),
        ])
    }
}

impl JobIdPolicy {
    pub fn new(strategies: Vec<JobIdStrategy>) -> Self {
        Self { strategies }
    }

    pub fn strategies(&self) -> &[JobIdStrategy] {
        &self.strategies
    }

    pub fn extract(&self, raw_url: &str) -> Option<String> {
        let raw_url = raw_url.trim();
        if raw_url.is_empty() {
            return None;
        }

        let url = match parse_lenient(raw_url) {
            Ok(url) => url,
            Err(err) => {
                warn!(url = raw_url, error = %err, "could not parse job redirect url");
                return None;
            }
        };

        let id = self
            .strategies
            .iter()
            .find_map(|strategy| strategy.apply(&url));
        if id.is_none() {
            warn!(url = raw_url, "no job id found in redirect url path or query");
        }
        id
    }
}

/// Relative URLs are resolved against a placeholder origin so path and query
/// strategies still apply to them.
fn parse_lenient(raw: &str) -> Result<Url, url::ParseError> {
    static PLACEHOLDER: OnceLock<Option<Url>> = OnceLock::new();

    match Url::parse(raw) {
        Err(url::ParseError::RelativeUrlWithoutBase) => {
            match PLACEHOLDER
                .get_or_init(|| Url::parse("http://placeholder.invalid/").ok())
                .as_ref()
            {
                Some(base) => base.join(raw),
                None => Err(url::ParseError::RelativeUrlWithoutBase),
            }
        }
        other => other,
    }
}
