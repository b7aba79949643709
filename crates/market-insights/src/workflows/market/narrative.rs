use std::sync::Arc;

use pulldown_cmark::{html, CowStr, Event, Options, Parser, Tag};
use tracing::{error, info, warn};

use super::domain::{JobListing, SalaryInsight, SearchQuery, TrustedHtml};
use super::gateway::{ChatMessage, CompletionRequest, TextGenerator};

const SYSTEM_MESSAGE: &str = "You are an AI assistant providing recruitment market analysis. \
Focus on actionable insights for a recruiter based *only* on the provided data. \
Use Markdown for formatting (like **bold**).";

const ELLIPSIS: &str = "...";

/// Prompt sampling limits and generation budget.
#[derive(Debug, Clone, PartialEq)]
pub struct NarrativeSettings {
    pub max_titles: usize,
    pub max_descriptions: usize,
    pub description_char_limit: usize,
    pub max_tokens: u32,
    pub temperature: f32,
}

impl Default for NarrativeSettings {
    fn default() -> Self {
        Self {
            max_titles: 7,
            max_descriptions: 5,
            description_char_limit: 1000,
            max_tokens: 250,
            temperature: 0.5,
        }
    }
}

pub struct NarrativeSummarizer {
    generator: Arc<dyn TextGenerator>,
    settings: NarrativeSettings,
}

impl NarrativeSummarizer {
    pub fn new(generator: Arc<dyn TextGenerator>) -> Self {
        Self::with_settings(generator, NarrativeSettings::default())
    }

    pub fn with_settings(generator: Arc<dyn TextGenerator>, settings: NarrativeSettings) -> Self {
        Self {
            generator,
            settings,
        }
    }

    pub async fn summarize(
        &self,
        query: &SearchQuery,
        total_jobs: u64,
        sample: &[JobListing],
        salary: Option<&SalaryInsight>,
    ) -> Option<TrustedHtml> {
        let request = self.build_request(query, total_jobs, sample, salary);

        match self.generator.complete(&request).await {
            Ok(Some(markdown)) if !markdown.trim().is_empty() => {
                info!(chars = markdown.len(), "received narrative summary");
                Some(render_markdown(markdown.trim()))
            }
            Ok(_) => {
                warn!("text generator returned no summary content");
                None
            }
            Err(err) => {
                error!(error = %err, "narrative summary request failed");
                None
            }
        }
    }

    pub fn build_request(
        &self,
        query: &SearchQuery,
        total_jobs: u64,
        sample: &[JobListing],
        salary: Option<&SalaryInsight>,
    ) -> CompletionRequest {
        CompletionRequest {
            messages: vec![
                ChatMessage::system(SYSTEM_MESSAGE),
                ChatMessage::user(self.user_prompt(query, total_jobs, sample, salary)),
            ],
            max_tokens: self.settings.max_tokens,
            temperature: self.settings.temperature,
        }
    }

    fn user_prompt(
        &self,
        query: &SearchQuery,
        total_jobs: u64,
        sample: &[JobListing],
        salary: Option<&SalaryInsight>,
    ) -> String {
        let titles: Vec<&str> = sample
            .iter()
            .take(self.settings.max_titles)
            .map(|listing| listing.title.as_str())
            .filter(|title| !title.is_empty())
            .collect();
        let titles = if titles.is_empty() {
            "N/A".to_string()
        } else {
            titles.join(", ")
        };

        let descriptions = sample
            .iter()
            .take(self.settings.max_descriptions)
            .map(|listing| listing.description.as_str())
            .collect::<Vec<_>>()
            .join(" ");
        let descriptions = truncate_with_ellipsis(&descriptions, self.settings.description_char_limit);
        let descriptions = if descriptions.is_empty() {
            "N/A".to_string()
        } else {
            descriptions
        };

        format!(
            "Analyze the job market for a recruiter hiring for '{what}' in '{location}, {country}'.\n\n\
**Market Data:**\n\
- Total Job Listings Found: {total_jobs}\n\
- Estimated Average Salary: {salary}\n\
- Sample Job Titles: {titles}\n\
- Sample Job Description Excerpts: {descriptions}\n\n\
**Recruiter Analysis (Based *only* on above data - use Markdown for emphasis):**\n\
1.  **Market Activity & Competitiveness:** Based on job volume and salary data (if available), how active/competitive does this market seem?\n\
2.  **Key Skills/Keywords:** Based *only* on the sample titles and descriptions, what 2-3 potential key skills or technologies seem commonly required?\n\
3.  **Candidate Pool & Sourcing:** What does the job volume suggest about the likely candidate pool size and the potential need for proactive sourcing vs. relying on applications?\n\n\
Provide a concise, bulleted summary. Do not invent skills or salary details not present in the data.",
            what = query.what(),
            location = query.location(),
            country = query.country().to_ascii_uppercase(),
            salary = salary_phrase(salary),
        )
    }
}

pub fn salary_phrase(salary: Option<&SalaryInsight>) -> String {
    match salary {
        Some(SalaryInsight {
            average: Some(average),
            ..
        }) => format!(
            "approximately {} (currency based on country)",
            group_thousands(*average)
        ),
        Some(insight) if !insight.histogram.is_empty() => {
            "Distribution data available, but average could not be calculated.".to_string()
        }
        _ => "Not available".to_string(),
    }
}

/// Hard cut at `limit` characters plus `...`; may split a word.
pub fn truncate_with_ellipsis(text: &str, limit: usize) -> String {
    if text.chars().count() <= limit {
        return text.to_string();
    }
    let mut truncated: String = text.chars().take(limit).collect();
    truncated.push_str(ELLIPSIS);
    truncated
}

fn group_thousands(value: i64) -> String {
    let digits = value.unsigned_abs().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    for (index, digit) in digits.chars().enumerate() {
        if index > 0 && (digits.len() - index) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }
    if value < 0 {
        grouped.insert(0, '-');
    }
    grouped
}

/// Markdown to HTML with tables and fenced code. Raw HTML from the generator
/// is re-emitted as text so it arrives escaped, and link or image targets
/// outside `http`, `https`, and `mailto` are replaced with `#`.
pub fn render_markdown(markdown: &str) -> TrustedHtml {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);

    let events = Parser::new_ext(markdown, options).map(|event| match event {
        Event::Html(raw) => Event::Text(raw),
        Event::Start(Tag::Link(kind, dest, title)) => {
            Event::Start(Tag::Link(kind, safe_destination(dest), title))
        }
        Event::Start(Tag::Image(kind, dest, title)) => {
            Event::Start(Tag::Image(kind, safe_destination(dest), title))
        }
        other => other,
    });

    let mut rendered = String::with_capacity(markdown.len() * 3 / 2);
    html::push_html(&mut rendered, events);
    TrustedHtml::from_rendered(rendered)
}

fn safe_destination(dest: CowStr<'_>) -> CowStr<'_> {
    if is_allowed_destination(&dest) {
        dest
    } else {
        warn!(destination = &*dest, "dropping unsafe link target from narrative");
        CowStr::Borrowed("#")
    }
}

/// Relative targets pass; absolute ones must use an allow-listed scheme.
fn is_allowed_destination(dest: &str) -> bool {
    let dest = dest.trim();
    let Some(colon) = dest.find(':') else {
        return true;
    };
    let scheme = &dest[..colon];
    if scheme.contains(&['/', '?', '#'][..]) {
        return true;
    }
    ["http", "https", "mailto"]
        .iter()
        .any(|allowed| scheme.eq_ignore_ascii_case(allowed))
}
