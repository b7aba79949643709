use clap::Args;
use market_insights::config::AppConfig;
use market_insights::error::AppError;
use market_insights::telemetry;
use market_insights::workflows::market::{
    salary_phrase, truncate_with_ellipsis, InsightOrchestrator, InsightRequest, MarketInsights,
    SearchQuery,
};

const DESCRIPTION_PREVIEW_CHARS: usize = 160;

#[derive(Args, Debug)]
pub(crate) struct InsightsArgs {
    /// Job title or keywords to search for
    #[arg(long)]
    pub(crate) what: String,
    /// City, region, or postcode
    #[arg(long = "where")]
    pub(crate) location: String,
    /// Two-letter country code (e.g. us, gb)
    #[arg(long)]
    pub(crate) country: String,
    /// Skip the AI-generated market narrative
    #[arg(long)]
    pub(crate) no_summary: bool,
    /// Print the insights as JSON instead of a text report
    #[arg(long)]
    pub(crate) json: bool,
}

pub(crate) async fn run_insights_report(args: InsightsArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    telemetry::init(&config.telemetry)?;

    let query = SearchQuery::new(args.what, args.location, args.country)?;
    let mut request = InsightRequest::new(query);
    if args.no_summary {
        request = request.without_summary();
    }

    let orchestrator = InsightOrchestrator::from_config(&config.providers)?;
    let insights = orchestrator.fetch_market_insights(&request).await?;

    if args.json {
        let body = serde_json::to_string_pretty(&insights).map_err(std::io::Error::from)?;
        println!("{body}");
    } else {
        print!("{}", render_insights_report(&insights));
    }
    Ok(())
}

pub(crate) fn render_insights_report(insights: &MarketInsights) -> String {
    let query = &insights.query;
    let mut lines = vec![
        format!(
            "Job market insights: {} in {} ({})",
            query.what(),
            query.location(),
            query.country().to_ascii_uppercase()
        ),
        format!(
            "Generated {}",
            insights.generated_at.format("%Y-%m-%d %H:%M UTC")
        ),
        format!("Total matching jobs: {}", insights.total_jobs),
        format!("Average salary: {}", salary_phrase(insights.salary.as_ref())),
    ];

    if let Some(salary) = insights.salary.as_ref().filter(|s| !s.histogram.is_empty()) {
        lines.push("\nSalary distribution".to_string());
        lines.extend(
            salary
                .histogram
                .iter()
                .map(|(bucket, count)| format!("- {bucket}: {count} listings")),
        );
    }

    match &insights.skills {
        Some(skills) if !skills.skills.is_empty() => {
            lines.push(format!("\nTop skills for {}", skills.normalized_title));
            lines.extend(skills.skills.iter().map(|skill| format!("- {skill}")));
        }
        _ => lines.push("\nTop skills: not available".to_string()),
    }

    if let Some(narrative) = &insights.narrative {
        lines.push("\nMarket summary (HTML)".to_string());
        lines.push(narrative.as_str().trim_end().to_string());
    }

    if insights.listings.is_empty() {
        lines.push("\nJob listings: none".to_string());
    } else {
        lines.push("\nJob listings".to_string());
        for listing in &insights.listings {
            lines.push(format!(
                "- {} at {} ({}) [{}]",
                listing.title, listing.company, listing.location, listing.external_id
            ));
            lines.push(format!(
                "  {}",
                truncate_with_ellipsis(&listing.description, DESCRIPTION_PREVIEW_CHARS)
            ));
            if !listing.url.is_empty() {
                lines.push(format!("  {}", listing.url));
            }
        }
    }

    let mut report = lines.join("\n");
    report.push('\n');
    report
}
