use crate::report::{run_insights_report, InsightsArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use market_insights::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "Job Market Insights",
    about = "Aggregate job search, salary, skills, and narrative data for recruiters",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Run one market insights search and print the report
    Insights(InsightsArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Insights(args) => run_insights_report(args).await,
    }
}
