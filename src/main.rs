use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use chrono::Utc;
use clap::{Parser, Subcommand, ValueEnum};

mod assistant;
mod config;
mod error;
mod insights;
mod lookup;
mod models;
mod report;
mod responses;
mod router;
mod source;
#[cfg(test)]
mod testing;

use assistant::Assistant;
use config::{SourceConfig, DEFAULT_MAX_ROWS, SHEET_URL_ENV};
use models::{AssistantContext, AssistantInput, Role};
use source::{RowSource, SheetSource, StaticSource};

#[derive(Parser)]
#[command(name = "leadflow-assistant")]
#[command(about = "LeadFlow sales assistant over the published sales sheet", long_about = None)]
struct Cli {
    /// Published CSV export of the sales sheet
    #[arg(long, env = SHEET_URL_ENV, global = true)]
    sheet_url: Option<String>,
    /// Read a local CSV export instead of fetching the sheet
    #[arg(long, global = true)]
    csv: Option<PathBuf>,
    #[arg(long, default_value_t = 10, global = true)]
    timeout_secs: u64,
    #[arg(long, default_value_t = DEFAULT_MAX_ROWS, global = true)]
    max_rows: usize,
    /// Increase log verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
    #[arg(long, value_enum, default_value_t = LogFormat::Text, global = true)]
    log_format: LogFormat,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Ask the assistant a question
    Ask {
        message: Option<String>,
        #[arg(long)]
        role: Option<Role>,
        #[arg(long, default_value = "")]
        team: String,
        /// JSON request in the dashboard chat format
        #[arg(long)]
        input: Option<PathBuf>,
    },
    /// Rank closers by net kW
    Closers {
        #[arg(long, default_value_t = 5)]
        limit: usize,
    },
    /// Rank setters by conversion rate
    Setters {
        #[arg(long, default_value_t = 8)]
        limit: usize,
    },
    /// Generate a markdown leaderboard report
    Report {
        #[arg(long, default_value = "report.md")]
        out: PathBuf,
    },
}

fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = match cli.verbose {
        0 => "leadflow_assistant=warn",
        1 => "leadflow_assistant=info",
        _ => "leadflow_assistant=debug",
    };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => fmt()
            .with_env_filter(env_filter)
            .with_writer(std::io::stderr)
            .with_target(false)
            .init(),
        LogFormat::Json => fmt()
            .json()
            .with_env_filter(env_filter)
            .with_writer(std::io::stderr)
            .init(),
    }
}

fn build_input(
    message: Option<String>,
    role: Option<Role>,
    team: String,
    input: Option<PathBuf>,
) -> anyhow::Result<AssistantInput> {
    let mut request = match input {
        Some(path) => {
            let raw = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            serde_json::from_str::<AssistantInput>(&raw)
                .with_context(|| format!("invalid chat request in {}", path.display()))?
        }
        None => AssistantInput {
            context: match role {
                Some(role) => AssistantContext::for_role(role, team),
                None => AssistantContext {
                    team_id: team,
                    ..AssistantContext::default()
                },
            },
            ..AssistantInput::default()
        },
    };

    if let Some(message) = message {
        request.message = message;
    }
    if role.is_some() {
        request.context.user_role = role;
    }
    Ok(request)
}

async fn run<S: RowSource>(source: S, source_label: &str, command: Commands) -> anyhow::Result<()> {
    match command {
        Commands::Ask {
            message,
            role,
            team,
            input,
        } => {
            let request = build_input(message, role, team, input)?;
            let reply = Assistant::new(source).answer(&request).await;
            println!("{reply}");
        }
        Commands::Closers { limit } => {
            let rows = source.fetch_rows().await;
            let closers = insights::rank_closers(&rows);
            if closers.is_empty() {
                println!("No net deals found in the sheet.");
                return Ok(());
            }

            println!("Top closers by net kW:");
            for (i, closer) in closers.iter().take(limit).enumerate() {
                println!(
                    "{}. {} {:.1} kW across {} deals (avg {:.1} kW)",
                    i + 1,
                    closer.name,
                    closer.total_kw,
                    closer.total_deals_count,
                    closer.avg_kw_per_deal()
                );
            }
        }
        Commands::Setters { limit } => {
            let rows = source.fetch_rows().await;
            let setters = insights::rank_setters(&rows);
            if setters.is_empty() {
                println!("No setter activity found in the sheet.");
                return Ok(());
            }

            println!("Top setters by conversion rate:");
            for (i, setter) in setters.iter().take(limit).enumerate() {
                println!(
                    "{}. {} {:.1}% ({} of {} leads, {} closers)",
                    i + 1,
                    setter.name,
                    setter.conversion_rate,
                    setter.sold_leads,
                    setter.total_leads,
                    setter.unique_closers_worked_with
                );
            }
        }
        Commands::Report { out } => {
            let rows = source.fetch_rows().await;
            let report = report::build_report(source_label, Utc::now(), &rows);
            std::fs::write(&out, report)
                .with_context(|| format!("failed to write {}", out.display()))?;
            println!("Report written to {}.", out.display());
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli);

    let max_rows = cli.max_rows;
    match cli.csv {
        Some(path) => {
            let source = StaticSource::from_path(&path, max_rows)?;
            run(source, &path.display().to_string(), cli.command).await
        }
        None => {
            let config = SourceConfig::with_url_override(cli.sheet_url)
                .timeout(Duration::from_secs(cli.timeout_secs))
                .max_rows(max_rows);
            let label = config.url.clone();
            let source = SheetSource::new(config).context("failed to build HTTP client")?;
            run(source, &label, cli.command).await
        }
    }
}
