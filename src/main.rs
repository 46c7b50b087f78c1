use std::path::PathBuf;

use anyhow::Context;
use chrono::{DateTime, NaiveDate, Utc};
use clap::{Args, Parser, Subcommand};
use serde_json::json;

use resourcing_forecast::calendar::{self, AsOf, ProjectSpan, Reference};
use resourcing_forecast::input::load_portfolio;
use resourcing_forecast::{budget, headers, recovery, report, risk, utilization};
use resourcing_forecast::EngineConfig;

#[derive(Parser)]
#[command(name = "resourcing-forecast")]
#[command(about = "Budget burn, revenue recovery and at-risk rollups for project resourcing", long_about = None)]
struct Cli {
    /// Policy file (TOML); defaults to resourcing-forecast.toml when present
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Log engine decisions at debug level
    #[arg(long, short, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct ClockArgs {
    /// Reference instant (RFC 3339); defaults to the wall clock
    #[arg(long)]
    now: Option<DateTime<Utc>>,
    /// Explicit as-of boundary (RFC 3339)
    #[arg(long)]
    as_of: Option<DateTime<Utc>>,
}

impl ClockArgs {
    fn reference(&self) -> Reference {
        match (self.now, self.as_of) {
            (Some(now), Some(as_of)) => Reference::new(now, AsOf::from_instant(as_of)),
            (None, Some(as_of)) => Reference::from_as_of(AsOf::from_instant(as_of)),
            (Some(now), None) => Reference::at(now),
            (None, None) => Reference::at(Utc::now()),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Show the as-of boundary and the current week
    AsOf {
        #[command(flatten)]
        clock: ClockArgs,
    },
    /// List a project span's weeks with their classification
    Weeks {
        #[arg(long)]
        start: NaiveDate,
        #[arg(long)]
        end: Option<NaiveDate>,
        #[command(flatten)]
        clock: ClockArgs,
    },
    /// Map column headers to week keys
    Headers {
        #[arg(required = true)]
        headers: Vec<String>,
    },
    /// Budget burn and forecast per project
    Rollup {
        #[arg(long)]
        input: PathBuf,
        #[arg(long)]
        project: Option<String>,
        #[command(flatten)]
        clock: ClockArgs,
    },
    /// Weekly, monthly and rolling revenue recovery per project
    Recovery {
        #[arg(long)]
        input: PathBuf,
        #[arg(long)]
        project: Option<String>,
        #[command(flatten)]
        clock: ClockArgs,
    },
    /// Person-week utilization outside the planned band
    Utilization {
        #[arg(long)]
        input: PathBuf,
        #[arg(long)]
        project: Option<String>,
        #[command(flatten)]
        clock: ClockArgs,
    },
    /// Risk tags for every active project in the portfolio
    AtRisk {
        #[arg(long)]
        input: PathBuf,
        #[command(flatten)]
        clock: ClockArgs,
    },
    /// Generate a markdown report
    Report {
        #[arg(long)]
        input: PathBuf,
        #[arg(long)]
        project: Option<String>,
        #[arg(long, default_value = "report.md")]
        out: PathBuf,
        #[command(flatten)]
        clock: ClockArgs,
    },
}

fn main() {
    if let Err(error) = run() {
        eprintln!("resourcing-forecast error: {error:#}");
        std::process::exit(1);
    }
}

fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose)?;

    let config = EngineConfig::load(cli.config.as_deref()).context("failed to load configuration")?;

    match cli.command {
        Commands::AsOf { clock } => {
            let reference = clock.reference();
            println!("As of: {}", reference.as_of());
            println!("Current week: {}", reference.current_week());
        }
        Commands::Weeks { start, end, clock } => {
            let reference = clock.reference();
            for week in ProjectSpan::new(start, end).weeks(&reference) {
                let marker = if calendar::is_current_week(week, reference.now()) {
                    " (today)"
                } else {
                    ""
                };
                println!(
                    "{} {:>5} {}{}",
                    week.key(),
                    week.short(),
                    reference.classify(week).as_str(),
                    marker
                );
            }
        }
        Commands::Headers { headers: cells } => {
            let columns = headers::parse_header_row(&cells);
            println!("{}", serde_json::to_string_pretty(&columns)?);
        }
        Commands::Rollup {
            input,
            project,
            clock,
        } => {
            let reference = clock.reference();
            let portfolio = load_portfolio(&input)?;
            let rollups: Vec<_> = portfolio
                .select(project.as_deref())?
                .into_iter()
                .map(|project| {
                    json!({
                        "projectId": project.id,
                        "projectName": project.name,
                        "budget": budget::rollup_project(project, &reference),
                    })
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&rollups)?);
        }
        Commands::Recovery {
            input,
            project,
            clock,
        } => {
            let reference = clock.reference();
            let portfolio = load_portfolio(&input)?;
            let summaries: Vec<_> = portfolio
                .select(project.as_deref())?
                .into_iter()
                .map(|project| {
                    json!({
                        "projectId": project.id,
                        "projectName": project.name,
                        "recovery": recovery::recovery_for_project(
                            project,
                            &reference,
                            config.recovery.recent_weeks,
                        ),
                    })
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&summaries)?);
        }
        Commands::Utilization {
            input,
            project,
            clock,
        } => {
            let reference = clock.reference();
            let portfolio = load_portfolio(&input)?;
            for project in portfolio.select(project.as_deref())? {
                let variances = utilization::person_week_variances(
                    &project.weekly_rows,
                    &reference,
                    &config.resourcing,
                );
                println!("{}:", project.name);
                for item in variances
                    .iter()
                    .filter(|item| item.variance != utilization::Variance::OnTrack)
                {
                    println!(
                        "- {} week of {}: {:.0}% ({})",
                        item.person,
                        item.week.short(),
                        item.utilization * 100.0,
                        item.variance.as_str()
                    );
                }
            }
        }
        Commands::AtRisk { input, clock } => {
            let reference = clock.reference();
            let portfolio = load_portfolio(&input)?;
            let at_risk = risk::evaluate_portfolio(&portfolio.projects, &reference, &config);
            println!("{}", serde_json::to_string_pretty(&at_risk)?);
        }
        Commands::Report {
            input,
            project,
            out,
            clock,
        } => {
            let reference = clock.reference();
            let portfolio = load_portfolio(&input)?;
            let projects = portfolio.select(project.as_deref())?;
            let report = report::build_report(&projects, &reference, &config);
            std::fs::write(&out, report)
                .with_context(|| format!("failed to write {}", out.display()))?;
            println!("Report written to {}.", out.display());
        }
    }

    Ok(())
}

fn init_tracing(verbose: bool) -> anyhow::Result<()> {
    let level = if verbose { "debug" } else { "warn" };

    let filter = tracing_subscriber::EnvFilter::try_from_env("RESOURCING_LOG")
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|error| anyhow::anyhow!("failed to initialize tracing subscriber: {error}"))?;

    Ok(())
}
