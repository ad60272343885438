use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use chrono::Utc;
use clap::{Parser, Subcommand};
use grade_stats::config::Config;
use grade_stats::db::{self, PgRecordSource};
use grade_stats::query::{check_threshold, GradeQueries};
use grade_stats::report;
use grade_stats::source::RecordSource;
use grade_stats::GradeError;
use serde::Serialize;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::{error, info};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "grade-stats")]
#[command(about = "Weighted grade statistics for learners and classes", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the grades schema, constraints and indexes
    InitDb,
    /// Load a small realistic seed dataset
    Seed,
    /// Import scores from a CSV file
    Import {
        #[arg(long)]
        csv: PathBuf,
    },
    /// Weighted average of a learner's grades, per class
    ClassAverages {
        #[arg(value_name = "LEARNER_ID")]
        learner: String,
    },
    /// Overall average of a learner across their classes
    Average {
        #[arg(value_name = "LEARNER_ID")]
        learner: String,
    },
    /// Share of all learners above a weighted average threshold
    Stats {
        #[arg(long)]
        threshold: Option<f64>,
    },
    /// Share of one class's learners above a weighted average threshold
    ClassStats {
        #[arg(value_name = "CLASS_ID")]
        class: String,
        #[arg(long)]
        threshold: Option<f64>,
    },
    /// Generate a markdown report
    Report {
        #[arg(long)]
        threshold: Option<f64>,
        #[arg(long, default_value = "grade-report.md")]
        out: PathBuf,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    match run(Cli::parse()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{err:#}");
            match err.downcast_ref::<GradeError>() {
                Some(grade_err) if grade_err.is_client_error() => ExitCode::from(2),
                _ => ExitCode::FAILURE,
            }
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = Config::from_env()?;
    let pool = connect(&config).await?;

    match cli.command {
        Commands::InitDb => {
            db::init_db(&pool).await?;
            println!("Schema ready.");
        }
        Commands::Seed => {
            let inserted = db::seed(&pool).await?;
            println!("Inserted {inserted} seed grade records.");
        }
        Commands::Import { csv } => {
            let inserted = db::import_csv(&pool, &csv).await?;
            println!("Inserted {inserted} grade records from {}.", csv.display());
        }
        Commands::ClassAverages { learner } => {
            let averages = queries(pool).class_averages(&learner).await?;
            print_json(&averages)?;
        }
        Commands::Average { learner } => {
            let average = queries(pool).overall_average(&learner).await?;
            print_json(&average)?;
        }
        Commands::Stats { threshold } => {
            let stats = queries(pool)
                .population_stats(threshold.unwrap_or(config.threshold))
                .await?;
            print_json(&stats)?;
        }
        Commands::ClassStats { class, threshold } => {
            let stats = queries(pool)
                .class_stats(&class, threshold.unwrap_or(config.threshold))
                .await?;
            print_json(&stats)?;
        }
        Commands::Report { threshold, out } => {
            let threshold = check_threshold(threshold.unwrap_or(config.threshold))?;
            let records = PgRecordSource::new(pool).fetch_all().await?;
            let report = report::build_report(Utc::now().date_naive(), threshold, &records);
            std::fs::write(&out, report)
                .with_context(|| format!("failed to write {}", out.display()))?;
            info!(records = records.len(), "Report generated");
            println!("Report written to {}.", out.display());
        }
    }

    Ok(())
}

async fn connect(config: &Config) -> anyhow::Result<PgPool> {
    PgPoolOptions::new()
        .max_connections(config.max_connections)
        .connect(config.database_url()?)
        .await
        .map_err(GradeError::from)
        .context("failed to connect to Postgres")
}

fn queries(pool: PgPool) -> GradeQueries<PgRecordSource> {
    GradeQueries::new(PgRecordSource::new(pool))
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
