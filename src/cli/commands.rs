use chrono::NaiveDate;
use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Mutex;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::cli::args::{Cli, Commands};
use crate::config::Settings;
use crate::error::{EtlError, Result};
use crate::models::LocationRegistry;
use crate::processors::{Pipeline, RunReport};
use crate::utils::constants::DEFAULT_BACKFILL_DAYS;
use crate::utils::progress::ProgressReporter;
use crate::utils::{backfill_days, daily_target, date_range, today_utc};
use crate::writers::SqliteWriter;

pub async fn run(cli: Cli) -> Result<()> {
    init_logging(cli.verbose, cli.log_file.as_deref())?;

    let settings = Settings::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Daily { policy } => {
            let policy = policy.unwrap_or(settings.pipeline.daily_policy);
            let date = daily_target(policy, today_utc());
            println!("Daily run for {} ({:?})", date, policy);
            run_etl(&settings, &[date], cli.quiet).await
        }

        Commands::Backfill { days, start, end } => {
            let today = today_utc();
            let dates = match (start, end) {
                (Some(start), Some(end)) => date_range(start, end, today)?,
                _ => backfill_days(days.unwrap_or(DEFAULT_BACKFILL_DAYS), today)?,
            };
            if let (Some(first), Some(last)) = (dates.first(), dates.last()) {
                println!("Backfilling {} days: {} to {}", dates.len(), first, last);
            }
            run_etl(&settings, &dates, cli.quiet).await
        }

        Commands::InitDb => {
            let registry = settings.registry()?;
            let writer = SqliteWriter::connect(&settings.database.url).await?;

            let result = prepare_store(&writer, &registry).await;
            writer.close().await;

            let added = result?;
            println!(
                "Schema ready at {} ({} new of {} locations)",
                settings.database.url,
                added,
                registry.len()
            );
            Ok(())
        }

        Commands::Locations => {
            let registry = settings.registry()?;
            println!("{} locations:", registry.len());
            for location in registry.iter() {
                println!(
                    "  {:<20} {:>9.4} {:>10.4}",
                    location.to_string(),
                    location.latitude,
                    location.longitude
                );
            }
            Ok(())
        }
    }
}

async fn run_etl(settings: &Settings, dates: &[NaiveDate], quiet: bool) -> Result<()> {
    if settings.api_key().is_none() {
        warn!("No Google API key configured, air quality fields will be null");
    }

    let pipeline = Pipeline::from_settings(settings)?;
    let writer = SqliteWriter::connect(&settings.database.url).await?;

    let report = load_dates(&pipeline, &writer, dates, quiet).await;
    writer.close().await;
    let report = report?;

    println!("\n{}", report.generate_summary());
    info!(
        succeeded = report.succeeded,
        failed = report.failed(),
        "Run complete"
    );

    match report.aborted {
        Some(reason) => Err(EtlError::RunAborted(reason)),
        None => Ok(()),
    }
}

/// Schema plus the registry's locations, created once at setup.
async fn prepare_store(writer: &SqliteWriter, registry: &LocationRegistry) -> Result<usize> {
    writer.init_schema().await?;
    writer.seed_locations(registry).await
}

async fn load_dates(
    pipeline: &Pipeline,
    writer: &SqliteWriter,
    dates: &[NaiveDate],
    quiet: bool,
) -> Result<RunReport> {
    prepare_store(writer, pipeline.registry()).await?;

    let progress = ProgressReporter::new(
        pipeline.total_units(dates) as u64,
        "Processing units...",
        quiet,
    );
    let report = pipeline.run(writer, dates, &progress).await;
    progress.finish_with_message(&format!("Processed {} units", report.processed()));
    Ok(report)
}

/// Install the global subscriber: `info` by default, `debug` with `--verbose`,
/// `RUST_LOG` taking precedence when set.
fn init_logging(verbose: bool, log_file: Option<&Path>) -> Result<()> {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("aq_etl={},warn", default_level)));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false);

    // Ignore the error if a subscriber is already installed
    match log_file {
        Some(path) => {
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            let _ = builder
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .try_init();
        }
        None => {
            let _ = builder.with_writer(std::io::stderr).try_init();
        }
    }

    Ok(())
}
