// Catalog harvester CLI
//
// Visits the configured catalogs, merges the results with the stored
// snapshot, and prints the rows that were not there before.

use anyhow::{Context, Result};
use clap::Parser;
use kodegen_tools_catalogscrape::executor::RetryPolicy;
use kodegen_tools_catalogscrape::utils::{DEFAULT_BACKOFF_MS, DEFAULT_DATABASE_FILE, DEFAULT_MAX_RETRIES};
use kodegen_tools_catalogscrape::{COLUMNS, HarvestConfig, HarvestError, Harvester, Source};
use std::path::PathBuf;
use std::sync::Mutex;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

#[derive(Debug, Parser)]
#[command(name = "kodegen-catalogscrape", version, about = "Harvest sheet-metal material catalogs")]
struct Cli {
    /// SQLite file holding the snapshot
    #[arg(long, env = "CATALOGSCRAPE_DB", default_value = DEFAULT_DATABASE_FILE)]
    database: PathBuf,

    /// Where per-run screenshot folders are created
    #[arg(long, default_value = ".")]
    diagnostics_dir: PathBuf,

    /// Source to harvest (repeatable); defaults to all
    #[arg(long = "source", value_name = "SOURCE")]
    sources: Vec<Source>,

    /// Show the browser window
    #[arg(long)]
    headed: bool,

    #[arg(long, default_value_t = DEFAULT_MAX_RETRIES)]
    max_retries: u32,

    #[arg(long, default_value_t = DEFAULT_BACKOFF_MS)]
    backoff_ms: u64,

    /// Log file, appended to
    #[arg(long, default_value = "scraper.log")]
    log_file: PathBuf,

    /// Print added rows as JSON instead of a table
    #[arg(long)]
    json: bool,
}

fn init_logging(log_file: &PathBuf) -> Result<()> {
    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_file)
        .with_context(|| format!("Failed to open log file {}", log_file.display()))?;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(fmt::layer().with_ansi(false).with_writer(Mutex::new(file)))
        .try_init()
        .context("Failed to install tracing subscriber")?;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_file)?;

    let mut builder = HarvestConfig::builder()
        .database_path(&cli.database)
        .diagnostics_root(&cli.diagnostics_dir)
        .headless(!cli.headed)
        .retry_policy(RetryPolicy::new(cli.max_retries, cli.backoff_ms));
    if !cli.sources.is_empty() {
        builder = builder.sources(cli.sources.iter().copied());
    }
    let config = builder.build()?;

    let request = Harvester::new(config).start();
    let cancel = request.cancel_token();
    let bus = request.event_bus();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, stopping after the current step");
            cancel.cancel();
        }
    });

    let outcome = match request.await {
        Ok(outcome) => outcome,
        Err(HarvestError::Cancelled) => {
            tracing::warn!("Harvest cancelled; snapshot unchanged");
            return Ok(());
        }
        Err(e) => return Err(e).context("Harvest failed"),
    };

    for site in &outcome.sites {
        tracing::info!(
            "{}: {} records from {} materials ({} failed)",
            site.source,
            site.records,
            site.materials_visited,
            site.failed_materials
        );
    }

    let tally = bus.metrics().snapshot();
    if tally.warnings > 0 || tally.errors > 0 {
        tracing::warn!(
            "{} warning(s) and {} error(s) during the run; see the diagnostics folder",
            tally.warnings,
            tally.errors
        );
    }

    let report = &outcome.report;
    if cli.json {
        println!("{}", serde_json::to_string_pretty(report)?);
    } else if report.added_count == 0 {
        println!("No new rows ({} total)", outcome.records.len());
    } else {
        println!("{} new rows:", report.added_count);
        println!("{}", COLUMNS.join(" | "));
        for row in &report.added_rows {
            println!("{}", row.values().join(" | "));
        }
    }
    Ok(())
}
