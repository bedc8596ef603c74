use mpec_ingest::config::{DEFAULT_CONFIG_PATH, IngestConfig};
use mpec_ingest::logging::init_logging;
use mpec_ingest::module::bulletin::HttpBulletinSource;
use mpec_ingest::module::classify::PhaList;
use mpec_ingest::module::observatory::ObservatoryDirectory;
use mpec_ingest::module::pipeline::{IngestContext, YearMonth};
use mpec_ingest::module::stats::run_aggregation;
use mpec_ingest::module::store::BulletinStore;

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;

/// Ingest one month of Minor Planet Electronic Circulars.
#[derive(Debug, Parser)]
#[command(name = "mpec-ingest", version)]
struct Args {
    /// Month to ingest, as YYYYMM
    yyyymm: YearMonth,

    /// Configuration file
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Skip the station aggregation pass after ingestion
    #[arg(long)]
    no_aggregate: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Load configuration
    let (config, found) = IngestConfig::load_or_default(&args.config)?;

    // Initialize logging
    let _logging_guard = init_logging(&config.log_dir, "mpec-ingest", &config.log_level)?;

    tracing::info!("MPEC ingest starting for {}", args.yyyymm);
    if !found {
        tracing::warn!("Config file {} not found, using defaults", args.config.display());
    }

    let source = HttpBulletinSource::new(&config.base_url, &config.fetch).context("failed to build HTTP client")?;
    let store = BulletinStore::open(&config.database_path)
        .with_context(|| format!("failed to open database {}", config.database_path.display()))?;
    tracing::info!("Database ready at {}", config.database_path.display());

    let pha = PhaList::load_optional(config.pha_list_path.as_deref());

    let mut context = IngestContext::new(source, store, pha, config.fetch.clone());
    context.ingest_month(args.yyyymm).await?;

    if args.no_aggregate {
        tracing::info!("Aggregation skipped");
        return Ok(());
    }

    let observatories = ObservatoryDirectory::load_optional(config.observatory_path.as_deref());
    let report = run_aggregation(context.store(), &observatories, Some(&config.aggregate_dir))?;
    for unit in &report.changed {
        tracing::debug!("Aggregate changed: {}", unit);
    }

    Ok(())
}
