//! eq-assoc - earthquake to well association
//!
//! # Usage
//!
//! ```bash
//! # Incremental run over ./data/source with the default config search
//! eq-assoc
//!
//! # Rebuild everything with binary (in-window / in-radius) scoring
//! eq-assoc --mode full --assoc-mode simple
//!
//! # Only disposal and production, one write at the end
//! eq-assoc --types WD,PROD --in-memory
//!
//! # Recompute one quake
//! eq-assoc --reassociate-quake 123456
//! ```
//!
//! # Environment Variables
//!
//! - `EQ_ASSOC_CONFIG`: Path to an assoc_config.toml
//! - `RUST_LOG`: Logging level (default: info, `--verbose` for debug)

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing::{info, warn};

use eq_assoc::ingest::SourceTables;
use eq_assoc::pipeline::backfill_missing_summaries;
use eq_assoc::{
    ActivityType, AssocConfig, AssociationPipeline, AssociationStore, ConfigOverrides,
    ProcessingMode, QuakeId, RunReport, RunTargets, ScoringMode,
};

// ============================================================================
// CLI Arguments
// ============================================================================

#[derive(Parser, Debug)]
#[command(name = "eq-assoc")]
#[command(about = "Associate earthquakes with nearby HF, disposal and production wells")]
#[command(version)]
struct CliArgs {
    /// Config file (skips the EQ_ASSOC_CONFIG / ./assoc_config.toml search)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// incremental: only new or invalidated quakes; full: truncate and redo all
    #[arg(long, value_enum)]
    mode: Option<ProcessingMode>,

    /// simple: binary association; detailed: distance and time decay
    #[arg(long = "assoc-mode", value_enum)]
    scoring: Option<ScoringMode>,

    /// Quakes per batch
    #[arg(long)]
    batch_size: Option<usize>,

    /// Hold all batches in memory and write once at the end
    #[arg(long)]
    in_memory: bool,

    /// Activity types to associate, e.g. HF,WD
    #[arg(long, value_delimiter = ',')]
    types: Option<Vec<ActivityType>>,

    /// sled database holding the link and summary tables
    #[arg(long, value_name = "DIR")]
    store: Option<PathBuf>,

    /// Directory of source CSV tables
    #[arg(long, value_name = "DIR")]
    data_dir: Option<PathBuf>,

    /// Recompute a single quake, replacing its stored rows
    #[arg(long, value_name = "QUAKE_ID")]
    reassociate_quake: Option<QuakeId>,

    /// Re-associate a single well from its present line
    #[arg(long, value_name = "WELL_ID")]
    reassociate_well: Option<String>,

    /// Lag for date-only HF stages (days)
    #[arg(long)]
    hf_lag_dateonly_days: Option<i64>,

    /// Lag for HF stages with a precise time (hours)
    #[arg(long)]
    hf_lag_datetime_hours: Option<i64>,

    #[arg(long)]
    hf_tmax_days: Option<i64>,

    /// Delayed onset for disposal (months)
    #[arg(long)]
    wd_delay_months: Option<u32>,

    #[arg(long)]
    wd_tmax_days: Option<i64>,

    #[arg(long)]
    prod_tmax_days: Option<i64>,

    /// Decay shape constant
    #[arg(long)]
    kernel_shape: Option<f64>,

    /// Debug logging
    #[arg(short, long)]
    verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long)]
    json_logs: bool,

    #[command(subcommand)]
    command: Option<SubCommand>,
}

#[derive(clap::Subcommand, Debug)]
enum SubCommand {
    /// Run the association pipeline (default)
    Run,
    /// Only recompute summaries missing for linked quakes
    Backfill,
    /// Print table counts and sample rows
    Report,
    /// Print the effective configuration as TOML
    PrintConfig,
}

impl CliArgs {
    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            mode: self.mode,
            scoring: self.scoring,
            batch_size: self.batch_size,
            in_memory: self.in_memory.then_some(true),
            types: self.types.clone(),
            store_path: self.store.clone(),
            data_dir: self.data_dir.clone(),
            radius_km: None,
            hf_lag_dateonly_days: self.hf_lag_dateonly_days,
            hf_lag_datetime_hours: self.hf_lag_datetime_hours,
            hf_tmax_days: self.hf_tmax_days,
            wd_delay_months: self.wd_delay_months,
            wd_tmax_days: self.wd_tmax_days,
            prod_tmax_days: self.prod_tmax_days,
            kernel_shape: self.kernel_shape,
        }
    }

    fn targets(&self) -> RunTargets {
        RunTargets {
            quake: self.reassociate_quake,
            well: self.reassociate_well.clone(),
        }
    }
}

// ============================================================================
// Commands
// ============================================================================

fn open_store(config: &AssocConfig) -> Result<AssociationStore> {
    let path = &config.run.store_path;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    AssociationStore::open(path).with_context(|| format!("Failed to open store at {}", path.display()))
}

fn run(config: &AssocConfig, targets: &RunTargets) -> Result<RunReport> {
    let tables = SourceTables::new(config).context("Invalid time zone in config")?;
    let events = tables.load_events().context("Failed to load earthquakes")?;
    let activities = tables.load_activities().context("Failed to load activity tables")?;

    let store = open_store(config)?;
    let report = AssociationPipeline::new(config, &store)
        .run(events, activities, targets)
        .context("Association run failed")?;

    println!("{}", serde_json::to_string_pretty(&report)?);
    verify(&store);
    Ok(report)
}

/// Diagnostic only: failures are logged, never returned
fn verify(store: &AssociationStore) {
    let report = match store.table_report() {
        Ok(r) => r,
        Err(e) => {
            warn!(error = %e, "Post-run verification failed");
            return;
        }
    };

    println!("links:     {}", report.links);
    println!("summaries: {}", report.summaries);
    println!("processed: {}", report.processed);
    if let Some(link) = &report.sample_link {
        match serde_json::to_string(link) {
            Ok(json) => println!("sample link:    {json}"),
            Err(e) => warn!(error = %e, "Could not render sample link"),
        }
    }
    if let Some(summary) = &report.sample_summary {
        match serde_json::to_string(summary) {
            Ok(json) => println!("sample summary: {json}"),
            Err(e) => warn!(error = %e, "Could not render sample summary"),
        }
    }
}

// ============================================================================
// Main Entry Point
// ============================================================================

fn init_logging(verbose: bool, json: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));
    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(false);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn main() -> Result<()> {
    let args = CliArgs::parse();
    init_logging(args.verbose, args.json_logs);

    let base = match &args.config {
        Some(path) => AssocConfig::load_from_file(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => AssocConfig::load(),
    };
    let config = base
        .with_overrides(&args.overrides())
        .context("Invalid command-line overrides")?;

    let targets = args.targets();

    match args.command.unwrap_or(SubCommand::Run) {
        SubCommand::Run => {
            info!(
                mode = %config.run.mode,
                scoring = %config.run.scoring,
                types = ?config.run.types,
                "eq-assoc starting"
            );
            if config.run.mode == ProcessingMode::Full && targets.quake.is_some() {
                warn!("--reassociate-quake with --mode full truncates every other quake's rows");
            }
            run(&config, &targets)?;
        }
        SubCommand::Backfill => {
            let store = open_store(&config)?;
            let inserted = backfill_missing_summaries(&store, config.run.backfill_batch_size)
                .context("Backfill failed")?;
            println!("backfilled summaries: {inserted}");
            verify(&store);
        }
        SubCommand::Report => verify(&open_store(&config)?),
        SubCommand::PrintConfig => print!("{}", config.to_toml()?),
    }
    Ok(())
}
