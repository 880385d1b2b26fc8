//! StockCast CLI: run, diagnose, and forecast commands.
//!
//! Commands:
//! - `run`: full pipeline; writes report.json, diagnostics.csv, forecast.csv
//! - `diagnose`: rank SKUs by stock-out risk without training
//! - `forecast`: run the pipeline and print one SKU's forecast as JSON
//!
//! Logs go to stderr, filtered by `RUST_LOG` (default `info`).

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;

use stockcast_core::diagnostics::{count_below, rank_by_risk};
use stockcast_core::domain::SkuId;
use stockcast_core::features::derive_table;
use stockcast_runner::export::{export_forecast_json, save_artifacts};
use stockcast_runner::{
    load_observations, run_pipeline, ColumnMapping, ForecastPoint, PipelineConfig, PipelineReport,
};

#[derive(Parser)]
#[command(
    name = "stockcast",
    about = "StockCast CLI: per-SKU inventory forecasting"
)]
struct Cli {
    /// Emit log lines as JSON.
    #[arg(long, global = true, default_value_t = false)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Input options shared by every command.
#[derive(Args)]
struct InputArgs {
    /// Observation CSV file.
    #[arg(long)]
    data: PathBuf,

    /// Pipeline TOML config. Defaults apply when omitted.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Read the legacy export headers (ID_PRODUTO, DATA_EVENTO, ...).
    #[arg(long, default_value_t = false)]
    legacy_columns: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full pipeline and write artifacts.
    Run {
        #[command(flatten)]
        input: InputArgs,

        /// Forecast only this SKU (all SKUs when omitted).
        #[arg(long)]
        sku: Option<String>,

        /// Forecast horizon in days. Defaults to the config value.
        #[arg(long)]
        horizon: Option<usize>,

        /// Output directory for artifacts.
        #[arg(long, default_value = "results")]
        output_dir: PathBuf,
    },
    /// Print the most at-risk SKUs.
    Diagnose {
        #[command(flatten)]
        input: InputArgs,

        /// Number of SKUs to list.
        #[arg(long, default_value_t = 10)]
        top: usize,
    },
    /// Run the pipeline and print one SKU's forecast as JSON.
    Forecast {
        #[command(flatten)]
        input: InputArgs,

        /// SKU to forecast.
        #[arg(long)]
        sku: String,

        /// Forecast horizon in days. Defaults to the config value.
        #[arg(long)]
        horizon: Option<usize>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    if let Err(e) = init_tracing(cli.json_logs) {
        eprintln!("warning: logging disabled, could not install subscriber: {e}");
    }

    match cli.command {
        Commands::Run {
            input,
            sku,
            horizon,
            output_dir,
        } => run_cmd(&input, sku, horizon, &output_dir),
        Commands::Diagnose { input, top } => diagnose_cmd(&input, top),
        Commands::Forecast {
            input,
            sku,
            horizon,
        } => forecast_cmd(&input, &sku, horizon),
    }
}

/// Install the global stderr subscriber. Fails if one is already installed.
fn init_tracing(json: bool) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);
    if json {
        builder.json().try_init()
    } else {
        builder.try_init()
    }
}

fn load_config(input: &InputArgs) -> Result<PipelineConfig> {
    let mut config = match &input.config {
        Some(path) => PipelineConfig::from_file(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => PipelineConfig::default(),
    };
    if input.legacy_columns {
        config.columns = ColumnMapping {
            date_format: config.columns.date_format.clone(),
            ..ColumnMapping::legacy()
        };
    }
    Ok(config)
}

fn load_input(input: &InputArgs) -> Result<(PipelineConfig, stockcast_runner::LoadedObservations)> {
    let config = load_config(input)?;
    let loaded = load_observations(&input.data, &config.columns)
        .with_context(|| format!("failed to load observations from {}", input.data.display()))?;
    Ok((config, loaded))
}

fn run_cmd(input: &InputArgs, sku: Option<String>, horizon: Option<usize>, output_dir: &Path) -> Result<()> {
    let (config, loaded) = load_input(input)?;
    let (report, session) = run_pipeline(&config, &loaded.table)?;
    let horizon = horizon.unwrap_or(session.default_horizon());

    let forecasts = match sku {
        Some(id) => session.forecast(&SkuId::new(id), horizon)?,
        None => session.forecast_all(horizon)?,
    };

    print_summary(&report);
    print_forecast(&forecasts);

    let written = save_artifacts(&report, &forecasts, output_dir)?;
    info!(dir = %output_dir.display(), files = written.len(), "artifacts written");
    for path in written {
        println!("Wrote {}", path.display());
    }
    Ok(())
}

fn diagnose_cmd(input: &InputArgs, top: usize) -> Result<()> {
    let (config, loaded) = load_input(input)?;
    let features = derive_table(&loaded.table, &config.features);
    let ranked = rank_by_risk(&features);

    println!(
        "{} SKUs, {} below the replenish level ({}) at least once",
        ranked.len(),
        count_below(&ranked, config.features.replenish_threshold),
        config.features.replenish_threshold
    );
    println!(
        "{:<12} {:>6} {:>9} {:>9} {:>9} {:>10}",
        "sku", "min", "mean", "std", "low_days", "promo_days"
    );
    for d in ranked.iter().take(top) {
        let std = d.std_stock.map(|s| format!("{s:.1}")).unwrap_or_else(|| "-".into());
        println!(
            "{:<12} {:>6} {:>9.1} {:>9} {:>9} {:>10}",
            d.sku_id.as_str(),
            d.min_stock,
            d.mean_stock,
            std,
            d.low_stock_days,
            d.promotion_days
        );
    }
    Ok(())
}

fn forecast_cmd(input: &InputArgs, sku: &str, horizon: Option<usize>) -> Result<()> {
    let (config, loaded) = load_input(input)?;
    let (_, session) = run_pipeline(&config, &loaded.table)?;
    let horizon = horizon.unwrap_or(session.default_horizon());
    let points = session.forecast(&SkuId::new(sku), horizon)?;
    println!("{}", export_forecast_json(&points)?);
    Ok(())
}

fn print_summary(report: &PipelineReport) {
    let s = &report.sizes;
    println!(
        "Dataset: {} SKUs, {} observations (hash {})",
        s.skus,
        s.observations,
        report.dataset_hash.get(..12).unwrap_or(&report.dataset_hash)
    );
    println!(
        "Split:   {} train / {} holdout ({:?}), {} rows dropped",
        s.train_rows, s.holdout_rows, s.split_strategy, s.dropped_rows
    );
    println!();
    println!("{:<20} {:>8} {:>8} {:>9} {:>8}", "model", "rmse", "mae", "mape%", "r2");
    for c in &report.selection.candidates {
        let marker = if c.kind == report.selection.selected { "*" } else { " " };
        println!(
            "{marker}{:<19} {:>8.2} {:>8.2} {:>9.2} {:>8.3}",
            c.kind.name(),
            c.metrics.rmse,
            c.metrics.mae,
            c.metrics.mape,
            c.metrics.r2
        );
    }
    println!();
}

fn print_forecast(points: &[ForecastPoint]) {
    println!("{:<12} {:<10} {:>9} {:>9} {:>9} {:>6}", "sku", "date", "predicted", "lower", "upper", "conf");
    for p in points {
        println!(
            "{:<12} {:<10} {:>9.1} {:>9.1} {:>9.1} {:>6}",
            p.sku_id.as_str(),
            p.date.to_string(),
            p.predicted_level,
            p.lower_bound,
            p.upper_bound,
            p.confidence_label
        );
    }
}
