//! Export: JSON and CSV artifacts of a pipeline run.
//!
//! - **JSON**: the full `PipelineReport` (schema-versioned) and forecast points
//! - **CSV**: ranked diagnostics and forecast points, values to one decimal
//!
//! Unknown report schema versions are rejected on load.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use stockcast_core::diagnostics::SkuDiagnostics;

use crate::forecast::ForecastPoint;
use crate::pipeline::{PipelineReport, SCHEMA_VERSION};

// ─── JSON export ────────────────────────────────────────────────────

pub fn export_report_json(report: &PipelineReport) -> Result<String> {
    serde_json::to_string_pretty(report).context("failed to serialize PipelineReport to JSON")
}

/// Deserialize a `PipelineReport`, rejecting unknown schema versions.
pub fn import_report_json(json: &str) -> Result<PipelineReport> {
    let report: PipelineReport =
        serde_json::from_str(json).context("failed to deserialize PipelineReport from JSON")?;
    if report.schema_version > SCHEMA_VERSION {
        bail!(
            "unsupported schema version {} (max supported: {})",
            report.schema_version,
            SCHEMA_VERSION
        );
    }
    Ok(report)
}

pub fn export_forecast_json(points: &[ForecastPoint]) -> Result<String> {
    serde_json::to_string_pretty(points).context("failed to serialize forecast to JSON")
}

// ─── CSV export ─────────────────────────────────────────────────────

/// Ranked diagnostics.
///
/// Columns: rank, sku_id, observations, min_stock, mean_stock, std_stock,
/// low_stock_days, mean_price, promotion_days
pub fn export_diagnostics_csv(diagnostics: &[SkuDiagnostics]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record([
        "rank",
        "sku_id",
        "observations",
        "min_stock",
        "mean_stock",
        "std_stock",
        "low_stock_days",
        "mean_price",
        "promotion_days",
    ])?;

    for (i, d) in diagnostics.iter().enumerate() {
        wtr.write_record([
            (i + 1).to_string(),
            d.sku_id.to_string(),
            d.observation_count.to_string(),
            d.min_stock.to_string(),
            format!("{:.2}", d.mean_stock),
            d.std_stock.map(|s| format!("{s:.2}")).unwrap_or_default(),
            d.low_stock_days.to_string(),
            format!("{:.2}", d.mean_price),
            d.promotion_days.to_string(),
        ])?;
    }

    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

/// Forecast points with levels rounded to one decimal.
///
/// Columns: sku_id, date, predicted_level, lower_bound, upper_bound, confidence
pub fn export_forecast_csv(points: &[ForecastPoint]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record([
        "sku_id",
        "date",
        "predicted_level",
        "lower_bound",
        "upper_bound",
        "confidence",
    ])?;
    for p in points {
        wtr.write_record([
            p.sku_id.to_string(),
            p.date.to_string(),
            format!("{:.1}", p.predicted_level),
            format!("{:.1}", p.lower_bound),
            format!("{:.1}", p.upper_bound),
            p.confidence_label.clone(),
        ])?;
    }
    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

// ─── Artifact bundle ────────────────────────────────────────────────

/// Write `report.json`, `diagnostics.csv`, and `forecast.csv` into `output_dir`.
///
/// Returns the written paths.
pub fn save_artifacts(
    report: &PipelineReport,
    forecasts: &[ForecastPoint],
    output_dir: &Path,
) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(output_dir)
        .with_context(|| format!("failed to create output dir: {}", output_dir.display()))?;

    let files = [
        ("report.json", export_report_json(report)?),
        ("diagnostics.csv", export_diagnostics_csv(&report.diagnostics)?),
        ("forecast.csv", export_forecast_csv(forecasts)?),
    ];
    let mut written = Vec::with_capacity(files.len());
    for (name, content) in files {
        let path = output_dir.join(name);
        std::fs::write(&path, content)
            .with_context(|| format!("failed to write {}", path.display()))?;
        written.push(path);
    }
    Ok(written)
}

/// Load a `PipelineReport` from an output directory's report.json.
pub fn load_report(dir: &Path) -> Result<PipelineReport> {
    let path = dir.join("report.json");
    let json = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    import_report_json(&json)
}
