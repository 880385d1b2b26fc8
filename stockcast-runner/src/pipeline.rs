//! End-to-end pipeline: wires features, diagnostics, dataset, trainer, and forecaster.
//!
//! Stages run in a fixed order: feature derivation for every SKU (parallel),
//! then diagnostics and dataset assembly over the finished table, then
//! training and selection. The result is a serializable `PipelineReport`
//! plus a `ForecastSession` that answers forecast requests for the run.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use stockcast_core::dataset::{assemble, split, DatasetError, SplitStrategy};
use stockcast_core::diagnostics::{rank_by_risk, SkuDiagnostics};
use stockcast_core::domain::{ObservationTable, SkuId};
use stockcast_core::features::{derive_table, FeatureTable};

use crate::config::{ConfigError, PipelineConfig};
use crate::data_loader::compute_dataset_hash;
use crate::forecast::{ForecastError, ForecastGenerator, ForecastPoint};
use crate::trainer::{train_and_select, ModelSelection, SelectionSummary, TrainerError};

/// Current schema version of the persisted report.
pub const SCHEMA_VERSION: u32 = 1;

/// Errors from a pipeline run.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    #[error("dataset error: {0}")]
    Dataset(#[from] DatasetError),

    #[error("trainer error: {0}")]
    Trainer(#[from] TrainerError),

    #[error("forecast error: {0}")]
    Forecast(#[from] ForecastError),

    #[error("observation table is empty")]
    EmptyInput,
}

/// Row counts at each stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetSizes {
    pub skus: usize,
    pub observations: usize,
    pub feature_rows: usize,
    pub dropped_rows: usize,
    pub train_rows: usize,
    pub holdout_rows: usize,
    pub split_strategy: SplitStrategy,
}

/// Output contract of one run, minus forecasts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineReport {
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub dataset_hash: String,
    pub sizes: DatasetSizes,
    /// Ranked most at-risk first.
    pub diagnostics: Vec<SkuDiagnostics>,
    pub selection: SelectionSummary,
    pub config: PipelineConfig,
}

fn default_schema_version() -> u32 {
    SCHEMA_VERSION
}

/// Feature table and selected model of a finished run.
#[derive(Debug, Clone)]
pub struct ForecastSession {
    features: FeatureTable,
    selection: ModelSelection,
    band_multiplier: f64,
    default_horizon: usize,
}

impl ForecastSession {
    pub fn features(&self) -> &FeatureTable {
        &self.features
    }

    pub fn selection(&self) -> &ModelSelection {
        &self.selection
    }

    pub fn default_horizon(&self) -> usize {
        self.default_horizon
    }

    pub fn generator(&self) -> ForecastGenerator<'_> {
        ForecastGenerator::new(
            &self.features,
            self.selection.model(),
            self.selection.metrics(),
            self.band_multiplier,
        )
    }

    pub fn forecast(&self, sku: &SkuId, horizon: usize) -> Result<Vec<ForecastPoint>, ForecastError> {
        self.generator().forecast(sku, horizon)
    }

    /// Every SKU at `horizon`, flattened SKU-then-date.
    pub fn forecast_all(&self, horizon: usize) -> Result<Vec<ForecastPoint>, ForecastError> {
        Ok(self
            .generator()
            .forecast_all(horizon)?
            .into_iter()
            .flat_map(|(_, points)| points)
            .collect())
    }
}

/// Run every stage on `table`.
pub fn run_pipeline(
    config: &PipelineConfig,
    table: &ObservationTable,
) -> Result<(PipelineReport, ForecastSession), PipelineError> {
    config.validate()?;
    if table.is_empty() {
        return Err(PipelineError::EmptyInput);
    }
    let dataset_hash = compute_dataset_hash(table);

    info!(skus = table.sku_count(), observations = table.observation_count(), "deriving features");
    let features = derive_table(table, &config.features);

    let diagnostics = rank_by_risk(&features);
    info!(
        at_risk = diagnostics.iter().filter(|d| d.low_stock_days > 0).count(),
        "diagnostics ranked"
    );

    let dataset = assemble(&features);
    if dataset.dropped_rows > 0 {
        warn!(dropped = dataset.dropped_rows, "dropped rows with non-finite features");
    }
    let parts = split(&dataset, config.split.strategy, config.split.holdout_fraction)?;
    info!(
        strategy = ?parts.strategy,
        train = parts.train.len(),
        holdout = parts.holdout.len(),
        "dataset split"
    );

    let selection = train_and_select(&parts, &config.model_params())?;

    let report = PipelineReport {
        schema_version: SCHEMA_VERSION,
        dataset_hash,
        sizes: DatasetSizes {
            skus: table.sku_count(),
            observations: table.observation_count(),
            feature_rows: features.row_count(),
            dropped_rows: dataset.dropped_rows,
            train_rows: parts.train.len(),
            holdout_rows: parts.holdout.len(),
            split_strategy: parts.strategy,
        },
        diagnostics,
        selection: selection.summary(),
        config: config.clone(),
    };
    let session = ForecastSession {
        features,
        selection,
        band_multiplier: config.forecast.band_multiplier,
        default_horizon: config.forecast.horizon,
    };
    Ok((report, session))
}
