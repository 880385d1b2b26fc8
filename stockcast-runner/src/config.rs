//! Pipeline configuration loaded from TOML.
//!
//! Every section is optional; missing sections and keys fall back to the
//! defaults below, so an empty file is a valid configuration.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

use stockcast_core::dataset::SplitStrategy;
use stockcast_core::features::FeatureThresholds;
use stockcast_core::models::{BoostParams, ForestParams, ModelParams};

/// Errors from loading or validating a configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("read config file '{path}': {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Input header names for the five observation columns, plus the date format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnMapping {
    pub sku_id: String,
    pub date: String,
    pub stock_level: String,
    pub price: String,
    pub promotion_flag: String,
    /// `chrono` format string for the date column.
    pub date_format: String,
}

impl Default for ColumnMapping {
    fn default() -> Self {
        Self {
            sku_id: "sku_id".into(),
            date: "date".into(),
            stock_level: "stock_level".into(),
            price: "price".into(),
            promotion_flag: "promotion_flag".into(),
            date_format: "%Y-%m-%d".into(),
        }
    }
}

impl ColumnMapping {
    /// Header names of the legacy inventory export.
    pub fn legacy() -> Self {
        Self {
            sku_id: "ID_PRODUTO".into(),
            date: "DATA_EVENTO".into(),
            stock_level: "QUANTIDADE_ESTOQUE".into(),
            price: "PRECO".into(),
            promotion_flag: "FLAG_PROMOCAO".into(),
            date_format: "%Y-%m-%d".into(),
        }
    }

    /// Names in schema order.
    pub fn names(&self) -> [&str; 5] {
        [
            self.sku_id.as_str(),
            self.date.as_str(),
            self.stock_level.as_str(),
            self.price.as_str(),
            self.promotion_flag.as_str(),
        ]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SplitConfig {
    pub strategy: SplitStrategy,
    pub holdout_fraction: f64,
}

impl Default for SplitConfig {
    fn default() -> Self {
        Self {
            strategy: SplitStrategy::GlobalOrdered,
            holdout_fraction: 0.2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForecastConfig {
    pub horizon: usize,
    /// Band half-width as a multiple of the selected model's holdout RMSE.
    pub band_multiplier: f64,
}

impl Default for ForecastConfig {
    fn default() -> Self {
        Self {
            horizon: 7,
            band_multiplier: 1.5,
        }
    }
}

/// Full configuration of one pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub seed: u64,
    pub columns: ColumnMapping,
    pub features: FeatureThresholds,
    pub split: SplitConfig,
    pub forest: ForestParams,
    pub boosted: BoostParams,
    pub forecast: ForecastConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            columns: ColumnMapping::default(),
            features: FeatureThresholds::default(),
            split: SplitConfig::default(),
            forest: ForestParams::default(),
            boosted: BoostParams::default(),
            forecast: ForecastConfig::default(),
        }
    }
}

impl PipelineConfig {
    /// Load and validate a configuration file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Parse and validate a TOML string.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn model_params(&self) -> ModelParams {
        ModelParams {
            seed: self.seed,
            forest: self.forest,
            boosted: self.boosted,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: String| Err(ConfigError::Invalid(msg));

        self.forest
            .validate()
            .map_err(|e| ConfigError::Invalid(format!("[forest] {e}")))?;
        self.boosted
            .validate()
            .map_err(|e| ConfigError::Invalid(format!("[boosted] {e}")))?;

        let f = self.split.holdout_fraction;
        if !(f > 0.0 && f < 1.0) {
            return invalid(format!("[split] holdout_fraction must be in (0, 1), got {f}"));
        }
        if self.forecast.horizon == 0 {
            return invalid("[forecast] horizon must be >= 1".into());
        }
        let m = self.forecast.band_multiplier;
        if !(m.is_finite() && m > 0.0) {
            return invalid(format!("[forecast] band_multiplier must be positive, got {m}"));
        }
        let t = &self.features;
        if t.low_stock_threshold > t.replenish_threshold {
            return invalid(format!(
                "[features] low_stock_threshold ({}) exceeds replenish_threshold ({})",
                t.low_stock_threshold, t.replenish_threshold
            ));
        }
        if self.columns.date_format.trim().is_empty() {
            return invalid("[columns] date_format must not be empty".into());
        }
        Ok(())
    }
}
