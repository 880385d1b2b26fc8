//! StockCast Runner: ingestion, configuration, training and selection, forecasting, export.
//!
//! This crate builds on `stockcast-core` to provide:
//! - CSV observation loading with dataset fingerprinting
//! - TOML pipeline configuration with validated defaults
//! - Holdout evaluation metrics (RMSE, MAE, smoothed MAPE, R2)
//! - Candidate training and R2-based model selection
//! - Recursive N-day forecasts with RMSE-sized confidence bands
//! - End-to-end pipeline and JSON/CSV artifact export

pub mod config;
pub mod data_loader;
pub mod export;
pub mod forecast;
pub mod metrics;
pub mod pipeline;
pub mod trainer;

pub use config::{ColumnMapping, ConfigError, ForecastConfig, PipelineConfig, SplitConfig};
pub use data_loader::{load_observations, read_observations, LoadError, LoadedObservations};
pub use forecast::{ForecastError, ForecastGenerator, ForecastPoint, CONFIDENCE_LABEL};
pub use metrics::EvaluationMetrics;
pub use pipeline::{run_pipeline, DatasetSizes, ForecastSession, PipelineError, PipelineReport};
pub use trainer::{train_and_select, CandidateReport, ModelSelection, SelectionSummary, TrainerError};
