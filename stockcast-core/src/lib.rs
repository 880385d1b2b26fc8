//! StockCast Core: domain types, causal feature engine, dataset assembly, tree learners.
//!
//! This crate holds the algorithmic heart of the forecaster and performs no I/O:
//! - Observations, validated per-SKU series, and the input schema contract
//! - Single-pass, per-SKU feature derivation (no look-ahead)
//! - Per-SKU diagnostics rollup ranked by stock-out risk
//! - Fixed-column dataset assembly and the ordered train/holdout split
//! - CART regression trees, a bagged forest, and a boosted ensemble
//! - Deterministic RNG hierarchy for reproducible training

pub mod dataset;
pub mod diagnostics;
pub mod domain;
pub mod features;
pub mod models;
pub mod rng;
pub mod schema;

pub use dataset::{
    assemble, split, AssembledDataset, DatasetError, DatasetSplit, Sample, SplitStrategy,
    FEATURE_COLUMNS, N_FEATURES,
};
pub use diagnostics::{rank_by_risk, SkuDiagnostics};
pub use domain::{Observation, ObservationTable, SeriesError, SkuId, SkuSeries};
pub use features::{derive_features, derive_table, FeatureTable, FeatureThresholds, FeatureVector};
pub use models::{ModelKind, ModelParams, Regressor, TrainError, TrainedModel};
pub use schema::SchemaError;
