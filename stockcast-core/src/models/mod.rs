//! Regression learners used by the trainer: a CART tree, a bagged forest of
//! trees, and a gradient-boosted tree ensemble.
//!
//! Models are fitted once and never mutated; retraining produces a new
//! value. `TrainedModel` is the tagged union the rest of the pipeline holds.

pub mod boosting;
pub mod forest;
pub mod matrix;
pub mod tree;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::rng::RngHierarchy;

pub use boosting::{BoostParams, GradientBoosting};
pub use forest::{ForestParams, RandomForest, FOREST_STREAM};
pub use matrix::FeatureMatrix;
pub use tree::{RegressionTree, TreeParams};

/// Upper bound of the stock domain; predictions are clipped to `[0, STOCK_CAPACITY]`.
pub const STOCK_CAPACITY: f64 = 100.0;

/// Clip a raw estimate into the stock domain.
pub fn clip_stock(value: f64) -> f64 {
    value.clamp(0.0, STOCK_CAPACITY)
}

/// Errors raised while fitting a learner.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TrainError {
    #[error("training set is empty")]
    EmptyTrainingSet,

    #[error("feature matrix has {rows} rows but {targets} targets")]
    TargetLength { rows: usize, targets: usize },

    #[error("row {row} has {found} features, expected {expected}")]
    FeatureWidth {
        row: usize,
        expected: usize,
        found: usize,
    },

    #[error("invalid hyperparameters: {0}")]
    InvalidParams(String),
}

pub(crate) fn check_training_set(x: &FeatureMatrix, y: &[f64]) -> Result<(), TrainError> {
    if x.n_rows() == 0 || x.n_features() == 0 {
        return Err(TrainError::EmptyTrainingSet);
    }
    if x.n_rows() != y.len() {
        return Err(TrainError::TargetLength {
            rows: x.n_rows(),
            targets: y.len(),
        });
    }
    Ok(())
}

/// Scale non-negative weights to sum to 1. All-zero input stays all-zero.
pub(crate) fn normalize(values: &[f64]) -> Vec<f64> {
    let total: f64 = values.iter().sum();
    if total > 0.0 {
        values.iter().map(|v| v / total).collect()
    } else {
        vec![0.0; values.len()]
    }
}

/// Anything that maps a feature row to a stock estimate.
pub trait Regressor: Send + Sync {
    fn predict(&self, row: &[f64]) -> f64;

    fn n_features(&self) -> usize;

    /// Normalized squared-error reduction per feature.
    fn feature_importances(&self) -> Vec<f64>;

    fn predict_batch(&self, x: &FeatureMatrix) -> Vec<f64> {
        x.rows().map(|r| self.predict(r)).collect()
    }
}

impl Regressor for RandomForest {
    fn predict(&self, row: &[f64]) -> f64 {
        RandomForest::predict(self, row)
    }

    fn n_features(&self) -> usize {
        RandomForest::n_features(self)
    }

    fn feature_importances(&self) -> Vec<f64> {
        RandomForest::feature_importances(self)
    }
}

impl Regressor for GradientBoosting {
    fn predict(&self, row: &[f64]) -> f64 {
        GradientBoosting::predict(self, row)
    }

    fn n_features(&self) -> usize {
        GradientBoosting::n_features(self)
    }

    fn feature_importances(&self) -> Vec<f64> {
        GradientBoosting::feature_importances(self)
    }
}

/// Learner family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelKind {
    Forest,
    Boosted,
}

impl ModelKind {
    /// Fixed evaluation order of the candidates.
    pub const ALL: [ModelKind; 2] = [ModelKind::Forest, ModelKind::Boosted];

    pub fn name(&self) -> &'static str {
        match self {
            ModelKind::Forest => "random_forest",
            ModelKind::Boosted => "gradient_boosting",
        }
    }

    /// Fit a model of this kind.
    pub fn train(
        self,
        x: &FeatureMatrix,
        y: &[f64],
        params: &ModelParams,
    ) -> Result<TrainedModel, TrainError> {
        match self {
            ModelKind::Forest => {
                let rng = RngHierarchy::new(params.seed);
                RandomForest::fit(x, y, &params.forest, &rng).map(TrainedModel::Forest)
            }
            ModelKind::Boosted => {
                GradientBoosting::fit(x, y, &params.boosted).map(TrainedModel::Boosted)
            }
        }
    }
}

impl std::fmt::Display for ModelKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Hyperparameters of both learners plus the master seed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModelParams {
    pub seed: u64,
    pub forest: ForestParams,
    pub boosted: BoostParams,
}

impl Default for ModelParams {
    fn default() -> Self {
        Self {
            seed: 42,
            forest: ForestParams::default(),
            boosted: BoostParams::default(),
        }
    }
}

/// A fitted model of either family.
#[derive(Debug, Clone, PartialEq)]
pub enum TrainedModel {
    Forest(RandomForest),
    Boosted(GradientBoosting),
}

impl TrainedModel {
    pub fn kind(&self) -> ModelKind {
        match self {
            TrainedModel::Forest(_) => ModelKind::Forest,
            TrainedModel::Boosted(_) => ModelKind::Boosted,
        }
    }

    fn inner(&self) -> &dyn Regressor {
        match self {
            TrainedModel::Forest(m) => m as &dyn Regressor,
            TrainedModel::Boosted(m) => m as &dyn Regressor,
        }
    }

    /// Estimate clipped to the stock domain.
    pub fn predict_clipped(&self, row: &[f64]) -> f64 {
        clip_stock(self.predict(row))
    }
}

impl Regressor for TrainedModel {
    fn predict(&self, row: &[f64]) -> f64 {
        self.inner().predict(row)
    }

    fn n_features(&self) -> usize {
        self.inner().n_features()
    }

    fn feature_importances(&self) -> Vec<f64> {
        self.inner().feature_importances()
    }
}
