//! Gradient-boosted regression trees with squared-error loss.
//!
//! Stage `k` fits a tree to the residuals of the cumulative prediction of
//! stages `1..k-1`, so stages are strictly sequential. Prediction is the
//! initial estimate (mean target) plus the learning-rate-scaled sum of stage
//! outputs. Fitting uses every training row at every stage and is fully
//! deterministic.

use serde::{Deserialize, Serialize};

use super::{check_training_set, normalize, FeatureMatrix, RegressionTree, TrainError, TreeParams};

/// Boosting hyperparameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoostParams {
    pub n_stages: usize,
    pub max_depth: usize,
    pub learning_rate: f64,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
}

impl Default for BoostParams {
    fn default() -> Self {
        Self {
            n_stages: 100,
            max_depth: 5,
            learning_rate: 0.1,
            min_samples_split: 2,
            min_samples_leaf: 1,
        }
    }
}

impl BoostParams {
    pub fn tree_params(&self) -> TreeParams {
        TreeParams {
            max_depth: self.max_depth,
            min_samples_split: self.min_samples_split,
            min_samples_leaf: self.min_samples_leaf,
        }
    }

    pub fn validate(&self) -> Result<(), TrainError> {
        if self.n_stages == 0 {
            return Err(TrainError::InvalidParams("n_stages must be >= 1".into()));
        }
        if !(self.learning_rate > 0.0 && self.learning_rate <= 1.0) {
            return Err(TrainError::InvalidParams(format!(
                "learning_rate must be in (0, 1], got {}",
                self.learning_rate
            )));
        }
        self.tree_params().validate()
    }
}

/// A fitted boosted ensemble.
#[derive(Debug, Clone, PartialEq)]
pub struct GradientBoosting {
    init: f64,
    learning_rate: f64,
    stages: Vec<RegressionTree>,
    n_features: usize,
    /// Training mean squared error after each stage.
    train_loss: Vec<f64>,
}

impl GradientBoosting {
    pub fn fit(x: &FeatureMatrix, y: &[f64], params: &BoostParams) -> Result<Self, TrainError> {
        params.validate()?;
        check_training_set(x, y)?;

        let n = x.n_rows();
        let tree_params = params.tree_params();
        let init = y.iter().sum::<f64>() / n as f64;
        let mut fitted = vec![init; n];
        let mut stages = Vec::with_capacity(params.n_stages);
        let mut train_loss = Vec::with_capacity(params.n_stages);

        for _ in 0..params.n_stages {
            let residuals: Vec<f64> = y.iter().zip(&fitted).map(|(t, f)| t - f).collect();
            let tree = RegressionTree::fit(x, &residuals, &tree_params)?;
            for (i, f) in fitted.iter_mut().enumerate() {
                *f += params.learning_rate * tree.predict(x.row(i));
            }
            let mse = y
                .iter()
                .zip(&fitted)
                .map(|(t, f)| (t - f).powi(2))
                .sum::<f64>()
                / n as f64;
            train_loss.push(mse);
            stages.push(tree);
        }

        Ok(Self {
            init,
            learning_rate: params.learning_rate,
            stages,
            n_features: x.n_features(),
            train_loss,
        })
    }

    pub fn predict(&self, row: &[f64]) -> f64 {
        let staged: f64 = self.stages.iter().map(|t| t.predict(row)).sum();
        self.init + self.learning_rate * staged
    }

    pub fn initial_estimate(&self) -> f64 {
        self.init
    }

    pub fn stages(&self) -> &[RegressionTree] {
        &self.stages
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }

    pub fn train_loss(&self) -> &[f64] {
        &self.train_loss
    }

    /// Normalized split gains summed over all stages.
    pub fn feature_importances(&self) -> Vec<f64> {
        let mut acc = vec![0.0; self.n_features];
        for tree in &self.stages {
            for (a, g) in acc.iter_mut().zip(tree.split_gains()) {
                *a += g;
            }
        }
        normalize(&acc)
    }
}
