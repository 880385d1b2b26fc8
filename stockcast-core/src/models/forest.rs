//! Random forest regressor: bagged regression trees, prediction = mean of members.
//!
//! Each tree is fit on its own bootstrap sample drawn from a `StdRng` seeded
//! by the RNG hierarchy with `(FOREST_STREAM, tree_index)`. Trees are trained
//! in parallel with rayon; because every tree owns its seed, the fitted
//! forest is identical for any thread count.

use rand::Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::rng::RngHierarchy;

use super::{check_training_set, normalize, FeatureMatrix, RegressionTree, TrainError, TreeParams};

/// RNG stream name for bootstrap sampling.
pub const FOREST_STREAM: &str = "forest";

/// Forest hyperparameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForestParams {
    pub n_trees: usize,
    pub max_depth: usize,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
}

impl Default for ForestParams {
    fn default() -> Self {
        Self {
            n_trees: 100,
            max_depth: 15,
            min_samples_split: 5,
            min_samples_leaf: 2,
        }
    }
}

impl ForestParams {
    pub fn tree_params(&self) -> TreeParams {
        TreeParams {
            max_depth: self.max_depth,
            min_samples_split: self.min_samples_split,
            min_samples_leaf: self.min_samples_leaf,
        }
    }

    pub fn validate(&self) -> Result<(), TrainError> {
        if self.n_trees == 0 {
            return Err(TrainError::InvalidParams("n_trees must be >= 1".into()));
        }
        self.tree_params().validate()
    }
}

/// A fitted random forest.
#[derive(Debug, Clone, PartialEq)]
pub struct RandomForest {
    trees: Vec<RegressionTree>,
    n_features: usize,
}

impl RandomForest {
    pub fn fit(
        x: &FeatureMatrix,
        y: &[f64],
        params: &ForestParams,
        rng: &RngHierarchy,
    ) -> Result<Self, TrainError> {
        params.validate()?;
        check_training_set(x, y)?;

        let n = x.n_rows();
        let tree_params = params.tree_params();
        let trees = (0..params.n_trees)
            .into_par_iter()
            .map(|i| {
                let mut r = rng.rng_for(FOREST_STREAM, i as u64);
                let sample: Vec<usize> = (0..n).map(|_| r.gen_range(0..n)).collect();
                RegressionTree::fit_sample(x, y, &sample, &tree_params)
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            trees,
            n_features: x.n_features(),
        })
    }

    pub fn predict(&self, row: &[f64]) -> f64 {
        let total: f64 = self.trees.iter().map(|t| t.predict(row)).sum();
        total / self.trees.len() as f64
    }

    pub fn trees(&self) -> &[RegressionTree] {
        &self.trees
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }

    /// Mean of the per-tree normalized split gains.
    pub fn feature_importances(&self) -> Vec<f64> {
        let mut acc = vec![0.0; self.n_features];
        for tree in &self.trees {
            for (a, g) in acc.iter_mut().zip(normalize(tree.split_gains())) {
                *a += g;
            }
        }
        normalize(&acc)
    }
}
