//! CART regression tree.
//!
//! Greedy binary splits minimizing the summed squared error of the two
//! children. Candidate thresholds are midpoints between consecutive distinct
//! sorted feature values; rows with `x[f] <= threshold` go left. Leaves hold
//! the mean target of their rows. Ties between equally good splits resolve to
//! the lowest feature index and then the lowest threshold, so fitting is
//! deterministic.

use serde::{Deserialize, Serialize};

use super::{check_training_set, FeatureMatrix, TrainError};

/// Minimum squared-error reduction for a split to be taken.
const MIN_GAIN: f64 = 1e-12;

/// Growth limits of a single tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeParams {
    /// Root is depth 0; nodes at `max_depth` are always leaves.
    pub max_depth: usize,
    /// A node with fewer rows is not split.
    pub min_samples_split: usize,
    /// Each child of a split keeps at least this many rows.
    pub min_samples_leaf: usize,
}

impl TreeParams {
    pub fn validate(&self) -> Result<(), TrainError> {
        if self.max_depth == 0 {
            return Err(TrainError::InvalidParams("max_depth must be >= 1".into()));
        }
        if self.min_samples_split < 2 {
            return Err(TrainError::InvalidParams(
                "min_samples_split must be >= 2".into(),
            ));
        }
        if self.min_samples_leaf == 0 {
            return Err(TrainError::InvalidParams(
                "min_samples_leaf must be >= 1".into(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Node {
    Leaf {
        value: f64,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
}

/// A fitted regression tree.
#[derive(Debug, Clone, PartialEq)]
pub struct RegressionTree {
    nodes: Vec<Node>,
    n_features: usize,
    /// Total squared-error reduction attributed to each feature.
    gains: Vec<f64>,
}

impl RegressionTree {
    /// Fit on every row of `x`.
    pub fn fit(x: &FeatureMatrix, y: &[f64], params: &TreeParams) -> Result<Self, TrainError> {
        let sample: Vec<usize> = (0..x.n_rows()).collect();
        Self::fit_sample(x, y, &sample, params)
    }

    /// Fit on the rows listed in `sample`. Repeated indices count as repeated rows.
    pub fn fit_sample(
        x: &FeatureMatrix,
        y: &[f64],
        sample: &[usize],
        params: &TreeParams,
    ) -> Result<Self, TrainError> {
        params.validate()?;
        check_training_set(x, y)?;
        if sample.is_empty() {
            return Err(TrainError::EmptyTrainingSet);
        }

        let mut grower = Grower {
            x,
            y,
            params,
            nodes: Vec::new(),
            gains: vec![0.0; x.n_features()],
        };
        grower.grow(sample.to_vec(), 0);

        Ok(Self {
            nodes: grower.nodes,
            n_features: x.n_features(),
            gains: grower.gains,
        })
    }

    pub fn predict(&self, row: &[f64]) -> f64 {
        let mut idx = 0;
        loop {
            match &self.nodes[idx] {
                Node::Leaf { value } => return *value,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    idx = if row[*feature] <= *threshold {
                        *left
                    } else {
                        *right
                    };
                }
            }
        }
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn leaf_count(&self) -> usize {
        self.nodes
            .iter()
            .filter(|n| matches!(n, Node::Leaf { .. }))
            .count()
    }

    /// Unnormalized squared-error reduction per feature.
    pub fn split_gains(&self) -> &[f64] {
        &self.gains
    }
}

struct Candidate {
    feature: usize,
    threshold: f64,
    children_sse: f64,
}

struct Grower<'a> {
    x: &'a FeatureMatrix,
    y: &'a [f64],
    params: &'a TreeParams,
    nodes: Vec<Node>,
    gains: Vec<f64>,
}

impl Grower<'_> {
    fn grow(&mut self, rows: Vec<usize>, depth: usize) -> usize {
        let n = rows.len();
        let mean = rows.iter().map(|&r| self.y[r]).sum::<f64>() / n as f64;
        let sse: f64 = rows.iter().map(|&r| (self.y[r] - mean).powi(2)).sum();

        let id = self.nodes.len();
        self.nodes.push(Node::Leaf { value: mean });

        let p = self.params;
        if depth >= p.max_depth
            || n < p.min_samples_split
            || n < 2 * p.min_samples_leaf
            || sse <= MIN_GAIN
        {
            return id;
        }

        let best = match self.best_split(&rows) {
            Some(c) => c,
            None => return id,
        };
        let gain = sse - best.children_sse;
        if gain <= MIN_GAIN {
            return id;
        }

        let (left_rows, right_rows): (Vec<usize>, Vec<usize>) = rows
            .into_iter()
            .partition(|&r| self.x.get(r, best.feature) <= best.threshold);

        self.gains[best.feature] += gain;
        let left = self.grow(left_rows, depth + 1);
        let right = self.grow(right_rows, depth + 1);
        self.nodes[id] = Node::Split {
            feature: best.feature,
            threshold: best.threshold,
            left,
            right,
        };
        id
    }

    fn best_split(&self, rows: &[usize]) -> Option<Candidate> {
        let n = rows.len();
        let min_leaf = self.params.min_samples_leaf;
        let total_sum: f64 = rows.iter().map(|&r| self.y[r]).sum();
        let total_sq: f64 = rows.iter().map(|&r| self.y[r] * self.y[r]).sum();

        let mut best: Option<Candidate> = None;
        let mut pairs: Vec<(f64, f64)> = Vec::with_capacity(n);

        for feature in 0..self.x.n_features() {
            pairs.clear();
            pairs.extend(rows.iter().map(|&r| (self.x.get(r, feature), self.y[r])));
            pairs.sort_by(|a, b| a.0.total_cmp(&b.0));

            let mut left_sum = 0.0;
            let mut left_sq = 0.0;
            for i in 0..n - 1 {
                let (value, target) = pairs[i];
                left_sum += target;
                left_sq += target * target;

                let left_n = i + 1;
                let right_n = n - left_n;
                if left_n < min_leaf {
                    continue;
                }
                if right_n < min_leaf {
                    break;
                }
                let next = pairs[i + 1].0;
                if value >= next {
                    continue;
                }

                let right_sum = total_sum - left_sum;
                let right_sq = total_sq - left_sq;
                let sse_left = (left_sq - left_sum * left_sum / left_n as f64).max(0.0);
                let sse_right = (right_sq - right_sum * right_sum / right_n as f64).max(0.0);
                let children_sse = sse_left + sse_right;

                if best
                    .as_ref()
                    .map_or(true, |b| children_sse < b.children_sse)
                {
                    let mut threshold = value + (next - value) / 2.0;
                    if threshold >= next {
                        threshold = value;
                    }
                    best = Some(Candidate {
                        feature,
                        threshold,
                        children_sse,
                    });
                }
            }
        }

        best
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(max_depth: usize) -> TreeParams {
        TreeParams {
            max_depth,
            min_samples_split: 2,
            min_samples_leaf: 1,
        }
    }

    /// Depth of the deepest leaf (0 for a single-leaf tree).
    fn depth(tree: &RegressionTree) -> usize {
        fn walk(nodes: &[Node], idx: usize) -> usize {
            match &nodes[idx] {
                Node::Leaf { .. } => 0,
                Node::Split { left, right, .. } => 1 + walk(nodes, *left).max(walk(nodes, *right)),
            }
        }
        walk(&tree.nodes, 0)
    }

    fn matrix(rows: &[&[f64]]) -> FeatureMatrix {
        FeatureMatrix::from_rows(rows).unwrap()
    }

    #[test]
    fn step_function_is_learned_exactly() {
        let x = matrix(&[&[1.0], &[2.0], &[3.0], &[10.0], &[11.0], &[12.0]]);
        let y = [5.0, 5.0, 5.0, 50.0, 50.0, 50.0];
        let tree = RegressionTree::fit(&x, &y, &params(3)).unwrap();

        assert_eq!(tree.predict(&[2.5]), 5.0);
        assert_eq!(tree.predict(&[11.5]), 50.0);
        assert_eq!(tree.leaf_count(), 2);
        assert_eq!(depth(&tree), 1);
        // Midpoint threshold between 3 and 10
        assert_eq!(tree.predict(&[6.5]), 5.0);
        assert_eq!(tree.predict(&[6.6]), 50.0);
    }

    #[test]
    fn picks_informative_feature() {
        // Feature 0 is noise, feature 1 separates the targets.
        let x = matrix(&[
            &[3.0, 0.0],
            &[1.0, 0.0],
            &[2.0, 1.0],
            &[3.0, 1.0],
            &[1.0, 0.0],
            &[2.0, 1.0],
        ]);
        let y = [0.0, 0.0, 10.0, 10.0, 0.0, 10.0];
        let tree = RegressionTree::fit(&x, &y, &params(1)).unwrap();
        assert_eq!(tree.predict(&[3.0, 0.0]), 0.0);
        assert_eq!(tree.predict(&[1.0, 1.0]), 10.0);
        assert!(tree.split_gains()[1] > 0.0);
        assert_eq!(tree.split_gains()[0], 0.0);
    }

    #[test]
    fn constant_target_is_single_leaf() {
        let x = matrix(&[&[1.0], &[2.0], &[3.0]]);
        let tree = RegressionTree::fit(&x, &[7.0, 7.0, 7.0], &params(5)).unwrap();
        assert_eq!(tree.node_count(), 1);
        assert_eq!(tree.predict(&[100.0]), 7.0);
    }

    #[test]
    fn max_depth_is_respected() {
        let rows: Vec<Vec<f64>> = (0..64).map(|i| vec![i as f64]).collect();
        let x = FeatureMatrix::from_rows(&rows).unwrap();
        let y: Vec<f64> = (0..64).map(|i| (i * i) as f64).collect();
        let tree = RegressionTree::fit(&x, &y, &params(3)).unwrap();
        assert!(depth(&tree) <= 3);
        assert!(tree.leaf_count() <= 8);
    }

    #[test]
    fn min_samples_leaf_is_respected() {
        let x = matrix(&[&[1.0], &[2.0], &[3.0], &[4.0]]);
        let y = [0.0, 100.0, 100.0, 100.0];
        let p = TreeParams {
            max_depth: 4,
            min_samples_split: 2,
            min_samples_leaf: 2,
        };
        let tree = RegressionTree::fit(&x, &y, &p).unwrap();
        // Isolating the single 0.0 row would need a 1-row leaf.
        assert_eq!(tree.predict(&[1.0]), 50.0);
        assert_eq!(tree.predict(&[4.0]), 100.0);
    }

    #[test]
    fn min_samples_split_is_respected() {
        let x = matrix(&[&[1.0], &[2.0], &[3.0], &[4.0]]);
        let y = [0.0, 0.0, 10.0, 10.0];
        let p = TreeParams {
            max_depth: 4,
            min_samples_split: 5,
            min_samples_leaf: 1,
        };
        let tree = RegressionTree::fit(&x, &y, &p).unwrap();
        assert_eq!(tree.node_count(), 1);
        assert_eq!(tree.predict(&[1.0]), 5.0);
    }

    #[test]
    fn repeated_sample_indices_weight_rows() {
        let x = matrix(&[&[1.0], &[2.0]]);
        let y = [0.0, 30.0];
        let tree = RegressionTree::fit_sample(&x, &y, &[0, 1, 1], &params(1)).unwrap();
        assert_eq!(tree.predict(&[1.0]), 0.0);
        let stump = RegressionTree::fit_sample(
            &x,
            &y,
            &[0, 1, 1],
            &TreeParams {
                max_depth: 1,
                min_samples_split: 4,
                min_samples_leaf: 1,
            },
        )
        .unwrap();
        assert_eq!(stump.predict(&[1.0]), 20.0);
    }

    #[test]
    fn identical_feature_values_cannot_split() {
        let x = matrix(&[&[1.0], &[1.0], &[1.0]]);
        let tree = RegressionTree::fit(&x, &[0.0, 5.0, 10.0], &params(3)).unwrap();
        assert_eq!(tree.node_count(), 1);
        assert_eq!(tree.predict(&[1.0]), 5.0);
    }

    #[test]
    fn invalid_params_rejected() {
        let x = matrix(&[&[1.0]]);
        assert!(RegressionTree::fit(&x, &[1.0], &params(0)).is_err());
        let p = TreeParams {
            max_depth: 2,
            min_samples_split: 2,
            min_samples_leaf: 0,
        };
        assert!(RegressionTree::fit(&x, &[1.0], &p).is_err());
    }

    #[test]
    fn empty_training_set_rejected() {
        let rows: Vec<Vec<f64>> = vec![];
        let x = FeatureMatrix::from_rows(&rows).unwrap();
        let err = RegressionTree::fit(&x, &[], &params(2)).unwrap_err();
        assert_eq!(err, TrainError::EmptyTrainingSet);
    }
}
