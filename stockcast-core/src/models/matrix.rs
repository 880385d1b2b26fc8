//! Dense row-major feature matrix.

use super::TrainError;

/// Row-major matrix of `f64` features.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FeatureMatrix {
    data: Vec<f64>,
    n_features: usize,
}

impl FeatureMatrix {
    /// Build from rows of equal width.
    pub fn from_rows<R: AsRef<[f64]>>(rows: &[R]) -> Result<Self, TrainError> {
        let n_features = rows.first().map(|r| r.as_ref().len()).unwrap_or(0);
        let mut data = Vec::with_capacity(rows.len() * n_features);
        for (i, row) in rows.iter().enumerate() {
            let row = row.as_ref();
            if row.len() != n_features {
                return Err(TrainError::FeatureWidth {
                    row: i,
                    expected: n_features,
                    found: row.len(),
                });
            }
            data.extend_from_slice(row);
        }
        Ok(Self { data, n_features })
    }

    pub fn n_rows(&self) -> usize {
        if self.n_features == 0 {
            0
        } else {
            self.data.len() / self.n_features
        }
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn row(&self, i: usize) -> &[f64] {
        let start = i * self.n_features;
        &self.data[start..start + self.n_features]
    }

    #[inline]
    pub fn get(&self, row: usize, feature: usize) -> f64 {
        self.data[row * self.n_features + feature]
    }

    pub fn rows(&self) -> impl Iterator<Item = &[f64]> {
        self.data.chunks_exact(self.n_features.max(1))
    }
}
