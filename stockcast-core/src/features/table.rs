//! FeatureTable: derived features for every SKU, keyed in SKU order.

use rayon::prelude::*;
use std::collections::BTreeMap;

use crate::domain::{ObservationTable, SkuId};

use super::{derive_features, FeatureThresholds, FeatureVector};

/// Feature vectors of all SKUs of one run.
///
/// Iteration is SKU-then-date regardless of how derivation was scheduled.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeatureTable {
    by_sku: BTreeMap<SkuId, Vec<FeatureVector>>,
}

impl FeatureTable {
    pub fn from_map(by_sku: BTreeMap<SkuId, Vec<FeatureVector>>) -> Self {
        Self { by_sku }
    }

    pub fn get(&self, sku: &SkuId) -> Option<&[FeatureVector]> {
        self.by_sku.get(sku).map(Vec::as_slice)
    }

    /// Most recent feature vector of `sku`.
    pub fn last(&self, sku: &SkuId) -> Option<&FeatureVector> {
        self.by_sku.get(sku).and_then(|rows| rows.last())
    }

    /// Numeric code of `sku` used as a model input: its ordinal position in
    /// the sorted SKU set.
    pub fn sku_code(&self, sku: &SkuId) -> Option<f64> {
        if !self.by_sku.contains_key(sku) {
            return None;
        }
        Some(self.by_sku.range(..sku.clone()).count() as f64)
    }

    pub fn skus(&self) -> impl Iterator<Item = &SkuId> {
        self.by_sku.keys()
    }

    /// `(sku, rows)` pairs in SKU order.
    pub fn iter(&self) -> impl Iterator<Item = (&SkuId, &[FeatureVector])> {
        self.by_sku.iter().map(|(k, v)| (k, v.as_slice()))
    }

    /// All rows, SKU-then-date.
    pub fn rows(&self) -> impl Iterator<Item = &FeatureVector> {
        self.by_sku.values().flatten()
    }

    pub fn sku_count(&self) -> usize {
        self.by_sku.len()
    }

    pub fn row_count(&self) -> usize {
        self.by_sku.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.by_sku.is_empty()
    }
}

/// Derive features for every SKU of `table`, one independent pass per SKU,
/// in parallel. Returns only after every SKU has finished.
pub fn derive_table(table: &ObservationTable, thresholds: &FeatureThresholds) -> FeatureTable {
    let derived: Vec<(SkuId, Vec<FeatureVector>)> = table
        .series()
        .par_iter()
        .map(|series| (series.sku_id().clone(), derive_features(series, thresholds)))
        .collect();

    FeatureTable {
        by_sku: derived.into_iter().collect(),
    }
}
