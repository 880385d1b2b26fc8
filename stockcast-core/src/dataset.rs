//! Dataset assembler: fixed feature columns, non-finite row filtering, and
//! the ordered (never shuffled) train/holdout split.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::SkuId;
use crate::features::{FeatureTable, FeatureVector};
use crate::models::{FeatureMatrix, TrainError};

/// Model input columns, in matrix order.
pub const FEATURE_COLUMNS: [&str; N_FEATURES] = [
    "sku_code",
    "price",
    "promotion_flag",
    "day_of_week",
    "day_of_month",
    "month",
    "is_weekend",
    "prev_day_consumption",
    "previous_price",
    "price_variation",
    "moving_avg_3",
    "moving_avg_7",
    "trend_3",
    "days_since_restock",
];

pub const N_FEATURES: usize = 14;

pub const TARGET_COLUMN: &str = "stock_level";

fn flag(b: bool) -> f64 {
    if b {
        1.0
    } else {
        0.0
    }
}

/// Encode one feature vector in `FEATURE_COLUMNS` order.
pub fn feature_row(fv: &FeatureVector, sku_code: f64) -> [f64; N_FEATURES] {
    [
        sku_code,
        fv.price,
        flag(fv.promotion_flag),
        f64::from(fv.day_of_week),
        f64::from(fv.day_of_month),
        f64::from(fv.month),
        flag(fv.is_weekend),
        fv.prev_day_consumption as f64,
        fv.previous_price,
        fv.price_variation,
        fv.moving_avg_3,
        fv.moving_avg_7,
        fv.trend_3,
        fv.days_since_restock as f64,
    ]
}

/// One model row with its provenance.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub sku_id: SkuId,
    pub date: NaiveDate,
    pub features: [f64; N_FEATURES],
    pub target: f64,
}

/// All usable rows of a feature table, SKU-then-date.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AssembledDataset {
    pub samples: Vec<Sample>,
    /// Rows discarded because a feature or the target was not finite.
    pub dropped_rows: usize,
}

impl AssembledDataset {
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

/// Select the model columns of every row in `table`.
pub fn assemble(table: &FeatureTable) -> AssembledDataset {
    let mut out = AssembledDataset::default();
    for (code, (sku, rows)) in table.iter().enumerate() {
        for fv in rows {
            let features = feature_row(fv, code as f64);
            let target = f64::from(fv.stock_level);
            if features.iter().all(|v| v.is_finite()) && target.is_finite() {
                out.samples.push(Sample {
                    sku_id: sku.clone(),
                    date: fv.date,
                    features,
                    target,
                });
            } else {
                out.dropped_rows += 1;
            }
        }
    }
    out
}

/// Where the train/holdout boundary is drawn.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SplitStrategy {
    /// One cut over the concatenated SKU-then-date table. The holdout may
    /// contain whole SKUs never seen in training.
    #[default]
    GlobalOrdered,
    /// The last fraction of every SKU's own history is held out.
    PerSkuTemporal,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum DatasetError {
    #[error("holdout fraction must be in (0, 1), got {0}")]
    InvalidHoldoutFraction(f64),

    #[error("{partition} partition is empty ({total} assembled rows)")]
    EmptyPartition {
        partition: &'static str,
        total: usize,
    },

    #[error(transparent)]
    Matrix(#[from] TrainError),
}

/// Training and holdout partitions.
#[derive(Debug, Clone, PartialEq)]
pub struct DatasetSplit {
    pub strategy: SplitStrategy,
    pub train: Vec<Sample>,
    pub holdout: Vec<Sample>,
}

fn to_matrix(samples: &[Sample]) -> Result<(FeatureMatrix, Vec<f64>), DatasetError> {
    let rows: Vec<&[f64]> = samples.iter().map(|s| s.features.as_slice()).collect();
    let x = FeatureMatrix::from_rows(&rows)?;
    let y = samples.iter().map(|s| s.target).collect();
    Ok((x, y))
}

impl DatasetSplit {
    pub fn train_matrix(&self) -> Result<(FeatureMatrix, Vec<f64>), DatasetError> {
        to_matrix(&self.train)
    }

    pub fn holdout_matrix(&self) -> Result<(FeatureMatrix, Vec<f64>), DatasetError> {
        to_matrix(&self.holdout)
    }
}

fn holdout_len(n: usize, fraction: f64) -> usize {
    ((n as f64 * fraction).ceil() as usize).min(n)
}

/// Split `dataset` without shuffling.
///
/// Holdout size is `ceil(n * holdout_fraction)`, taken from the end: of the
/// whole table for `GlobalOrdered`, of each SKU for `PerSkuTemporal`.
pub fn split(
    dataset: &AssembledDataset,
    strategy: SplitStrategy,
    holdout_fraction: f64,
) -> Result<DatasetSplit, DatasetError> {
    if !(holdout_fraction > 0.0 && holdout_fraction < 1.0) {
        return Err(DatasetError::InvalidHoldoutFraction(holdout_fraction));
    }
    let samples = &dataset.samples;

    let (train, holdout) = match strategy {
        SplitStrategy::GlobalOrdered => {
            let cut = samples.len() - holdout_len(samples.len(), holdout_fraction);
            (samples[..cut].to_vec(), samples[cut..].to_vec())
        }
        SplitStrategy::PerSkuTemporal => {
            let mut train = Vec::new();
            let mut holdout = Vec::new();
            let mut start = 0;
            while start < samples.len() {
                let sku = &samples[start].sku_id;
                let end = samples[start..]
                    .iter()
                    .position(|s| &s.sku_id != sku)
                    .map_or(samples.len(), |p| start + p);
                let group = &samples[start..end];
                let cut = group.len() - holdout_len(group.len(), holdout_fraction);
                train.extend_from_slice(&group[..cut]);
                holdout.extend_from_slice(&group[cut..]);
                start = end;
            }
            (train, holdout)
        }
    };

    if train.is_empty() {
        return Err(DatasetError::EmptyPartition {
            partition: "training",
            total: samples.len(),
        });
    }
    if holdout.is_empty() {
        return Err(DatasetError::EmptyPartition {
            partition: "holdout",
            total: samples.len(),
        });
    }

    Ok(DatasetSplit {
        strategy,
        train,
        holdout,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Observation, ObservationTable};
    use crate::features::{derive_table, FeatureThresholds};

    fn table(sizes: &[(&str, usize)]) -> FeatureTable {
        let base = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let mut obs = Vec::new();
        for &(sku, n) in sizes {
            for i in 0..n {
                obs.push(Observation::new(
                    sku,
                    base + chrono::Duration::days(i as i64),
                    (50 + i) as u32,
                    2.5,
                    i % 4 == 0,
                ));
            }
        }
        derive_table(
            &ObservationTable::from_observations(obs).unwrap(),
            &FeatureThresholds::default(),
        )
    }

    #[test]
    fn columns_exclude_alert_flags() {
        assert_eq!(FEATURE_COLUMNS.len(), N_FEATURES);
        assert!(!FEATURE_COLUMNS.contains(&"low_stock"));
        assert!(!FEATURE_COLUMNS.contains(&"needs_replenish"));
        assert!(!FEATURE_COLUMNS.contains(&TARGET_COLUMN));
    }

    #[test]
    fn assembles_every_row_with_sku_codes() {
        let ds = assemble(&table(&[("1", 3), ("2", 2)]));
        assert_eq!(ds.len(), 5);
        assert_eq!(ds.dropped_rows, 0);
        let codes: Vec<f64> = ds.samples.iter().map(|s| s.features[0]).collect();
        assert_eq!(codes, vec![0.0, 0.0, 0.0, 1.0, 1.0]);
        assert_eq!(ds.samples[1].target, 51.0);
    }

    #[test]
    fn non_finite_rows_are_dropped() {
        let mut ft = table(&[("1", 3)]);
        let mut map = std::collections::BTreeMap::new();
        let mut rows = ft.get(&"1".into()).unwrap().to_vec();
        rows[1].moving_avg_7 = f64::NAN;
        map.insert(SkuId::from("1"), rows);
        ft = FeatureTable::from_map(map);

        let ds = assemble(&ft);
        assert_eq!(ds.len(), 2);
        assert_eq!(ds.dropped_rows, 1);
    }

    #[test]
    fn global_split_is_ordered_tail() {
        let ds = assemble(&table(&[("1", 6), ("2", 4)]));
        let s = split(&ds, SplitStrategy::GlobalOrdered, 0.2).unwrap();
        assert_eq!(s.train.len(), 8);
        assert_eq!(s.holdout.len(), 2);
        assert_eq!(s.train[..], ds.samples[..8]);
        assert!(s.holdout.iter().all(|r| r.sku_id.as_str() == "2"));
    }

    #[test]
    fn holdout_size_rounds_up() {
        let ds = assemble(&table(&[("1", 11)]));
        let s = split(&ds, SplitStrategy::GlobalOrdered, 0.2).unwrap();
        assert_eq!(s.holdout.len(), 3);
        assert_eq!(s.train.len(), 8);
    }

    #[test]
    fn per_sku_split_holds_out_each_tail() {
        let ds = assemble(&table(&[("1", 5), ("2", 10)]));
        let s = split(&ds, SplitStrategy::PerSkuTemporal, 0.2).unwrap();
        let held: Vec<(&str, usize)> = ["1", "2"]
            .iter()
            .map(|k| (*k, s.holdout.iter().filter(|r| r.sku_id.as_str() == *k).count()))
            .collect();
        assert_eq!(held, vec![("1", 1), ("2", 2)]);
        assert_eq!(s.train.len(), 12);
        for sku in ["1", "2"] {
            let last_train = s.train.iter().filter(|r| r.sku_id.as_str() == sku).map(|r| r.date).max();
            let first_hold = s.holdout.iter().filter(|r| r.sku_id.as_str() == sku).map(|r| r.date).min();
            assert!(last_train < first_hold);
        }
    }

    #[test]
    fn degenerate_partitions_rejected() {
        let ds = assemble(&table(&[("1", 1)]));
        let err = split(&ds, SplitStrategy::GlobalOrdered, 0.2).unwrap_err();
        assert!(matches!(err, DatasetError::EmptyPartition { partition: "training", .. }));

        let empty = AssembledDataset::default();
        assert!(split(&empty, SplitStrategy::GlobalOrdered, 0.2).is_err());
    }

    #[test]
    fn fraction_bounds() {
        let ds = assemble(&table(&[("1", 5)]));
        for f in [0.0, 1.0, -0.5, f64::NAN] {
            assert!(matches!(
                split(&ds, SplitStrategy::GlobalOrdered, f),
                Err(DatasetError::InvalidHoldoutFraction(_))
            ));
        }
    }

    #[test]
    fn matrices_match_partitions() {
        let ds = assemble(&table(&[("1", 10)]));
        let s = split(&ds, SplitStrategy::GlobalOrdered, 0.2).unwrap();
        let (x, y) = s.train_matrix().unwrap();
        assert_eq!(x.n_rows(), 8);
        assert_eq!(x.n_features(), N_FEATURES);
        assert_eq!(y.len(), 8);
    }
}
