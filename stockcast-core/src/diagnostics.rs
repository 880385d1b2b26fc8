//! Diagnostics aggregator: read-only per-SKU stock rollup for risk ranking.

use serde::{Deserialize, Serialize};

use crate::domain::SkuId;
use crate::features::{FeatureTable, FeatureVector};

/// Summary statistics of one SKU's history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkuDiagnostics {
    pub sku_id: SkuId,
    pub observation_count: usize,
    pub min_stock: u32,
    pub mean_stock: f64,
    /// Sample standard deviation (n - 1); `None` with a single observation.
    pub std_stock: Option<f64>,
    pub low_stock_days: usize,
    pub mean_price: f64,
    pub promotion_days: usize,
}

impl SkuDiagnostics {
    /// Summarize one SKU's rows. Returns `None` for an empty slice.
    pub fn from_rows(sku_id: &SkuId, rows: &[FeatureVector]) -> Option<Self> {
        if rows.is_empty() {
            return None;
        }
        let n = rows.len() as f64;
        let stocks: Vec<f64> = rows.iter().map(|r| f64::from(r.stock_level)).collect();
        let mean_stock = stocks.iter().sum::<f64>() / n;

        Some(Self {
            sku_id: sku_id.clone(),
            observation_count: rows.len(),
            min_stock: rows.iter().map(|r| r.stock_level).min().unwrap_or(0),
            mean_stock,
            std_stock: sample_std(&stocks, mean_stock),
            low_stock_days: rows.iter().filter(|r| r.low_stock).count(),
            mean_price: rows.iter().map(|r| r.price).sum::<f64>() / n,
            promotion_days: rows.iter().filter(|r| r.promotion_flag).count(),
        })
    }
}

fn sample_std(values: &[f64], mean: f64) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    Some(var.sqrt())
}

/// Per-SKU diagnostics ranked ascending by minimum stock (most at-risk first).
///
/// Ties keep SKU order.
pub fn rank_by_risk(table: &FeatureTable) -> Vec<SkuDiagnostics> {
    let mut out: Vec<SkuDiagnostics> = table
        .iter()
        .filter_map(|(sku, rows)| SkuDiagnostics::from_rows(sku, rows))
        .collect();
    out.sort_by_key(|d| d.min_stock);
    out
}

/// Number of ranked SKUs whose minimum stock fell strictly below `level`.
pub fn count_below(ranked: &[SkuDiagnostics], level: u32) -> usize {
    ranked.iter().filter(|d| d.min_stock < level).count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Observation, ObservationTable};
    use crate::features::{derive_table, FeatureThresholds};
    use chrono::NaiveDate;

    fn table(data: Vec<(&str, Vec<(u32, f64, bool)>)>) -> FeatureTable {
        let base = NaiveDate::from_ymd_opt(2024, 2, 1).unwrap();
        let mut obs = Vec::new();
        for (sku, rows) in &data {
            for (i, &(stock, price, promo)) in rows.iter().enumerate() {
                obs.push(Observation::new(
                    *sku,
                    base + chrono::Duration::days(i as i64),
                    stock,
                    price,
                    promo,
                ));
            }
        }
        derive_table(
            &ObservationTable::from_observations(obs).unwrap(),
            &FeatureThresholds::default(),
        )
    }

    #[test]
    fn rollup_values() {
        let ft = table(vec![("1", vec![(10, 2.0, true), (30, 4.0, false), (50, 6.0, true)])]);
        let ranked = rank_by_risk(&ft);
        let d = &ranked[0];
        assert_eq!(d.min_stock, 10);
        assert!((d.mean_stock - 30.0).abs() < 1e-12);
        assert!((d.std_stock.unwrap() - 20.0).abs() < 1e-12);
        assert_eq!(d.low_stock_days, 1);
        assert!((d.mean_price - 4.0).abs() < 1e-12);
        assert_eq!(d.promotion_days, 2);
        assert_eq!(d.observation_count, 3);
    }

    #[test]
    fn ranked_most_at_risk_first() {
        let ft = table(vec![
            ("1", vec![(60, 1.0, false), (55, 1.0, false)]),
            ("2", vec![(8, 1.0, false), (90, 1.0, false)]),
            ("3", vec![(25, 1.0, false)]),
        ]);
        let ranked = rank_by_risk(&ft);
        let order: Vec<&str> = ranked.iter().map(|d| d.sku_id.as_str()).collect();
        assert_eq!(order, vec!["2", "3", "1"]);
        assert_eq!(count_below(&ranked, 10), 1);
        assert_eq!(count_below(&ranked, 30), 2);
    }

    #[test]
    fn single_observation_has_no_std() {
        let ft = table(vec![("9", vec![(40, 3.0, false)])]);
        assert_eq!(rank_by_risk(&ft)[0].std_stock, None);
    }

    #[test]
    fn rollup_does_not_touch_features() {
        let ft = table(vec![("1", vec![(10, 2.0, true), (30, 4.0, false)])]);
        let before = ft.clone();
        let _ = rank_by_risk(&ft);
        assert_eq!(ft, before);
    }
}
