//! End-to-end pipeline tests: determinism, forecast contract, error paths.

use chrono::{Duration, NaiveDate};
use stockcast_core::dataset::SplitStrategy;
use stockcast_core::domain::{Observation, ObservationTable, SkuId};
use stockcast_core::models::ModelKind;
use stockcast_runner::{run_pipeline, ForecastError, PipelineConfig, PipelineError};

/// Several SKUs with daily consumption, periodic restocks, and promotions.
fn make_table(skus: u64, days: i64) -> ObservationTable {
    let base = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
    let mut obs = Vec::new();
    for sku in 1..=skus {
        let mut stock = 100i64;
        for d in 0..days {
            let promo = (d + sku as i64) % 7 == 0;
            stock -= 2 + ((d * 3 + sku as i64) % 5) + if promo { 4 } else { 0 };
            if stock < 6 {
                stock = 96 + (sku as i64 % 4);
            }
            obs.push(Observation::new(
                sku,
                base + Duration::days(d),
                stock as u32,
                5.0 + sku as f64 + if promo { -0.5 } else { 0.0 },
                promo,
            ));
        }
    }
    ObservationTable::from_observations(obs).unwrap()
}

fn quick_config() -> PipelineConfig {
    let mut config = PipelineConfig::default();
    config.forest.n_trees = 15;
    config.boosted.n_stages = 30;
    config
}

#[test]
fn two_runs_are_bit_identical() {
    let table = make_table(4, 60);
    let config = quick_config();
    let (a, _) = run_pipeline(&config, &table).unwrap();
    let (b, _) = run_pipeline(&config, &table).unwrap();

    assert_eq!(a.selection.selected, b.selection.selected);
    for (ca, cb) in a.selection.candidates.iter().zip(&b.selection.candidates) {
        assert_eq!(ca.metrics.rmse.to_bits(), cb.metrics.rmse.to_bits());
        assert_eq!(ca.metrics.mae.to_bits(), cb.metrics.mae.to_bits());
        assert_eq!(ca.metrics.mape.to_bits(), cb.metrics.mape.to_bits());
        assert_eq!(ca.metrics.r2.to_bits(), cb.metrics.r2.to_bits());
    }
    assert_eq!(a, b);
}

#[test]
fn report_sizes_follow_global_split() {
    let table = make_table(3, 50);
    let (report, _) = run_pipeline(&quick_config(), &table).unwrap();
    assert_eq!(report.sizes.skus, 3);
    assert_eq!(report.sizes.observations, 150);
    assert_eq!(report.sizes.feature_rows, 150);
    assert_eq!(report.sizes.dropped_rows, 0);
    assert_eq!(report.sizes.holdout_rows, 30);
    assert_eq!(report.sizes.train_rows, 120);
    assert_eq!(report.sizes.split_strategy, SplitStrategy::GlobalOrdered);
    assert_eq!(report.dataset_hash.len(), 64);
    assert_eq!(report.diagnostics.len(), 3);
    for pair in report.diagnostics.windows(2) {
        assert!(pair[0].min_stock <= pair[1].min_stock);
    }
}

#[test]
fn selected_model_has_best_r2() {
    let (report, session) = run_pipeline(&quick_config(), &make_table(3, 50)).unwrap();
    let sel = &report.selection;
    let forest = &sel.candidates[0];
    let boosted = &sel.candidates[1];
    assert_eq!(forest.kind, ModelKind::Forest);
    let expected = if boosted.metrics.r2 > forest.metrics.r2 {
        ModelKind::Boosted
    } else {
        ModelKind::Forest
    };
    assert_eq!(sel.selected, expected);
    assert_eq!(session.selection().kind(), expected);
}

#[test]
fn per_sku_split_strategy() {
    let mut config = quick_config();
    config.split.strategy = SplitStrategy::PerSkuTemporal;
    let (report, _) = run_pipeline(&config, &make_table(3, 50)).unwrap();
    assert_eq!(report.sizes.holdout_rows, 30);
    assert_eq!(report.sizes.split_strategy, SplitStrategy::PerSkuTemporal);
}

#[test]
fn forecast_contract() {
    let table = make_table(2, 40);
    let (_, session) = run_pipeline(&quick_config(), &table).unwrap();
    let sku = SkuId::from(2u64);
    let last = table.get(&sku).unwrap().last_date();

    let points = session.forecast(&sku, session.default_horizon()).unwrap();
    assert_eq!(points.len(), 7);
    for (i, p) in points.iter().enumerate() {
        assert_eq!(p.date, last + Duration::days(i as i64 + 1));
        assert!((0.0..=100.0).contains(&p.predicted_level));
        assert!(p.lower_bound >= 0.0 && p.upper_bound <= 100.0);
        assert_eq!(p.sku_id, sku);
    }

    let all = session.forecast_all(3).unwrap();
    assert_eq!(all.len(), 6);
    assert_eq!(all[0].sku_id, SkuId::from(1u64));
}

#[test]
fn unknown_sku_is_not_found() {
    let (_, session) = run_pipeline(&quick_config(), &make_table(2, 30)).unwrap();
    let err = session.forecast(&"999".into(), 7).unwrap_err();
    assert_eq!(err, ForecastError::NotFound("999".into()));
}

#[test]
fn seed_changes_forest_only() {
    let table = make_table(3, 40);
    let mut other = quick_config();
    other.seed = 7;
    let (a, _) = run_pipeline(&quick_config(), &table).unwrap();
    let (b, _) = run_pipeline(&other, &table).unwrap();
    assert_eq!(a.selection.candidates[1].metrics, b.selection.candidates[1].metrics);
    assert_ne!(a.selection.candidates[0].metrics, b.selection.candidates[0].metrics);
}

#[test]
fn tiny_input_fails_on_empty_partition() {
    let table = make_table(1, 1);
    let err = run_pipeline(&quick_config(), &table).unwrap_err();
    assert!(matches!(err, PipelineError::Dataset(_)));
}

#[test]
fn invalid_config_rejected_before_work() {
    let mut config = quick_config();
    config.forecast.horizon = 0;
    let err = run_pipeline(&config, &make_table(1, 10)).unwrap_err();
    assert!(matches!(err, PipelineError::Config(_)));
}

#[test]
fn empty_table_rejected() {
    let err = run_pipeline(&quick_config(), &ObservationTable::default()).unwrap_err();
    assert!(matches!(err, PipelineError::EmptyInput));
}
