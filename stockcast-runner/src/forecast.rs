//! Forecast generator: N-day projection from a SKU's last known state.
//!
//! Each future day gets a synthetic feature vector built from the SKU's
//! most recent one: calendar fields from the future date, no promotion,
//! flat pricing (`price` and `previous_price` both the last price, zero
//! variation), restock distance advanced by the day offset, and every other
//! signal held at its last observed value. Predictions are never fed back
//! into the held signals.

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use stockcast_core::dataset::feature_row;
use stockcast_core::domain::SkuId;
use stockcast_core::features::{CalendarFields, FeatureTable, FeatureVector};
use stockcast_core::models::{TrainedModel, STOCK_CAPACITY};

use crate::metrics::EvaluationMetrics;

/// Label attached to every forecast band.
pub const CONFIDENCE_LABEL: &str = "85%";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ForecastError {
    #[error("SKU '{0}' not found in feature table")]
    NotFound(SkuId),

    #[error("forecast horizon must be >= 1")]
    InvalidHorizon,
}

/// One projected day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastPoint {
    pub sku_id: SkuId,
    pub date: NaiveDate,
    pub predicted_level: f64,
    pub lower_bound: f64,
    pub upper_bound: f64,
    pub confidence_label: String,
}

/// Synthetic feature vector `offset` days after `last`.
pub fn project_features(last: &FeatureVector, offset: usize) -> FeatureVector {
    let date = last.date + Duration::days(offset as i64);
    let calendar = CalendarFields::from_date(date);
    FeatureVector {
        date,
        promotion_flag: false,
        day_of_week: calendar.day_of_week,
        day_of_month: calendar.day_of_month,
        month: calendar.month,
        is_weekend: calendar.is_weekend,
        previous_price: last.price,
        price_variation: 0.0,
        days_since_restock: last.days_since_restock + offset,
        ..last.clone()
    }
}

/// Projects stock levels with a selected model over a feature table.
#[derive(Debug, Clone, Copy)]
pub struct ForecastGenerator<'a> {
    features: &'a FeatureTable,
    model: &'a TrainedModel,
    error_margin: f64,
}

impl<'a> ForecastGenerator<'a> {
    /// Band half-width is `band_multiplier * metrics.rmse`.
    pub fn new(
        features: &'a FeatureTable,
        model: &'a TrainedModel,
        metrics: &EvaluationMetrics,
        band_multiplier: f64,
    ) -> Self {
        Self {
            features,
            model,
            error_margin: band_multiplier * metrics.rmse,
        }
    }

    pub fn error_margin(&self) -> f64 {
        self.error_margin
    }

    /// Exactly `horizon` points on the days following the SKU's last observation.
    pub fn forecast(&self, sku: &SkuId, horizon: usize) -> Result<Vec<ForecastPoint>, ForecastError> {
        if horizon == 0 {
            return Err(ForecastError::InvalidHorizon);
        }
        let last = self
            .features
            .last(sku)
            .ok_or_else(|| ForecastError::NotFound(sku.clone()))?;
        let code = self
            .features
            .sku_code(sku)
            .ok_or_else(|| ForecastError::NotFound(sku.clone()))?;

        let points = (1..=horizon)
            .map(|d| {
                let fv = project_features(last, d);
                let predicted = self.model.predict_clipped(&feature_row(&fv, code));
                ForecastPoint {
                    sku_id: sku.clone(),
                    date: fv.date,
                    predicted_level: predicted,
                    lower_bound: (predicted - self.error_margin).max(0.0),
                    upper_bound: (predicted + self.error_margin).min(STOCK_CAPACITY),
                    confidence_label: CONFIDENCE_LABEL.to_string(),
                }
            })
            .collect();
        Ok(points)
    }

    /// Forecast every SKU of the table, in SKU order.
    pub fn forecast_all(&self, horizon: usize) -> Result<Vec<(SkuId, Vec<ForecastPoint>)>, ForecastError> {
        self.features
            .skus()
            .map(|sku| Ok((sku.clone(), self.forecast(sku, horizon)?)))
            .collect()
    }
}
