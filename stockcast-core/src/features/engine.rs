//! Forward-scan accumulator producing `FeatureVector`s.

use crate::domain::{Observation, SkuSeries};

use super::{
    CalendarFields, FeatureThresholds, FeatureVector, TrailingWindow, LONG_WINDOW, SHORT_WINDOW,
};

/// Running state of one forward pass over a single SKU series.
///
/// `last_restock` is a single forward-maintained pointer, so restock
/// distance is O(1) per observation.
#[derive(Debug, Clone)]
pub struct FeatureState {
    thresholds: FeatureThresholds,
    index: usize,
    prev_stock: Option<u32>,
    prev_price: Option<f64>,
    short: TrailingWindow<SHORT_WINDOW>,
    long: TrailingWindow<LONG_WINDOW>,
    last_restock: Option<usize>,
}

impl FeatureState {
    pub fn new(thresholds: FeatureThresholds) -> Self {
        Self {
            thresholds,
            index: 0,
            prev_stock: None,
            prev_price: None,
            short: TrailingWindow::new(),
            long: TrailingWindow::new(),
            last_restock: None,
        }
    }

    /// Number of observations consumed so far.
    pub fn position(&self) -> usize {
        self.index
    }

    /// Consume the next observation and emit its feature vector.
    pub fn step(&mut self, obs: &Observation) -> FeatureVector {
        let index = self.index;
        let stock = obs.stock_level;
        let t = &self.thresholds;

        let prev_day_consumption = self
            .prev_stock
            .map(|prev| i64::from(prev) - i64::from(stock))
            .unwrap_or(0);
        let previous_price = self.prev_price.unwrap_or(obs.price);

        self.short.push(stock);
        self.long.push(stock);
        let current = f64::from(stock);
        let moving_avg_3 = self.short.mean().unwrap_or(current);
        let moving_avg_7 = self.long.mean().unwrap_or(current);

        if stock >= t.restock_threshold {
            self.last_restock = Some(index);
        }
        let days_since_restock = match self.last_restock {
            Some(at) => index - at,
            None => index,
        };

        let calendar = CalendarFields::from_date(obs.date);

        self.prev_stock = Some(stock);
        self.prev_price = Some(obs.price);
        self.index += 1;

        FeatureVector {
            sku_id: obs.sku_id.clone(),
            date: obs.date,
            stock_level: stock,
            price: obs.price,
            promotion_flag: obs.promotion_flag,
            day_of_week: calendar.day_of_week,
            day_of_month: calendar.day_of_month,
            month: calendar.month,
            is_weekend: calendar.is_weekend,
            prev_day_consumption,
            previous_price,
            price_variation: obs.price - previous_price,
            moving_avg_3,
            moving_avg_7,
            trend_3: current - moving_avg_3,
            low_stock: stock < t.low_stock_threshold,
            needs_replenish: stock < t.replenish_threshold,
            days_since_restock,
        }
    }
}

/// Derive the feature vectors of one series: same length and order as the input.
pub fn derive_features(series: &SkuSeries, thresholds: &FeatureThresholds) -> Vec<FeatureVector> {
    let mut state = FeatureState::new(*thresholds);
    series
        .observations()
        .iter()
        .map(|obs| state.step(obs))
        .collect()
}
