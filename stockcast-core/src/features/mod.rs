//! Feature engine: per-SKU causal derivation of modeling signals.
//!
//! Each SKU series is scanned once, forward, by a `FeatureState` accumulator
//! that owns all running state (previous stock and price, 3- and 7-slot
//! trailing windows, last restock index). No derived value at index `t`
//! depends on observations after `t`. Accumulators are scoped to one series,
//! so SKUs are derived in parallel by `derive_table`.

pub mod calendar;
pub mod engine;
pub mod table;
pub mod window;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::domain::SkuId;

pub use calendar::CalendarFields;
pub use engine::{derive_features, FeatureState};
pub use table::{derive_table, FeatureTable};
pub use window::TrailingWindow;

/// Short moving-average window (observations).
pub const SHORT_WINDOW: usize = 3;
/// Long moving-average window (observations).
pub const LONG_WINDOW: usize = 7;

/// Stock thresholds driving the alert flags and restock detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureThresholds {
    /// `low_stock` when stock is strictly below this level.
    pub low_stock_threshold: u32,
    /// `needs_replenish` when stock is strictly below this level.
    pub replenish_threshold: u32,
    /// A restock event is any observation at or above this level.
    pub restock_threshold: u32,
}

impl Default for FeatureThresholds {
    fn default() -> Self {
        Self {
            low_stock_threshold: 20,
            replenish_threshold: 30,
            restock_threshold: 95,
        }
    }
}

/// One observation enriched with its derived features.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    pub sku_id: SkuId,
    pub date: NaiveDate,
    pub stock_level: u32,
    pub price: f64,
    pub promotion_flag: bool,

    pub day_of_week: u32,
    pub day_of_month: u32,
    pub month: u32,
    pub is_weekend: bool,

    /// Previous stock minus current stock; 0 at the first observation.
    pub prev_day_consumption: i64,
    pub previous_price: f64,
    pub price_variation: f64,
    pub moving_avg_3: f64,
    pub moving_avg_7: f64,
    pub trend_3: f64,

    pub low_stock: bool,
    pub needs_replenish: bool,
    pub days_since_restock: usize,
}

impl FeatureVector {
    pub fn calendar(&self) -> CalendarFields {
        CalendarFields {
            day_of_week: self.day_of_week,
            day_of_month: self.day_of_month,
            month: self.month,
            is_weekend: self.is_weekend,
        }
    }
}
