//! Observation: one SKU's inventory record for one calendar day.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::SkuId;

/// Raw daily stock, price and promotion record for a single SKU.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub sku_id: SkuId,
    pub date: NaiveDate,
    pub stock_level: u32,
    pub price: f64,
    pub promotion_flag: bool,
}

impl Observation {
    pub fn new(
        sku_id: impl Into<SkuId>,
        date: NaiveDate,
        stock_level: u32,
        price: f64,
        promotion_flag: bool,
    ) -> Self {
        Self {
            sku_id: sku_id.into(),
            date,
            stock_level,
            price,
            promotion_flag,
        }
    }

    /// Price must be finite and strictly positive.
    pub fn has_valid_price(&self) -> bool {
        self.price.is_finite() && self.price > 0.0
    }
}
