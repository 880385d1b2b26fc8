//! Domain types for StockCast

pub mod observation;
pub mod series;
pub mod sku;

pub use observation::Observation;
pub use series::{ObservationTable, SeriesError, SkuSeries};
pub use sku::SkuId;
