//! SkuSeries and ObservationTable: validated, date-ordered observation sets.

use chrono::NaiveDate;
use std::collections::BTreeMap;
use thiserror::Error;

use super::{Observation, SkuId};

/// Errors raised while building a series from raw observations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SeriesError {
    #[error("invalid series for SKU '{sku}': no observations")]
    Empty { sku: SkuId },

    #[error("SKU '{sku}': duplicate observation on {date}")]
    DuplicateDate { sku: SkuId, date: NaiveDate },

    #[error("SKU '{sku}': observation on {date} precedes previous date {previous}")]
    OutOfOrder {
        sku: SkuId,
        date: NaiveDate,
        previous: NaiveDate,
    },

    #[error("observation for SKU '{found}' does not belong to series '{expected}'")]
    SkuMismatch { expected: SkuId, found: SkuId },

    #[error("SKU '{sku}' on {date}: price must be positive, got {price}")]
    InvalidPrice {
        sku: SkuId,
        date: NaiveDate,
        price: f64,
    },

    #[error("SKU '{sku}' appears in more than one series")]
    DuplicateSku { sku: SkuId },
}

/// Ordered, non-empty observation history of one SKU.
///
/// Dates are strictly ascending. Immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub struct SkuSeries {
    sku_id: SkuId,
    observations: Vec<Observation>,
}

impl SkuSeries {
    /// Build a series, validating that observations are non-empty, belong to
    /// `sku_id`, carry a positive price, and are strictly ascending by date.
    pub fn new(sku_id: impl Into<SkuId>, observations: Vec<Observation>) -> Result<Self, SeriesError> {
        let sku_id = sku_id.into();
        if observations.is_empty() {
            return Err(SeriesError::Empty { sku: sku_id });
        }

        let mut previous: Option<NaiveDate> = None;
        for obs in &observations {
            if obs.sku_id != sku_id {
                return Err(SeriesError::SkuMismatch {
                    expected: sku_id,
                    found: obs.sku_id.clone(),
                });
            }
            if !obs.has_valid_price() {
                return Err(SeriesError::InvalidPrice {
                    sku: sku_id,
                    date: obs.date,
                    price: obs.price,
                });
            }
            if let Some(prev) = previous {
                if obs.date == prev {
                    return Err(SeriesError::DuplicateDate {
                        sku: sku_id,
                        date: obs.date,
                    });
                }
                if obs.date < prev {
                    return Err(SeriesError::OutOfOrder {
                        sku: sku_id,
                        date: obs.date,
                        previous: prev,
                    });
                }
            }
            previous = Some(obs.date);
        }

        Ok(Self {
            sku_id,
            observations,
        })
    }

    pub fn sku_id(&self) -> &SkuId {
        &self.sku_id
    }

    pub fn observations(&self) -> &[Observation] {
        &self.observations
    }

    pub fn len(&self) -> usize {
        self.observations.len()
    }

    /// Always false: construction rejects empty series.
    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    pub fn first_date(&self) -> NaiveDate {
        self.observations[0].date
    }

    pub fn last_date(&self) -> NaiveDate {
        self.observations[self.observations.len() - 1].date
    }

    /// Copy of this series truncated to the first `len` observations.
    ///
    /// Returns `None` when `len` is zero or exceeds the series length.
    pub fn truncated(&self, len: usize) -> Option<Self> {
        if len == 0 || len > self.observations.len() {
            return None;
        }
        Some(Self {
            sku_id: self.sku_id.clone(),
            observations: self.observations[..len].to_vec(),
        })
    }
}

/// All SKU series of one run, sorted by SKU.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ObservationTable {
    series: Vec<SkuSeries>,
}

impl ObservationTable {
    /// Group flat observations by SKU, sort each group by date, and validate.
    pub fn from_observations(observations: Vec<Observation>) -> Result<Self, SeriesError> {
        let mut grouped: BTreeMap<SkuId, Vec<Observation>> = BTreeMap::new();
        for obs in observations {
            grouped.entry(obs.sku_id.clone()).or_default().push(obs);
        }

        let series = grouped
            .into_iter()
            .map(|(sku, mut obs)| {
                obs.sort_by_key(|o| o.date);
                SkuSeries::new(sku, obs)
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { series })
    }

    /// Assemble a table from already-built series. SKUs must be unique.
    pub fn from_series(mut series: Vec<SkuSeries>) -> Result<Self, SeriesError> {
        series.sort_by(|a, b| a.sku_id.cmp(&b.sku_id));
        for pair in series.windows(2) {
            if pair[0].sku_id == pair[1].sku_id {
                return Err(SeriesError::DuplicateSku {
                    sku: pair[0].sku_id.clone(),
                });
            }
        }
        Ok(Self { series })
    }

    pub fn series(&self) -> &[SkuSeries] {
        &self.series
    }

    pub fn get(&self, sku: &SkuId) -> Option<&SkuSeries> {
        self.series
            .binary_search_by(|s| s.sku_id.cmp(sku))
            .ok()
            .map(|i| &self.series[i])
    }

    pub fn sku_count(&self) -> usize {
        self.series.len()
    }

    pub fn observation_count(&self) -> usize {
        self.series.iter().map(SkuSeries::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }
}
