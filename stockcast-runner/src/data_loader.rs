//! Observation loading for the runner.
//!
//! Reads a CSV inventory export, maps its header onto the observation schema
//! through a `ColumnMapping`, parses every cell, and groups the rows into
//! validated per-SKU series. Rows may appear in any order; each SKU is
//! sorted by date before validation.

use std::io::Read;
use std::path::Path;

use thiserror::Error;
use tracing::{debug, info};

use stockcast_core::domain::{Observation, ObservationTable, SeriesError};
use stockcast_core::schema::{
    locate_columns, parse_date, parse_flag, parse_price, parse_stock, SchemaError, SchemaType,
};

use crate::config::ColumnMapping;

/// Errors from the data loading layer.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("open '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error(transparent)]
    Series(#[from] SeriesError),

    #[error("input contains no observations")]
    NoRows,
}

/// Observations of one input file plus provenance.
#[derive(Debug, Clone)]
pub struct LoadedObservations {
    pub table: ObservationTable,
    /// BLAKE3 over the canonical SKU-then-date rows.
    pub dataset_hash: String,
    pub row_count: usize,
}

impl LoadedObservations {
    /// Wrap an in-memory table, hashing it the same way as a loaded file.
    pub fn from_table(table: ObservationTable) -> Self {
        let dataset_hash = compute_dataset_hash(&table);
        let row_count = table.observation_count();
        Self {
            table,
            dataset_hash,
            row_count,
        }
    }
}

/// Load observations from a CSV file.
pub fn load_observations(path: &Path, columns: &ColumnMapping) -> Result<LoadedObservations, LoadError> {
    let file = std::fs::File::open(path).map_err(|source| LoadError::Io {
        path: path.display().to_string(),
        source,
    })?;
    let loaded = read_observations(file, columns)?;
    info!(
        path = %path.display(),
        rows = loaded.row_count,
        skus = loaded.table.sku_count(),
        dataset_hash = %loaded.dataset_hash,
        "loaded observations"
    );
    Ok(loaded)
}

/// Parse observations from any CSV reader.
///
/// Row numbers in errors count data rows from 1 (the header is not counted).
pub fn read_observations<R: Read>(reader: R, columns: &ColumnMapping) -> Result<LoadedObservations, LoadError> {
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);

    let header: Vec<String> = rdr.headers()?.iter().map(str::to_string).collect();
    let idx = locate_columns(&header, columns.names())?;
    debug!(?idx, "located input columns");

    let mut observations = Vec::new();
    for (i, record) in rdr.records().enumerate() {
        let record = record?;
        let row = i + 1;
        let cell = |pos: usize| record.get(pos).unwrap_or("");

        let sku = cell(idx.sku_id);
        if sku.is_empty() {
            return Err(SchemaError::InvalidValue {
                row,
                column: columns.sku_id.clone(),
                value: String::new(),
                expected: SchemaType::Text,
            }
            .into());
        }
        observations.push(Observation::new(
            sku,
            parse_date(cell(idx.date), &columns.date_format, row, &columns.date)?,
            parse_stock(cell(idx.stock_level), row, &columns.stock_level)?,
            parse_price(cell(idx.price), row, &columns.price)?,
            parse_flag(cell(idx.promotion_flag), row, &columns.promotion_flag)?,
        ));
    }

    if observations.is_empty() {
        return Err(LoadError::NoRows);
    }

    let table = ObservationTable::from_observations(observations)?;
    Ok(LoadedObservations::from_table(table))
}

/// Compute a deterministic BLAKE3 hash over all observations.
///
/// Series are already SKU-sorted and date-ordered, so the hash is
/// independent of input row order.
pub(crate) fn compute_dataset_hash(table: &ObservationTable) -> String {
    let mut hasher = blake3::Hasher::new();
    for series in table.series() {
        hasher.update(series.sku_id().as_str().as_bytes());
        for obs in series.observations() {
            hasher.update(obs.date.to_string().as_bytes());
            hasher.update(&obs.stock_level.to_le_bytes());
            hasher.update(&obs.price.to_le_bytes());
            hasher.update(&[u8::from(obs.promotion_flag)]);
        }
    }
    hasher.finalize().to_hex().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    const CSV: &str = "\
sku_id,date,stock_level,price,promotion_flag
2,2024-01-02,40,9.5,0
1,2024-01-01,80,3.0,1
2,2024-01-01,45,9.5,0
1,2024-01-02,70,3.0,false
";

    #[test]
    fn groups_and_sorts_rows() {
        let loaded = read_observations(CSV.as_bytes(), &ColumnMapping::default()).unwrap();
        assert_eq!(loaded.row_count, 4);
        assert_eq!(loaded.table.sku_count(), 2);
        let two = loaded.table.get(&"2".into()).unwrap();
        assert_eq!(two.observations()[0].stock_level, 45);
        assert_eq!(two.observations()[1].stock_level, 40);
        assert!(loaded.table.get(&"1".into()).unwrap().observations()[0].promotion_flag);
    }

    #[test]
    fn hash_ignores_row_order() {
        let reordered = "\
sku_id,date,stock_level,price,promotion_flag
1,2024-01-02,70,3.0,0
2,2024-01-01,45,9.5,0
1,2024-01-01,80,3.0,1
2,2024-01-02,40,9.5,0
";
        let a = read_observations(CSV.as_bytes(), &ColumnMapping::default()).unwrap();
        let b = read_observations(reordered.as_bytes(), &ColumnMapping::default()).unwrap();
        assert_eq!(a.dataset_hash, b.dataset_hash);
        assert_eq!(a.dataset_hash.len(), 64);
    }

    #[test]
    fn hash_changes_with_values() {
        let changed = CSV.replace("40,9.5", "41,9.5");
        let a = read_observations(CSV.as_bytes(), &ColumnMapping::default()).unwrap();
        let b = read_observations(changed.as_bytes(), &ColumnMapping::default()).unwrap();
        assert_ne!(a.dataset_hash, b.dataset_hash);
    }

    #[test]
    fn missing_column_names_the_column() {
        let csv = "sku_id,date,stock_level,promotion_flag\n1,2024-01-01,5,0\n";
        let err = read_observations(csv.as_bytes(), &ColumnMapping::default()).unwrap_err();
        match err {
            LoadError::Schema(SchemaError::MissingColumn { column, .. }) => assert_eq!(column, "price"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn bad_cell_reports_row() {
        let csv = "sku_id,date,stock_level,price,promotion_flag\n1,2024-01-01,5,2.0,0\n1,2024-01-02,-3,2.0,0\n";
        let err = read_observations(csv.as_bytes(), &ColumnMapping::default()).unwrap_err();
        assert!(matches!(
            err,
            LoadError::Schema(SchemaError::InvalidValue { row: 2, .. })
        ));
    }

    #[test]
    fn duplicate_dates_rejected() {
        let csv = "sku_id,date,stock_level,price,promotion_flag\n1,2024-01-01,5,2.0,0\n1,2024-01-01,6,2.0,0\n";
        let err = read_observations(csv.as_bytes(), &ColumnMapping::default()).unwrap_err();
        assert!(matches!(err, LoadError::Series(SeriesError::DuplicateDate { .. })));
    }

    #[test]
    fn header_only_is_no_rows() {
        let csv = "sku_id,date,stock_level,price,promotion_flag\n";
        let err = read_observations(csv.as_bytes(), &ColumnMapping::default()).unwrap_err();
        assert!(matches!(err, LoadError::NoRows));
    }

    #[test]
    fn legacy_headers() {
        let csv = "ID_PRODUTO,DATA_EVENTO,QUANTIDADE_ESTOQUE,PRECO,FLAG_PROMOCAO,OBS\n\
                   101,2024-03-01,55,12.9,1,x\n";
        let loaded = read_observations(csv.as_bytes(), &ColumnMapping::legacy()).unwrap();
        assert_eq!(loaded.row_count, 1);
        assert!(loaded.table.get(&"101".into()).is_some());
    }
}
