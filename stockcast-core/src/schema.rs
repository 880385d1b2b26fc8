//! Observation table schema contract: the boundary between ingestion and the feature engine.
//!
//! Defines the logical columns every input table must provide, their value
//! types, and the parsing rules for individual cells. Ingestion adapters map
//! their own header names onto these logical columns before validation.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Value types of the observation columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SchemaType {
    Text,
    Date,
    UInt,
    Float,
    Flag,
}

/// Logical column of the observation table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaField {
    pub name: &'static str,
    pub dtype: SchemaType,
}

/// Required columns, in canonical order.
pub const OBSERVATION_SCHEMA: [SchemaField; 5] = [
    SchemaField {
        name: "sku_id",
        dtype: SchemaType::Text,
    },
    SchemaField {
        name: "date",
        dtype: SchemaType::Date,
    },
    SchemaField {
        name: "stock_level",
        dtype: SchemaType::UInt,
    },
    SchemaField {
        name: "price",
        dtype: SchemaType::Float,
    },
    SchemaField {
        name: "promotion_flag",
        dtype: SchemaType::Flag,
    },
];

/// Errors raised when an input table does not satisfy the contract.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    #[error("missing required column '{column}' ({field})")]
    MissingColumn { column: String, field: &'static str },

    #[error("row {row}, column '{column}': cannot parse '{value}' as {expected:?}")]
    InvalidValue {
        row: usize,
        column: String,
        value: String,
        expected: SchemaType,
    },
}

/// Positions of the five required columns within a concrete header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnIndex {
    pub sku_id: usize,
    pub date: usize,
    pub stock_level: usize,
    pub price: usize,
    pub promotion_flag: usize,
}

/// Locate the required columns in `header`.
///
/// `names` gives the header name used for each logical column, in
/// `OBSERVATION_SCHEMA` order. Matching trims surrounding whitespace.
/// Extra columns are ignored.
pub fn locate_columns<S: AsRef<str>>(
    header: &[S],
    names: [&str; 5],
) -> Result<ColumnIndex, SchemaError> {
    let mut positions = [0usize; 5];
    for ((slot, field), name) in positions.iter_mut().zip(&OBSERVATION_SCHEMA).zip(names) {
        *slot = header
            .iter()
            .position(|h| h.as_ref().trim() == name)
            .ok_or_else(|| SchemaError::MissingColumn {
                column: name.to_string(),
                field: field.name,
            })?;
    }

    let [sku_id, date, stock_level, price, promotion_flag] = positions;
    Ok(ColumnIndex {
        sku_id,
        date,
        stock_level,
        price,
        promotion_flag,
    })
}

fn invalid(row: usize, column: &str, value: &str, expected: SchemaType) -> SchemaError {
    SchemaError::InvalidValue {
        row,
        column: column.to_string(),
        value: value.to_string(),
        expected,
    }
}

/// Parse a date cell with the given `chrono` format string.
pub fn parse_date(raw: &str, format: &str, row: usize, column: &str) -> Result<NaiveDate, SchemaError> {
    NaiveDate::parse_from_str(raw.trim(), format).map_err(|_| invalid(row, column, raw, SchemaType::Date))
}

/// Parse a non-negative integer stock cell. Integral floats (`"42.0"`) are accepted.
pub fn parse_stock(raw: &str, row: usize, column: &str) -> Result<u32, SchemaError> {
    let trimmed = raw.trim();
    if let Ok(v) = trimmed.parse::<u32>() {
        return Ok(v);
    }
    match trimmed.parse::<f64>() {
        Ok(v) if v.is_finite() && v >= 0.0 && v.fract() == 0.0 && v <= u32::MAX as f64 => Ok(v as u32),
        _ => Err(invalid(row, column, raw, SchemaType::UInt)),
    }
}

/// Parse a strictly positive, finite price cell.
pub fn parse_price(raw: &str, row: usize, column: &str) -> Result<f64, SchemaError> {
    match raw.trim().parse::<f64>() {
        Ok(v) if v.is_finite() && v > 0.0 => Ok(v),
        _ => Err(invalid(row, column, raw, SchemaType::Float)),
    }
}

/// Parse a promotion flag cell: `0`/`1`, `true`/`false`, `yes`/`no` (case-insensitive).
pub fn parse_flag(raw: &str, row: usize, column: &str) -> Result<bool, SchemaError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "1.0" | "true" | "yes" | "y" => Ok(true),
        "0" | "0.0" | "false" | "no" | "n" => Ok(false),
        _ => Err(invalid(row, column, raw, SchemaType::Flag)),
    }
}
