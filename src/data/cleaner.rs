//! Data Cleaner Module
//! Renames raw sheet columns, strips header/footer residue, coerces numbers,
//! and filters out aggregate rows.

use crate::data::model::{
    FEE_COLUMNS, PRODUCT_TYPE, PROVIDER, RESERVE, RETURN_1Y, RETURN_COLUMNS,
    RETURN_NUMERIC_COLUMNS, TOTAL_COST_RATIO,
};
use polars::prelude::*;
use rayon::prelude::*;
use std::collections::HashSet;
use std::fmt;
use thiserror::Error;
use tracing::{debug, warn};

/// Text in the reserve cell that marks a repeated header or footer row.
const RESIDUE_MARKERS: [&str; 3] = ["적립금", "수익률", "NaN"];

/// Product types that are subtotals or placeholders rather than products.
const AGGREGATE_PRODUCT_TYPES: [&str; 3] = ["합계", "자사계열사", "기타"];

/// Provider text that marks fee-sheet totals or repeated headers.
const FEE_RESIDUE_PROVIDERS: [&str; 2] = ["합계", "사업자"];

#[derive(Error, Debug)]
pub enum SchemaError {
    #[error("{table} sheet has {found} columns, expected {expected}")]
    ColumnCount {
        table: &'static str,
        expected: usize,
        found: usize,
    },
    #[error("Polars error: {0}")]
    PolarsError(#[from] PolarsError),
}

/// A numeric column that kept its text form because some value would not parse.
#[derive(Debug, Clone, PartialEq)]
pub struct CoercionWarning {
    pub column: String,
    pub sample: String,
}

impl fmt::Display for CoercionWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} 열에 숫자가 아닌 값이 포함되어 있어 변환에서 제외되었습니다 (예: \"{}\")",
            crate::data::model::column_label(&self.column),
            self.sample
        )
    }
}

/// Output of a cleaning pass: the cleaned table plus non-fatal warnings.
#[derive(Debug, Clone)]
pub struct Cleaned {
    pub df: DataFrame,
    pub warnings: Vec<CoercionWarning>,
}

/// Result of coercing a single column.
enum Coerced {
    Unchanged,
    Numeric(Column),
    Text(Column, CoercionWarning),
}

/// Handles cleaning of raw return and fee sheets.
pub struct Cleaner;

impl Cleaner {
    /// Clean a raw returns sheet into the eight canonical columns.
    pub fn clean_returns(raw: &DataFrame) -> Result<Cleaned, SchemaError> {
        let df = Self::rename_positional(raw, &RETURN_COLUMNS, "returns")?;
        let before = df.height();

        let df = Self::drop_residue_rows(&df)?;
        let (df, warnings) = Self::coerce_numeric(df, &RETURN_NUMERIC_COLUMNS)?;
        let df = Self::retain_usable_rows(&df)?;

        debug!(before, after = df.height(), "cleaned returns sheet");
        Ok(Cleaned { df, warnings })
    }

    /// Clean a raw fee sheet down to provider and total cost ratio.
    ///
    /// Providers are stored trimmed. Duplicate providers keep their first row
    /// so the join never fans out.
    pub fn clean_fees(raw: &DataFrame) -> Result<Cleaned, SchemaError> {
        let df = Self::rename_positional(raw, &FEE_COLUMNS, "fee")?;
        let df = df.select([PROVIDER, TOTAL_COST_RATIO])?;

        let providers = df.column(PROVIDER)?.str()?;
        let mut seen = HashSet::new();
        let mask: BooleanChunked = providers
            .into_iter()
            .map(|provider| match provider.map(str::trim) {
                None | Some("") => false,
                Some(p) if FEE_RESIDUE_PROVIDERS.iter().any(|m| p.contains(m)) => false,
                Some(p) => seen.insert(p.to_string()),
            })
            .collect();
        let mut df = df.filter(&mask)?;

        let trimmed: Vec<Option<String>> = df
            .column(PROVIDER)?
            .str()?
            .into_iter()
            .map(|p| p.map(|p| p.trim().to_string()))
            .collect();
        df.with_column(Column::new(PROVIDER.into(), trimmed))?;

        let (df, warnings) = Self::coerce_numeric(df, &[TOTAL_COST_RATIO])?;
        debug!(rows = df.height(), "cleaned fee sheet");
        Ok(Cleaned { df, warnings })
    }

    /// Assign canonical names by position; the column count must match exactly.
    fn rename_positional(
        raw: &DataFrame,
        names: &[&str],
        table: &'static str,
    ) -> Result<DataFrame, SchemaError> {
        if raw.width() != names.len() {
            return Err(SchemaError::ColumnCount {
                table,
                expected: names.len(),
                found: raw.width(),
            });
        }

        let columns = raw
            .get_columns()
            .iter()
            .zip(names)
            .map(|(col, name)| {
                let col = if col.dtype() == &DataType::String {
                    col.clone()
                } else {
                    col.cast(&DataType::String)?
                };
                Ok(col.with_name((*name).into()))
            })
            .collect::<PolarsResult<Vec<Column>>>()?;

        Ok(DataFrame::new(columns)?)
    }

    /// Drop rows whose reserve cell carries header/footer text. Null cells stay.
    fn drop_residue_rows(df: &DataFrame) -> Result<DataFrame, SchemaError> {
        let reserve = df.column(RESERVE)?.str()?;
        let mask: BooleanChunked = reserve
            .into_iter()
            .map(|cell| match cell {
                Some(text) => !RESIDUE_MARKERS.iter().any(|m| text.contains(m)),
                None => true,
            })
            .collect();
        Ok(df.filter(&mask)?)
    }

    /// Keep rows with a one-year return and a real product type.
    fn retain_usable_rows(df: &DataFrame) -> Result<DataFrame, SchemaError> {
        let has_return = df.column(RETURN_1Y)?.is_not_null();
        let product_types = df.column(PRODUCT_TYPE)?.str()?;
        let mask: BooleanChunked = product_types
            .into_iter()
            .zip(&has_return)
            .map(|(product_type, has_return)| {
                let is_aggregate = product_type
                    .map(|t| AGGREGATE_PRODUCT_TYPES.iter().any(|m| t.contains(m)))
                    .unwrap_or(false);
                has_return.unwrap_or(false) && !is_aggregate
            })
            .collect();
        Ok(df.filter(&mask)?)
    }

    /// Coerce each named column to Float64, leaving unparseable columns as text.
    pub fn coerce_numeric(
        mut df: DataFrame,
        columns: &[&str],
    ) -> Result<(DataFrame, Vec<CoercionWarning>), SchemaError> {
        let targets = columns
            .iter()
            .map(|name| df.column(name).cloned())
            .collect::<PolarsResult<Vec<Column>>>()?;

        // Columns are independent; results are applied back in input order.
        let results = targets
            .par_iter()
            .map(Self::coerce_column)
            .collect::<PolarsResult<Vec<Coerced>>>()?;

        let mut warnings = Vec::new();
        for result in results {
            match result {
                Coerced::Unchanged => {}
                Coerced::Numeric(col) => {
                    debug!(column = %col.name(), "coerced to float");
                    df.with_column(col)?;
                }
                Coerced::Text(col, warning) => {
                    warn!(column = %warning.column, sample = %warning.sample, "numeric coercion skipped");
                    df.with_column(col)?;
                    warnings.push(warning);
                }
            }
        }
        Ok((df, warnings))
    }

    fn coerce_column(col: &Column) -> PolarsResult<Coerced> {
        match col.dtype() {
            DataType::Float64 => return Ok(Coerced::Unchanged),
            DataType::String => {}
            DataType::Float32
            | DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64 => {
                return Ok(Coerced::Numeric(col.cast(&DataType::Float64)?));
            }
            _ => {}
        }

        let text = col.cast(&DataType::String)?;
        let normalized: Vec<Option<String>> = text
            .str()?
            .into_iter()
            .map(|cell| cell.and_then(normalize_numeric_text))
            .collect();

        let mut parsed = Vec::with_capacity(normalized.len());
        let mut failure = None;
        for cell in &normalized {
            match cell.as_deref().map(parse_number) {
                None => parsed.push(None),
                Some(Ok(value)) => parsed.push(value),
                Some(Err(())) => {
                    failure = cell.clone();
                    break;
                }
            }
        }

        let name = col.name().clone();
        Ok(match failure {
            None => Coerced::Numeric(Column::new(name, parsed)),
            Some(sample) => Coerced::Text(
                Column::new(name.clone(), normalized),
                CoercionWarning {
                    column: name.to_string(),
                    sample,
                },
            ),
        })
    }
}

/// Strip thousands separators and whitespace; a lone dash or empty cell is missing.
pub fn normalize_numeric_text(cell: &str) -> Option<String> {
    let cleaned = cell.replace(',', "");
    let cleaned = cleaned.trim();
    // Whitespace-only cells count as missing too, same as a blank CSV field.
    if cleaned.is_empty() || cleaned == "-" {
        None
    } else {
        Some(cleaned.to_string())
    }
}

/// Parse normalized text; a parsed NaN counts as missing.
fn parse_number(text: &str) -> Result<Option<f64>, ()> {
    text.parse::<f64>()
        .map(|v| if v.is_nan() { None } else { Some(v) })
        .map_err(|_| ())
}
