//! Fee Merger Module
//! Left-joins cleaned returns with fee data and derives net efficiency.

use crate::data::model::{
    fee_records, EnrichedTable, NET_EFFICIENCY, PROVIDER, RETURN_1Y, TOTAL_COST_RATIO,
};
use polars::prelude::*;
use std::collections::HashMap;
use std::fmt;
use tracing::{info, warn};

/// Enrichment was skipped because an operand column is not numeric.
#[derive(Debug, Clone, PartialEq)]
pub struct MergeWarning {
    pub column: String,
}

impl fmt::Display for MergeWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} 열이 숫자가 아니어서 수수료 결합을 건너뜁니다",
            crate::data::model::column_label(&self.column)
        )
    }
}

/// Merge output.
#[derive(Debug, Clone)]
pub struct Merged {
    pub table: EnrichedTable,
    pub warning: Option<MergeWarning>,
}

/// Joins fee data onto return rows.
pub struct Merger;

impl Merger {
    /// Left-join `fees` onto `returns` by exact provider name.
    ///
    /// With no fee rows the join is skipped and no fee columns are added.
    /// Row count and order always match `returns`.
    pub fn merge(returns: DataFrame, fees: Option<&DataFrame>) -> PolarsResult<Merged> {
        let Some(fees) = fees.filter(|f| f.height() > 0) else {
            info!(rows = returns.height(), "no fee data, skipping join");
            return Ok(Self::passthrough(returns, None));
        };

        let one_year_numeric = returns.column(RETURN_1Y)?.dtype() == &DataType::Float64;
        let ratio_numeric = fees.column(TOTAL_COST_RATIO)?.dtype() == &DataType::Float64;
        let text_operand = match (one_year_numeric, ratio_numeric) {
            (false, _) => Some(RETURN_1Y),
            (true, false) => Some(TOTAL_COST_RATIO),
            (true, true) => None,
        };
        if let Some(column) = text_operand {
            warn!(column, "operand not numeric, skipping join");
            let warning = MergeWarning {
                column: column.to_string(),
            };
            return Ok(Self::passthrough(returns, Some(warning)));
        }

        // First occurrence wins so duplicate fee rows cannot add rows.
        let mut ratio_by_provider: HashMap<String, Option<f64>> = HashMap::new();
        for fee in fee_records(fees) {
            ratio_by_provider
                .entry(fee.provider)
                .or_insert(fee.total_cost_ratio);
        }

        let providers = returns.column(PROVIDER)?.str()?;
        let one_year = returns.column(RETURN_1Y)?.f64()?;

        let mut matched = 0usize;
        let (cost, net): (Vec<Option<f64>>, Vec<Option<f64>>) = providers
            .into_iter()
            .zip(one_year)
            .map(|(provider, ret)| {
                let ratio = provider
                    .and_then(|p| ratio_by_provider.get(p).copied())
                    .flatten();
                if ratio.is_some() {
                    matched += 1;
                }
                let net = match (ret, ratio) {
                    (Some(r), Some(c)) => Some(r - c),
                    _ => None,
                };
                (ratio, net)
            })
            .unzip();

        let mut df = returns;
        df.with_column(Column::new(TOTAL_COST_RATIO.into(), cost))?;
        df.with_column(Column::new(NET_EFFICIENCY.into(), net))?;

        info!(rows = df.height(), matched, "joined fee data");
        Ok(Merged {
            table: EnrichedTable::new(df),
            warning: None,
        })
    }

    fn passthrough(returns: DataFrame, warning: Option<MergeWarning>) -> Merged {
        Merged {
            table: EnrichedTable::new(returns),
            warning,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::PRODUCT_TYPE;

    fn returns() -> DataFrame {
        DataFrame::new(vec![
            Column::new(PROVIDER.into(), ["A", "B", "A", "C"]),
            Column::new(PRODUCT_TYPE.into(), ["보장", "비보장", "비보장", "보장"]),
            Column::new(RETURN_1Y.into(), [Some(3.0), Some(2.0), Some(5.0), Some(1.0)]),
        ])
        .unwrap()
    }

    fn fees() -> DataFrame {
        DataFrame::new(vec![
            Column::new(PROVIDER.into(), ["A", "B", "A"]),
            Column::new(TOTAL_COST_RATIO.into(), [Some(0.5), None, Some(9.0)]),
        ])
        .unwrap()
    }

    #[test]
    fn left_join_keeps_every_return_row() {
        let merged = Merger::merge(returns(), Some(&fees())).unwrap();
        let df = merged.table.dataframe();

        assert!(merged.warning.is_none());
        assert!(merged.table.has_fee_data());
        assert_eq!(df.height(), 4);

        let cost = df.column(TOTAL_COST_RATIO).unwrap().f64().unwrap();
        let net = df.column(NET_EFFICIENCY).unwrap().f64().unwrap();
        assert_eq!(cost.get(0), Some(0.5));
        assert_eq!(net.get(0), Some(2.5));
        // Matched provider with a missing ratio.
        assert_eq!(cost.get(1), None);
        assert_eq!(net.get(1), None);
        // Duplicate fee row ignored.
        assert_eq!(net.get(2), Some(4.5));
        // Unmatched provider.
        assert_eq!(cost.get(3), None);
        assert_eq!(net.get(3), None);
    }

    #[test]
    fn net_efficiency_is_exact_difference() {
        let merged = Merger::merge(returns(), Some(&fees())).unwrap();
        for record in merged.table.records() {
            match (record.base.return_1y, record.total_cost_ratio) {
                (Some(r), Some(c)) => assert_eq!(record.net_efficiency, Some(r - c)),
                _ => assert_eq!(record.net_efficiency, None),
            }
        }
    }

    #[test]
    fn missing_fee_table_adds_no_columns() {
        let merged = Merger::merge(returns(), None).unwrap();
        assert!(!merged.table.has_fee_data());
        assert!(!merged.table.has_column(TOTAL_COST_RATIO));
        assert_eq!(merged.table.height(), 4);
    }

    #[test]
    fn empty_fee_table_adds_no_columns() {
        let empty = fees().head(Some(0));
        let merged = Merger::merge(returns(), Some(&empty)).unwrap();
        assert!(!merged.table.has_column(NET_EFFICIENCY));
        assert!(merged.warning.is_none());
    }

    #[test]
    fn text_cost_ratio_skips_join_with_warning() {
        let text_fees = DataFrame::new(vec![
            Column::new(PROVIDER.into(), ["A"]),
            Column::new(TOTAL_COST_RATIO.into(), ["n/a"]),
        ])
        .unwrap();
        let merged = Merger::merge(returns(), Some(&text_fees)).unwrap();
        assert!(!merged.table.has_fee_data());
        assert_eq!(
            merged.warning,
            Some(MergeWarning {
                column: TOTAL_COST_RATIO.to_string()
            })
        );
    }
}
