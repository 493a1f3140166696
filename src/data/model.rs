//! Canonical column names and typed record views over the cleaned tables.

use polars::prelude::*;

pub const PROVIDER: &str = "provider";
pub const PRODUCT_TYPE: &str = "product_type";
pub const RESERVE: &str = "reserve";
pub const RETURN_1Y: &str = "return_1y";
pub const RETURN_3Y: &str = "return_3y";
pub const RETURN_5Y: &str = "return_5y";
pub const RETURN_7Y: &str = "return_7y";
pub const RETURN_10Y: &str = "return_10y";
pub const TOTAL_COST_RATIO: &str = "total_cost_ratio";
pub const NET_EFFICIENCY: &str = "net_efficiency";

/// Positional layout of the returns sheet.
pub const RETURN_COLUMNS: [&str; 8] = [
    PROVIDER,
    PRODUCT_TYPE,
    RESERVE,
    RETURN_1Y,
    RETURN_3Y,
    RETURN_5Y,
    RETURN_7Y,
    RETURN_10Y,
];

/// Columns of the returns sheet that are coerced to numbers.
pub const RETURN_NUMERIC_COLUMNS: [&str; 6] = [
    RESERVE, RETURN_1Y, RETURN_3Y, RETURN_5Y, RETURN_7Y, RETURN_10Y,
];

/// Positional layout of the fee sheet. Only provider and total cost ratio survive cleaning.
pub const FEE_COLUMNS: [&str; 6] = [
    PROVIDER,
    "plan_type",
    "management_fee",
    "custody_fee",
    "fund_cost",
    TOTAL_COST_RATIO,
];

/// Display label for a canonical column.
pub fn column_label(name: &str) -> &str {
    match name {
        PROVIDER => "사업자명",
        PRODUCT_TYPE => "원리금구분",
        RESERVE => "적립금",
        RETURN_1Y => "1년수익률",
        RETURN_3Y => "3년수익률",
        RETURN_5Y => "5년수익률",
        RETURN_7Y => "7년수익률",
        RETURN_10Y => "10년수익률",
        TOTAL_COST_RATIO => "총비용부담률",
        NET_EFFICIENCY => "순효율",
        other => other,
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReturnRecord {
    pub provider: String,
    pub product_type: String,
    pub reserve: Option<f64>,
    pub return_1y: Option<f64>,
    pub return_3y: Option<f64>,
    pub return_5y: Option<f64>,
    pub return_7y: Option<f64>,
    pub return_10y: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FeeRecord {
    pub provider: String,
    pub total_cost_ratio: Option<f64>,
}

/// A return record joined with its provider's fee data.
///
/// `total_cost_ratio` and `net_efficiency` are `None` both for unmatched
/// providers and for tables merged without any fee data; use
/// [`EnrichedTable::has_fee_data`] to tell the two apart.
#[derive(Debug, Clone, PartialEq)]
pub struct EnrichedRecord {
    pub base: ReturnRecord,
    pub total_cost_ratio: Option<f64>,
    pub net_efficiency: Option<f64>,
}

/// The merged table handed to the presenter.
#[derive(Debug, Clone, Default)]
pub struct EnrichedTable {
    df: DataFrame,
}

impl EnrichedTable {
    pub fn new(df: DataFrame) -> Self {
        Self { df }
    }

    pub fn dataframe(&self) -> &DataFrame {
        &self.df
    }

    pub fn height(&self) -> usize {
        self.df.height()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.df.column(name).is_ok()
    }

    /// Whether the fee join ran. Checks column presence, not null values.
    pub fn has_fee_data(&self) -> bool {
        self.has_column(TOTAL_COST_RATIO) && self.has_column(NET_EFFICIENCY)
    }

    /// Extract typed records in table order.
    pub fn records(&self) -> Vec<EnrichedRecord> {
        records_from_frame(&self.df)
    }
}

/// Read typed records out of any frame carrying the canonical columns.
/// Columns that are missing or were left as text read as `None`.
pub fn records_from_frame(df: &DataFrame) -> Vec<EnrichedRecord> {
    let providers = text_values(df, PROVIDER);
    let product_types = text_values(df, PRODUCT_TYPE);
    let reserve = float_values(df, RESERVE);
    let r1 = float_values(df, RETURN_1Y);
    let r3 = float_values(df, RETURN_3Y);
    let r5 = float_values(df, RETURN_5Y);
    let r7 = float_values(df, RETURN_7Y);
    let r10 = float_values(df, RETURN_10Y);
    let cost = float_values(df, TOTAL_COST_RATIO);
    let net = float_values(df, NET_EFFICIENCY);

    (0..df.height())
        .map(|i| EnrichedRecord {
            base: ReturnRecord {
                provider: providers[i].clone().unwrap_or_default(),
                product_type: product_types[i].clone().unwrap_or_default(),
                reserve: reserve[i],
                return_1y: r1[i],
                return_3y: r3[i],
                return_5y: r5[i],
                return_7y: r7[i],
                return_10y: r10[i],
            },
            total_cost_ratio: cost[i],
            net_efficiency: net[i],
        })
        .collect()
}

/// Read fee records out of a cleaned fee frame, skipping rows without a provider.
pub fn fee_records(df: &DataFrame) -> Vec<FeeRecord> {
    text_values(df, PROVIDER)
        .into_iter()
        .zip(float_values(df, TOTAL_COST_RATIO))
        .filter_map(|(provider, total_cost_ratio)| {
            Some(FeeRecord {
                provider: provider?,
                total_cost_ratio,
            })
        })
        .collect()
}

/// Values of a Float64 column, or all `None` when the column is absent or not numeric.
pub fn float_values(df: &DataFrame, name: &str) -> Vec<Option<f64>> {
    df.column(name)
        .ok()
        .and_then(|col| col.f64().ok())
        .map(|ca| ca.into_iter().collect())
        .unwrap_or_else(|| vec![None; df.height()])
}

/// Values of a column rendered as text, or all `None` when absent.
pub fn text_values(df: &DataFrame, name: &str) -> Vec<Option<String>> {
    let Ok(col) = df.column(name) else {
        return vec![None; df.height()];
    };
    match col.str() {
        Ok(ca) => ca.into_iter().map(|v| v.map(str::to_string)).collect(),
        Err(_) => col
            .as_materialized_series()
            .iter()
            .map(|v| {
                if v.is_null() {
                    None
                } else {
                    Some(v.to_string().trim_matches('"').to_string())
                }
            })
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_frame() -> DataFrame {
        DataFrame::new(vec![
            Column::new(PROVIDER.into(), ["A", "B"]),
            Column::new(PRODUCT_TYPE.into(), ["원리금보장형", "실적배당형"]),
            Column::new(RESERVE.into(), [Some(10.0), None]),
            Column::new(RETURN_1Y.into(), [Some(2.5), Some(4.0)]),
            Column::new(RETURN_3Y.into(), [None::<f64>, None]),
            Column::new(RETURN_5Y.into(), [None::<f64>, None]),
            Column::new(RETURN_7Y.into(), [None::<f64>, None]),
            Column::new(RETURN_10Y.into(), [None::<f64>, None]),
        ])
        .unwrap()
    }

    #[test]
    fn records_without_fee_columns_have_no_fee_fields() {
        let table = EnrichedTable::new(sample_frame());
        assert!(!table.has_fee_data());

        let records = table.records();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].base.provider, "A");
        assert_eq!(records[0].base.reserve, Some(10.0));
        assert_eq!(records[1].base.return_1y, Some(4.0));
        assert!(records.iter().all(|r| r.total_cost_ratio.is_none()));
    }

    #[test]
    fn text_column_reads_as_missing_numbers() {
        let mut df = sample_frame();
        df.with_column(Column::new(RESERVE.into(), ["x", "y"])).unwrap();
        assert_eq!(float_values(&df, RESERVE), vec![None, None]);
        assert_eq!(
            text_values(&df, RESERVE),
            vec![Some("x".to_string()), Some("y".to_string())]
        );
    }

    #[test]
    fn fee_records_skip_missing_providers() {
        let df = DataFrame::new(vec![
            Column::new(PROVIDER.into(), [Some("A"), None, Some("B")]),
            Column::new(TOTAL_COST_RATIO.into(), [Some(0.5), Some(0.1), None]),
        ])
        .unwrap();
        assert_eq!(
            fee_records(&df),
            vec![
                FeeRecord {
                    provider: "A".into(),
                    total_cost_ratio: Some(0.5)
                },
                FeeRecord {
                    provider: "B".into(),
                    total_cost_ratio: None
                },
            ]
        );
    }

    #[test]
    fn labels_fall_back_to_raw_name() {
        assert_eq!(column_label(RETURN_1Y), "1년수익률");
        assert_eq!(column_label("plan_type"), "plan_type");
    }
}
