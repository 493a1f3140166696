//! Presenter Recipes
//! Pure aggregations over the enriched table that feed the dashboard views.

use crate::data::model::{
    column_label, text_values, EnrichedTable, NET_EFFICIENCY, PRODUCT_TYPE, PROVIDER, RETURN_1Y,
    RETURN_3Y, RETURN_5Y, TOTAL_COST_RATIO,
};
use crate::stats::{BoxSummary, StatsCalculator};
use polars::prelude::*;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PresenterError {
    #[error("'{0}' 열이 없습니다")]
    MissingColumn(&'static str),
    #[error("'{0}' 열이 숫자가 아닙니다")]
    NotNumeric(&'static str),
    #[error("'{0}' 열이 텍스트가 아닙니다")]
    NotText(&'static str),
    #[error("수수료 데이터가 없어 표시할 수 없습니다")]
    FeeDataUnavailable,
    #[error("Polars error: {0}")]
    PolarsError(#[from] PolarsError),
}

/// Investor risk preference used for product recommendations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RiskTier {
    /// Principal-guaranteed products only.
    #[default]
    Conservative,
    /// One-year return at or above the median.
    Neutral,
    /// One-year return at or above the 75th percentile.
    Aggressive,
}

impl RiskTier {
    pub const ALL: [RiskTier; 3] = [RiskTier::Conservative, RiskTier::Neutral, RiskTier::Aggressive];

    pub fn label(self) -> &'static str {
        match self {
            RiskTier::Conservative => "안정형",
            RiskTier::Neutral => "중립형",
            RiskTier::Aggressive => "공격형",
        }
    }
}

impl fmt::Display for RiskTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Grouping key for the trend comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TrendGrouping {
    #[default]
    Provider,
    ProductType,
}

impl TrendGrouping {
    pub fn column(self) -> &'static str {
        match self {
            TrendGrouping::Provider => PROVIDER,
            TrendGrouping::ProductType => PRODUCT_TYPE,
        }
    }

    pub fn label(self) -> &'static str {
        column_label(self.column())
    }
}

/// Periods compared in the trend view, in display order.
pub const TREND_PERIODS: [&str; 3] = [RETURN_1Y, RETURN_3Y, RETURN_5Y];

#[derive(Debug, Clone, PartialEq)]
pub struct ProviderMean {
    pub provider: String,
    pub mean_return: f64,
}

/// One (cost ratio, return) point of the efficiency scatter.
#[derive(Debug, Clone, PartialEq)]
pub struct EfficiencyPoint {
    pub provider: String,
    pub product_type: String,
    pub total_cost_ratio: f64,
    pub return_1y: f64,
    pub net_efficiency: f64,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct EfficiencyScatter {
    /// Every row with both a cost ratio and a one-year return.
    pub points: Vec<EfficiencyPoint>,
    /// Highest net efficiency first, ties in table order.
    pub top: Vec<EfficiencyPoint>,
}

/// Record counts per provider and product type.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PortfolioSummary {
    pub product_types: Vec<String>,
    pub rows: Vec<PortfolioRow>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PortfolioRow {
    pub provider: String,
    /// One count per entry of [`PortfolioSummary::product_types`].
    pub counts: Vec<u32>,
}

impl PortfolioSummary {
    pub fn count(&self, provider: &str, product_type: &str) -> Option<u32> {
        let col = self.product_types.iter().position(|t| t == product_type)?;
        self.rows
            .iter()
            .find(|r| r.provider == provider)
            .map(|r| r.counts[col])
    }

    /// Pivot as a frame: provider column plus one count column per product type.
    pub fn to_dataframe(&self) -> PolarsResult<DataFrame> {
        let mut columns = vec![Column::new(
            column_label(PROVIDER).into(),
            self.rows
                .iter()
                .map(|r| r.provider.as_str())
                .collect::<Vec<_>>(),
        )];
        for product_type in &self.product_types {
            let counts: Vec<u32> = self
                .rows
                .iter()
                .map(|r| self.count(&r.provider, product_type).unwrap_or(0))
                .collect();
            columns.push(Column::new(product_type.as_str().into(), counts));
        }
        DataFrame::new(columns)
    }
}

/// Mean return of one group over one period.
#[derive(Debug, Clone, PartialEq)]
pub struct TrendPoint {
    pub group: String,
    pub period: &'static str,
    pub value: f64,
}

/// Builds dashboard aggregates from the enriched table.
pub struct Presenter;

impl Presenter {
    /// Mean one-year return per provider, highest first.
    pub fn provider_ranking(table: &EnrichedTable) -> Result<Vec<ProviderMean>, PresenterError> {
        let df = table.dataframe();
        let providers = text_column(df, PROVIDER)?;
        let returns = numeric_column(df, RETURN_1Y)?;

        let mut groups: BTreeMap<String, Vec<f64>> = BTreeMap::new();
        for (provider, ret) in providers.into_iter().zip(returns) {
            if let (Some(provider), Some(ret)) = (provider, ret) {
                groups.entry(provider.to_string()).or_default().push(ret);
            }
        }

        let mut ranking: Vec<ProviderMean> = groups
            .into_iter()
            .map(|(provider, values)| ProviderMean {
                provider,
                mean_return: StatsCalculator::mean(&values),
            })
            .collect();
        ranking.sort_by(|a, b| {
            b.mean_return
                .partial_cmp(&a.mean_return)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        Ok(ranking)
    }

    /// Scatter points of cost ratio against return, with the `n` most efficient rows.
    pub fn efficiency_scatter(
        table: &EnrichedTable,
        n: usize,
    ) -> Result<EfficiencyScatter, PresenterError> {
        if !table.has_fee_data() {
            return Err(PresenterError::FeeDataUnavailable);
        }
        let df = table.dataframe();
        for column in [RETURN_1Y, TOTAL_COST_RATIO, NET_EFFICIENCY] {
            numeric_column(df, column)?;
        }

        let points: Vec<EfficiencyPoint> = table
            .records()
            .into_iter()
            .filter_map(|record| {
                Some(EfficiencyPoint {
                    total_cost_ratio: record.total_cost_ratio?,
                    return_1y: record.base.return_1y?,
                    net_efficiency: record.net_efficiency?,
                    provider: record.base.provider,
                    product_type: record.base.product_type,
                })
            })
            .collect();

        let mut top = points.clone();
        top.sort_by(|a, b| {
            b.net_efficiency
                .partial_cmp(&a.net_efficiency)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        top.truncate(n);

        Ok(EfficiencyScatter { points, top })
    }

    /// Rows recommended for a risk tier, in table order.
    ///
    /// Each tier is computed independently over the whole table.
    pub fn recommend(table: &EnrichedTable, tier: RiskTier) -> Result<DataFrame, PresenterError> {
        let df = table.dataframe();
        let mask: BooleanChunked = match tier {
            RiskTier::Conservative => text_column(df, PRODUCT_TYPE)?
                .into_iter()
                .map(|t| t.map(|t| t.contains("보장")).unwrap_or(false))
                .collect(),
            RiskTier::Neutral | RiskTier::Aggressive => {
                let returns = numeric_column(df, RETURN_1Y)?;
                let values: Vec<f64> = returns.into_iter().flatten().collect();
                let threshold = match tier {
                    RiskTier::Neutral => StatsCalculator::median(&values),
                    _ => StatsCalculator::quantile(&values, 75.0),
                };
                returns
                    .into_iter()
                    .map(|r| r.map(|r| r >= threshold).unwrap_or(false))
                    .collect()
            }
        };
        Ok(df.filter(&mask)?)
    }

    /// Count of rows per (provider, product type), zero-filled.
    pub fn portfolio_summary(table: &EnrichedTable) -> Result<PortfolioSummary, PresenterError> {
        let df = table.dataframe();
        let providers = text_column(df, PROVIDER)?;
        let product_types = text_column(df, PRODUCT_TYPE)?;

        let mut counts: BTreeMap<&str, BTreeMap<&str, u32>> = BTreeMap::new();
        let mut all_types: BTreeSet<&str> = BTreeSet::new();
        for (provider, product_type) in providers.into_iter().zip(product_types) {
            if let (Some(provider), Some(product_type)) = (provider, product_type) {
                *counts
                    .entry(provider)
                    .or_default()
                    .entry(product_type)
                    .or_default() += 1;
                all_types.insert(product_type);
            }
        }

        let rows = counts
            .into_iter()
            .map(|(provider, by_type)| PortfolioRow {
                provider: provider.to_string(),
                counts: all_types
                    .iter()
                    .map(|t| by_type.get(t).copied().unwrap_or(0))
                    .collect(),
            })
            .collect();

        Ok(PortfolioSummary {
            product_types: all_types.into_iter().map(str::to_string).collect(),
            rows,
        })
    }

    /// Mean 1y/3y/5y returns per group as (group, period, value) triples.
    ///
    /// Periods whose column stayed text are left out; empty means are omitted.
    pub fn trend_comparison(
        table: &EnrichedTable,
        grouping: TrendGrouping,
    ) -> Result<Vec<TrendPoint>, PresenterError> {
        let df = table.dataframe();
        let groups = text_column(df, grouping.column())?;

        let mut by_group: BTreeMap<&str, Vec<usize>> = BTreeMap::new();
        for (i, group) in groups.into_iter().enumerate() {
            if let Some(group) = group {
                by_group.entry(group).or_default().push(i);
            }
        }

        let periods: Vec<(&'static str, &Float64Chunked)> = TREND_PERIODS
            .iter()
            .filter_map(|&period| numeric_column(df, period).ok().map(|ca| (period, ca)))
            .collect();

        let mut points = Vec::new();
        for (group, rows) in &by_group {
            for (period, values) in &periods {
                let present: Vec<f64> = rows.iter().filter_map(|&i| values.get(i)).collect();
                if present.is_empty() {
                    continue;
                }
                points.push(TrendPoint {
                    group: group.to_string(),
                    period: *period,
                    value: StatsCalculator::mean(&present),
                });
            }
        }
        Ok(points)
    }

    /// One-year return distribution per product type.
    pub fn product_type_distribution(
        table: &EnrichedTable,
    ) -> Result<Vec<BoxSummary>, PresenterError> {
        let df = table.dataframe();
        let product_types = text_column(df, PRODUCT_TYPE)?;
        let returns = numeric_column(df, RETURN_1Y)?;

        let mut groups: BTreeMap<&str, Vec<f64>> = BTreeMap::new();
        for (product_type, ret) in product_types.into_iter().zip(returns) {
            if let (Some(product_type), Some(ret)) = (product_type, ret) {
                groups.entry(product_type).or_default().push(ret);
            }
        }

        Ok(groups
            .into_iter()
            .map(|(product_type, values)| {
                let mut summary = StatsCalculator::box_summary(&values);
                summary.group_name = product_type.to_string();
                summary
            })
            .collect())
    }

    /// Rows of one product type, highest one-year return first.
    pub fn filter_by_product_type(
        table: &EnrichedTable,
        product_type: &str,
    ) -> Result<DataFrame, PresenterError> {
        Self::filter_sorted(table, PRODUCT_TYPE, product_type)
    }

    /// Rows of one provider, highest one-year return first.
    pub fn filter_by_provider(
        table: &EnrichedTable,
        provider: &str,
    ) -> Result<DataFrame, PresenterError> {
        Self::filter_sorted(table, PROVIDER, provider)
    }

    /// Distinct values of a text column in first-appearance order.
    pub fn distinct_values(table: &EnrichedTable, column: &'static str) -> Vec<String> {
        let mut seen = BTreeSet::new();
        text_values(table.dataframe(), column)
            .into_iter()
            .flatten()
            .filter(|v| seen.insert(v.clone()))
            .collect()
    }

    fn filter_sorted(
        table: &EnrichedTable,
        column: &'static str,
        value: &str,
    ) -> Result<DataFrame, PresenterError> {
        let df = table.dataframe();
        let keys = text_column(df, column)?;
        let mut rows: Vec<usize> = keys
            .into_iter()
            .enumerate()
            .filter(|(_, key)| *key == Some(value))
            .map(|(i, _)| i)
            .collect();

        // Text one-year returns cannot be ranked; keep table order then.
        if let Ok(returns) = numeric_column(df, RETURN_1Y) {
            rows.sort_by(|&a, &b| {
                let (a, b) = (returns.get(a), returns.get(b));
                b.partial_cmp(&a).unwrap_or(std::cmp::Ordering::Equal)
            });
        }

        let idx = IdxCa::from_vec(
            "idx".into(),
            rows.into_iter().map(|i| i as IdxSize).collect(),
        );
        Ok(df.take(&idx)?)
    }
}

fn text_column<'a>(
    df: &'a DataFrame,
    name: &'static str,
) -> Result<&'a StringChunked, PresenterError> {
    let col = df
        .column(name)
        .map_err(|_| PresenterError::MissingColumn(name))?;
    col.str().map_err(|_| PresenterError::NotText(name))
}

fn numeric_column<'a>(
    df: &'a DataFrame,
    name: &'static str,
) -> Result<&'a Float64Chunked, PresenterError> {
    let col = df
        .column(name)
        .map_err(|_| PresenterError::MissingColumn(name))?;
    col.f64().map_err(|_| PresenterError::NotNumeric(name))
}
