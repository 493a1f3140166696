//! Presenter module - Aggregations behind the dashboard views

mod recipes;

pub use recipes::{
    EfficiencyScatter, PortfolioSummary, Presenter, PresenterError, ProviderMean, RiskTier,
    TrendGrouping, TrendPoint, TREND_PERIODS,
};
