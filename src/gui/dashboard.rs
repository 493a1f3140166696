//! Dashboard Widget
//! Right side scrollable panel laying out the chart and table sections.

use crate::charts::ChartPlotter;
use crate::data::EnrichedTable;
use crate::gui::control_panel::ViewSettings;
use crate::presenter::{
    EfficiencyScatter, PortfolioSummary, Presenter, PresenterError, ProviderMean, TrendPoint,
};
use crate::stats::BoxSummary;
use egui::{Color32, RichText, ScrollArea};
use polars::prelude::*;
use tracing::debug;

const SECTION_SPACING: f32 = 18.0;

/// Views that depend only on the enriched table.
struct SessionViews {
    distribution: Result<Vec<BoxSummary>, PresenterError>,
    ranking: Result<Vec<ProviderMean>, PresenterError>,
    /// `None` when the table carries no fee columns: the section is not shown.
    scatter: Option<Result<EfficiencyScatter, PresenterError>>,
    portfolio: Result<(PortfolioSummary, DataFrame), PresenterError>,
}

/// Views that follow the selectors.
struct SelectionViews {
    by_product_type: Option<Result<DataFrame, PresenterError>>,
    by_provider: Option<Result<DataFrame, PresenterError>>,
    recommended: Result<DataFrame, PresenterError>,
    trend: Result<Vec<TrendPoint>, PresenterError>,
}

/// Scrollable dashboard of charts and tables for one enriched table.
#[derive(Default)]
pub struct Dashboard {
    table: Option<EnrichedTable>,
    settings: ViewSettings,
    session: Option<SessionViews>,
    selection: Option<SelectionViews>,
}

impl Dashboard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// Compute every view for a freshly loaded table.
    pub fn set_table(&mut self, table: EnrichedTable, top_n: usize, settings: &ViewSettings) {
        let scatter = table
            .has_fee_data()
            .then(|| Presenter::efficiency_scatter(&table, top_n));
        let portfolio = Presenter::portfolio_summary(&table).and_then(|summary| {
            let df = summary.to_dataframe()?;
            Ok((summary, df))
        });

        self.session = Some(SessionViews {
            distribution: Presenter::product_type_distribution(&table),
            ranking: Presenter::provider_ranking(&table),
            scatter,
            portfolio,
        });
        self.table = Some(table);
        self.update_selection(settings);
    }

    /// Recompute the selector-driven views.
    pub fn update_selection(&mut self, settings: &ViewSettings) {
        let Some(table) = &self.table else {
            return;
        };
        debug!(?settings, "recomputing selection views");

        self.selection = Some(SelectionViews {
            by_product_type: settings
                .product_type
                .as_deref()
                .map(|t| Presenter::filter_by_product_type(table, t)),
            by_provider: settings
                .provider
                .as_deref()
                .map(|p| Presenter::filter_by_provider(table, p)),
            recommended: Presenter::recommend(table, settings.risk_tier),
            trend: Presenter::trend_comparison(table, settings.trend_grouping),
        });
        self.settings = settings.clone();
    }

    pub fn show(&self, ui: &mut egui::Ui) {
        let (Some(table), Some(session), Some(selection)) =
            (&self.table, &self.session, &self.selection)
        else {
            ui.centered_and_justified(|ui| {
                ui.label(
                    RichText::new("파일을 불러올 수 없습니다. 기본 파일이 없거나 업로드되지 않았습니다.")
                        .size(16.0),
                );
            });
            return;
        };

        ScrollArea::vertical()
            .auto_shrink([false, false])
            .show(ui, |ui| {
                ui.label(
                    RichText::new(format!("📊 IRP 수익률 비교 ({}개 상품)", table.height()))
                        .size(22.0)
                        .strong(),
                );
                ui.add_space(SECTION_SPACING);

                Self::section(ui, "1. 상품 유형별 1년 수익률 분포", |ui| {
                    Self::show_result(ui, &session.distribution, |ui, summaries| {
                        ChartPlotter::draw_distribution_chart(ui, summaries)
                    });
                });

                Self::section(ui, "2. 사업자별 평균 수익률", |ui| {
                    Self::show_result(ui, &session.ranking, |ui, ranking| {
                        ChartPlotter::draw_ranking_chart(ui, ranking)
                    });
                });

                Self::section(ui, "3. 상품 유형별 필터링", |ui| {
                    Self::show_optional_table(ui, "by_product_type", &selection.by_product_type);
                });

                Self::section(ui, "4. 사업자별 상품", |ui| {
                    Self::show_optional_table(ui, "by_provider", &selection.by_provider);
                });

                if let Some(scatter) = &session.scatter {
                    Self::section(ui, "5. 비용 대비 수익률 (순효율 상위)", |ui| {
                        Self::show_result(ui, scatter, ChartPlotter::draw_efficiency_scatter);
                    });
                }

                let tier_title = format!("6. 투자 성향별 추천 상품 ({})", self.settings.risk_tier);
                Self::section(ui, &tier_title, |ui| {
                    Self::show_result(ui, &selection.recommended, |ui, df| {
                        ChartPlotter::draw_table(ui, "recommended", df)
                    });
                });

                Self::section(ui, "7. 사업자별 상품 구성", |ui| {
                    Self::show_result(ui, &session.portfolio, |ui, (_, df)| {
                        ChartPlotter::draw_table(ui, "portfolio", df)
                    });
                });

                let trend_title = format!(
                    "8. 기간별 평균 수익률 비교 ({} 기준)",
                    self.settings.trend_grouping.label()
                );
                Self::section(ui, &trend_title, |ui| {
                    Self::show_result(ui, &selection.trend, |ui, points| {
                        ChartPlotter::draw_trend_chart(ui, "trend", points)
                    });
                });
            });
    }

    fn section(ui: &mut egui::Ui, title: &str, body: impl FnOnce(&mut egui::Ui)) {
        ui.label(RichText::new(title).size(16.0).strong());
        ui.add_space(6.0);
        body(ui);
        ui.add_space(SECTION_SPACING);
        ui.separator();
        ui.add_space(SECTION_SPACING / 2.0);
    }

    fn show_result<T>(
        ui: &mut egui::Ui,
        result: &Result<T, PresenterError>,
        draw: impl FnOnce(&mut egui::Ui, &T),
    ) {
        match result {
            Ok(view) => draw(ui, view),
            Err(e) => Self::show_error(ui, e),
        }
    }

    fn show_optional_table(
        ui: &mut egui::Ui,
        id: &str,
        view: &Option<Result<DataFrame, PresenterError>>,
    ) {
        match view {
            None => {
                ui.label(RichText::new("선택된 항목이 없습니다").color(Color32::GRAY));
            }
            Some(Ok(df)) => ChartPlotter::draw_table(ui, id, df),
            Some(Err(e)) => Self::show_error(ui, e),
        }
    }

    fn show_error(ui: &mut egui::Ui, error: &PresenterError) {
        ui.label(RichText::new(error.to_string()).color(Color32::from_rgb(220, 53, 69)));
    }
}
