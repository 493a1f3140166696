//! Chart Plotter Module
//! Creates interactive visualizations using egui_plot.

use crate::data::model::column_label;
use crate::presenter::{EfficiencyScatter, ProviderMean, TrendPoint, TREND_PERIODS};
use crate::stats::BoxSummary;
use egui::{Align2, Color32, RichText};
use egui_plot::{
    Bar, BarChart, BoxElem, BoxPlot, BoxSpread, Legend, MarkerShape, Plot, PlotPoint, PlotPoints,
    Points, Text,
};
use polars::prelude::*;

/// Color palette for groups
pub const PALETTE: [Color32; 10] = [
    Color32::from_rgb(52, 152, 219),  // Blue
    Color32::from_rgb(231, 76, 60),   // Red
    Color32::from_rgb(46, 204, 113),  // Green
    Color32::from_rgb(155, 89, 182),  // Purple
    Color32::from_rgb(243, 156, 18),  // Orange
    Color32::from_rgb(26, 188, 156),  // Teal
    Color32::from_rgb(233, 30, 99),   // Pink
    Color32::from_rgb(0, 188, 212),   // Cyan
    Color32::from_rgb(255, 87, 34),   // Deep Orange
    Color32::from_rgb(96, 125, 139),  // Blue Grey
];

/// Highlight for the labelled top points of the scatter.
pub const HIGHLIGHT_COLOR: Color32 = Color32::from_rgb(220, 53, 69);

const CHART_HEIGHT: f32 = 320.0;
const TABLE_MAX_HEIGHT: f32 = 260.0;

/// Creates dashboard charts using egui_plot.
pub struct ChartPlotter;

impl ChartPlotter {
    pub fn group_color(group_index: usize) -> Color32 {
        PALETTE[group_index % PALETTE.len()]
    }

    /// Category labels for integer x positions.
    fn category_formatter(
        labels: Vec<String>,
    ) -> impl Fn(egui_plot::GridMark, &std::ops::RangeInclusive<f64>) -> String {
        move |mark, _range| {
            let rounded = mark.value.round();
            if (mark.value - rounded).abs() > 1e-6 || rounded < 0.0 {
                return String::new();
            }
            labels.get(rounded as usize).cloned().unwrap_or_default()
        }
    }

    /// One-year return distribution per product type, whiskers at min and max.
    pub fn draw_distribution_chart(ui: &mut egui::Ui, summaries: &[BoxSummary]) {
        let labels: Vec<String> = summaries.iter().map(|s| s.group_name.clone()).collect();

        Plot::new("distribution_by_product_type")
            .height(CHART_HEIGHT)
            .allow_scroll(false)
            .x_axis_label("상품 유형")
            .y_axis_label("1년 수익률 (%)")
            .x_axis_formatter(Self::category_formatter(labels))
            .show(ui, |plot_ui| {
                for (i, summary) in summaries.iter().enumerate() {
                    if summary.count == 0 {
                        continue;
                    }
                    let color = Self::group_color(i);
                    let elem = BoxElem::new(
                        i as f64,
                        BoxSpread::new(
                            summary.min,
                            summary.q1,
                            summary.median,
                            summary.q3,
                            summary.max,
                        ),
                    )
                    .name(&summary.group_name)
                    .box_width(0.5)
                    .fill(color.gamma_multiply(0.3))
                    .stroke(egui::Stroke::new(1.5, color));

                    plot_ui.box_plot(BoxPlot::new(vec![elem]).name(&summary.group_name));
                }
            });
    }

    /// Mean one-year return per provider, in ranking order.
    pub fn draw_ranking_chart(ui: &mut egui::Ui, ranking: &[ProviderMean]) {
        let labels: Vec<String> = ranking.iter().map(|r| r.provider.clone()).collect();
        let bars: Vec<Bar> = ranking
            .iter()
            .enumerate()
            .map(|(i, r)| {
                Bar::new(i as f64, r.mean_return)
                    .name(&r.provider)
                    .width(0.7)
                    .fill(PALETTE[0])
            })
            .collect();

        Plot::new("provider_ranking")
            .height(CHART_HEIGHT)
            .allow_scroll(false)
            .x_axis_label("사업자명")
            .y_axis_label("평균 수익률 (%)")
            .x_axis_formatter(Self::category_formatter(labels))
            .show(ui, |plot_ui| {
                plot_ui.bar_chart(BarChart::new(bars).name("평균 1년 수익률"));
            });
    }

    /// Cost ratio against one-year return, labelling the most efficient rows.
    pub fn draw_efficiency_scatter(ui: &mut egui::Ui, scatter: &EfficiencyScatter) {
        Plot::new("efficiency_scatter")
            .height(CHART_HEIGHT)
            .allow_scroll(false)
            .legend(Legend::default())
            .x_axis_label("총비용부담률 (%)")
            .y_axis_label("1년 수익률 (%)")
            .show(ui, |plot_ui| {
                let all: PlotPoints = scatter
                    .points
                    .iter()
                    .map(|p| [p.total_cost_ratio, p.return_1y])
                    .collect();
                plot_ui.points(
                    Points::new(all)
                        .radius(3.5)
                        .color(PALETTE[0].gamma_multiply(0.7))
                        .name("전체 상품"),
                );

                let top: PlotPoints = scatter
                    .top
                    .iter()
                    .map(|p| [p.total_cost_ratio, p.return_1y])
                    .collect();
                plot_ui.points(
                    Points::new(top)
                        .radius(6.0)
                        .shape(MarkerShape::Diamond)
                        .color(HIGHLIGHT_COLOR)
                        .name(format!("순효율 상위 {}", scatter.top.len())),
                );

                for (rank, p) in scatter.top.iter().enumerate() {
                    plot_ui.text(
                        Text::new(
                            PlotPoint::new(p.total_cost_ratio, p.return_1y),
                            RichText::new(format!(
                                "{}. {} ({:.2})",
                                rank + 1,
                                p.provider,
                                p.net_efficiency
                            ))
                            .size(11.0),
                        )
                        .anchor(Align2::LEFT_BOTTOM)
                        .color(HIGHLIGHT_COLOR),
                    );
                }
            });
    }

    /// Grouped bars: one cluster per group, one bar per period.
    pub fn draw_trend_chart(ui: &mut egui::Ui, id: &str, points: &[TrendPoint]) {
        let mut groups: Vec<String> = Vec::new();
        for p in points {
            if !groups.contains(&p.group) {
                groups.push(p.group.clone());
            }
        }

        let bar_width = 0.8 / TREND_PERIODS.len() as f64;
        let charts: Vec<BarChart> = TREND_PERIODS
            .iter()
            .enumerate()
            .map(|(k, period)| {
                let offset = (k as f64 - (TREND_PERIODS.len() - 1) as f64 / 2.0) * bar_width;
                let bars: Vec<Bar> = points
                    .iter()
                    .filter(|p| p.period == *period)
                    .filter_map(|p| {
                        let x = groups.iter().position(|g| *g == p.group)? as f64;
                        Some(Bar::new(x + offset, p.value).width(bar_width * 0.9).name(&p.group))
                    })
                    .collect();
                BarChart::new(bars)
                    .name(column_label(period))
                    .color(Self::group_color(k))
            })
            .collect();

        Plot::new(format!("trend_{}", id))
            .height(CHART_HEIGHT)
            .allow_scroll(false)
            .legend(Legend::default())
            .y_axis_label("평균 수익률 (%)")
            .x_axis_formatter(Self::category_formatter(groups))
            .show(ui, |plot_ui| {
                for chart in charts {
                    plot_ui.bar_chart(chart);
                }
            });
    }

    /// Scrollable grid view of a frame, with canonical columns relabelled.
    pub fn draw_table(ui: &mut egui::Ui, id: &str, df: &DataFrame) {
        if df.height() == 0 {
            ui.label(RichText::new("해당하는 상품이 없습니다").color(Color32::GRAY));
            return;
        }

        let columns = df.get_columns();
        egui::Frame::none()
            .fill(ui.visuals().widgets.noninteractive.bg_fill)
            .rounding(5.0)
            .inner_margin(8.0)
            .show(ui, |ui| {
                egui::ScrollArea::both()
                    .id_salt(format!("table_scroll_{}", id))
                    .max_height(TABLE_MAX_HEIGHT)
                    .show(ui, |ui| {
                        egui::Grid::new(ui.make_persistent_id(format!("table_{}", id)))
                            .striped(true)
                            .min_col_width(60.0)
                            .spacing([10.0, 4.0])
                            .show(ui, |ui| {
                                for col in columns {
                                    ui.label(
                                        RichText::new(column_label(col.name().as_str()))
                                            .strong()
                                            .size(11.0),
                                    );
                                }
                                ui.end_row();

                                for row in 0..df.height() {
                                    for col in columns {
                                        ui.label(RichText::new(Self::cell_text(col, row)).size(11.0));
                                    }
                                    ui.end_row();
                                }
                            });
                    });
            });
    }

    fn cell_text(col: &Column, row: usize) -> String {
        match col.get(row) {
            Ok(AnyValue::Null) | Err(_) => "-".to_string(),
            Ok(AnyValue::Float64(v)) => format!("{:.2}", v),
            Ok(AnyValue::String(s)) => s.to_string(),
            Ok(other) => other.to_string().trim_matches('"').to_string(),
        }
    }
}
