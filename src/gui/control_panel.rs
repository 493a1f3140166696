//! Control Panel Widget
//! Left side panel with file upload, view selectors and status messages.

use crate::presenter::{RiskTier, TrendGrouping};
use egui::{Color32, ComboBox, RichText};
use std::path::PathBuf;

/// Selector state that parameterizes the presenter views.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ViewSettings {
    pub product_type: Option<String>,
    pub provider: Option<String>,
    pub risk_tier: RiskTier,
    pub trend_grouping: TrendGrouping,
}

/// Status line severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusKind {
    Info,
    Warning,
    Error,
}

/// Left side control panel with file selection and view selectors.
pub struct ControlPanel {
    pub settings: ViewSettings,
    pub returns_path: Option<PathBuf>,
    pub fee_path: PathBuf,
    pub product_types: Vec<String>,
    pub providers: Vec<String>,
    pub status: String,
    pub status_kind: StatusKind,
    pub warnings: Vec<String>,
}

impl Default for ControlPanel {
    fn default() -> Self {
        Self {
            settings: ViewSettings::default(),
            returns_path: None,
            fee_path: PathBuf::new(),
            product_types: Vec::new(),
            providers: Vec::new(),
            status: "Ready".to_string(),
            status_kind: StatusKind::Info,
            warnings: Vec::new(),
        }
    }
}

impl ControlPanel {
    pub fn new(fee_path: PathBuf) -> Self {
        Self {
            fee_path,
            ..Self::default()
        }
    }

    /// Replace selector options after a load, keeping selections that still exist.
    pub fn update_options(&mut self, product_types: Vec<String>, providers: Vec<String>) {
        Self::retain_selection(&mut self.settings.product_type, &product_types);
        Self::retain_selection(&mut self.settings.provider, &providers);
        self.product_types = product_types;
        self.providers = providers;
    }

    fn retain_selection(selection: &mut Option<String>, options: &[String]) {
        if !selection.as_ref().is_some_and(|s| options.contains(s)) {
            *selection = options.first().cloned();
        }
    }

    pub fn set_status(&mut self, kind: StatusKind, status: impl Into<String>) {
        self.status_kind = kind;
        self.status = status.into();
    }

    /// Draw the control panel
    pub fn show(&mut self, ui: &mut egui::Ui) -> ControlPanelAction {
        let mut action = ControlPanelAction::None;
        let before = self.settings.clone();

        // Title
        ui.vertical_centered(|ui| {
            ui.add_space(5.0);
            ui.label(
                RichText::new("📊 IRP 수익률 대시보드")
                    .size(20.0)
                    .color(Color32::from_rgb(100, 149, 237)),
            );
        });
        ui.add_space(10.0);
        ui.separator();
        ui.add_space(5.0);

        // ===== File Section =====
        ui.label(RichText::new("📁 파일 업로드").size(14.0).strong());
        ui.add_space(5.0);

        egui::Frame::none()
            .fill(ui.visuals().widgets.noninteractive.bg_fill)
            .rounding(5.0)
            .inner_margin(8.0)
            .show(ui, |ui| {
                ui.horizontal(|ui| {
                    let path_text = self
                        .returns_path
                        .as_ref()
                        .and_then(|p| p.file_name())
                        .map(|n| n.to_string_lossy().to_string())
                        .unwrap_or_else(|| "선택된 파일 없음".to_string());

                    ui.label(RichText::new(&path_text).size(12.0).color(
                        if self.returns_path.is_some() {
                            ui.visuals().text_color()
                        } else {
                            Color32::GRAY
                        },
                    ));

                    ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                        if ui.button("📂 찾아보기").clicked() {
                            action = ControlPanelAction::BrowseReturns;
                        }
                    });
                });

                ui.add_space(4.0);
                ui.label(
                    RichText::new(format!("수수료 파일: {}", self.fee_path.display()))
                        .size(11.0)
                        .color(Color32::GRAY),
                );
                if ui.small_button("🔄 다시 불러오기").clicked() {
                    action = ControlPanelAction::Reload;
                }
            });

        ui.add_space(15.0);
        ui.separator();
        ui.add_space(10.0);

        // ===== Selector Section =====
        ui.label(RichText::new("🔧 보기 설정").size(14.0).strong());
        ui.add_space(8.0);

        let label_width = 90.0;
        let combo_width = 170.0;

        ui.horizontal(|ui| {
            ui.add_sized([label_width, 20.0], egui::Label::new("상품 유형:"));
            Self::option_combo(
                ui,
                "product_type",
                combo_width,
                &mut self.settings.product_type,
                &self.product_types,
            );
        });

        ui.add_space(5.0);

        ui.horizontal(|ui| {
            ui.add_sized([label_width, 20.0], egui::Label::new("사업자:"));
            Self::option_combo(
                ui,
                "provider",
                combo_width,
                &mut self.settings.provider,
                &self.providers,
            );
        });

        ui.add_space(5.0);

        ui.horizontal(|ui| {
            ui.add_sized([label_width, 20.0], egui::Label::new("투자 성향:"));
            ComboBox::from_id_salt("risk_tier")
                .width(combo_width)
                .selected_text(self.settings.risk_tier.label())
                .show_ui(ui, |ui| {
                    for tier in RiskTier::ALL {
                        ui.selectable_value(&mut self.settings.risk_tier, tier, tier.label());
                    }
                });
        });

        ui.add_space(5.0);

        ui.horizontal(|ui| {
            ui.add_sized([label_width, 20.0], egui::Label::new("추세 기준:"));
            ui.radio_value(
                &mut self.settings.trend_grouping,
                TrendGrouping::Provider,
                TrendGrouping::Provider.label(),
            );
            ui.radio_value(
                &mut self.settings.trend_grouping,
                TrendGrouping::ProductType,
                TrendGrouping::ProductType.label(),
            );
        });

        ui.add_space(15.0);
        ui.separator();
        ui.add_space(10.0);

        // ===== Status Section =====
        ui.label(RichText::new("📋 상태").size(14.0).strong());
        ui.add_space(5.0);

        let status_color = match self.status_kind {
            StatusKind::Error => Color32::from_rgb(220, 53, 69),
            StatusKind::Warning => Color32::from_rgb(243, 156, 18),
            StatusKind::Info => Color32::GRAY,
        };
        ui.label(RichText::new(&self.status).size(11.0).color(status_color));

        for warning in &self.warnings {
            ui.add_space(3.0);
            ui.label(
                RichText::new(format!("⚠ {}", warning))
                    .size(11.0)
                    .color(Color32::from_rgb(243, 156, 18)),
            );
        }

        if action == ControlPanelAction::None && self.settings != before {
            action = ControlPanelAction::SelectionChanged;
        }
        action
    }

    fn option_combo(
        ui: &mut egui::Ui,
        id: &str,
        width: f32,
        selection: &mut Option<String>,
        options: &[String],
    ) {
        ComboBox::from_id_salt(id)
            .width(width)
            .selected_text(selection.clone().unwrap_or_default())
            .show_ui(ui, |ui| {
                for option in options {
                    if ui
                        .selectable_label(selection.as_ref() == Some(option), option)
                        .clicked()
                    {
                        *selection = Some(option.clone());
                    }
                }
            });
    }
}

/// Actions triggered by control panel
#[derive(Debug, Clone, PartialEq)]
pub enum ControlPanelAction {
    None,
    BrowseReturns,
    Reload,
    SelectionChanged,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn options_keep_existing_selection() {
        let mut panel = ControlPanel::new(PathBuf::from("fees.xlsx"));
        panel.update_options(vec!["A".into(), "B".into()], vec!["X".into()]);
        assert_eq!(panel.settings.product_type.as_deref(), Some("A"));

        panel.settings.product_type = Some("B".into());
        panel.update_options(vec!["B".into(), "C".into()], vec!["X".into()]);
        assert_eq!(panel.settings.product_type.as_deref(), Some("B"));

        panel.update_options(vec!["C".into()], Vec::new());
        assert_eq!(panel.settings.product_type.as_deref(), Some("C"));
        assert_eq!(panel.settings.provider, None);
    }
}
