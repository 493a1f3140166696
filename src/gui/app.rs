//! IRP Dashboard Main Application
//! Main window with control panel and dashboard.

use crate::config::AppConfig;
use crate::data::model::{PRODUCT_TYPE, PROVIDER};
use crate::data::{LoadCache, LoadError, Pipeline, PipelineError};
use crate::gui::control_panel::StatusKind;
use crate::gui::{ControlPanel, ControlPanelAction, Dashboard};
use crate::presenter::Presenter;
use egui::SidePanel;
use std::path::PathBuf;
use tracing::{error, info};

/// Main application window.
pub struct IrpDashboardApp {
    config: AppConfig,
    cache: LoadCache,
    control_panel: ControlPanel,
    dashboard: Dashboard,
}

impl IrpDashboardApp {
    pub fn new(_cc: &eframe::CreationContext<'_>, config: AppConfig) -> Self {
        let mut app = Self {
            control_panel: ControlPanel::new(config.fee_path.clone()),
            config,
            cache: LoadCache::new(),
            dashboard: Dashboard::new(),
        };

        let default_path = app.config.returns_path.clone();
        if default_path.exists() {
            app.load_returns(default_path);
        } else {
            app.control_panel.set_status(
                StatusKind::Warning,
                format!(
                    "기본 파일이 존재하지 않습니다. 파일을 업로드해주세요. ({})",
                    default_path.display()
                ),
            );
        }
        app
    }

    /// Handle returns file selection
    fn handle_browse_returns(&mut self) {
        if let Some(path) = rfd::FileDialog::new()
            .add_filter("Spreadsheet", &["xlsx", "xls", "csv"])
            .pick_file()
        {
            self.load_returns(path);
        }
    }

    fn handle_reload(&mut self) {
        match self.control_panel.returns_path.clone() {
            Some(path) => self.load_returns(path),
            None => self.control_panel.set_status(
                StatusKind::Warning,
                "불러올 파일이 없습니다. 파일을 업로드해주세요.",
            ),
        }
    }

    /// Run the pipeline for a returns file and rebuild every view.
    fn load_returns(&mut self, path: PathBuf) {
        self.control_panel.returns_path = Some(path.clone());
        self.control_panel.warnings.clear();

        match Pipeline::run(&mut self.cache, &self.config, &path) {
            Ok(outcome) => {
                let rows = outcome.table.height();
                self.control_panel.update_options(
                    Presenter::distinct_values(&outcome.table, PRODUCT_TYPE),
                    Presenter::distinct_values(&outcome.table, PROVIDER),
                );
                self.control_panel.warnings =
                    outcome.warnings.iter().map(|w| w.to_string()).collect();
                self.control_panel
                    .set_status(StatusKind::Info, format!("{}개 상품을 불러왔습니다", rows));

                self.dashboard.set_table(
                    outcome.table,
                    self.config.top_n,
                    &self.control_panel.settings,
                );
                info!(
                    path = %path.display(),
                    rows,
                    cached_files = self.cache.len(),
                    "dashboard ready"
                );
            }
            Err(PipelineError::Load(LoadError::NotFound(missing))) => {
                self.dashboard.clear();
                self.control_panel.set_status(
                    StatusKind::Warning,
                    format!(
                        "파일이 존재하지 않습니다. 파일을 업로드해주세요. ({})",
                        missing.display()
                    ),
                );
            }
            Err(e) => {
                error!(path = %path.display(), error = %e, "pipeline failed");
                self.dashboard.clear();
                self.control_panel.set_status(StatusKind::Error, e.to_string());
            }
        }
    }
}

impl eframe::App for IrpDashboardApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // Left panel - Control Panel
        SidePanel::left("control_panel")
            .min_width(300.0)
            .max_width(360.0)
            .show(ctx, |ui| {
                egui::ScrollArea::vertical().show(ui, |ui| {
                    let action = self.control_panel.show(ui);

                    match action {
                        ControlPanelAction::BrowseReturns => self.handle_browse_returns(),
                        ControlPanelAction::Reload => self.handle_reload(),
                        ControlPanelAction::SelectionChanged => {
                            self.dashboard
                                .update_selection(&self.control_panel.settings);
                        }
                        ControlPanelAction::None => {}
                    }
                });
            });

        // Central panel - Dashboard
        egui::CentralPanel::default().show(ctx, |ui| {
            self.dashboard.show(ui);
        });
    }
}
